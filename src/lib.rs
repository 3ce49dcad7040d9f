pub mod animal;
pub mod cell;
pub mod census;
pub mod config;
pub mod engine;
pub mod geography;
pub mod island;
pub mod rng;
pub mod scenario;

pub use animal::{Animal, Species};
pub use config::Params;
pub use engine::{Simulation, YearSummary};
pub use geography::{Loc, TerrainKind};
pub use island::{Island, IslandError, PopulationRecord};
