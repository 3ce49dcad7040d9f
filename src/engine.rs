use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::animal::Species;
use crate::census::{Census, CellCensus};
use crate::config::{Params, SpeciesOverrides, TerrainOverrides};
use crate::geography::TerrainKind;
use crate::island::{Island, IslandError, Phase, PopulationRecord};
use crate::rng::SimRng;

#[derive(Clone, Debug, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Births, moves or deaths, depending on the phase.
    pub events: usize,
    pub duration_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct YearSummary {
    pub year: u32,
    pub herbivores: usize,
    pub carnivores: usize,
    pub births: usize,
    pub migrations: usize,
    pub deaths: usize,
    pub phases: Vec<PhaseReport>,
}

impl YearSummary {
    pub fn total(&self) -> usize {
        self.herbivores + self.carnivores
    }
}

/// Drives an [`Island`] year by year from a single seeded random stream.
#[derive(Debug, Clone)]
pub struct Simulation {
    island: Island,
    rng: SimRng,
    year: u32,
}

impl Simulation {
    pub fn new(map: &str, ini_pop: &[PopulationRecord], seed: u64) -> Result<Self, IslandError> {
        Self::with_params(map, ini_pop, Params::default(), seed)
    }

    pub fn with_params(
        map: &str,
        ini_pop: &[PopulationRecord],
        params: Params,
        seed: u64,
    ) -> Result<Self, IslandError> {
        let mut island = Island::new(map, params)?;
        island.add_population(ini_pop)?;
        Ok(Self::from_island(island, seed))
    }

    pub fn from_island(island: Island, seed: u64) -> Self {
        Self {
            island,
            rng: SimRng::new(seed),
            year: 0,
        }
    }

    /// Rossumøya with its stock population.
    pub fn rossumoya(seed: u64) -> Result<Self, IslandError> {
        Ok(Self::from_island(Island::rossumoya()?, seed))
    }

    pub fn set_animal_parameters(
        &mut self,
        species: Species,
        overrides: &SpeciesOverrides,
    ) -> Result<(), IslandError> {
        self.island.set_species_params(species, overrides)
    }

    pub fn set_landscape_parameters(
        &mut self,
        terrain: TerrainKind,
        overrides: &TerrainOverrides,
    ) -> Result<(), IslandError> {
        self.island.set_terrain_params(terrain, overrides)
    }

    pub fn add_population(&mut self, records: &[PopulationRecord]) -> Result<(), IslandError> {
        self.island.add_population(records)
    }

    /// Simulates one year.
    pub fn step(&mut self) -> YearSummary {
        let mut phases = Vec::with_capacity(Phase::ANNUAL_CYCLE.len());
        for phase in Phase::ANNUAL_CYCLE {
            let start = Instant::now();
            let events = self.island.run_phase(phase, &mut self.rng);
            let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;
            debug!(year = self.year + 1, phase = %phase, events, duration_ms, "phase complete");
            phases.push(PhaseReport {
                phase,
                events,
                duration_ms,
            });
        }
        self.year += 1;

        let events_of = |wanted: Phase| {
            phases
                .iter()
                .find(|report| report.phase == wanted)
                .map_or(0, |report| report.events)
        };
        let births = events_of(Phase::Procreation);
        let migrations = events_of(Phase::Migration);
        let deaths = events_of(Phase::Death);
        let summary = YearSummary {
            year: self.year,
            herbivores: self.island.total_herbivores(),
            carnivores: self.island.total_carnivores(),
            births,
            migrations,
            deaths,
            phases,
        };
        info!(
            year = summary.year,
            herbivores = summary.herbivores,
            carnivores = summary.carnivores,
            births = summary.births,
            migrations = summary.migrations,
            deaths = summary.deaths,
            "year simulated"
        );
        summary
    }

    pub fn run(&mut self, num_years: u32) {
        self.run_with_hook(num_years, |_| {});
    }

    pub fn run_with_hook<F>(&mut self, num_years: u32, mut hook: F)
    where
        F: FnMut(&YearSummary),
    {
        for _ in 0..num_years {
            let summary = self.step();
            hook(&summary);
        }
    }

    /// Last year simulated; 0 before the first step.
    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn num_animals(&self) -> usize {
        self.island.total_population()
    }

    pub fn num_animals_per_species(&self) -> BTreeMap<Species, usize> {
        self.island.per_species()
    }

    pub fn animal_distribution(&self) -> Vec<CellCensus> {
        self.island.distribution()
    }

    pub fn census(&self) -> Census {
        Census::new(self.year, self.island.distribution())
    }

    pub fn island(&self) -> &Island {
        &self.island
    }
}
