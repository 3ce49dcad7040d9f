//! The island grid and the annual cycle.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::animal::{Animal, Species};
use crate::cell::Cell;
use crate::census::CellCensus;
use crate::config::{ConfigError, Params, SpeciesOverrides, TerrainOverrides};
use crate::geography::{Geography, GeographyError, Loc, TerrainKind, DEFAULT_MAP};
use crate::rng::SimRng;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IslandError {
    #[error(transparent)]
    Geography(#[from] GeographyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("location {0} is outside the island")]
    OutOfBounds(Loc),
    #[error("animals cannot be placed in {terrain} cell at {loc}")]
    Impassable { loc: Loc, terrain: TerrainKind },
    #[error("invalid weight {weight} for {species} at {loc}")]
    InvalidWeight {
        loc: Loc,
        species: Species,
        weight: f64,
    },
}

/// One individual of a population record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalSpec {
    pub species: Species,
    pub age: u32,
    pub weight: f64,
}

/// Animals to place in a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub loc: Loc,
    pub pop: Vec<AnimalSpec>,
}

impl PopulationRecord {
    pub fn uniform(loc: Loc, species: Species, age: u32, weight: f64, count: usize) -> Self {
        Self {
            loc,
            pop: vec![
                AnimalSpec {
                    species,
                    age,
                    weight
                };
                count
            ],
        }
    }
}

/// The stock population of Rossumøya: 150 herbivores and 40
/// carnivores, all aged 5 and weighing 20, at `(10, 10)`.
pub fn default_population() -> Vec<PopulationRecord> {
    let loc = Loc::new(10, 10);
    vec![
        PopulationRecord::uniform(loc, Species::Herbivore, 5, 20.0, 150),
        PopulationRecord::uniform(loc, Species::Carnivore, 5, 20.0, 40),
    ]
}

/// Phases of the annual cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    RegrowFodder,
    Feeding,
    Procreation,
    Migration,
    ResetMigration,
    Aging,
    Death,
}

impl Phase {
    pub const ANNUAL_CYCLE: [Phase; 7] = [
        Phase::RegrowFodder,
        Phase::Feeding,
        Phase::Procreation,
        Phase::Migration,
        Phase::ResetMigration,
        Phase::Aging,
        Phase::Death,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::RegrowFodder => "regrow_fodder",
            Phase::Feeding => "feeding",
            Phase::Procreation => "procreation",
            Phase::Migration => "migration",
            Phase::ResetMigration => "reset_migration",
            Phase::Aging => "aging",
            Phase::Death => "death",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct Island {
    geography: Geography,
    cells: Vec<Cell>,
    params: Params,
}

impl Island {
    pub fn new(map: &str, params: Params) -> Result<Self, IslandError> {
        params.validate()?;
        let geography = Geography::parse(map)?;
        let cells = geography
            .locations()
            .map(|loc| {
                let kind = geography
                    .terrain_at(loc)
                    .unwrap_or(TerrainKind::Ocean);
                Cell::new(kind, &params)
            })
            .collect();
        Ok(Self {
            geography,
            cells,
            params,
        })
    }

    /// Rossumøya with its stock population and default parameters.
    pub fn rossumoya() -> Result<Self, IslandError> {
        let mut island = Self::new(DEFAULT_MAP, Params::default())?;
        island.add_population(&default_population())?;
        Ok(island)
    }

    pub fn geography(&self) -> &Geography {
        &self.geography
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn cell(&self, loc: Loc) -> Option<&Cell> {
        self.geography
            .contains(loc)
            .then(|| &self.cells[self.geography.index(loc)])
    }

    /// Cells with their coordinates, in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Loc, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| (self.geography.loc_of(index), cell))
    }

    /// Places every record, or none of them if any record is invalid.
    pub fn add_population(&mut self, records: &[PopulationRecord]) -> Result<(), IslandError> {
        for record in records {
            if let Err(err) = self.check_record(record) {
                warn!(loc = %record.loc, error = %err, "population rejected");
                return Err(err);
            }
        }

        for record in records {
            let index = self.geography.index(record.loc);
            for spec in &record.pop {
                let animal = Animal::with_weight(
                    spec.species,
                    spec.age,
                    spec.weight,
                    self.params.species(spec.species),
                );
                // Passability was checked above.
                let _ = self.cells[index].add_animal(animal);
            }
            debug!(loc = %record.loc, animals = record.pop.len(), "population added");
        }
        Ok(())
    }

    fn check_record(&self, record: &PopulationRecord) -> Result<(), IslandError> {
        let loc = record.loc;
        let terrain = self
            .geography
            .terrain_at(loc)
            .ok_or(IslandError::OutOfBounds(loc))?;
        if !terrain.is_passable() {
            return Err(IslandError::Impassable { loc, terrain });
        }
        match record
            .pop
            .iter()
            .find(|spec| !(spec.weight.is_finite() && spec.weight >= 0.0))
        {
            Some(spec) => Err(IslandError::InvalidWeight {
                loc,
                species: spec.species,
                weight: spec.weight,
            }),
            None => Ok(()),
        }
    }

    pub fn set_species_params(
        &mut self,
        species: Species,
        overrides: &SpeciesOverrides,
    ) -> Result<(), IslandError> {
        self.params.set_species(species, overrides)?;
        for cell in self.cells.iter_mut() {
            cell.refresh_fitness(&self.params);
        }
        Ok(())
    }

    pub fn set_terrain_params(
        &mut self,
        kind: TerrainKind,
        overrides: &TerrainOverrides,
    ) -> Result<(), IslandError> {
        self.params.set_terrain(kind, overrides)?;
        for cell in self.cells.iter_mut().filter(|cell| cell.kind() == kind) {
            cell.clamp_fodder(&self.params);
        }
        Ok(())
    }

    /// Runs the whole annual cycle.
    pub fn step_year(&mut self, rng: &mut SimRng) {
        for phase in Phase::ANNUAL_CYCLE {
            self.run_phase(phase, rng);
        }
    }

    /// Runs one phase on every cell. Returns the number of births, moves or
    /// deaths for the phases that have them, zero otherwise.
    pub fn run_phase(&mut self, phase: Phase, rng: &mut SimRng) -> usize {
        let params = &self.params;
        match phase {
            Phase::RegrowFodder => {
                for cell in self.cells.iter_mut() {
                    cell.regrow_fodder(params);
                }
                0
            }
            Phase::Feeding => {
                for cell in self.cells.iter_mut().filter(|cell| cell.is_passable()) {
                    cell.herbivores_eat(params);
                    cell.carnivores_eat(params, rng);
                }
                0
            }
            Phase::Procreation => {
                let mut births = 0;
                for cell in self.cells.iter_mut().filter(|cell| cell.is_passable()) {
                    births += cell.procreate(Species::Herbivore, params, rng);
                    births += cell.procreate(Species::Carnivore, params, rng);
                }
                births
            }
            Phase::Migration => self.migrate_all(rng),
            Phase::ResetMigration => {
                for cell in self.cells.iter_mut() {
                    cell.reset_migration_flags();
                }
                0
            }
            Phase::Aging => {
                for cell in self.cells.iter_mut() {
                    cell.age_and_starve(params);
                }
                0
            }
            Phase::Death => self
                .cells
                .iter_mut()
                .map(|cell| cell.die(params, rng))
                .sum(),
        }
    }

    /// Moves every migrating animal to an orthogonal neighbour, cells taken
    /// in row-major order. Returns the number of animals that moved.
    pub fn migrate_all(&mut self, rng: &mut SimRng) -> usize {
        let mut moved = 0;
        for index in 0..self.cells.len() {
            if !self.cells[index].is_passable() {
                continue;
            }
            let candidates = self.cells[index].find_migration_candidates(&self.params, rng);
            if candidates.is_empty() {
                continue;
            }
            let from = self.geography.loc_of(index);
            for animal in candidates {
                let destination = self
                    .choose_destination(from, animal.species(), rng)
                    .map(|loc| self.geography.index(loc));
                let target = destination.unwrap_or(index);
                match self.cells[target].add_animal(animal) {
                    Ok(()) if target != index => moved += 1,
                    Ok(()) => {}
                    Err(animal) => {
                        let _ = self.cells[index].add_animal(animal);
                    }
                }
            }
        }
        moved
    }

    /// Picks the neighbour an animal of `species` at `from` moves to, drawn
    /// in proportion to each neighbour's propensity. `None` when no
    /// neighbour can be entered.
    pub fn choose_destination(
        &mut self,
        from: Loc,
        species: Species,
        rng: &mut SimRng,
    ) -> Option<Loc> {
        let neighbours = self.geography.neighbours(from);
        let weights: Vec<f64> = neighbours
            .iter()
            .map(|loc| {
                let index = self.geography.index(*loc);
                self.cells[index].propensity(species, &self.params)
            })
            .collect();
        rng.weighted_index(&weights).map(|pick| neighbours[pick])
    }

    /// Migration probabilities towards each orthogonal neighbour of `from`.
    /// All zero when the animal is boxed in.
    pub fn migration_probabilities(&mut self, from: Loc, species: Species) -> Vec<(Loc, f64)> {
        let neighbours = self.geography.neighbours(from);
        let weights: Vec<f64> = neighbours
            .iter()
            .map(|loc| {
                let index = self.geography.index(*loc);
                self.cells[index].propensity(species, &self.params)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        neighbours
            .into_iter()
            .zip(weights)
            .map(|(loc, weight)| {
                let p = if total > 0.0 { weight / total } else { 0.0 };
                (loc, p)
            })
            .collect()
    }

    pub fn total_herbivores(&self) -> usize {
        self.cells.iter().map(Cell::total_herbivores).sum()
    }

    pub fn total_carnivores(&self) -> usize {
        self.cells.iter().map(Cell::total_carnivores).sum()
    }

    pub fn total_population(&self) -> usize {
        self.cells.iter().map(Cell::total_population).sum()
    }

    pub fn per_species(&self) -> BTreeMap<Species, usize> {
        Species::ALL
            .into_iter()
            .map(|species| {
                let count = self.cells.iter().map(|cell| cell.count(species)).sum();
                (species, count)
            })
            .collect()
    }

    /// Per-cell counts for every cell, in row-major order.
    pub fn distribution(&self) -> Vec<CellCensus> {
        self.cells()
            .map(|(loc, cell)| CellCensus {
                row: loc.row,
                col: loc.col,
                terrain: cell.kind(),
                herbivores: cell.total_herbivores(),
                carnivores: cell.total_carnivores(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "OOOOO\nOJJJO\nOJJJO\nOJJJO\nOOOOO";

    #[test]
    fn rossumoya_starts_with_stock_population() {
        let island = Island::rossumoya().unwrap();
        assert_eq!(island.total_population(), 190);
        let cell = island.cell(Loc::new(10, 10)).unwrap();
        assert_eq!(cell.total_herbivores(), 150);
        assert_eq!(cell.total_carnivores(), 40);
    }

    #[test]
    fn placement_into_water_is_rejected() {
        let mut island = Island::new(SMALL, Params::default()).unwrap();
        let record = PopulationRecord::uniform(Loc::new(0, 2), Species::Herbivore, 1, 10.0, 3);
        let err = island.add_population(&[record]).unwrap_err();
        assert!(matches!(err, IslandError::Impassable { .. }));
        assert_eq!(island.total_population(), 0);
    }

    #[test]
    fn placement_outside_or_with_bad_weight_is_rejected() {
        let mut island = Island::new(SMALL, Params::default()).unwrap();
        let outside = PopulationRecord::uniform(Loc::new(9, 9), Species::Herbivore, 1, 10.0, 1);
        assert!(matches!(
            island.add_population(&[outside]),
            Err(IslandError::OutOfBounds(_))
        ));

        let good = PopulationRecord::uniform(Loc::new(2, 2), Species::Herbivore, 1, 10.0, 4);
        let bad = PopulationRecord::uniform(Loc::new(2, 2), Species::Carnivore, 1, -3.0, 1);
        assert!(matches!(
            island.add_population(&[good, bad]),
            Err(IslandError::InvalidWeight { .. })
        ));
        assert_eq!(island.total_population(), 0, "records apply all or nothing");
    }

    #[test]
    fn invalid_maps_surface_geography_errors() {
        let err = Island::new("OOO\nOJ\nOOO", Params::default()).unwrap_err();
        assert!(matches!(
            err,
            IslandError::Geography(GeographyError::InconsistentRowLength { .. })
        ));
    }

    #[test]
    fn boxed_in_animals_stay_put() {
        let mut island = Island::new("OOOOO\nOOJOO\nOMJMO\nOOOOO", Params::default()).unwrap();
        let probabilities = island.migration_probabilities(Loc::new(1, 2), Species::Herbivore);
        let total: f64 = probabilities.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(probabilities[3].0, Loc::new(2, 2));
        assert_eq!(probabilities[3].1, 1.0);

        let mut sealed = Island::new("OOOOO\nOOJOO\nOOOOO", Params::default()).unwrap();
        let mut rng = SimRng::new(1);
        assert_eq!(
            sealed.choose_destination(Loc::new(1, 2), Species::Herbivore, &mut rng),
            None
        );
        assert!(sealed
            .migration_probabilities(Loc::new(1, 2), Species::Carnivore)
            .iter()
            .all(|(_, p)| *p == 0.0));
    }

    #[test]
    fn migration_prefers_richer_neighbours() {
        let mut island = Island::new("OOOOO\nODJSO\nOOOOO", Params::default()).unwrap();
        let probabilities = island.migration_probabilities(Loc::new(1, 2), Species::Herbivore);
        let desert = probabilities[0].1;
        let savannah = probabilities[1].1;
        assert!(savannah > desert);
        assert_eq!(probabilities[2].1, 0.0);
        assert_eq!(probabilities[3].1, 0.0);
    }

    #[test]
    fn parameter_changes_refresh_cached_state() {
        let mut island = Island::rossumoya().unwrap();
        let before = island.cell(Loc::new(10, 10)).unwrap().herbivores()[0].fitness();
        island
            .set_species_params(
                Species::Herbivore,
                &SpeciesOverrides {
                    w_half: Some(40.0),
                    ..Default::default()
                },
            )
            .unwrap();
        let after = island.cell(Loc::new(10, 10)).unwrap().herbivores()[0].fitness();
        assert!(after < before);

        island
            .set_terrain_params(
                TerrainKind::Jungle,
                &TerrainOverrides {
                    f_max: Some(100.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(island.cell(Loc::new(10, 10)).unwrap().fodder(), 100.0);
    }

    #[test]
    fn phases_run_in_cycle_order() {
        assert_eq!(
            Phase::ANNUAL_CYCLE,
            [
                Phase::RegrowFodder,
                Phase::Feeding,
                Phase::Procreation,
                Phase::Migration,
                Phase::ResetMigration,
                Phase::Aging,
                Phase::Death,
            ]
        );
    }

    #[test]
    fn invalid_terrain_tables_are_rejected() {
        let mut params = Params::default();
        params.savannah.f_max = -50.0;
        let err = Island::new("OOO\nOSO\nOOO", params).unwrap_err();
        assert!(matches!(
            err,
            IslandError::Config(ConfigError::InvalidParameter { name: "f_max", .. })
        ));

        let mut params = Params::default();
        params.savannah.alpha = 2.0;
        assert!(Island::new("OOO\nOSO\nOOO", params).is_err());
    }
}
