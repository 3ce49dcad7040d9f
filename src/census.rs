//! Read-only population reports for external consumers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::animal::Species;
use crate::geography::{Loc, TerrainKind};

/// Animal counts of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCensus {
    pub row: usize,
    pub col: usize,
    pub terrain: TerrainKind,
    pub herbivores: usize,
    pub carnivores: usize,
}

impl CellCensus {
    pub fn loc(&self) -> Loc {
        Loc::new(self.row, self.col)
    }

    pub fn count(&self, species: Species) -> usize {
        match species {
            Species::Herbivore => self.herbivores,
            Species::Carnivore => self.carnivores,
        }
    }

    pub fn total(&self) -> usize {
        self.herbivores + self.carnivores
    }
}

/// Island-wide counts at the end of a year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Census {
    pub year: u32,
    pub total: usize,
    pub per_species: BTreeMap<Species, usize>,
    pub cells: Vec<CellCensus>,
}

impl Census {
    pub fn new(year: u32, cells: Vec<CellCensus>) -> Self {
        let mut per_species: BTreeMap<Species, usize> =
            Species::ALL.into_iter().map(|species| (species, 0)).collect();
        for cell in &cells {
            for species in Species::ALL {
                *per_species.entry(species).or_default() += cell.count(species);
            }
        }
        let total = per_species.values().sum();
        Self {
            year,
            total,
            per_species,
            cells,
        }
    }

    pub fn cell(&self, loc: Loc) -> Option<&CellCensus> {
        self.cells.iter().find(|cell| cell.loc() == loc)
    }

    /// Cells holding at least one animal.
    pub fn occupied(&self) -> impl Iterator<Item = &CellCensus> + '_ {
        self.cells.iter().filter(|cell| cell.total() > 0)
    }
}
