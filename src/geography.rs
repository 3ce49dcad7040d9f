//! Terrain map parsing and grid geometry.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The 13 x 21 map of Rossumøya.
pub const DEFAULT_MAP: &str = "\
OOOOOOOOOOOOOOOOOOOOO
OOOOOOOOSMMMMJJJJJJJO
OSSSSSJJJJMMJJJJJJJOO
OSSSSSSSSSMMJJJJJJOOO
OSSSSSJJJJJJJJJJJJOOO
OSSSSSJJJDDJJJSJJJOOO
OSSJJJJJDDDJJJSSSSOOO
OOSSSSJJJDDJJJSOOOOOO
OSSSJJJJJDDJJJJJJJOOO
OSSSSJJJJDDJJJJOOOOOO
OOSSSSJJJJJJJJOOOOOOO
OOOSSSSJJJJJJJOOOOOOO
OOOOOOOOOOOOOOOOOOOOO";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeographyError {
    #[error("island map is empty")]
    EmptyMap,
    #[error("inconsistent line length: row {row} has {found} cells, expected {expected}")]
    InconsistentRowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid landscape type '{code}' at ({row}, {col})")]
    InvalidTerrainCode { code: char, row: usize, col: usize },
    #[error("non-ocean boundary: '{code}' at ({row}, {col})")]
    NonOceanBoundary { code: char, row: usize, col: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TerrainKind {
    Ocean,
    Mountain,
    Desert,
    Savannah,
    Jungle,
}

impl TerrainKind {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'O' => Some(TerrainKind::Ocean),
            'M' => Some(TerrainKind::Mountain),
            'D' => Some(TerrainKind::Desert),
            'S' => Some(TerrainKind::Savannah),
            'J' => Some(TerrainKind::Jungle),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            TerrainKind::Ocean => 'O',
            TerrainKind::Mountain => 'M',
            TerrainKind::Desert => 'D',
            TerrainKind::Savannah => 'S',
            TerrainKind::Jungle => 'J',
        }
    }

    /// Ocean and Mountain cannot be entered.
    pub fn is_passable(self) -> bool {
        !matches!(self, TerrainKind::Ocean | TerrainKind::Mountain)
    }
}

impl fmt::Display for TerrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerrainKind::Ocean => "Ocean",
            TerrainKind::Mountain => "Mountain",
            TerrainKind::Desert => "Desert",
            TerrainKind::Savannah => "Savannah",
            TerrainKind::Jungle => "Jungle",
        };
        f.write_str(name)
    }
}

/// Zero-based `(row, col)` coordinate on the island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Loc {
    pub row: usize,
    pub col: usize,
}

impl Loc {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for Loc {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl From<Loc> for (usize, usize) {
    fn from(loc: Loc) -> Self {
        (loc.row, loc.col)
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Validated terrain layout of a rectangular island.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geography {
    rows: usize,
    cols: usize,
    terrain: Vec<TerrainKind>,
}

impl Geography {
    /// Parses a newline-separated terrain map.
    ///
    /// Checks run in order: row lengths, terrain codes, then the ocean border,
    /// so each malformed map reports the first class of problem it has.
    pub fn parse(map: &str) -> Result<Self, GeographyError> {
        let lines: Vec<&str> = map.lines().collect();
        if lines.is_empty() || lines[0].is_empty() {
            return Err(GeographyError::EmptyMap);
        }

        let cols = lines[0].chars().count();
        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != cols {
                return Err(GeographyError::InconsistentRowLength {
                    row,
                    expected: cols,
                    found,
                });
            }
        }

        let rows = lines.len();
        let mut terrain = Vec::with_capacity(rows * cols);
        for (row, line) in lines.iter().enumerate() {
            for (col, code) in line.chars().enumerate() {
                let kind = TerrainKind::from_code(code)
                    .ok_or(GeographyError::InvalidTerrainCode { code, row, col })?;
                terrain.push(kind);
            }
        }

        let geography = Self {
            rows,
            cols,
            terrain,
        };
        for loc in geography.locations() {
            let on_border =
                loc.row == 0 || loc.col == 0 || loc.row == rows - 1 || loc.col == cols - 1;
            let kind = geography.terrain[geography.index(loc)];
            if on_border && kind != TerrainKind::Ocean {
                return Err(GeographyError::NonOceanBoundary {
                    code: kind.code(),
                    row: loc.row,
                    col: loc.col,
                });
            }
        }
        Ok(geography)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, loc: Loc) -> bool {
        loc.row < self.rows && loc.col < self.cols
    }

    /// Row-major index of `loc`. Callers check [`Geography::contains`] first.
    pub fn index(&self, loc: Loc) -> usize {
        loc.row * self.cols + loc.col
    }

    pub fn loc_of(&self, index: usize) -> Loc {
        Loc::new(index / self.cols, index % self.cols)
    }

    pub fn terrain_at(&self, loc: Loc) -> Option<TerrainKind> {
        self.contains(loc).then(|| self.terrain[self.index(loc)])
    }

    /// All coordinates in row-major order.
    pub fn locations(&self) -> impl Iterator<Item = Loc> + '_ {
        (0..self.cell_count()).map(|index| self.loc_of(index))
    }

    /// Orthogonal neighbours in the fixed order left, right, up, down.
    /// Coordinates outside the map are skipped.
    pub fn neighbours(&self, loc: Loc) -> Vec<Loc> {
        let mut neighbours = Vec::with_capacity(4);
        if loc.col > 0 {
            neighbours.push(Loc::new(loc.row, loc.col - 1));
        }
        if loc.col + 1 < self.cols {
            neighbours.push(Loc::new(loc.row, loc.col + 1));
        }
        if loc.row > 0 {
            neighbours.push(Loc::new(loc.row - 1, loc.col));
        }
        if loc.row + 1 < self.rows {
            neighbours.push(Loc::new(loc.row + 1, loc.col));
        }
        neighbours
    }
}
