use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::{
    animal::Species,
    config::{Params, SpeciesOverrides, TerrainOverrides},
    engine::Simulation,
    geography::{TerrainKind, DEFAULT_MAP},
    island::{default_population, Island, PopulationRecord},
};

fn default_years() -> u32 {
    100
}

fn default_map() -> String {
    DEFAULT_MAP.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_years")]
    pub years: u32,
    #[serde(default = "default_map")]
    pub map: String,
    /// Stock population of the default island when omitted.
    #[serde(default)]
    pub populations: Option<Vec<PopulationRecord>>,
    #[serde(default)]
    pub animal_parameters: BTreeMap<Species, SpeciesOverrides>,
    /// Keyed by terrain code letter.
    #[serde(default)]
    pub landscape_parameters: BTreeMap<char, TerrainOverrides>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        Scenario::from_yaml(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn params(&self) -> Result<Params> {
        let mut params = Params::default();
        for (species, overrides) in &self.animal_parameters {
            params
                .set_species(*species, overrides)
                .with_context(|| format!("Invalid {species} parameters"))?;
        }
        for (code, overrides) in &self.landscape_parameters {
            let kind = TerrainKind::from_code(*code)
                .ok_or_else(|| anyhow!("Unknown landscape code '{code}'"))?;
            params
                .set_terrain(kind, overrides)
                .with_context(|| format!("Invalid {kind} parameters"))?;
        }
        Ok(params)
    }

    pub fn build_island(&self) -> Result<Island> {
        let mut island = Island::new(&self.map, self.params()?)
            .with_context(|| format!("Invalid island for scenario '{}'", self.name))?;
        let populations = match &self.populations {
            Some(records) => records.clone(),
            None => default_population(),
        };
        island
            .add_population(&populations)
            .with_context(|| format!("Invalid population for scenario '{}'", self.name))?;
        Ok(island)
    }

    pub fn build_simulation(&self, seed_override: Option<u64>) -> Result<Simulation> {
        let island = self.build_island()?;
        Ok(Simulation::from_island(
            island,
            seed_override.unwrap_or(self.seed),
        ))
    }

    pub fn years(&self, override_years: Option<u32>) -> u32 {
        override_years.unwrap_or(self.years)
    }
}
