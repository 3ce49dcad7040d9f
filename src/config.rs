//! Species and landscape parameter tables.
//!
//! Every vital rate in the model reads its constants from a [`Params`] value
//! owned by the island. Overrides arrive as structs of optional fields so that
//! unspecified names keep their current value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animal::Species;
use crate::geography::TerrainKind;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value} for parameter '{name}': {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("parameter '{name}' does not apply to {target}")]
    NotApplicable { name: &'static str, target: String },
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),
}

/// Constants shared by every individual of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParams {
    pub w_birth: f64,
    pub sigma_birth: f64,
    pub beta: f64,
    pub eta: f64,
    pub a_half: f64,
    pub phi_age: f64,
    pub w_half: f64,
    pub phi_weight: f64,
    pub mu: f64,
    pub lambda: f64,
    pub gamma: f64,
    pub zeta: f64,
    pub xi: f64,
    pub omega: f64,
    #[serde(rename = "F")]
    pub appetite: f64,
    /// Kill threshold, carnivores only.
    #[serde(rename = "DeltaPhiMax", default, skip_serializing_if = "Option::is_none")]
    pub delta_phi_max: Option<f64>,
}

impl SpeciesParams {
    pub fn herbivore() -> Self {
        Self {
            w_birth: 8.0,
            sigma_birth: 1.5,
            beta: 0.9,
            eta: 0.05,
            a_half: 40.0,
            phi_age: 0.2,
            w_half: 10.0,
            phi_weight: 0.1,
            mu: 0.25,
            lambda: 1.0,
            gamma: 0.2,
            zeta: 3.5,
            xi: 1.2,
            omega: 0.4,
            appetite: 10.0,
            delta_phi_max: None,
        }
    }

    pub fn carnivore() -> Self {
        Self {
            w_birth: 6.0,
            sigma_birth: 1.0,
            beta: 0.75,
            eta: 0.125,
            a_half: 60.0,
            phi_age: 0.4,
            w_half: 4.0,
            phi_weight: 0.4,
            mu: 0.4,
            lambda: 1.0,
            gamma: 0.8,
            zeta: 3.5,
            xi: 1.1,
            omega: 0.9,
            appetite: 50.0,
            delta_phi_max: Some(10.0),
        }
    }

    pub fn defaults_for(species: Species) -> Self {
        match species {
            Species::Herbivore => Self::herbivore(),
            Species::Carnivore => Self::carnivore(),
        }
    }

    /// Minimum weight a mother needs before she can give birth at all.
    pub fn min_procreation_weight(&self) -> f64 {
        self.zeta * (self.w_birth + self.sigma_birth)
    }

    pub fn validate(&self, species: Species) -> Result<(), ConfigError> {
        let non_negative = [
            ("w_birth", self.w_birth),
            ("sigma_birth", self.sigma_birth),
            ("beta", self.beta),
            ("eta", self.eta),
            ("a_half", self.a_half),
            ("phi_age", self.phi_age),
            ("w_half", self.w_half),
            ("phi_weight", self.phi_weight),
            ("mu", self.mu),
            ("lambda", self.lambda),
            ("gamma", self.gamma),
            ("zeta", self.zeta),
            ("xi", self.xi),
            ("omega", self.omega),
            ("F", self.appetite),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() {
                return Err(ConfigError::InvalidParameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
            if value < 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name,
                    value,
                    reason: "must be non-negative",
                });
            }
        }
        if self.mu > 1.0 {
            return Err(ConfigError::InvalidParameter {
                name: "mu",
                value: self.mu,
                reason: "must lie in [0, 1]",
            });
        }
        if self.w_birth == 0.0 && self.sigma_birth == 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "sigma_birth",
                value: self.sigma_birth,
                reason: "birth weight distribution never yields a positive weight",
            });
        }
        match (species, self.delta_phi_max) {
            (Species::Carnivore, Some(delta)) if delta > 0.0 && delta.is_finite() => Ok(()),
            (Species::Carnivore, Some(delta)) => Err(ConfigError::InvalidParameter {
                name: "DeltaPhiMax",
                value: delta,
                reason: "must be strictly positive",
            }),
            (Species::Carnivore, None) => Err(ConfigError::InvalidParameter {
                name: "DeltaPhiMax",
                value: f64::NAN,
                reason: "carnivores need a kill threshold",
            }),
            (Species::Herbivore, Some(_)) => Err(ConfigError::NotApplicable {
                name: "DeltaPhiMax",
                target: species.to_string(),
            }),
            (Species::Herbivore, None) => Ok(()),
        }
    }

    /// Returns a copy with `overrides` applied, validated as a whole.
    pub fn with_overrides(
        &self,
        species: Species,
        overrides: &SpeciesOverrides,
    ) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        let o = overrides;
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = o.$field { next.$field = value; })*
            };
        }
        apply!(
            w_birth,
            sigma_birth,
            beta,
            eta,
            a_half,
            phi_age,
            w_half,
            phi_weight,
            mu,
            lambda,
            gamma,
            zeta,
            xi,
            omega,
            appetite
        );
        if let Some(delta) = o.delta_phi_max {
            if species == Species::Herbivore {
                return Err(ConfigError::NotApplicable {
                    name: "DeltaPhiMax",
                    target: species.to_string(),
                });
            }
            next.delta_phi_max = Some(delta);
        }
        next.validate(species)?;
        Ok(next)
    }
}

/// Named overrides for a species table. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesOverrides {
    pub w_birth: Option<f64>,
    pub sigma_birth: Option<f64>,
    pub beta: Option<f64>,
    pub eta: Option<f64>,
    pub a_half: Option<f64>,
    pub phi_age: Option<f64>,
    pub w_half: Option<f64>,
    pub phi_weight: Option<f64>,
    pub mu: Option<f64>,
    pub lambda: Option<f64>,
    pub gamma: Option<f64>,
    pub zeta: Option<f64>,
    pub xi: Option<f64>,
    pub omega: Option<f64>,
    #[serde(rename = "F")]
    pub appetite: Option<f64>,
    #[serde(rename = "DeltaPhiMax")]
    pub delta_phi_max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainParams {
    pub f_max: f64,
    /// Regrowth rate, Savannah only.
    pub alpha: f64,
}

impl TerrainParams {
    pub const BARREN: TerrainParams = TerrainParams {
        f_max: 0.0,
        alpha: 0.0,
    };

    /// `f_max` must be finite and non-negative, `alpha` must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.f_max.is_finite() && self.f_max >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "f_max",
                value: self.f_max,
                reason: "must be non-negative",
            });
        }
        if !(self.alpha.is_finite() && (0.0..=1.0).contains(&self.alpha)) {
            return Err(ConfigError::InvalidParameter {
                name: "alpha",
                value: self.alpha,
                reason: "must lie in [0, 1]",
            });
        }
        Ok(())
    }

    pub fn savannah() -> Self {
        Self {
            f_max: 300.0,
            alpha: 0.3,
        }
    }

    pub fn jungle() -> Self {
        Self {
            f_max: 800.0,
            alpha: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerrainOverrides {
    pub f_max: Option<f64>,
    pub alpha: Option<f64>,
}

/// Every tunable constant of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub herbivore: SpeciesParams,
    pub carnivore: SpeciesParams,
    pub savannah: TerrainParams,
    pub jungle: TerrainParams,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            herbivore: SpeciesParams::defaults_for(Species::Herbivore),
            carnivore: SpeciesParams::defaults_for(Species::Carnivore),
            savannah: TerrainParams::savannah(),
            jungle: TerrainParams::jungle(),
        }
    }
}

impl Params {
    pub fn species(&self, species: Species) -> &SpeciesParams {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    pub fn terrain(&self, kind: TerrainKind) -> TerrainParams {
        match kind {
            TerrainKind::Savannah => self.savannah,
            TerrainKind::Jungle => self.jungle,
            TerrainKind::Desert | TerrainKind::Mountain | TerrainKind::Ocean => {
                TerrainParams::BARREN
            }
        }
    }

    /// Checks every species and terrain table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for species in Species::ALL {
            self.species(species).validate(species)?;
        }
        self.savannah.validate()?;
        self.jungle.validate()
    }

    pub fn set_species(
        &mut self,
        species: Species,
        overrides: &SpeciesOverrides,
    ) -> Result<(), ConfigError> {
        let updated = self.species(species).with_overrides(species, overrides)?;
        match species {
            Species::Herbivore => self.herbivore = updated,
            Species::Carnivore => self.carnivore = updated,
        }
        Ok(())
    }

    pub fn set_terrain(
        &mut self,
        kind: TerrainKind,
        overrides: &TerrainOverrides,
    ) -> Result<(), ConfigError> {
        let current = match kind {
            TerrainKind::Savannah => self.savannah,
            TerrainKind::Jungle => self.jungle,
            TerrainKind::Desert | TerrainKind::Mountain | TerrainKind::Ocean => {
                let name = if overrides.f_max.is_some() {
                    "f_max"
                } else if overrides.alpha.is_some() {
                    "alpha"
                } else {
                    return Ok(());
                };
                return Err(ConfigError::NotApplicable {
                    name,
                    target: kind.to_string(),
                });
            }
        };
        if overrides.alpha.is_some() && kind != TerrainKind::Savannah {
            return Err(ConfigError::NotApplicable {
                name: "alpha",
                target: kind.to_string(),
            });
        }
        let next = TerrainParams {
            f_max: overrides.f_max.unwrap_or(current.f_max),
            alpha: overrides.alpha.unwrap_or(current.alpha),
        };
        next.validate()?;
        match kind {
            TerrainKind::Savannah => self.savannah = next,
            _ => self.jungle = next,
        }
        Ok(())
    }
}
