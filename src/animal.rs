//! Individuals and the fitness-driven vital rates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SpeciesParams};
use crate::rng::SimRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Herbivore,
    Carnivore,
}

impl Species {
    pub const ALL: [Species; 2] = [Species::Herbivore, Species::Carnivore];

    pub fn name(self) -> &'static str {
        match self {
            Species::Herbivore => "Herbivore",
            Species::Carnivore => "Carnivore",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Herbivore" => Ok(Species::Herbivore),
            "Carnivore" => Ok(Species::Carnivore),
            other => Err(ConfigError::UnknownSpecies(other.to_string())),
        }
    }
}

/// Logistic term used by both halves of the fitness formula.
fn sigmoid(sign: f64, x: f64, x_half: f64, phi: f64) -> f64 {
    1.0 / (1.0 + (sign * phi * (x - x_half)).exp())
}

/// Fitness for the given age and weight, in `[0, 1]`.
pub fn fitness_of(age: u32, weight: f64, params: &SpeciesParams) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let age_term = sigmoid(1.0, f64::from(age), params.a_half, params.phi_age);
    let weight_term = sigmoid(-1.0, weight, params.w_half, params.phi_weight);
    (age_term * weight_term).clamp(0.0, 1.0)
}

/// Draws the weight of a newborn; never returns a non-positive value.
pub fn draw_birth_weight(params: &SpeciesParams, rng: &mut SimRng) -> f64 {
    rng.positive_normal(params.w_birth, params.sigma_birth)
}

/// A single herbivore or carnivore.
///
/// Age and weight only change through methods that also refresh the cached
/// fitness, so [`Animal::fitness`] is always current for the parameters the
/// animal was last updated with.
#[derive(Debug, Clone, PartialEq)]
pub struct Animal {
    species: Species,
    age: u32,
    weight: f64,
    fitness: f64,
    has_migrated: bool,
}

impl Animal {
    /// Weight must be finite and non-negative.
    pub fn new(
        species: Species,
        age: u32,
        weight: f64,
        params: &SpeciesParams,
    ) -> Result<Self, ConfigError> {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "weight",
                value: weight,
                reason: "must be finite and non-negative",
            });
        }
        Ok(Self::with_weight(species, age, weight, params))
    }

    pub(crate) fn with_weight(
        species: Species,
        age: u32,
        weight: f64,
        params: &SpeciesParams,
    ) -> Self {
        Self {
            species,
            age,
            weight,
            fitness: fitness_of(age, weight, params),
            has_migrated: false,
        }
    }

    /// A newborn with a freshly drawn birth weight.
    pub fn newborn(species: Species, params: &SpeciesParams, rng: &mut SimRng) -> Self {
        let weight = draw_birth_weight(params, rng);
        Self::with_weight(species, 0, weight, params)
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn has_migrated(&self) -> bool {
        self.has_migrated
    }

    pub(crate) fn set_migrated(&mut self, migrated: bool) {
        self.has_migrated = migrated;
    }

    /// Recomputes fitness, e.g. after the species table changed.
    pub fn refresh_fitness(&mut self, params: &SpeciesParams) {
        self.fitness = fitness_of(self.age, self.weight, params);
    }

    /// Converts eaten food into body weight.
    pub fn eat(&mut self, food: f64, params: &SpeciesParams) {
        self.weight += params.beta * food;
        self.refresh_fitness(params);
    }

    /// One year older and `eta * weight` lighter.
    pub fn age_one_year(&mut self, params: &SpeciesParams) {
        self.age = self.age.saturating_add(1);
        self.weight -= params.eta * self.weight;
        self.refresh_fitness(params);
    }

    /// Tries to give birth given `n` same-species animals in the cell.
    ///
    /// Returns the newborn when the mother can afford its weight cost; the
    /// mother loses `xi * birth_weight` in that case.
    pub fn try_give_birth(
        &mut self,
        n: usize,
        params: &SpeciesParams,
        rng: &mut SimRng,
    ) -> Option<Animal> {
        if !self.prob_procreation(n, params, rng) {
            return None;
        }
        let birth_weight = draw_birth_weight(params, rng);
        let cost = params.xi * birth_weight;
        if cost >= self.weight {
            return None;
        }
        self.weight -= cost;
        self.refresh_fitness(params);
        Some(Animal::with_weight(self.species, 0, birth_weight, params))
    }

    pub fn prob_procreation(&self, n: usize, params: &SpeciesParams, rng: &mut SimRng) -> bool {
        if self.weight < params.min_procreation_weight() {
            return false;
        }
        let others = n.saturating_sub(1) as f64;
        let p = (params.gamma * self.fitness * others).min(1.0);
        rng.chance(p)
    }

    /// Animals with zero fitness always die.
    pub fn prob_death(&self, params: &SpeciesParams, rng: &mut SimRng) -> bool {
        if self.fitness == 0.0 {
            return true;
        }
        rng.chance(params.omega * (1.0 - self.fitness))
    }

    pub fn prob_migration(&self, params: &SpeciesParams, rng: &mut SimRng) -> bool {
        rng.chance(params.mu * self.fitness)
    }

    /// Whether this carnivore kills a prey animal of the given fitness.
    ///
    /// Herbivores never kill. No random number is consumed when the outcome
    /// is certain.
    pub fn prob_kill(&self, prey_fitness: f64, params: &SpeciesParams, rng: &mut SimRng) -> bool {
        let Some(delta_phi_max) = params.delta_phi_max else {
            return false;
        };
        if self.species != Species::Carnivore || self.fitness <= prey_fitness {
            return false;
        }
        let difference = self.fitness - prey_fitness;
        if difference >= delta_phi_max {
            return true;
        }
        rng.chance(difference / delta_phi_max)
    }
}
