//! A single landscape cell: fodder stock, residents and the local rules.

use crate::animal::{Animal, Species};
use crate::config::Params;
use crate::geography::TerrainKind;
use crate::rng::SimRng;

#[derive(Debug, Clone)]
pub struct Cell {
    kind: TerrainKind,
    fodder: f64,
    herbivores: Vec<Animal>,
    carnivores: Vec<Animal>,
    propensity: [Option<f64>; 2],
}

impl Cell {
    /// A cell with its fodder at the terrain cap.
    pub fn new(kind: TerrainKind, params: &Params) -> Self {
        Self {
            kind,
            fodder: params.terrain(kind).f_max,
            herbivores: Vec::new(),
            carnivores: Vec::new(),
            propensity: [None; 2],
        }
    }

    pub fn kind(&self) -> TerrainKind {
        self.kind
    }

    pub fn is_passable(&self) -> bool {
        self.kind.is_passable()
    }

    pub fn fodder(&self) -> f64 {
        self.fodder
    }

    pub fn herbivores(&self) -> &[Animal] {
        &self.herbivores
    }

    pub fn carnivores(&self) -> &[Animal] {
        &self.carnivores
    }

    pub fn animals(&self, species: Species) -> &[Animal] {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
        }
    }

    fn animals_mut(&mut self, species: Species) -> &mut Vec<Animal> {
        match species {
            Species::Herbivore => &mut self.herbivores,
            Species::Carnivore => &mut self.carnivores,
        }
    }

    pub fn total_herbivores(&self) -> usize {
        self.herbivores.len()
    }

    pub fn total_carnivores(&self) -> usize {
        self.carnivores.len()
    }

    pub fn total_population(&self) -> usize {
        self.herbivores.len() + self.carnivores.len()
    }

    pub fn count(&self, species: Species) -> usize {
        self.animals(species).len()
    }

    fn invalidate(&mut self) {
        self.propensity = [None; 2];
    }

    /// Places an animal in the cell. Impassable cells hand it back.
    pub fn add_animal(&mut self, animal: Animal) -> Result<(), Animal> {
        if !self.is_passable() {
            return Err(animal);
        }
        self.animals_mut(animal.species()).push(animal);
        self.invalidate();
        Ok(())
    }

    /// Caps fodder at a (possibly lowered) terrain maximum.
    pub(crate) fn clamp_fodder(&mut self, params: &Params) {
        let f_max = params.terrain(self.kind).f_max;
        if self.fodder > f_max {
            self.fodder = f_max;
            self.invalidate();
        }
    }

    pub(crate) fn refresh_fitness(&mut self, params: &Params) {
        for animal in self.herbivores.iter_mut() {
            animal.refresh_fitness(&params.herbivore);
        }
        for animal in self.carnivores.iter_mut() {
            animal.refresh_fitness(&params.carnivore);
        }
        self.invalidate();
    }

    pub fn regrow_fodder(&mut self, params: &Params) {
        let terrain = params.terrain(self.kind);
        match self.kind {
            TerrainKind::Jungle => self.fodder = terrain.f_max,
            TerrainKind::Savannah => {
                self.fodder += terrain.alpha * (terrain.f_max - self.fodder);
                self.fodder = self.fodder.clamp(0.0, terrain.f_max);
            }
            TerrainKind::Desert | TerrainKind::Mountain | TerrainKind::Ocean => return,
        }
        self.invalidate();
    }

    /// Herbivores graze, fittest first, until the fodder runs out.
    pub fn herbivores_eat(&mut self, params: &Params) {
        let herb = &params.herbivore;
        self.herbivores
            .sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        for herbivore in self.herbivores.iter_mut() {
            if self.fodder <= 0.0 {
                break;
            }
            let eaten = herb.appetite.min(self.fodder);
            self.fodder -= eaten;
            herbivore.eat(eaten, herb);
        }
        self.fodder = self.fodder.max(0.0);
        self.invalidate();
    }

    /// Carnivores hunt, fittest first, trying the weakest herbivores first.
    pub fn carnivores_eat(&mut self, params: &Params, rng: &mut SimRng) {
        if self.carnivores.is_empty() || self.herbivores.is_empty() {
            return;
        }
        let carn = &params.carnivore;
        self.carnivores
            .sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        self.herbivores
            .sort_by(|a, b| a.fitness().total_cmp(&b.fitness()));

        for carnivore in self.carnivores.iter_mut() {
            let mut eaten = 0.0;
            let mut survivors = Vec::with_capacity(self.herbivores.len());
            for prey in self.herbivores.drain(..) {
                if eaten >= carn.appetite {
                    survivors.push(prey);
                    continue;
                }
                if carnivore.prob_kill(prey.fitness(), carn, rng) {
                    eaten += prey.weight().min(carn.appetite - eaten);
                } else {
                    survivors.push(prey);
                }
            }
            self.herbivores = survivors;
            if eaten > 0.0 {
                carnivore.eat(eaten, carn);
            }
        }
        self.invalidate();
    }

    /// Breeding step for one species; returns the number of newborns.
    ///
    /// The population count is taken once up front and only animals present
    /// at that point may give birth.
    pub fn procreate(&mut self, species: Species, params: &Params, rng: &mut SimRng) -> usize {
        let table = params.species(species);
        let residents = self.animals_mut(species);
        let n = residents.len();
        if n < 2 {
            return 0;
        }
        let mut newborns = Vec::new();
        for mother in residents.iter_mut().take(n) {
            if let Some(child) = mother.try_give_birth(n, table, rng) {
                newborns.push(child);
            }
        }
        let births = newborns.len();
        residents.extend(newborns);
        if births > 0 {
            self.invalidate();
        }
        births
    }

    /// Removes and returns every resident that decides to migrate this
    /// cycle. Each returned animal is flagged as migrated.
    pub fn find_migration_candidates(&mut self, params: &Params, rng: &mut SimRng) -> Vec<Animal> {
        let mut candidates = Vec::new();
        for species in Species::ALL {
            let table = params.species(species);
            let residents = std::mem::take(self.animals_mut(species));
            let mut staying = Vec::with_capacity(residents.len());
            for mut animal in residents {
                if !animal.has_migrated() && animal.prob_migration(table, rng) {
                    animal.set_migrated(true);
                    candidates.push(animal);
                } else {
                    staying.push(animal);
                }
            }
            *self.animals_mut(species) = staying;
        }
        if !candidates.is_empty() {
            self.invalidate();
        }
        candidates
    }

    pub fn reset_migration_flags(&mut self) {
        for animal in self.herbivores.iter_mut().chain(self.carnivores.iter_mut()) {
            animal.set_migrated(false);
        }
    }

    pub fn age_and_starve(&mut self, params: &Params) {
        for animal in self.herbivores.iter_mut() {
            animal.age_one_year(&params.herbivore);
        }
        for animal in self.carnivores.iter_mut() {
            animal.age_one_year(&params.carnivore);
        }
        self.invalidate();
    }

    /// Removes residents that die this year; returns how many died.
    pub fn die(&mut self, params: &Params, rng: &mut SimRng) -> usize {
        let before = self.total_population();
        let herb = &params.herbivore;
        self.herbivores
            .retain(|animal| !animal.prob_death(herb, rng));
        let carn = &params.carnivore;
        self.carnivores
            .retain(|animal| !animal.prob_death(carn, rng));
        let deaths = before - self.total_population();
        if deaths > 0 {
            self.invalidate();
        }
        deaths
    }

    /// Food available per hungry mouth for `species` if one more animal came.
    pub fn relative_fodder(&self, species: Species, params: &Params) -> f64 {
        let table = params.species(species);
        let food = match species {
            Species::Herbivore => self.fodder,
            Species::Carnivore => self.herbivores.iter().map(Animal::weight).sum(),
        };
        let demand = (self.count(species) + 1) as f64 * table.appetite;
        if demand > 0.0 {
            food / demand
        } else {
            0.0
        }
    }

    /// Attractiveness of this cell to a migrating animal of `species`.
    pub fn propensity(&mut self, species: Species, params: &Params) -> f64 {
        if !self.is_passable() {
            return 0.0;
        }
        let slot = species as usize;
        if let Some(cached) = self.propensity[slot] {
            return cached;
        }
        let value = (params.species(species).lambda * self.relative_fodder(species, params)).exp();
        self.propensity[slot] = Some(value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        Params::default()
    }

    fn populated(kind: TerrainKind, herbivores: usize, carnivores: usize) -> Cell {
        let params = params();
        let mut cell = Cell::new(kind, &params);
        for _ in 0..herbivores {
            cell.add_animal(Animal::new(Species::Herbivore, 5, 20.0, &params.herbivore).unwrap())
                .unwrap();
        }
        for _ in 0..carnivores {
            cell.add_animal(Animal::new(Species::Carnivore, 5, 20.0, &params.carnivore).unwrap())
                .unwrap();
        }
        cell
    }

    #[test]
    fn initial_fodder_matches_terrain() {
        let params = params();
        assert_eq!(Cell::new(TerrainKind::Jungle, &params).fodder(), 800.0);
        assert_eq!(Cell::new(TerrainKind::Savannah, &params).fodder(), 300.0);
        for kind in [TerrainKind::Desert, TerrainKind::Mountain, TerrainKind::Ocean] {
            assert_eq!(Cell::new(kind, &params).fodder(), 0.0);
        }
    }

    #[test]
    fn impassable_cells_reject_animals() {
        let params = params();
        for kind in [TerrainKind::Ocean, TerrainKind::Mountain] {
            let mut cell = Cell::new(kind, &params);
            let animal = Animal::new(Species::Herbivore, 1, 10.0, &params.herbivore).unwrap();
            assert!(cell.add_animal(animal).is_err());
            assert_eq!(cell.total_population(), 0);
            assert_eq!(cell.propensity(Species::Herbivore, &params), 0.0);
        }
    }

    #[test]
    fn savannah_regrows_towards_cap() {
        let params = params();
        let mut cell = populated(TerrainKind::Savannah, 40, 0);
        cell.herbivores_eat(&params);
        assert_eq!(cell.fodder(), 0.0);
        let mut previous = cell.fodder();
        for _ in 0..50 {
            cell.regrow_fodder(&params);
            assert!(cell.fodder() >= previous);
            assert!(cell.fodder() <= 300.0);
            previous = cell.fodder();
        }
        assert!(300.0 - cell.fodder() < 1e-3);
    }

    #[test]
    fn jungle_resets_to_cap() {
        let params = params();
        let mut cell = populated(TerrainKind::Jungle, 10, 0);
        cell.herbivores_eat(&params);
        assert_eq!(cell.fodder(), 700.0);
        cell.regrow_fodder(&params);
        assert_eq!(cell.fodder(), 800.0);
    }

    #[test]
    fn grazing_conserves_fodder() {
        let params = params();
        let mut cell = populated(TerrainKind::Savannah, 35, 0);
        let weight_before: f64 = cell.herbivores().iter().map(Animal::weight).sum();
        let fodder_before = cell.fodder();
        cell.herbivores_eat(&params);
        let weight_after: f64 = cell.herbivores().iter().map(Animal::weight).sum();
        let consumed = fodder_before - cell.fodder();
        assert!(cell.fodder() >= 0.0);
        assert!((consumed - 300.0).abs() < 1e-9);
        assert!((weight_after - weight_before - params.herbivore.beta * consumed).abs() < 1e-9);
    }

    #[test]
    fn fittest_herbivores_graze_first() {
        let params = params();
        let mut cell = Cell::new(TerrainKind::Savannah, &params);
        cell.fodder = 15.0;
        cell.add_animal(Animal::new(Species::Herbivore, 5, 5.0, &params.herbivore).unwrap())
            .unwrap();
        cell.add_animal(Animal::new(Species::Herbivore, 5, 40.0, &params.herbivore).unwrap())
            .unwrap();
        cell.herbivores_eat(&params);
        let heavy = &cell.herbivores()[0];
        let light = &cell.herbivores()[1];
        assert!((heavy.weight() - (40.0 + 0.9 * 10.0)).abs() < 1e-9);
        assert!((light.weight() - (5.0 + 0.9 * 5.0)).abs() < 1e-9);
        assert_eq!(cell.fodder(), 0.0);
    }

    #[test]
    fn carnivores_gain_at_most_their_appetite() {
        let mut params = params();
        params.carnivore.delta_phi_max = Some(1e-6);
        params.carnivore.appetite = 30.0;
        let mut cell = Cell::new(TerrainKind::Desert, &params);
        for _ in 0..5 {
            cell.add_animal(Animal::new(Species::Herbivore, 80, 20.0, &params.herbivore).unwrap())
                .unwrap();
        }
        cell.add_animal(Animal::new(Species::Carnivore, 2, 30.0, &params.carnivore).unwrap())
            .unwrap();
        let mut rng = SimRng::new(1);
        cell.carnivores_eat(&params, &mut rng);
        // Two kills reach the appetite; the second is only partly converted.
        assert_eq!(cell.total_herbivores(), 3);
        let carnivore = &cell.carnivores()[0];
        assert!((carnivore.weight() - (30.0 + 0.75 * 30.0)).abs() < 1e-9);
    }

    #[test]
    fn weak_carnivores_do_not_kill() {
        let params = params();
        let mut cell = Cell::new(TerrainKind::Jungle, &params);
        for _ in 0..10 {
            cell.add_animal(Animal::new(Species::Herbivore, 5, 40.0, &params.herbivore).unwrap())
                .unwrap();
        }
        cell.add_animal(Animal::new(Species::Carnivore, 90, 0.5, &params.carnivore).unwrap())
            .unwrap();
        let mut rng = SimRng::new(1);
        cell.carnivores_eat(&params, &mut rng);
        assert_eq!(cell.total_herbivores(), 10);
    }

    #[test]
    fn procreation_uses_the_initial_count() {
        let mut params = params();
        params.herbivore.gamma = 10.0;
        params.herbivore.xi = 0.0;
        let mut cell = populated(TerrainKind::Jungle, 10, 0);
        for animal in cell.herbivores.iter_mut() {
            *animal = Animal::new(Species::Herbivore, 5, 60.0, &params.herbivore).unwrap();
        }
        let mut rng = SimRng::new(4);
        let births = cell.procreate(Species::Herbivore, &params, &mut rng);
        // Every mother is certain to breed, newborns are not asked.
        assert_eq!(births, 10);
        assert_eq!(cell.total_herbivores(), 20);
        assert_eq!(
            cell.herbivores().iter().filter(|a| a.age() == 0).count(),
            10
        );
    }

    #[test]
    fn single_animal_never_breeds() {
        let params = params();
        let mut cell = populated(TerrainKind::Jungle, 1, 1);
        let mut rng = SimRng::new(4);
        assert_eq!(cell.procreate(Species::Herbivore, &params, &mut rng), 0);
        assert_eq!(cell.procreate(Species::Carnivore, &params, &mut rng), 0);
    }

    #[test]
    fn migration_candidates_are_flagged_once() {
        let mut params = params();
        params.herbivore.mu = 1.0;
        params.herbivore.phi_age = 50.0;
        params.herbivore.phi_weight = 50.0;
        let mut cell = Cell::new(TerrainKind::Jungle, &params);
        for _ in 0..6 {
            cell.add_animal(Animal::new(Species::Herbivore, 0, 100.0, &params.herbivore).unwrap())
                .unwrap();
        }
        let mut rng = SimRng::new(8);
        let candidates = cell.find_migration_candidates(&params, &mut rng);
        assert_eq!(candidates.len(), 6);
        assert!(candidates.iter().all(Animal::has_migrated));
        assert_eq!(cell.total_population(), 0);

        for animal in candidates {
            cell.add_animal(animal).unwrap();
        }
        assert!(cell.find_migration_candidates(&params, &mut rng).is_empty());
        cell.reset_migration_flags();
        assert!(cell.herbivores().iter().all(|a| !a.has_migrated()));
    }

    #[test]
    fn aging_costs_weight() {
        let params = params();
        let mut cell = populated(TerrainKind::Desert, 2, 2);
        cell.age_and_starve(&params);
        assert!(cell.herbivores().iter().all(|a| a.age() == 6));
        assert!(cell
            .herbivores()
            .iter()
            .all(|a| (a.weight() - 19.0).abs() < 1e-9));
        assert!(cell
            .carnivores()
            .iter()
            .all(|a| (a.weight() - 17.5).abs() < 1e-9));
    }

    #[test]
    fn starved_animals_die() {
        let params = params();
        let mut cell = Cell::new(TerrainKind::Desert, &params);
        cell.add_animal(Animal::new(Species::Herbivore, 5, 0.0, &params.herbivore).unwrap())
            .unwrap();
        let mut rng = SimRng::new(3);
        assert_eq!(cell.die(&params, &mut rng), 1);
        assert_eq!(cell.total_population(), 0);
    }

    #[test]
    fn propensity_tracks_population_changes() {
        let params = params();
        let mut cell = populated(TerrainKind::Jungle, 0, 0);
        let empty = cell.propensity(Species::Herbivore, &params);
        assert!((empty - (800.0f64 / 10.0).exp()).abs() / empty < 1e-12);
        assert_eq!(cell.propensity(Species::Herbivore, &params), empty);

        cell.add_animal(Animal::new(Species::Herbivore, 5, 20.0, &params.herbivore).unwrap())
            .unwrap();
        let crowded = cell.propensity(Species::Herbivore, &params);
        assert!(crowded < empty);

        let carn = cell.propensity(Species::Carnivore, &params);
        assert!((carn - (20.0f64 / 50.0).exp()).abs() < 1e-12);
    }

    #[test]
    fn counts_are_idempotent() {
        let cell = populated(TerrainKind::Savannah, 7, 3);
        for _ in 0..3 {
            assert_eq!(cell.total_population(), 10);
            assert_eq!(cell.total_herbivores(), 7);
            assert_eq!(cell.total_carnivores(), 3);
        }
    }
}
