//! Seeded random source shared by every stochastic rule of the model.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// The single pseudo-random stream of a simulation.
#[derive(Clone, Debug)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Bernoulli trial. `p <= 0` never succeeds and `p >= 1` always does.
    pub fn chance(&mut self, p: f64) -> bool {
        self.inner.gen::<f64>() < p
    }

    /// Rejection-samples `N(mean, std_dev)` until the value is strictly positive.
    ///
    /// Callers must pass a finite, non-negative `std_dev` and make sure a
    /// positive value is reachable, i.e. `mean > 0` or `std_dev > 0`.
    pub fn positive_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        loop {
            let z: f64 = StandardNormal.sample(&mut self.inner);
            let value = mean + std_dev * z;
            if value > 0.0 {
                return value;
            }
        }
    }

    /// Draws an index proportionally to `weights`.
    ///
    /// Returns `None` when every weight is zero. Infinite weights win over
    /// finite ones and are chosen uniformly among themselves.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let infinite: Vec<usize> = weights
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_infinite() && w.is_sign_positive())
            .map(|(idx, _)| idx)
            .collect();
        if !infinite.is_empty() {
            let pick = self.inner.gen_range(0..infinite.len());
            return Some(infinite[pick]);
        }
        // All-zero, empty or NaN weights leave nowhere to go.
        let dist = WeightedIndex::new(weights).ok()?;
        Some(dist.sample(&mut self.inner))
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
