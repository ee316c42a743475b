//! Seeded pseudo-random oracle.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{RandomSource, U32_RANGE};
use crate::error::SimulationResult;

/// Oracle driven by a deterministic PRNG keyed by an integer seed.
///
/// The seed-to-sequence map is stable across platforms. `random01` draws a
/// single `u32` and scales it onto the `2^-32` grid, so every value it
/// returns survives the record/replay byte encoding bit-exactly.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Creates an oracle producing the sequence keyed by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn random01(&mut self) -> SimulationResult<f64> {
        Ok(f64::from(self.rng.next_u32()) / U32_RANGE)
    }

    fn random_int(&mut self, lo: i32, hi: i32) -> SimulationResult<i32> {
        debug_assert!(lo < hi, "random_int requires lo < hi, got {lo}..{hi}");
        Ok(self.rng.random_range(lo..hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..100 {
            assert_eq!(a.random01().unwrap(), b.random01().unwrap());
            assert_eq!(
                a.random_int(-5, 1000).unwrap(),
                b.random_int(-5, 1000).unwrap()
            );
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededRandom::new(1);
        let mut b = SeededRandom::new(2);
        let draws_a: Vec<f64> = (0..8).map(|_| a.random01().unwrap()).collect();
        let draws_b: Vec<f64> = (0..8).map(|_| b.random01().unwrap()).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn random01_stays_in_unit_interval() {
        let mut rng = SeededRandom::new(7);
        for _ in 0..1000 {
            let value = rng.random01().unwrap();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn random_int_respects_bounds() {
        let mut rng = SeededRandom::new(7);
        for _ in 0..1000 {
            let value = rng.random_int(10, 20).unwrap();
            assert!((10..20).contains(&value));
        }
    }

    #[test]
    fn random01_lands_on_u32_grid() {
        let mut rng = SeededRandom::new(3);
        for _ in 0..100 {
            let value = rng.random01().unwrap();
            let scaled = value * U32_RANGE;
            assert_eq!(scaled, scaled.trunc());
        }
    }
}
