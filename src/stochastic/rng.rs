//! The random-number boundary of the engine.
//!
//! The engine only ever asks for "N standard-normal variates". Sequential
//! runs draw them from one stream seeded once; parallel runs give every
//! iteration its own stream whose seed is a SplitMix64 mix of the run seed
//! and the iteration index, so results do not depend on scheduling.

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// A source of standard-normal vectors.
pub trait NormalSource: Send {
    fn standard_normals(&mut self, n: usize) -> DVector<f64>;
}

/// Seeded `StdRng` stream of standard-normal variates.
#[derive(Debug, Clone)]
pub struct NormalStream {
    rng: StdRng,
}

impl NormalStream {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Independent stream for one iteration of a parallel run.
    pub fn for_iteration(run_seed: u64, index: usize) -> Self {
        Self::from_seed(iteration_seed(run_seed, index))
    }
}

impl NormalSource for NormalStream {
    fn standard_normals(&mut self, n: usize) -> DVector<f64> {
        let rng = &mut self.rng;
        DVector::from_fn(n, |_, _| rng.sample(StandardNormal))
    }
}

/// Per-iteration sub-seed.
pub fn iteration_seed(run_seed: u64, index: usize) -> u64 {
    splitmix64(run_seed ^ splitmix64(index as u64))
}

/// Fresh run seed from OS entropy.
pub fn entropy_seed() -> u64 {
    rand::random()
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
