//! Per-run seeds.
//!
//! Every source of randomness of a run draws from a stream derived from the run's
//! [`RunSeed`]; there is no process-wide random state.
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Independent random streams of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedStream {
    /// Simulator demand.
    Environment,

    /// Exploration of learned controllers.
    Exploration,

    /// Replay buffer sampling.
    Replay,

    /// Parameter initialisation.
    Init,

    /// Environment seed of the k-th training episode.
    Training(u64),
}

impl SeedStream {
    fn tag(&self) -> u64 {
        match self {
            Self::Environment => 0x01,
            Self::Exploration => 0x02,
            Self::Replay => 0x03,
            Self::Init => 0x04,
            Self::Training(k) => 0x100 + k,
        }
    }
}

/// The seed of one (controller, seed) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunSeed(u64);

impl RunSeed {
    /// Wraps a seed.
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// The wrapped seed.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Derives the seed of a stream.
    pub fn derive(&self, stream: SeedStream) -> u64 {
        splitmix64(self.0 ^ splitmix64(stream.tag()))
    }

    /// Returns a generator for a stream.
    pub fn rng(&self, stream: SeedStream) -> StdRng {
        StdRng::seed_from_u64(self.derive(stream))
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
