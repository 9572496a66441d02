use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::num::NonZeroU64;

/// Step used to visit a label partition: every node, or every n-th one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStride {
    /// No skipping. Reported as `-1` for compatibility.
    All,
    Every(NonZeroU64),
}

impl SampleStride {
    pub fn as_raw(self) -> i64 {
        match self {
            SampleStride::All => -1,
            SampleStride::Every(n) => n.get() as i64,
        }
    }

    /// Whether the element at 1-indexed `position` is visited.
    pub fn selects(self, position: u64) -> bool {
        match self {
            SampleStride::All => true,
            SampleStride::Every(n) => position % n.get() == 0,
        }
    }
}

/// Computes jittered sampling strides so that roughly `desired` elements of
/// a population get visited.
#[derive(Debug, Clone)]
pub struct SampleSelector {
    rng: StdRng,
}

impl Default for SampleSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSelector {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible strides for tests and repeatable runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `desired == -1` samples everything. Non-positive sizes other than -1
    /// are treated the same way instead of dividing by zero.
    pub fn sample_stride(&mut self, population: u64, desired: i64) -> SampleStride {
        if desired <= 0 || population == 0 {
            return SampleStride::All;
        }
        let skip = (population / desired as u64) as f64;
        let min = (skip - skip * 0.1).floor() as u64;
        let max = (skip + skip * 0.1).ceil() as u64;
        if min >= max {
            return SampleStride::All;
        }
        let draw = self.rng.gen_range(min..max);
        NonZeroU64::new(draw).map_or(SampleStride::All, SampleStride::Every)
    }
}
