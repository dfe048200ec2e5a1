use rand::{Rng, SeedableRng, rngs::StdRng};

/// A per-process stream of uniform reals.
pub struct Sampler<R: Rng = StdRng> {
    rng: R,
}

impl Sampler<StdRng> {
    /// Seeds a new stream for the process `rank`.
    ///
    /// # Args
    /// * `base` - The run-wide base seed.
    /// * `rank` - The identity of this process.
    ///
    /// # Returns
    /// A sampler whose stream differs from every other rank's.
    pub fn for_rank(base: u64, rank: usize) -> Self {
        Self::new(StdRng::seed_from_u64(base.wrapping_add(rank as u64)))
    }
}

impl<R: Rng> Sampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draws a real in `[lo, hi)`, `lo < hi`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        let v = self.rng.random_range(lo..hi);

        // Float ranges may round up onto the excluded bound.
        if v >= hi { hi.next_down().max(lo) } else { v }
    }
}
