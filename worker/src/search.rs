use std::num::NonZeroUsize;

use log::debug;
use rand::Rng;

use crate::{
    objective::Objective,
    partition::{Interval, Strip},
    sampler::Sampler,
};

/// A sampled point together with its objective value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl Candidate {
    fn draw<R, O>(strip: &Strip, sampler: &mut Sampler<R>, f: &O) -> Self
    where
        R: Rng,
        O: Objective + ?Sized,
    {
        let x = sampler.uniform(strip.x.lo, strip.x.hi);
        let y = sampler.uniform(strip.y.lo, strip.y.hi);
        Self {
            x,
            y,
            value: f.eval(x, y),
        }
    }
}

/// Everything a rank knows after searching its strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerState {
    pub rank: usize,
    pub strip: Interval,
    pub y_range: Interval,
    pub best: Candidate,
    pub samples: usize,
}

/// Random sampling of a single strip.
pub struct LocalSearch {
    strip: Strip,
    samples: NonZeroUsize,
}

impl LocalSearch {
    /// Creates a new `LocalSearch`.
    ///
    /// # Args
    /// * `strip` - The part of the domain to sample.
    /// * `samples` - How many points to draw.
    pub fn new(strip: Strip, samples: NonZeroUsize) -> Self {
        Self { strip, samples }
    }

    /// Draws all the samples and keeps the lowest one.
    ///
    /// # Args
    /// * `rank` - The rank owning the strip.
    /// * `f` - The objective to minimize.
    /// * `sampler` - This rank's random stream.
    ///
    /// # Returns
    /// The final state of this rank.
    pub fn run<R, O>(&self, rank: usize, f: &O, sampler: &mut Sampler<R>) -> WorkerState
    where
        R: Rng,
        O: Objective + ?Sized,
    {
        let mut best = Candidate::draw(&self.strip, sampler, f);

        for _ in 1..self.samples.get() {
            let candidate = Candidate::draw(&self.strip, sampler, f);
            if candidate.value < best.value {
                best = candidate;
            }
        }

        debug!(
            rank = rank,
            samples = self.samples.get(),
            value = best.value;
            "local search finished"
        );

        WorkerState {
            rank,
            strip: self.strip.x,
            y_range: self.strip.y,
            best,
            samples: self.samples.get(),
        }
    }
}
