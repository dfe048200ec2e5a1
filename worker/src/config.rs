use std::{env, num::NonZeroUsize};

use crate::{error::ConfigErr, objective::Landscape, partition::Domain};

/// The validated amount of samples of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCount {
    total: NonZeroUsize,
    per_rank: NonZeroUsize,
}

impl SampleCount {
    /// Validates the command line arguments, without the program name.
    ///
    /// # Args
    /// * `args` - Should hold exactly the total sample count.
    /// * `size` - The amount of processes sharing the samples.
    ///
    /// # Returns
    /// The sample count or the usage error to report.
    pub fn from_args<I>(args: I, size: usize) -> Result<Self, ConfigErr>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(arg), None) => Self::parse(&arg, size),
            _ => Err(ConfigErr::MissingSamples),
        }
    }

    /// Validates a single sample count.
    ///
    /// # Args
    /// * `arg` - A positive integer, optionally written with a zero fraction (`"400.0"`).
    /// * `size` - The amount of processes sharing the samples, at least 1.
    ///
    /// # Returns
    /// The sample count or the usage error to report.
    pub fn parse(arg: &str, size: usize) -> Result<Self, ConfigErr> {
        let total = integral(arg.trim())
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| ConfigErr::InvalidSamples(arg.to_string()))?;

        let indivisible = ConfigErr::IndivisibleSamples {
            samples: total.get(),
            size,
        };

        if size == 0 || total.get() % size != 0 {
            return Err(indivisible);
        }

        let per_rank = NonZeroUsize::new(total.get() / size).ok_or(indivisible)?;
        Ok(Self { total, per_rank })
    }

    pub fn total(&self) -> usize {
        self.total.get()
    }

    pub fn per_rank(&self) -> NonZeroUsize {
        self.per_rank
    }
}

/// Reads a decimal whose value is a whole number: `"400"`, `"400."`, `"400.00"`.
fn integral(s: &str) -> Option<usize> {
    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));

    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !digits(whole) || !digits(fraction) {
        return None;
    }

    if fraction.bytes().any(|b| b != b'0') {
        return None;
    }

    whole.parse().ok()
}

/// Everything a rank needs to search, identical on every rank.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub samples: SampleCount,
    pub domain: Domain,
    pub objective: Landscape,
    pub seed: u64,
}

impl SearchConfig {
    /// Creates a config with the default domain, objective and seed.
    pub fn new(samples: SampleCount) -> Self {
        Self {
            samples,
            domain: Domain::UNIT,
            objective: Landscape::default(),
            seed: 0,
        }
    }

    /// Reads `OBJECTIVE` and `SEED` from the process environment.
    pub fn from_env(samples: SampleCount) -> Result<Self, ConfigErr> {
        Self::from_lookup(samples, |var| env::var(var).ok())
    }

    /// Reads `OBJECTIVE` and `SEED` through `lookup`.
    pub fn from_lookup<F>(samples: SampleCount, lookup: F) -> Result<Self, ConfigErr>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(samples);

        if let Some(name) = lookup("OBJECTIVE") {
            config.objective = name.parse()?;
        }

        if let Some(seed) = lookup("SEED") {
            let parsed = seed.trim().parse::<u64>();
            config.seed = parsed.map_err(|_| ConfigErr::InvalidVar {
                var: "SEED",
                value: seed,
            })?;
        }

        Ok(config)
    }
}
