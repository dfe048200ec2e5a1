use std::io::Write;

use comms::msg::MinLoc;
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    comm::Communicator,
    config::{SampleCount, SearchConfig},
    error::Result,
    objective::{Landscape, Objective},
    partition::{Domain, strip_of},
    report,
    sampler::Sampler,
    search::{LocalSearch, WorkerState},
    topology::RankContext,
    transfer::{self, GlobalResult},
};

/// What a single rank ends up knowing after a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub local: WorkerState,
    pub winner: MinLoc,
    /// Only set on the coordinator.
    pub global: Option<GlobalResult>,
}

/// A single rank of the search.
pub struct Worker<O: Objective = Landscape> {
    samples: SampleCount,
    domain: Domain,
    objective: O,
    seed: u64,
}

impl Worker<Landscape> {
    /// Creates a worker from a validated config.
    pub fn from_config(config: SearchConfig) -> Self {
        Self {
            samples: config.samples,
            domain: config.domain,
            objective: config.objective,
            seed: config.seed,
        }
    }
}

impl<O: Objective> Worker<O> {
    /// Creates a new `Worker` over the unit square with seed 0.
    ///
    /// # Args
    /// * `samples` - The run-wide sample count.
    /// * `objective` - The function to minimize.
    pub fn new(samples: SampleCount, objective: O) -> Self {
        Self {
            samples,
            domain: Domain::UNIT,
            objective,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// Samples this rank's strip, no communication involved.
    pub fn search(&self, ctx: RankContext) -> WorkerState {
        let strip = strip_of(ctx, self.domain);
        debug!(rank = ctx.rank(), lo = strip.x.lo, hi = strip.x.hi; "assigned strip");

        let mut sampler = Sampler::for_rank(self.seed, ctx.rank());
        LocalSearch::new(strip, self.samples.per_rank()).run(
            ctx.rank(),
            &self.objective,
            &mut sampler,
        )
    }

    /// Runs the whole search on this rank.
    ///
    /// Every rank of the group must call this with the same config.
    ///
    /// # Args
    /// * `comm` - This rank's communicator.
    /// * `out` - Where the result lines are printed.
    ///
    /// # Returns
    /// What this rank learnt, or the first communication failure.
    pub async fn run<R, W, Out>(
        &self,
        comm: &mut Communicator<R, W>,
        out: &mut Out,
    ) -> Result<Outcome>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
        Out: Write + Send,
    {
        let ctx = comm.ctx();
        let local = self.search(ctx);

        writeln!(out, "{}", report::local_line(&local))?;
        out.flush()?;

        let mine = MinLoc {
            value: local.best.value,
            rank: ctx.rank(),
        };
        let winner = comm.allreduce(mine).await?;
        debug!(rank = ctx.rank(), owner = winner.rank, value = winner.value; "reduced");

        let global = transfer::collect(comm, winner, &local).await?;
        comm.barrier().await?;

        if let Some(result) = &global {
            info!(owner = result.owner_rank, value = result.value; "global minimum found");
            write!(out, "\n{}\n\n", report::global_line(result, self.samples.total()))?;
            out.flush()?;
        }

        Ok(Outcome {
            local,
            winner,
            global,
        })
    }
}
