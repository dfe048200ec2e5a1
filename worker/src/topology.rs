//! Process identity and peer addresses.
//!
//! Every variable is read through a lookup function so the resolution rules
//! can be exercised without touching the process environment.
//!
//! | Concern | Variables (first match wins)                                  |
//! |---------|---------------------------------------------------------------|
//! | rank    | `RANK`, `OMPI_COMM_WORLD_RANK`, `PMI_RANK`, `SLURM_PROCID`    |
//! | size    | `SIZE`, `OMPI_COMM_WORLD_SIZE`, `PMI_SIZE`, `SLURM_NTASKS`    |
//! | peers   | `PEERS`, else `HOST` + `PORT` with rank `r` at `PORT + r`     |

use std::env;

use crate::error::ConfigErr;

const RANK_VARS: [&str; 4] = ["RANK", "OMPI_COMM_WORLD_RANK", "PMI_RANK", "SLURM_PROCID"];
const SIZE_VARS: [&str; 4] = ["SIZE", "OMPI_COMM_WORLD_SIZE", "PMI_SIZE", "SLURM_NTASKS"];

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 47000;

/// The rank of the coordinator process.
pub const COORDINATOR: usize = 0;

/// Identity of this process within the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankContext {
    rank: usize,
    size: usize,
}

impl RankContext {
    /// Creates a new `RankContext`.
    ///
    /// # Args
    /// * `rank` - This process's rank, in `[0, size)`.
    /// * `size` - The total amount of processes.
    ///
    /// # Returns
    /// A topology error if `size` is zero or `rank` out of range.
    pub fn new(rank: usize, size: usize) -> Result<Self, ConfigErr> {
        if size == 0 {
            return Err(ConfigErr::Topology("size must be at least 1".into()));
        }

        if rank >= size {
            return Err(ConfigErr::Topology(format!(
                "rank {rank} out of range for size {size}"
            )));
        }

        Ok(Self { rank, size })
    }

    /// A group of one.
    pub fn single() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// Every member of a group of `size`, in rank order.
    pub fn group(size: usize) -> impl Iterator<Item = RankContext> {
        (0..size).map(move |rank| Self { rank, size })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }
}

/// Where every rank of the group listens.
#[derive(Debug, Clone)]
pub struct Topology {
    ctx: RankContext,
    addrs: Vec<String>,
}

impl Topology {
    /// Resolves the topology from the process environment.
    pub fn from_env() -> Result<Self, ConfigErr> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Resolves the topology through `lookup`.
    ///
    /// # Args
    /// * `lookup` - Returns the value of a variable, if set.
    ///
    /// # Returns
    /// The resolved topology or a configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigErr>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rank = first_number(&lookup, &RANK_VARS)?;
        let size = first_number(&lookup, &SIZE_VARS)?;

        let ctx = match (rank, size) {
            (None, None) => RankContext::single(),
            (Some(rank), Some(size)) => RankContext::new(rank, size)?,
            (Some(_), None) => return Err(ConfigErr::Topology("rank set without size".into())),
            (None, Some(size)) => {
                return Err(ConfigErr::Topology(format!("size {size} set without rank")));
            }
        };

        let addrs = match lookup("PEERS") {
            Some(peers) => {
                let addrs: Vec<String> = peers
                    .split(',')
                    .map(str::trim)
                    .filter(|addr| !addr.is_empty())
                    .map(String::from)
                    .collect();

                if addrs.len() != ctx.size() {
                    return Err(ConfigErr::Topology(format!(
                        "expected {} peer addresses, got {}",
                        ctx.size(),
                        addrs.len()
                    )));
                }

                addrs
            }
            None => {
                let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
                let port = match lookup("PORT") {
                    Some(port) => {
                        let parsed = port.trim().parse::<u16>();
                        parsed.map_err(|_| ConfigErr::InvalidVar {
                            var: "PORT",
                            value: port,
                        })?
                    }
                    None => DEFAULT_PORT,
                };

                port_range(&host, port, ctx.size())?
            }
        };

        Ok(Self { ctx, addrs })
    }

    /// Creates a topology from explicit parts.
    pub fn new(ctx: RankContext, addrs: Vec<String>) -> Result<Self, ConfigErr> {
        if addrs.len() != ctx.size() {
            return Err(ConfigErr::Topology(format!(
                "expected {} peer addresses, got {}",
                ctx.size(),
                addrs.len()
            )));
        }

        Ok(Self { ctx, addrs })
    }

    pub fn ctx(&self) -> RankContext {
        self.ctx
    }

    /// The listening address of every rank, indexed by rank.
    pub fn addrs(&self) -> &[String] {
        &self.addrs
    }
}

fn first_number<F>(lookup: &F, vars: &[&'static str]) -> Result<Option<usize>, ConfigErr>
where
    F: Fn(&str) -> Option<String>,
{
    for &var in vars {
        if let Some(value) = lookup(var) {
            let parsed = value.trim().parse::<usize>();
            return parsed
                .map(Some)
                .map_err(|_| ConfigErr::InvalidVar { var, value });
        }
    }

    Ok(None)
}

fn port_range(host: &str, base: u16, size: usize) -> Result<Vec<String>, ConfigErr> {
    (0..size)
        .map(|rank| {
            u16::try_from(rank)
                .ok()
                .and_then(|rank| base.checked_add(rank))
                .map(|port| format!("{host}:{port}"))
                .ok_or_else(|| {
                    ConfigErr::Topology(format!("port {base} + {rank} exceeds the port range"))
                })
        })
        .collect()
}
