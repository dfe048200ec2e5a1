//! Starts a group of search processes on this host.

use std::{env, io, num::NonZeroUsize, path::PathBuf, process::Stdio};

use anyhow::{Context, Result, anyhow, bail};
use futures::future::try_join_all;
use log::{debug, info, warn};
use tokio::process::Command;

/// Name of the search binary.
pub const PROGRAM: &str = "mcmin";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 47000;

/// Everything needed to start a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    procs: NonZeroUsize,
    samples: String,
    program: PathBuf,
    host: String,
    port: u16,
}

impl Plan {
    /// Builds a plan from the command line and the process environment.
    pub fn from_env() -> Result<Self> {
        let exe = env::current_exe().ok();
        Self::from_args(env::args().skip(1), |var| env::var(var).ok(), exe)
    }

    /// Builds a plan.
    ///
    /// # Args
    /// * `args` - `<procs> <n> [program]`, without the launcher's name.
    /// * `lookup` - Returns the value of a variable, if set.
    /// * `exe` - The launcher's own path, used to find a sibling program.
    ///
    /// # Returns
    /// The plan or a usage error.
    pub fn from_args<I, F>(args: I, lookup: F, exe: Option<PathBuf>) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut args = args.into_iter();
        let (Some(procs), Some(samples)) = (args.next(), args.next()) else {
            bail!("usage: mcrun <procs> <n> [program]");
        };
        let explicit = args.next();
        if args.next().is_some() {
            bail!("usage: mcrun <procs> <n> [program]");
        }

        let procs = procs
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| anyhow!("number of processes {procs:?} is not a positive integer"))?;

        let program = resolve_program(explicit, lookup("MCMIN"), exe)?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("invalid PORT {port:?}"))?,
            None => DEFAULT_PORT,
        };

        let last_port = usize::from(port).checked_add(procs.get() - 1);
        if last_port.is_none_or(|last| last > usize::from(u16::MAX)) {
            bail!("{} processes don't fit above port {port}", procs.get());
        }

        Ok(Self {
            procs,
            samples,
            program,
            host,
            port,
        })
    }

    pub fn procs(&self) -> usize {
        self.procs.get()
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// The topology variables handed to the process of `rank`.
    pub fn rank_env(&self, rank: usize) -> [(&'static str, String); 4] {
        [
            ("RANK", rank.to_string()),
            ("SIZE", self.procs.get().to_string()),
            ("HOST", self.host.clone()),
            ("PORT", self.port.to_string()),
        ]
    }

    /// Starts every process and waits for all of them.
    ///
    /// # Returns
    /// The exit code of the group: the first non-zero code by rank, or 0.
    pub async fn launch(&self) -> Result<i32> {
        info!(procs = self.procs(); "launching {}", self.program.display());

        let children = (0..self.procs())
            .map(|rank| {
                Command::new(&self.program)
                    .arg(&self.samples)
                    .envs(self.rank_env(rank))
                    .stdin(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()
                    .with_context(|| format!("failed to start {}", self.program.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        let waits = children
            .into_iter()
            .enumerate()
            .map(|(rank, mut child)| async move {
                let status = child.wait().await?;
                debug!(rank = rank, code = status.code(); "process exited");
                Ok::<_, io::Error>(status.code())
            });

        let statuses = try_join_all(waits)
            .await
            .context("failed to wait for a process")?;

        let code = group_code(&statuses);
        if code != 0 {
            warn!(code = code; "group failed");
        }

        Ok(code)
    }
}

/// Finds the program to start.
///
/// An explicit argument wins over the `MCMIN` variable, which wins over a
/// `mcmin` next to the launcher.
pub fn resolve_program(
    explicit: Option<String>,
    var: Option<String>,
    exe: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(program) = explicit.or(var) {
        return Ok(PathBuf::from(program));
    }

    let dir = exe
        .as_deref()
        .and_then(|exe| exe.parent())
        .ok_or_else(|| anyhow!("can't locate {PROGRAM}, pass it explicitly or set MCMIN"))?;

    Ok(dir.join(format!("{PROGRAM}{}", env::consts::EXE_SUFFIX)))
}

/// Folds per-rank exit codes, a process killed by a signal counts as 1.
pub fn group_code(codes: &[Option<i32>]) -> i32 {
    codes
        .iter()
        .map(|code| code.unwrap_or(1))
        .find(|&code| code != 0)
        .unwrap_or(0)
}
