use std::{error::Error, fmt, io};

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Startup failures, detected before any communication happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErr {
    /// The sample count argument is absent.
    MissingSamples,
    /// The sample count is not a positive integer.
    InvalidSamples(String),
    /// The sample count can't be split evenly among the processes.
    IndivisibleSamples { samples: usize, size: usize },
    /// An unknown objective function name.
    UnknownObjective(String),
    /// A malformed environment variable.
    InvalidVar { var: &'static str, value: String },
    /// The process topology is inconsistent.
    Topology(String),
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErr::MissingSamples => {
                write!(f, "Error: number of random points is not chosen.")
            }
            ConfigErr::InvalidSamples(_) => {
                write!(f, "Error: number of random points is not positive integer.")
            }
            ConfigErr::IndivisibleSamples { .. } => write!(
                f,
                "Error: number of random points is not divisible by number of processes."
            ),
            ConfigErr::UnknownObjective(name) => {
                write!(f, "Error: unknown objective function {name:?}.")
            }
            ConfigErr::InvalidVar { var, value } => {
                write!(f, "Error: invalid value {value:?} for {var}.")
            }
            ConfigErr::Topology(detail) => write!(f, "Error: invalid topology: {detail}."),
        }
    }
}

impl Error for ConfigErr {}

/// Worker runtime failures.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    Config(ConfigErr),
    UnexpectedMessage {
        peer: usize,
        expected: &'static str,
        got: &'static str,
    },
    Peer {
        peer: usize,
        detail: String,
    },
    Handshake(String),
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Config(e) => write!(f, "{e}"),
            WorkerErr::UnexpectedMessage {
                peer,
                expected,
                got,
            } => write!(
                f,
                "unexpected message from rank {peer}: expected {expected}, got {got}"
            ),
            WorkerErr::Peer { peer, detail } => write!(f, "rank {peer} failed: {detail}"),
            WorkerErr::Handshake(detail) => write!(f, "handshake failed: {detail}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ConfigErr> for WorkerErr {
    fn from(value: ConfigErr) -> Self {
        Self::Config(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
