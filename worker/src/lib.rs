pub mod comm;
pub mod config;
pub mod error;
pub mod objective;
pub mod partition;
pub mod report;
pub mod sampler;
pub mod search;
pub mod topology;
pub mod transfer;
pub mod worker;

pub use comm::Communicator;
pub use config::{SampleCount, SearchConfig};
pub use error::{ConfigErr, WorkerErr};
pub use objective::{Landscape, Objective};
pub use topology::{RankContext, Topology};
pub use worker::{Outcome, Worker};
