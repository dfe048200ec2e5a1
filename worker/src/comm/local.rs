use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};

use super::{Communicator, Peer};
use crate::topology::RankContext;

/// Capacity of every in-process pipe, in bytes.
const PIPE_CAPACITY: usize = 4096;

/// A communicator whose peers live in the same process.
pub type LocalCommunicator = Communicator<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// Builds a fully connected group of `size` ranks over in-memory pipes.
///
/// # Args
/// * `size` - The amount of ranks.
///
/// # Returns
/// One communicator per rank, indexed by rank.
pub fn local(size: usize) -> Vec<LocalCommunicator> {
    let mut peers: Vec<Vec<Option<Peer<_, _>>>> = (0..size)
        .map(|_| (0..size).map(|_| None).collect())
        .collect();

    for a in 0..size {
        for b in a + 1..size {
            let (a_end, b_end) = io::duplex(PIPE_CAPACITY);
            let (a_rx, a_tx) = io::split(a_end);
            let (b_rx, b_tx) = io::split(b_end);
            peers[a][b] = Some(Peer::new(comms::channel(a_rx, a_tx)));
            peers[b][a] = Some(Peer::new(comms::channel(b_rx, b_tx)));
        }
    }

    RankContext::group(size)
        .zip(peers)
        .map(|(ctx, peers)| Communicator::new(ctx, peers))
        .collect()
}
