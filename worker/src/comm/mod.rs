//! Message passing between the ranks of a group.
//!
//! Every rank holds one framed channel per peer. Collectives run over a
//! binomial tree rooted at rank 0: a reduce phase up the tree followed by a
//! broadcast phase down it, `O(log size)` rounds each way. Messages between
//! two ranks are delivered in order and every rank issues the same sequence
//! of operations, so no tags are needed to match them.

mod local;
mod mesh;
mod minloc;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Axis, Command, Msg, Payload},
};
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncWrite};

pub use local::{LocalCommunicator, local};
pub use mesh::{TcpCommunicator, establish, establish_with};
pub use minloc::beats;

use crate::{
    error::{Result, WorkerErr},
    topology::RankContext,
};

/// A value that can be combined across ranks by `Communicator::allreduce`.
///
/// `combine` must be associative and commutative, the reduction tree gives
/// no guarantee on the order values meet in.
pub trait Reducible: Copy + Send {
    /// Diagnostic name of the expected message.
    const KIND: &'static str;

    fn to_msg(self) -> Msg<'static>;

    fn from_msg(msg: &Msg<'_>) -> Option<Self>;

    fn combine(self, other: Self) -> Self;
}

/// The token circulated by `Communicator::barrier`.
#[derive(Debug, Clone, Copy)]
struct Arrival;

impl Reducible for Arrival {
    const KIND: &'static str = "control/barrier";

    fn to_msg(self) -> Msg<'static> {
        Msg::Control(Command::Barrier)
    }

    fn from_msg(msg: &Msg<'_>) -> Option<Self> {
        matches!(msg, Msg::Control(Command::Barrier)).then_some(Arrival)
    }

    fn combine(self, _other: Self) -> Self {
        self
    }
}

/// Both ends of the channel to a single peer.
pub(crate) struct Peer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
}

impl<R, W> Peer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new((rx, tx): (OnoReceiver<R>, OnoSender<W>)) -> Self {
        Self { rx, tx }
    }
}

/// This rank's view of the group.
pub struct Communicator<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    ctx: RankContext,
    peers: Vec<Option<Peer<R, W>>>,
    buf: Vec<u8>,
}

impl<R, W> Communicator<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a new `Communicator`.
    ///
    /// # Args
    /// * `ctx` - This rank's identity.
    /// * `peers` - One entry per rank of the group, `None` at `ctx.rank()`.
    pub(crate) fn new(ctx: RankContext, peers: Vec<Option<Peer<R, W>>>) -> Self {
        debug_assert_eq!(peers.len(), ctx.size());
        Self {
            ctx,
            peers,
            buf: Vec::new(),
        }
    }

    /// A communicator for a group of one, every collective is local.
    pub fn single() -> Self {
        Self::new(RankContext::single(), vec![None])
    }

    pub fn ctx(&self) -> RankContext {
        self.ctx
    }

    /// Combines `local` with the values of every other rank.
    ///
    /// Blocks until every rank of the group has contributed.
    ///
    /// # Args
    /// * `local` - This rank's contribution.
    ///
    /// # Returns
    /// The combination of all contributions, identical on every rank.
    pub async fn allreduce<T: Reducible>(&mut self, local: T) -> Result<T> {
        let (rank, size) = (self.ctx.rank(), self.ctx.size());
        let mut acc = local;

        let mut mask = 1;
        while mask < size {
            if rank & mask != 0 {
                self.send(rank - mask, &acc.to_msg()).await?;
                break;
            }

            let child = rank + mask;
            if child < size {
                let theirs = self.recv_reducible::<T>(child).await?;
                acc = acc.combine(theirs);
            }

            mask <<= 1;
        }

        let mut mask = 1;
        while mask < size {
            if rank & mask != 0 {
                acc = self.recv_reducible::<T>(rank - mask).await?;
                break;
            }

            mask <<= 1;
        }

        mask >>= 1;
        while mask > 0 {
            if rank + mask < size {
                self.send(rank + mask, &acc.to_msg()).await?;
            }

            mask >>= 1;
        }

        Ok(acc)
    }

    /// Waits until every rank of the group has reached this call.
    pub async fn barrier(&mut self) -> Result<()> {
        trace!(rank = self.ctx.rank(); "entering barrier");
        self.allreduce(Arrival).await?;
        trace!(rank = self.ctx.rank(); "leaving barrier");
        Ok(())
    }

    /// Sends a point's coordinates to `to`, `x` first and `y` second.
    pub async fn send_coordinates(&mut self, to: usize, x: f64, y: f64) -> Result<()> {
        self.send(to, &Msg::Data(Payload::Coordinate(Axis::X, x)))
            .await?;
        self.send(to, &Msg::Data(Payload::Coordinate(Axis::Y, y)))
            .await
    }

    /// Receives a point's coordinates from `from`.
    ///
    /// The two coordinates may arrive in any order, each exactly once.
    pub async fn recv_coordinates(&mut self, from: usize) -> Result<(f64, f64)> {
        let (mut x, mut y) = (None, None);

        loop {
            if let (Some(x), Some(y)) = (x, y) {
                return Ok((x, y));
            }

            let msg = self.recv(from).await?;
            match msg {
                Msg::Data(Payload::Coordinate(Axis::X, v)) if x.is_none() => x = Some(v),
                Msg::Data(Payload::Coordinate(Axis::Y, v)) if y.is_none() => y = Some(v),
                other => {
                    return Err(WorkerErr::UnexpectedMessage {
                        peer: from,
                        expected: "data/x or data/y",
                        got: other.kind(),
                    });
                }
            }
        }
    }

    /// Tells every peer this rank is done and waits for them to say the same.
    pub async fn finalize(mut self) -> Result<()> {
        let rank = self.ctx.rank();
        let others: Vec<usize> = (0..self.ctx.size()).filter(|&p| p != rank).collect();

        for &peer in &others {
            self.send(peer, &Msg::Control(Command::Disconnect)).await?;
        }

        for &peer in &others {
            match self.recv(peer).await? {
                Msg::Control(Command::Disconnect) => {}
                other => {
                    return Err(WorkerErr::UnexpectedMessage {
                        peer,
                        expected: "control/disconnect",
                        got: other.kind(),
                    });
                }
            }
        }

        debug!(rank = rank; "disconnected from all peers");
        Ok(())
    }

    async fn send(&mut self, to: usize, msg: &Msg<'_>) -> Result<()> {
        trace!(rank = self.ctx.rank(), to = to, kind = msg.kind(); "send");
        let peer = Self::peer(&mut self.peers, to)?;
        peer.tx.send(msg).await?;
        Ok(())
    }

    /// Receives the next message from `from`, turning peer errors into `WorkerErr::Peer`.
    async fn recv(&mut self, from: usize) -> Result<Msg<'static>> {
        let Self { peers, buf, ctx } = self;
        let peer = Self::peer(peers, from)?;
        let msg: Msg = peer.rx.recv_into(buf).await?;
        trace!(rank = ctx.rank(), from = from, kind = msg.kind(); "recv");

        match msg {
            Msg::Control(cmd) => Ok(Msg::Control(cmd)),
            Msg::Data(payload) => Ok(Msg::Data(payload)),
            Msg::Err(detail) => Err(WorkerErr::Peer {
                peer: from,
                detail: detail.into_owned(),
            }),
        }
    }

    async fn recv_reducible<T: Reducible>(&mut self, from: usize) -> Result<T> {
        let msg = self.recv(from).await?;
        T::from_msg(&msg).ok_or_else(|| WorkerErr::UnexpectedMessage {
            peer: from,
            expected: T::KIND,
            got: msg.kind(),
        })
    }

    fn peer(peers: &mut [Option<Peer<R, W>>], rank: usize) -> Result<&mut Peer<R, W>> {
        peers
            .get_mut(rank)
            .and_then(Option::as_mut)
            .ok_or_else(|| WorkerErr::Handshake(format!("no channel to rank {rank}")))
    }
}
