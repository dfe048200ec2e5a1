use std::time::Duration;

use comms::msg::{Command, Msg};
use futures::future::try_join_all;
use log::{debug, info, warn};
use tokio::{
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time,
};

use super::{Communicator, Peer};
use crate::{
    error::{Result, WorkerErr},
    topology::{RankContext, Topology},
};

const CONNECT_ATTEMPTS: usize = 50;
const CONNECT_BACKOFF: Duration = Duration::from_millis(200);

/// A communicator whose peers are reached over TCP.
pub type TcpCommunicator = Communicator<OwnedReadHalf, OwnedWriteHalf>;

type TcpPeer = Peer<OwnedReadHalf, OwnedWriteHalf>;

/// Connects this process to every other rank of `topology`.
///
/// Binds this rank's address, connects to every lower rank and accepts a
/// connection from every higher one.
///
/// # Args
/// * `topology` - The group's addresses and this process's identity.
///
/// # Returns
/// The connected communicator or the first failure found.
pub async fn establish(topology: &Topology) -> Result<TcpCommunicator> {
    let ctx = topology.ctx();
    if ctx.size() == 1 {
        return Ok(Communicator::single());
    }

    let addr = &topology.addrs()[ctx.rank()];
    let listener = TcpListener::bind(addr).await?;
    info!(rank = ctx.rank(), size = ctx.size(); "listening at {addr}");

    establish_with(ctx, listener, topology.addrs()).await
}

/// Same as `establish`, on an already bound listener.
///
/// # Args
/// * `ctx` - This process's identity.
/// * `listener` - Bound at `addrs[ctx.rank()]`.
/// * `addrs` - The listening address of every rank.
pub async fn establish_with(
    ctx: RankContext,
    listener: TcpListener,
    addrs: &[String],
) -> Result<TcpCommunicator> {
    let lower = try_join_all(
        addrs
            .iter()
            .take(ctx.rank())
            .enumerate()
            .map(|(peer, addr)| connect(ctx, peer, addr)),
    );
    let higher = accept_all(ctx, &listener);

    let (lower, higher) = tokio::try_join!(lower, higher)?;

    let mut peers: Vec<Option<TcpPeer>> = (0..ctx.size()).map(|_| None).collect();
    for (rank, peer) in lower.into_iter().chain(higher) {
        peers[rank] = Some(peer);
    }

    debug!(rank = ctx.rank(); "connected to all peers");
    Ok(Communicator::new(ctx, peers))
}

/// Connects to the lower rank `peer` and performs the handshake.
async fn connect(ctx: RankContext, peer: usize, addr: &str) -> Result<(usize, TcpPeer)> {
    let mut attempt = 1;
    let stream = loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => break stream,
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                debug!(rank = ctx.rank(), peer = peer, attempt = attempt; "connect failed: {e}");
                attempt += 1;
                time::sleep(CONNECT_BACKOFF).await;
            }
            Err(e) => {
                warn!(rank = ctx.rank(), peer = peer; "giving up connecting to {addr}");
                return Err(e.into());
            }
        }
    };

    stream.set_nodelay(true)?;
    let (rx, tx) = stream.into_split();
    let (mut rx, mut tx) = comms::channel(rx, tx);

    let hello = Msg::Control(Command::Hello {
        rank: ctx.rank(),
        size: ctx.size(),
    });
    tx.send(&hello).await?;

    let mut buf = Vec::new();
    match rx.recv_into(&mut buf).await? {
        Msg::Control(Command::Hello { rank, size }) if rank == peer && size == ctx.size() => {}
        Msg::Control(Command::Hello { rank, size }) => {
            return Err(WorkerErr::Handshake(format!(
                "{addr} answered as rank {rank} of {size}, expected rank {peer} of {}",
                ctx.size()
            )));
        }
        Msg::Err(detail) => {
            return Err(WorkerErr::Peer {
                peer,
                detail: detail.into_owned(),
            });
        }
        other => {
            return Err(WorkerErr::UnexpectedMessage {
                peer,
                expected: "control/hello",
                got: other.kind(),
            });
        }
    }

    debug!(rank = ctx.rank(), peer = peer; "connected");
    Ok((peer, Peer::new((rx, tx))))
}

/// Accepts one connection from every higher rank.
async fn accept_all(ctx: RankContext, listener: &TcpListener) -> Result<Vec<(usize, TcpPeer)>> {
    let expected = ctx.size() - ctx.rank() - 1;
    let mut accepted: Vec<(usize, TcpPeer)> = Vec::with_capacity(expected);
    let mut buf = Vec::new();

    while accepted.len() < expected {
        let (stream, from) = listener.accept().await?;
        stream.set_nodelay(true)?;
        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);

        let peer = match rx.recv_into(&mut buf).await? {
            Msg::Control(Command::Hello { rank, size }) => {
                let duplicate = accepted.iter().any(|(r, _)| *r == rank);
                if size != ctx.size() || rank <= ctx.rank() || rank >= size || duplicate {
                    let detail = format!(
                        "rank {rank} of {size} rejected by rank {} of {}",
                        ctx.rank(),
                        ctx.size()
                    );
                    tx.send(&Msg::Err(detail.as_str().into())).await?;
                    return Err(WorkerErr::Handshake(detail));
                }
                rank
            }
            other => {
                let got = other.kind();
                let detail = format!("expected control/hello from {from}, got {got}");
                tx.send(&Msg::Err(detail.as_str().into())).await?;
                return Err(WorkerErr::Handshake(detail));
            }
        };

        let hello = Msg::Control(Command::Hello {
            rank: ctx.rank(),
            size: ctx.size(),
        });
        tx.send(&hello).await?;

        debug!(rank = ctx.rank(), peer = peer; "accepted connection from {from}");
        accepted.push((peer, Peer::new((rx, tx))));
    }

    Ok(accepted)
}
