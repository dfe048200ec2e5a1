use comms::msg::MinLoc;
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    comm::Communicator,
    error::Result,
    search::WorkerState,
    topology::{COORDINATOR, RankContext},
};

/// The group's minimum, as known by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalResult {
    pub value: f64,
    pub owner_rank: usize,
    pub x: f64,
    pub y: f64,
}

/// What this rank has to do once the winner is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Role {
    /// This rank found the group's minimum.
    pub is_owner: bool,
    /// This rank reports the result.
    pub is_coordinator: bool,
}

impl Role {
    pub fn of(ctx: RankContext, winner: &MinLoc) -> Self {
        Self {
            is_owner: ctx.rank() == winner.rank,
            is_coordinator: ctx.is_coordinator(),
        }
    }
}

/// Moves the winner's coordinates to the coordinator.
///
/// # Args
/// * `comm` - This rank's communicator.
/// * `winner` - The outcome of the minloc reduction, identical on every rank.
/// * `state` - This rank's local search result.
///
/// # Returns
/// The global result on the coordinator, `None` everywhere else.
pub async fn collect<R, W>(
    comm: &mut Communicator<R, W>,
    winner: MinLoc,
    state: &WorkerState,
) -> Result<Option<GlobalResult>>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let role = Role::of(comm.ctx(), &winner);
    let rank = comm.ctx().rank();

    let coords = match role {
        Role {
            is_owner: true,
            is_coordinator: true,
        } => {
            debug!(rank = rank; "coordinator owns the minimum, nothing to transfer");
            Some((state.best.x, state.best.y))
        }
        Role {
            is_owner: true,
            is_coordinator: false,
        } => {
            debug!(rank = rank; "sending coordinates to the coordinator");
            comm.send_coordinates(COORDINATOR, state.best.x, state.best.y)
                .await?;
            None
        }
        Role {
            is_owner: false,
            is_coordinator: true,
        } => {
            debug!(rank = rank, owner = winner.rank; "waiting for the owner's coordinates");
            Some(comm.recv_coordinates(winner.rank).await?)
        }
        Role {
            is_owner: false,
            is_coordinator: false,
        } => None,
    };

    Ok(coords.map(|(x, y)| GlobalResult {
        value: winner.value,
        owner_rank: winner.rank,
        x,
        y,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(rank: usize) -> RankContext {
        RankContext::new(rank, 4).unwrap()
    }

    fn winner(rank: usize) -> MinLoc {
        MinLoc { value: 0.0, rank }
    }

    #[test]
    fn coordinator_owning_the_minimum_has_both_roles() {
        let role = Role::of(ctx(0), &winner(0));
        assert!(role.is_owner && role.is_coordinator);
    }

    #[test]
    fn roles_are_disjoint_for_a_remote_owner() {
        assert_eq!(
            Role::of(ctx(0), &winner(2)),
            Role {
                is_owner: false,
                is_coordinator: true
            }
        );
        assert_eq!(
            Role::of(ctx(2), &winner(2)),
            Role {
                is_owner: true,
                is_coordinator: false
            }
        );
        assert_eq!(
            Role::of(ctx(3), &winner(2)),
            Role {
                is_owner: false,
                is_coordinator: false
            }
        );
    }

    #[test]
    fn exactly_one_owner_per_group() {
        let owners = (0..4).filter(|&r| Role::of(ctx(r), &winner(1)).is_owner).count();
        assert_eq!(owners, 1);
    }
}
