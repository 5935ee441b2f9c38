//! The collective reduction: the only point of inter-worker communication.
//!
//! Every worker calls [`Collective::reduce`] exactly once with its local
//! statistics. The coordinator (rank 0) blocks until every rank has
//! contributed and returns the combined [`GlobalStatistics`]; every other
//! rank hands its contribution over and receives `None`.
//!
//! The reduction is all-or-nothing: if any rank drops its endpoint without
//! contributing, the coordinator fails with `PartialParticipation` instead of
//! returning an undercounted sum.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::warn;

use crate::accumulator::LocalStatistics;
use crate::error::{EngineError, Result};
use crate::estimate::GlobalStatistics;

/// Rank of the coordinating worker.
pub const COORDINATOR_RANK: usize = 0;

/// A worker's endpoint into the collective reduction.
pub trait Collective {
    /// This worker's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Returns true on the coordinating worker.
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }

    /// Contributes `local` to the reduction.
    ///
    /// Consumes the endpoint: each rank participates exactly once.
    ///
    /// # Errors
    ///
    /// - `PartialParticipation` on the coordinator when a rank never contributed.
    /// - `CoordinatorUnavailable` on a worker whose contribution cannot be delivered.
    fn reduce(self, local: LocalStatistics) -> Result<Option<GlobalStatistics>>;
}

struct Contribution {
    rank: usize,
    stats: LocalStatistics,
}

enum Endpoint {
    Coordinator(Receiver<Contribution>),
    Worker(Sender<Contribution>),
}

/// In-process [`Collective`] backed by an `std::sync::mpsc` channel.
///
/// # Examples
///
/// ```rust
/// use pricer_distributed::accumulator::LocalStatistics;
/// use pricer_distributed::collective::{ChannelCommunicator, Collective};
///
/// let mut group = ChannelCommunicator::group(2).unwrap();
/// let worker = group.pop().unwrap();
/// let coordinator = group.pop().unwrap();
///
/// let stats = LocalStatistics { sum_payoff: 3.0, sum_squared_payoff: 9.0, count: 1,
///                               unit_sum: 3.0, unit_sum_squared: 9.0, unit_count: 1 };
/// assert!(worker.reduce(stats.clone()).unwrap().is_none());
///
/// let global = coordinator.reduce(stats).unwrap().unwrap();
/// assert_eq!(global.count(), 2);
/// ```
pub struct ChannelCommunicator {
    rank: usize,
    size: usize,
    endpoint: Endpoint,
}

impl ChannelCommunicator {
    /// Creates the endpoints of a group of `size` ranks, ordered by rank.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `size` is zero.
    pub fn group(size: usize) -> Result<Vec<Self>> {
        if size == 0 {
            return Err(EngineError::InvalidInput(
                "collective group must have at least one rank".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::channel();
        let mut endpoints = Vec::with_capacity(size);
        endpoints.push(Self {
            rank: COORDINATOR_RANK,
            size,
            endpoint: Endpoint::Coordinator(receiver),
        });
        for rank in 1..size {
            endpoints.push(Self {
                rank,
                size,
                endpoint: Endpoint::Worker(sender.clone()),
            });
        }
        // Only worker endpoints hold senders, so the inbox closes once all are gone.
        drop(sender);

        Ok(endpoints)
    }

    fn gather(
        size: usize,
        inbox: Receiver<Contribution>,
        local: LocalStatistics,
    ) -> Result<GlobalStatistics> {
        let mut slots: Vec<Option<LocalStatistics>> = vec![None; size];
        slots[COORDINATOR_RANK] = Some(local);

        let mut received = 1;
        while received < size {
            match inbox.recv() {
                Ok(Contribution { rank, stats }) => {
                    if rank < size && slots[rank].is_none() {
                        slots[rank] = Some(stats);
                        received += 1;
                    }
                }
                // Every remaining endpoint was dropped without contributing.
                Err(_) => break,
            }
        }

        if received < size {
            let missing: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter_map(|(rank, slot)| slot.is_none().then_some(rank))
                .collect();
            warn!(
                expected = size,
                received,
                ?missing,
                "collective reduction incomplete"
            );
            return Err(EngineError::PartialParticipation {
                expected: size,
                received,
                missing,
            });
        }

        let contributions: Vec<LocalStatistics> = slots.into_iter().flatten().collect();
        Ok(GlobalStatistics::from_contributions(&contributions))
    }
}

impl Collective for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn reduce(self, local: LocalStatistics) -> Result<Option<GlobalStatistics>> {
        match self.endpoint {
            Endpoint::Coordinator(inbox) => Self::gather(self.size, inbox, local).map(Some),
            Endpoint::Worker(outbox) => {
                outbox
                    .send(Contribution {
                        rank: self.rank,
                        stats: local,
                    })
                    .map_err(|_| EngineError::CoordinatorUnavailable { rank: self.rank })?;
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for ChannelCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn unit_stats(value: f64) -> LocalStatistics {
        LocalStatistics {
            sum_payoff: value,
            sum_squared_payoff: value * value,
            count: 1,
            unit_sum: value,
            unit_sum_squared: value * value,
            unit_count: 1,
        }
    }

    #[test]
    fn test_group_ranks() {
        let group = ChannelCommunicator::group(4).unwrap();
        let ranks: Vec<usize> = group.iter().map(|c| c.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(group[0].is_coordinator());
        assert!(group.iter().skip(1).all(|c| !c.is_coordinator()));
        assert!(group.iter().all(|c| c.size() == 4));
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(
            ChannelCommunicator::group(0),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_single_rank_group() {
        let mut group = ChannelCommunicator::group(1).unwrap();
        let global = group.remove(0).reduce(unit_stats(2.0)).unwrap().unwrap();
        assert_eq!(global.count(), 1);
        assert_eq!(global.sum_payoff(), 2.0);
    }

    #[test]
    fn test_only_coordinator_receives_result() {
        let group = ChannelCommunicator::group(4).unwrap();

        let results: Vec<(usize, Option<GlobalStatistics>)> = thread::scope(|s| {
            let handles: Vec<_> = group
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let rank = comm.rank();
                        (rank, comm.reduce(unit_stats(rank as f64 + 1.0)).unwrap())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (rank, result) in results {
            if rank == COORDINATOR_RANK {
                let global = result.unwrap();
                assert_eq!(global.count(), 4);
                assert_eq!(global.sum_payoff(), 10.0);
            } else {
                assert!(result.is_none());
            }
        }
    }

    #[test]
    fn test_arrival_order_does_not_change_result() {
        let values = [0.1, 0.7, 1e8, -3.3, 2.5e-9, 42.0];

        let run = |reverse: bool| {
            let mut group = ChannelCommunicator::group(values.len()).unwrap();
            let coordinator = group.remove(0);
            if reverse {
                group.reverse();
            }
            for comm in group {
                let v = values[comm.rank()];
                comm.reduce(unit_stats(v)).unwrap();
            }
            coordinator.reduce(unit_stats(values[0])).unwrap().unwrap()
        };

        assert_eq!(run(false), run(true));
    }

    #[test]
    fn test_dropped_rank_fails_reduction() {
        let mut group = ChannelCommunicator::group(4).unwrap();
        let coordinator = group.remove(0);

        for comm in group {
            if comm.rank() == 2 {
                drop(comm);
            } else {
                comm.reduce(unit_stats(1.0)).unwrap();
            }
        }

        match coordinator.reduce(unit_stats(1.0)) {
            Err(EngineError::PartialParticipation {
                expected,
                received,
                missing,
            }) => {
                assert_eq!(expected, 4);
                assert_eq!(received, 3);
                assert_eq!(missing, vec![2]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_missing_coordinator_fails_workers() {
        let mut group = ChannelCommunicator::group(3).unwrap();
        drop(group.remove(0));

        for comm in group {
            let rank = comm.rank();
            assert_eq!(
                comm.reduce(unit_stats(1.0)),
                Err(EngineError::CoordinatorUnavailable { rank })
            );
        }
    }
}
