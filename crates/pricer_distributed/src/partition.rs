//! Work partitioning across workers.
//!
//! `N` samples are split over `P` workers as `N / P` each, with the
//! `N % P` leftover samples going one apiece to the lowest-indexed workers.
//! Nothing is lost or duplicated, and shares differ by at most one.
//!
//! ```text
//! N = 10, P = 4   ->   [3, 3, 2, 2]
//! N = 2,  P = 4   ->   [1, 1, 0, 0]
//! ```

use crate::error::{EngineError, Result};

/// One worker's slice of a simulation run.
///
/// The worker index is explicit: a worker learns its identity from its share,
/// never from ambient state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkerShare {
    /// Worker index (rank) in `0..worker_count`.
    pub worker_index: usize,
    /// Number of samples this worker draws.
    pub sample_count: u64,
    /// Seed of this worker's generator: `base_seed + worker_index`.
    pub seed: u64,
}

impl WorkerShare {
    /// Derives the share of a single worker.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `worker_count` is zero or `worker_index` is out of range.
    pub fn derive(
        total_samples: u64,
        worker_count: usize,
        base_seed: u64,
        worker_index: usize,
    ) -> Result<Self> {
        check_worker_count(worker_count)?;
        if worker_index >= worker_count {
            return Err(EngineError::InvalidInput(format!(
                "worker_index {} out of range for {} workers",
                worker_index, worker_count
            )));
        }

        Ok(Self {
            worker_index,
            sample_count: share_of(total_samples, worker_count, worker_index),
            seed: worker_seed(base_seed, worker_index),
        })
    }
}

/// Splits `total_samples` over `worker_count` workers.
///
/// # Errors
///
/// `InvalidInput` if `worker_count` is zero.
///
/// # Examples
///
/// ```rust
/// use pricer_distributed::partition::partition;
///
/// assert_eq!(partition(10, 4).unwrap(), vec![3, 3, 2, 2]);
/// assert_eq!(partition(2, 4).unwrap(), vec![1, 1, 0, 0]);
/// assert!(partition(10, 0).is_err());
/// ```
pub fn partition(total_samples: u64, worker_count: usize) -> Result<Vec<u64>> {
    check_worker_count(worker_count)?;
    Ok((0..worker_count)
        .map(|index| share_of(total_samples, worker_count, index))
        .collect())
}

/// Derives every worker's share, including its seed.
///
/// # Errors
///
/// `InvalidInput` if `worker_count` is zero.
pub fn worker_shares(
    total_samples: u64,
    worker_count: usize,
    base_seed: u64,
) -> Result<Vec<WorkerShare>> {
    check_worker_count(worker_count)?;
    Ok((0..worker_count)
        .map(|worker_index| WorkerShare {
            worker_index,
            sample_count: share_of(total_samples, worker_count, worker_index),
            seed: worker_seed(base_seed, worker_index),
        })
        .collect())
}

/// Seed of worker `worker_index`: `base_seed + worker_index`, wrapping on overflow.
#[inline]
pub fn worker_seed(base_seed: u64, worker_index: usize) -> u64 {
    base_seed.wrapping_add(worker_index as u64)
}

#[inline]
fn share_of(total_samples: u64, worker_count: usize, worker_index: usize) -> u64 {
    let workers = worker_count as u64;
    let base = total_samples / workers;
    let remainder = total_samples % workers;
    if (worker_index as u64) < remainder {
        base + 1
    } else {
        base
    }
}

fn check_worker_count(worker_count: usize) -> Result<()> {
    if worker_count == 0 {
        return Err(EngineError::InvalidInput(
            "worker_count must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_even_split() {
        assert_eq!(partition(12, 4).unwrap(), vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_remainder_goes_to_first_workers() {
        assert_eq!(partition(10, 4).unwrap(), vec![3, 3, 2, 2]);
        assert_eq!(partition(7, 3).unwrap(), vec![3, 2, 2]);
    }

    #[test]
    fn test_fewer_samples_than_workers() {
        assert_eq!(partition(2, 5).unwrap(), vec![1, 1, 0, 0, 0]);
        assert_eq!(partition(0, 3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(partition(10, 0), Err(EngineError::InvalidInput(_))));
        assert!(matches!(
            worker_shares(10, 0, 42),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_worker_shares_seeds() {
        let shares = worker_shares(1_000_001, 4, 42).unwrap();
        let seeds: Vec<u64> = shares.iter().map(|s| s.seed).collect();
        assert_eq!(seeds, vec![42, 43, 44, 45]);
        assert_eq!(shares[0].sample_count, 250_001);
        assert_eq!(shares[3].sample_count, 250_000);
        for (index, share) in shares.iter().enumerate() {
            assert_eq!(share.worker_index, index);
        }
    }

    #[test]
    fn test_derive_matches_worker_shares() {
        let shares = worker_shares(103, 7, 9).unwrap();
        for share in shares {
            assert_eq!(WorkerShare::derive(103, 7, 9, share.worker_index).unwrap(), share);
        }
        assert!(WorkerShare::derive(103, 7, 9, 7).is_err());
    }

    #[test]
    fn test_seed_wraps() {
        assert_eq!(worker_seed(u64::MAX, 1), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn prop_partition_complete_and_balanced(
            total in 0u64..10_000_000,
            workers in 1usize..512,
        ) {
            let counts = partition(total, workers).unwrap();
            prop_assert_eq!(counts.len(), workers);
            prop_assert_eq!(counts.iter().sum::<u64>(), total);

            let max = *counts.iter().max().unwrap();
            let min = *counts.iter().min().unwrap();
            prop_assert!(max - min <= 1);
            // Non-increasing: the extra samples sit on the lowest indices.
            prop_assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn prop_seeds_distinct(base in any::<u64>(), workers in 1usize..256) {
            let shares = worker_shares(1_000, workers, base).unwrap();
            let seeds: HashSet<u64> = shares.iter().map(|s| s.seed).collect();
            prop_assert_eq!(seeds.len(), workers);
        }
    }
}
