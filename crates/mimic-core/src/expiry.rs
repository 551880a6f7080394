//! On-demand expiration sweep via random sampling.
//!
//! Lazy expiry already guarantees correctness: an expired key is treated as
//! absent and removed on the first access that observes it. This sweep only
//! exists for memory reclamation of keys nobody reads anymore. It samples
//! random keys and evicts the expired ones — no expiry index to maintain,
//! and no timer thread: the embedder decides when (and whether) to call it.

use crate::keyspace::Keyspace;

/// Maximum keys to sample per round.
const SAMPLE_SIZE: usize = 20;

/// If more than this fraction of the sample was expired, go again.
const EXPIRED_THRESHOLD: f64 = 0.25;

/// Maximum rounds per cycle so a sweep stays cheap.
const MAX_ROUNDS: usize = 3;

/// Runs one expiration cycle on the keyspace.
///
/// Samples up to `SAMPLE_SIZE` random keys per round, removes expired ones,
/// and repeats while more than 25% of the sample was expired (up to
/// `MAX_ROUNDS` total). Returns the number of keys removed.
pub fn run_expiration_cycle(ks: &mut Keyspace) -> usize {
    let mut total_removed = 0;

    for _ in 0..MAX_ROUNDS {
        let removed = ks.expire_sample(SAMPLE_SIZE);
        total_removed += removed;

        // a mostly-clean sample means the keyspace is in good shape
        if (removed as f64) < (SAMPLE_SIZE as f64) * EXPIRED_THRESHOLD {
            break;
        }
    }

    total_removed
}
