//! Compact monotonic time utilities for expiry bookkeeping.
//!
//! Expiry instants are stored as `u64` milliseconds on a process-local
//! monotonic clock, with `0` meaning "no expiry". This keeps every entry's
//! expiry to 8 bytes instead of an `Option<Instant>`.

use std::sync::OnceLock;
use std::time::Instant;

/// Returns current monotonic time in milliseconds since process start.
#[inline]
pub fn now_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_millis() as u64
}

/// Sentinel value meaning "no expiry".
pub const NO_EXPIRY: u64 = 0;

/// Returns true if the given expiry timestamp has passed.
#[inline]
pub fn is_expired(expires_at_ms: u64) -> bool {
    expires_at_ms != NO_EXPIRY && now_ms() >= expires_at_ms
}

/// Converts an optional time-to-live into an absolute expiry timestamp.
#[inline]
pub fn expiry_from_duration(ttl: Option<std::time::Duration>) -> u64 {
    ttl.map(|d| now_ms() + d.as_millis() as u64)
        .unwrap_or(NO_EXPIRY)
}

/// Returns remaining TTL in seconds, or None if no expiry is set.
#[inline]
pub fn remaining_secs(expires_at_ms: u64) -> Option<u64> {
    if expires_at_ms == NO_EXPIRY {
        None
    } else {
        Some(expires_at_ms.saturating_sub(now_ms()) / 1000)
    }
}

/// Returns remaining TTL in milliseconds, or None if no expiry is set.
#[inline]
pub fn remaining_ms(expires_at_ms: u64) -> Option<u64> {
    if expires_at_ms == NO_EXPIRY {
        None
    } else {
        Some(expires_at_ms.saturating_sub(now_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn no_expiry_never_expires() {
        assert!(!is_expired(NO_EXPIRY));
    }

    #[test]
    fn future_timestamp_not_expired() {
        let at = now_ms() + 60_000;
        assert!(!is_expired(at));
        assert!(remaining_secs(at).unwrap() >= 59);
    }

    #[test]
    fn past_timestamp_is_expired() {
        // now_ms() starts near zero, so wait until it is nonzero
        while now_ms() == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(is_expired(1));
    }

    #[test]
    fn duration_round_trip() {
        let at = expiry_from_duration(Some(Duration::from_secs(30)));
        let secs = remaining_secs(at).unwrap();
        assert!((29..=30).contains(&secs));
        assert_eq!(expiry_from_duration(None), NO_EXPIRY);
        assert_eq!(remaining_secs(NO_EXPIRY), None);
        assert_eq!(remaining_ms(NO_EXPIRY), None);
    }
}
