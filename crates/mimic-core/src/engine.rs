//! The engine facade: shared-state wrapper plus calling-convention adapter.
//!
//! The keyspace itself is a plain `&mut self` structure. `Engine` wraps it
//! in a single `Mutex` so that, embedded in a multi-threaded host, every
//! command — including read-modify-write sequences like increments, moves,
//! and range-then-delete — runs as one critical section.
//!
//! The facade is also where caller conventions are normalized. The one
//! convention that genuinely differs between client styles is the argument
//! order of add-with-score: relaxed callers send `member, score` pairs,
//! strict callers send `score, member`. That difference is a configuration
//! flag here, never a branch inside the core.

use std::sync::{Arc, Mutex, PoisonError};

use crate::coerce::Textual;
use crate::error::ZAddError;
use crate::keyspace::Keyspace;

/// Configuration for the engine facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Selects the strict argument-order convention (`score, member`) for
    /// bulk [`Engine::zadd`]. Relaxed (`member, score`) is the default.
    pub strict: bool,
}

/// A shareable handle to one keyspace.
///
/// `Clone` is cheap — clones share the same underlying store. There is no
/// ambient global instance: tests construct one engine per case and drop it.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    inner: Arc<Mutex<Keyspace>>,
    strict: bool,
}

impl Engine {
    /// Creates an engine with an empty keyspace and the relaxed convention.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Keyspace::new())),
            strict: config.strict,
        }
    }

    /// Returns `true` if this engine uses the strict zadd convention.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Runs `f` against the keyspace under the engine lock.
    ///
    /// The closure is one critical section: no other command interleaves
    /// with it. Keep closures short — they block every other handle.
    pub fn with<T>(&self, f: impl FnOnce(&mut Keyspace) -> T) -> T {
        let mut ks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut ks)
    }

    /// Bulk add-with-score with convention-dependent argument order.
    ///
    /// `args` is a flat pair list: `member, score, member, score, …` in
    /// relaxed mode, `score, member, score, member, …` in strict mode. The
    /// whole list is validated and parsed before any write, so a malformed
    /// tail never leaves a partial update. Returns the number of members
    /// newly inserted.
    pub fn zadd<T: Textual>(&self, key: &str, args: &[T]) -> Result<usize, ZAddError> {
        let pairs = parse_score_pairs(args, self.strict)?;
        self.with(|ks| {
            let mut added = 0;
            for (score, member) in &pairs {
                if ks.zadd(key, member.as_str(), *score)? {
                    added += 1;
                }
            }
            Ok(added)
        })
    }

    /// Clears the entire keyspace. The only whole-store reset primitive.
    pub fn flushdb(&self) {
        self.with(|ks| ks.flush());
    }
}

/// Splits a flat argument list into `(score, member)` pairs.
fn parse_score_pairs<T: Textual>(
    args: &[T],
    strict: bool,
) -> Result<Vec<(f64, String)>, ZAddError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(ZAddError::UnbalancedPairs);
    }
    let mut pairs = Vec::with_capacity(args.len() / 2);
    for pair in args.chunks(2) {
        let (score_arg, member_arg) = if strict {
            (&pair[0], &pair[1])
        } else {
            (&pair[1], &pair[0])
        };
        pairs.push((parse_score(&score_arg.render())?, member_arg.render()));
    }
    Ok(pairs)
}

/// Parses a score argument, accepting the `inf` / `-inf` sentinels.
fn parse_score(text: &str) -> Result<f64, ZAddError> {
    let score: f64 = text.trim().parse().map_err(|_| ZAddError::NotAFloat)?;
    if score.is_nan() {
        return Err(ZAddError::NotAFloat);
    }
    Ok(score)
}
