//! The keyspace: the engine's top-level key → typed-value mapping.
//!
//! A `Keyspace` owns a flat `AHashMap<Box<str>, Entry>` and handles key
//! creation, deletion, existence checks, and TTL management. Expired keys
//! are removed lazily on access: every read, write, and existence check
//! re-evaluates expiry against the current instant before touching the
//! entry. Typed command families live in the sibling modules and share the
//! helpers defined here.

use std::collections::HashSet;
use std::time::Duration;

use ahash::AHashMap;
use rand::seq::IteratorRandom;
use tracing::warn;

use crate::error::WrongType;
use crate::time;
use crate::types::{self, Value};

mod hash;
mod list;
mod set;
mod set_algebra;
mod string;
mod zrange;
mod zset;

pub use zrange::Aggregate;

/// A single entry in the keyspace: a typed value plus expiry bookkeeping.
///
/// The expiry instant is monotonic milliseconds, `0` meaning "no expiry".
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) value: Value,
    pub(crate) expires_at_ms: u64,
}

impl Entry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at_ms: time::expiry_from_duration(ttl),
        }
    }

    /// Returns `true` if this entry has passed its expiration time.
    fn is_expired(&self) -> bool {
        time::is_expired(self.expires_at_ms)
    }
}

/// The in-memory key-value store.
///
/// All operations take `&mut self` and run synchronously to completion; a
/// multi-threaded embedder wraps the keyspace in the [`crate::engine::Engine`]
/// facade, which makes each command one critical section.
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: AHashMap<Box<str>, Entry>,
}

impl Keyspace {
    /// Creates a new, empty keyspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a key. Returns `true` if the key existed (and wasn't expired).
    pub fn del(&mut self, key: &str) -> bool {
        if self.remove_if_expired(key) {
            return false;
        }
        self.entries.remove(key).is_some()
    }

    /// Returns `true` if the key exists and hasn't expired.
    pub fn exists(&mut self, key: &str) -> bool {
        if self.remove_if_expired(key) {
            return false;
        }
        self.entries.contains_key(key)
    }

    /// Sets an expiration on an existing key, in seconds from now.
    ///
    /// Returns `true` if the key exists and the TTL was set, `false` if the
    /// key doesn't exist.
    pub fn expire(&mut self, key: &str, seconds: u64) -> bool {
        self.pexpire(key, seconds.saturating_mul(1000))
    }

    /// Sets an expiration on an existing key, in milliseconds from now.
    pub fn pexpire(&mut self, key: &str, millis: u64) -> bool {
        if self.remove_if_expired(key) {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at_ms = time::now_ms().saturating_add(millis);
                true
            }
            None => false,
        }
    }

    /// Returns the remaining TTL for a key in whole seconds.
    ///
    /// Returns `-1` both when the key has no expiry and when the key doesn't
    /// exist — the two cases are observably identical to callers.
    pub fn ttl(&mut self, key: &str) -> i64 {
        if self.remove_if_expired(key) {
            return -1;
        }
        match self.entries.get(key) {
            Some(entry) => match time::remaining_secs(entry.expires_at_ms) {
                Some(secs) => secs.min(i64::MAX as u64) as i64,
                None => -1,
            },
            None => -1,
        }
    }

    /// Returns the type name of the value at `key`, or `"none"` if missing.
    pub fn value_type(&mut self, key: &str) -> &'static str {
        if self.remove_if_expired(key) {
            return "none";
        }
        match self.entries.get(key) {
            Some(entry) => types::type_name(&entry.value),
            None => "none",
        }
    }

    /// Returns all live keys matching a glob pattern.
    ///
    /// Warning: O(n) scan of the entire keyspace.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let len = self.entries.len();
        if len > 10_000 {
            warn!(key_count = len, "glob scan over a large keyspace");
        }
        let compiled = GlobPattern::new(pattern);
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .filter(|(key, _)| compiled.matches(key))
            .map(|(key, _)| String::from(&**key))
            .collect()
    }

    /// Removes every key. The only whole-store reset primitive.
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of keys, including not-yet-collected expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the keyspace has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Randomly samples up to `count` keys and removes any that have expired.
    ///
    /// Returns the number of keys removed. Used by the reclamation sweep in
    /// [`crate::expiry`] to clean up keys no one is reading.
    pub fn expire_sample(&mut self, count: usize) -> usize {
        if self.entries.is_empty() {
            return 0;
        }

        let mut rng = rand::rng();
        let sampled: Vec<String> = self
            .entries
            .keys()
            .choose_multiple(&mut rng, count)
            .into_iter()
            .map(|k| String::from(&**k))
            .collect();

        let mut removed = 0;
        for key in &sampled {
            if self.remove_if_expired(key) {
                removed += 1;
            }
        }
        removed
    }

    /// Checks if a key is expired and removes it if so. Returns `true` if
    /// the key was removed.
    pub(crate) fn remove_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .entries
            .get(key)
            .map(|e| e.is_expired())
            .unwrap_or(false);
        if expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Checks whether a key either doesn't exist or holds the expected
    /// collection type. Returns `Ok(true)` if the key is absent (the caller
    /// should create it), `Ok(false)` if it exists with the right type.
    fn ensure_collection_type(
        &self,
        key: &str,
        type_check: fn(&Value) -> bool,
    ) -> Result<bool, WrongType> {
        match self.entries.get(key) {
            None => Ok(true),
            Some(e) if type_check(&e.value) => Ok(false),
            Some(_) => Err(WrongType),
        }
    }

    /// Inserts a fresh key with an empty collection payload and no expiry.
    ///
    /// Any expiry a previous incarnation of the key carried is gone: the key
    /// is being (re)created.
    fn insert_empty(&mut self, key: &str, value: Value) {
        self.entries.insert(Box::from(key), Entry::new(value, None));
    }

    /// Drops the key when a removal left its aggregate payload empty.
    ///
    /// Empty aggregates are never kept: a set, hash, list, or sorted set
    /// whose last element is removed disappears entirely.
    fn drop_if_empty(&mut self, key: &str, is_empty: bool) {
        if is_empty {
            self.entries.remove(key);
        }
    }

    /// Reads a key as a set for the multi-key algebra commands.
    ///
    /// `None` means the key is absent (contributes the empty set).
    fn read_set(&self, key: &str) -> Result<Option<&HashSet<String>>, WrongType> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(Some(set)),
                _ => Err(WrongType),
            },
        }
    }
}

/// Glob-style pattern matching for `keys`.
///
/// Supports `*` (any sequence), `?` (one character), `[abc]` (one of a set),
/// and `[^abc]` / `[!abc]` (one not in a set). Iterative two-pointer
/// matching with backtracking to the most recent `*`, O(n*m) worst case.
pub(crate) struct GlobPattern {
    chars: Vec<char>,
}

impl GlobPattern {
    pub(crate) fn new(pattern: &str) -> Self {
        Self {
            chars: pattern.chars().collect(),
        }
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        let pat = &self.chars;
        let txt: Vec<char> = text.chars().collect();

        let mut pi = 0;
        let mut ti = 0;
        // backtracking state for the most recent '*'
        let mut star_pi: Option<usize> = None;
        let mut star_ti = 0;

        while ti < txt.len() || pi < pat.len() {
            if pi < pat.len() {
                match pat[pi] {
                    '*' => {
                        star_pi = Some(pi);
                        star_ti = ti;
                        pi += 1;
                        continue;
                    }
                    '?' if ti < txt.len() => {
                        pi += 1;
                        ti += 1;
                        continue;
                    }
                    '[' if ti < txt.len() => {
                        if let Some(next_pi) = match_class(pat, pi, txt[ti]) {
                            pi = next_pi;
                            ti += 1;
                            continue;
                        }
                        // class didn't match — fall through to backtrack
                    }
                    c if ti < txt.len() && c == txt[ti] => {
                        pi += 1;
                        ti += 1;
                        continue;
                    }
                    _ => {}
                }
            }

            // mismatch or pattern exhausted — retry from the last '*'
            match star_pi {
                Some(sp) => {
                    pi = sp + 1;
                    star_ti += 1;
                    ti = star_ti;
                    if ti > txt.len() {
                        return false;
                    }
                }
                None => return false,
            }
        }

        // trailing '*'s match the empty tail
        while pi < pat.len() && pat[pi] == '*' {
            pi += 1;
        }
        pi == pat.len()
    }
}

/// Matches one character against the class starting at `pat[open]` (a `[`).
///
/// Returns the pattern index just past the closing `]` on a match.
fn match_class(pat: &[char], open: usize, ch: char) -> Option<usize> {
    let mut j = open + 1;
    let mut negated = false;
    if j < pat.len() && (pat[j] == '^' || pat[j] == '!') {
        negated = true;
        j += 1;
    }

    let mut matched = false;
    while j < pat.len() && pat[j] != ']' {
        if pat[j] == ch {
            matched = true;
        }
        j += 1;
    }
    // unterminated class never matches
    if j >= pat.len() {
        return None;
    }

    if matched != negated {
        Some(j + 1)
    } else {
        None
    }
}

/// Convenience wrapper for one-off matches.
#[cfg(test)]
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    GlobPattern::new(pattern).matches(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn del_existing() {
        let mut ks = Keyspace::new();
        ks.set("key", "val");
        assert!(ks.del("key"));
        assert_eq!(ks.get("key").unwrap(), None);
    }

    #[test]
    fn del_missing() {
        let mut ks = Keyspace::new();
        assert!(!ks.del("nope"));
    }

    #[test]
    fn exists_present_and_absent() {
        let mut ks = Keyspace::new();
        ks.set("yes", "here");
        assert!(ks.exists("yes"));
        assert!(!ks.exists("no"));
    }

    #[test]
    fn ttl_without_expiry_is_minus_one() {
        let mut ks = Keyspace::new();
        ks.set("key", "val");
        assert_eq!(ks.ttl("key"), -1);
    }

    #[test]
    fn ttl_missing_key_is_minus_one() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.ttl("missing"), -1);
    }

    #[test]
    fn expire_then_ttl() {
        let mut ks = Keyspace::new();
        ks.set("key", "val");
        assert!(ks.expire("key", 30));
        let ttl = ks.ttl("key");
        assert!((0..=30).contains(&ttl));
    }

    #[test]
    fn expire_missing_key() {
        let mut ks = Keyspace::new();
        assert!(!ks.expire("nope", 60));
    }

    #[test]
    fn expired_key_behaves_as_absent() {
        let mut ks = Keyspace::new();
        ks.set("temp", "gone");
        assert!(ks.pexpire("temp", 5));
        std::thread::sleep(Duration::from_millis(20));

        assert!(!ks.exists("temp"));
        assert_eq!(ks.ttl("temp"), -1);
        assert!(!ks.del("temp"));
    }

    #[test]
    fn lazy_expiry_physically_removes() {
        let mut ks = Keyspace::new();
        ks.set("temp", "gone");
        ks.pexpire("temp", 5);
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(ks.len(), 1);
        let _ = ks.get("temp");
        assert_eq!(ks.len(), 0);
    }

    #[test]
    fn overwrite_discards_ttl() {
        let mut ks = Keyspace::new();
        ks.set("key", "v1");
        ks.expire("key", 100);
        ks.set("key", "v2");
        assert_eq!(ks.ttl("key"), -1);
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let mut ks = Keyspace::new();
        ks.set("key", "val");
        ks.expire("key", 0);
        assert!(!ks.exists("key"));
    }

    #[test]
    fn value_type_per_kind() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.value_type("missing"), "none");

        ks.set("s", "val");
        assert_eq!(ks.value_type("s"), "string");

        ks.rpush("l", ["item"]).unwrap();
        assert_eq!(ks.value_type("l"), "list");

        ks.hset("h", "f", "v").unwrap();
        assert_eq!(ks.value_type("h"), "hash");

        ks.sadd("set", ["m"]).unwrap();
        assert_eq!(ks.value_type("set"), "set");

        ks.zadd("z", "m", 1.0).unwrap();
        assert_eq!(ks.value_type("z"), "zset");
    }

    #[test]
    fn flush_removes_everything() {
        let mut ks = Keyspace::new();
        ks.set("a", "1");
        ks.sadd("s", ["m"]).unwrap();
        ks.expire("a", 100);

        ks.flush();

        assert!(ks.is_empty());
        assert!(!ks.exists("a"));
        assert!(!ks.exists("s"));
    }

    #[test]
    fn keys_match_all() {
        let mut ks = Keyspace::new();
        ks.set("a", "1");
        ks.set("b", "2");
        ks.set("c", "3");
        let mut result = ks.keys("*");
        result.sort();
        assert_eq!(result, vec!["a", "b", "c"]);
    }

    #[test]
    fn keys_with_pattern() {
        let mut ks = Keyspace::new();
        ks.set("user:1", "a");
        ks.set("user:2", "b");
        ks.set("item:1", "c");
        let mut result = ks.keys("user:*");
        result.sort();
        assert_eq!(result, vec!["user:1", "user:2"]);
    }

    #[test]
    fn keys_skips_expired() {
        let mut ks = Keyspace::new();
        ks.set("live", "a");
        ks.set("dead", "b");
        ks.pexpire("dead", 1);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(ks.keys("*"), vec!["live"]);
    }

    #[test]
    fn keys_empty_keyspace() {
        let ks = Keyspace::new();
        assert!(ks.keys("*").is_empty());
    }

    #[test]
    fn expire_sample_removes_expired() {
        let mut ks = Keyspace::new();
        for i in 0..10 {
            ks.set(&format!("temp:{i}"), "gone");
            ks.pexpire(&format!("temp:{i}"), 1);
        }
        for i in 0..5 {
            ks.set(&format!("keep:{i}"), "stay");
        }
        std::thread::sleep(Duration::from_millis(10));

        let removed = ks.expire_sample(100);
        assert_eq!(removed, 10);
        assert_eq!(ks.len(), 5);
    }

    #[test]
    fn glob_star() {
        assert!(glob_match("user:*", "user:123"));
        assert!(glob_match("user:*", "user:"));
        assert!(glob_match("*:data", "foo:data"));
        assert!(!glob_match("user:*", "item:123"));
    }

    #[test]
    fn glob_question() {
        assert!(glob_match("key?", "key1"));
        assert!(!glob_match("key?", "key"));
        assert!(!glob_match("key?", "key12"));
    }

    #[test]
    fn glob_classes() {
        assert!(glob_match("key[abc]", "keya"));
        assert!(!glob_match("key[abc]", "keyd"));
        assert!(glob_match("key[^abc]", "keyd"));
        assert!(!glob_match("key[!abc]", "keya"));
    }

    #[test]
    fn glob_literal() {
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactnot"));
        assert!(!glob_match("exact", "notexact"));
    }

    #[test]
    fn glob_unterminated_class() {
        assert!(!glob_match("key[abc", "keya"));
    }
}
