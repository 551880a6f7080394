//! Sorted set payload: dual-indexed by score and by member.
//!
//! Members are ordered by (score, member) — ties in score break
//! lexicographically on the member name, and every rank and range query
//! honors that ordering.
//!
//! The ordered view is a sorted `Vec<(OrderedFloat<f64>, Arc<str>)>`, which
//! gives O(log n) rank and score-bound lookups via binary search and cheap
//! contiguous iteration for ranges. A `HashMap<Arc<str>, OrderedFloat<f64>>`
//! provides O(1) member → score lookups. Member strings are shared between
//! both indexes through `Arc<str>`, so each name is stored once.

use std::collections::HashMap;
use std::sync::Arc;

use ordered_float::OrderedFloat;

/// A sorted set of unique members, each with an `f64` score.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    /// Score-ordered index, kept sorted by `(score, member)` at all times.
    sorted: Vec<(OrderedFloat<f64>, Arc<str>)>,
    /// Member → score index for O(1) lookups.
    scores: HashMap<Arc<str>, OrderedFloat<f64>>,
}

impl SortedSet {
    /// Creates an empty sorted set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member or updates its score unconditionally.
    ///
    /// Returns `true` only when the member was newly inserted.
    pub fn insert(&mut self, member: &str, score: f64) -> bool {
        let new_score = OrderedFloat(score);

        if let Some(&old_score) = self.scores.get(member) {
            if old_score == new_score {
                return false;
            }
            // reuse the Arc already held by the score index
            let name: Arc<str> = self.scores.get_key_value(member).unwrap().0.clone();
            let old_idx = self.position(old_score, &name).unwrap();
            self.sorted.remove(old_idx);
            self.scores.insert(name.clone(), new_score);
            let new_idx = self.position(new_score, &name).unwrap_err();
            self.sorted.insert(new_idx, (new_score, name));
            false
        } else {
            let name: Arc<str> = Arc::from(member);
            self.scores.insert(name.clone(), new_score);
            let idx = self.position(new_score, &name).unwrap_err();
            self.sorted.insert(idx, (new_score, name));
            true
        }
    }

    /// Removes a member. Returns `true` if it existed.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove_entry(member) {
            Some((name, score)) => {
                let idx = self.position(score, &name).unwrap();
                self.sorted.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Returns the score for a member, or `None` if not present.
    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).map(|s| s.0)
    }

    /// Returns the 0-based ascending rank of a member (lowest score first).
    pub fn rank(&self, member: &str) -> Option<usize> {
        let (name, &score) = self.scores.get_key_value(member)?;
        Some(self.position(score, name).unwrap())
    }

    /// Returns members in the given inclusive rank range, ascending.
    ///
    /// Negative indices count from the end; out-of-range indices clamp.
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<(&str, f64)> {
        let (s, e) = super::normalize_range(start, stop, self.sorted.len() as i64);
        if s > e {
            return Vec::new();
        }
        self.sorted[s as usize..=e as usize]
            .iter()
            .map(|(score, member)| (&**member, score.0))
            .collect()
    }

    /// Iterates over members whose score lies in `[min, max]`, ascending.
    ///
    /// The iterator is double-ended, so descending traversal is a `.rev()`.
    pub fn iter_by_score(
        &self,
        min: f64,
        max: f64,
    ) -> impl DoubleEndedIterator<Item = (&str, f64)> + '_ {
        let (lo, hi) = self.score_bounds(min, max);
        self.sorted[lo..hi]
            .iter()
            .map(|(score, member)| (&**member, score.0))
    }

    /// Counts members whose score lies in `[min, max]`.
    pub fn count_by_score(&self, min: f64, max: f64) -> usize {
        let (lo, hi) = self.score_bounds(min, max);
        hi - lo
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` if the sorted set has no members.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterates over (member, score) pairs in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, f64)> + '_ {
        self.sorted
            .iter()
            .map(|(score, member)| (&**member, score.0))
    }

    /// Finds the position of `(score, name)` in the ordered index.
    ///
    /// `Ok(idx)` if present, `Err(insertion_point)` otherwise. The search key
    /// is `(score, member)` — the set's own ordering.
    fn position(&self, score: OrderedFloat<f64>, name: &Arc<str>) -> Result<usize, usize> {
        self.sorted
            .binary_search_by(|(s, m)| s.cmp(&score).then_with(|| (**m).cmp(&**name)))
    }

    /// Returns the half-open index range of scores in `[min, max]`.
    fn score_bounds(&self, min: f64, max: f64) -> (usize, usize) {
        let lo = self.sorted.partition_point(|(s, _)| s.0 < min);
        let hi = self.sorted.partition_point(|(s, _)| s.0 <= max);
        if hi < lo {
            (lo, lo)
        } else {
            (lo, hi)
        }
    }
}
