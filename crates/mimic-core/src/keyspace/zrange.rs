use std::collections::HashMap;

use super::*;
use crate::types::normalize_range;
use crate::types::sorted_set::SortedSet;

/// How scores combine when a member appears in several source sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Aggregate {
    /// Sum the contributing scores.
    #[default]
    Sum,
    /// Keep the lowest contributing score.
    Min,
    /// Keep the highest contributing score.
    Max,
}

impl Aggregate {
    fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            Aggregate::Sum => a + b,
            Aggregate::Min => a.min(b),
            Aggregate::Max => a.max(b),
        }
    }
}

impl Keyspace {
    /// Returns members by rank, inclusive on both ends.
    ///
    /// Negative indices count from the end and out-of-range indices clamp.
    /// With `rev`, indices address the descending ordering: index 0 is the
    /// highest-ranked member, and the output comes back descending.
    pub fn zrange(
        &mut self,
        key: &str,
        start: i64,
        stop: i64,
        rev: bool,
    ) -> Result<Vec<(String, f64)>, WrongType> {
        self.with_zset(key, Vec::new(), |ss| {
            let items = if rev {
                let len = ss.len() as i64;
                let (s, e) = normalize_range(start, stop, len);
                if s > e {
                    Vec::new()
                } else {
                    // descending index i addresses ascending index len-1-i
                    let mut items = ss.range_by_rank(len - 1 - e, len - 1 - s);
                    items.reverse();
                    items
                }
            } else {
                ss.range_by_rank(start, stop)
            };
            items
                .into_iter()
                .map(|(member, score)| (member.to_owned(), score))
                .collect()
        })
    }

    /// Returns members with scores in `[min, max]`, ascending, after
    /// skipping `offset` matches and keeping at most `count`.
    ///
    /// `min > max` yields an empty result, never an error. Infinite bounds
    /// select everything on that side.
    pub fn zrange_by_score(
        &mut self,
        key: &str,
        min: f64,
        max: f64,
        offset: usize,
        count: Option<usize>,
    ) -> Result<Vec<(String, f64)>, WrongType> {
        self.with_zset(key, Vec::new(), |ss| {
            ss.iter_by_score(min, max)
                .skip(offset)
                .take(count.unwrap_or(usize::MAX))
                .map(|(member, score)| (member.to_owned(), score))
                .collect()
        })
    }

    /// Returns members with scores in `[min, max]`, descending, with the
    /// same offset/limit pagination as `zrange_by_score`.
    ///
    /// The bounds arrive highest-first, mirroring the command convention.
    pub fn zrevrange_by_score(
        &mut self,
        key: &str,
        max: f64,
        min: f64,
        offset: usize,
        count: Option<usize>,
    ) -> Result<Vec<(String, f64)>, WrongType> {
        self.with_zset(key, Vec::new(), |ss| {
            ss.iter_by_score(min, max)
                .rev()
                .skip(offset)
                .take(count.unwrap_or(usize::MAX))
                .map(|(member, score)| (member.to_owned(), score))
                .collect()
        })
    }

    /// Counts members with scores in `[min, max]`, independent of any
    /// pagination.
    pub fn zcount(&mut self, key: &str, min: f64, max: f64) -> Result<usize, WrongType> {
        self.with_zset(key, 0, |ss| ss.count_by_score(min, max))
    }

    /// Removes members by rank range. Returns the number removed.
    ///
    /// Deletes the key entirely when the set empties.
    pub fn zremrangebyrank(
        &mut self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<usize, WrongType> {
        self.zrem_collected(key, |ss| {
            ss.range_by_rank(start, stop)
                .into_iter()
                .map(|(member, _)| member.to_owned())
                .collect()
        })
    }

    /// Removes members by score range. Returns the number removed.
    pub fn zremrangebyscore(&mut self, key: &str, min: f64, max: f64) -> Result<usize, WrongType> {
        self.zrem_collected(key, |ss| {
            ss.iter_by_score(min, max)
                .map(|(member, _)| member.to_owned())
                .collect()
        })
    }

    /// Union-style aggregate store: every member of any source lands in
    /// `dest` with its scores combined by `aggregate`.
    ///
    /// A source missing a member contributes nothing (not zero). Returns
    /// the destination's cardinality. Zero source keys returns 0 and leaves
    /// `dest` untouched; an empty result deletes `dest`.
    pub fn zunionstore(
        &mut self,
        dest: &str,
        keys: &[&str],
        aggregate: Aggregate,
    ) -> Result<usize, WrongType> {
        if keys.is_empty() {
            return Ok(0);
        }
        let combined = self.combine_scores(keys, false, aggregate)?;
        Ok(self.store_zset(dest, combined))
    }

    /// Intersection-style aggregate store: only members present in every
    /// source land in `dest`, scores combined by `aggregate`.
    pub fn zinterstore(
        &mut self,
        dest: &str,
        keys: &[&str],
        aggregate: Aggregate,
    ) -> Result<usize, WrongType> {
        if keys.is_empty() {
            return Ok(0);
        }
        let combined = self.combine_scores(keys, true, aggregate)?;
        Ok(self.store_zset(dest, combined))
    }

    /// Read path shared by the range queries: lazy expiry, then either the
    /// empty result for a missing key or `f` applied to the sorted set.
    fn with_zset<T>(
        &mut self,
        key: &str,
        empty: T,
        f: impl FnOnce(&SortedSet) -> T,
    ) -> Result<T, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(empty);
        }
        match self.entries.get(key) {
            None => Ok(empty),
            Some(entry) => match &entry.value {
                Value::SortedSet(ss) => Ok(f(ss)),
                _ => Err(WrongType),
            },
        }
    }

    /// Destructive-range helper: collects victim members with `select`,
    /// removes them, and drops the key if it empties.
    fn zrem_collected(
        &mut self,
        key: &str,
        select: impl FnOnce(&SortedSet) -> Vec<String>,
    ) -> Result<usize, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(0);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        let Value::SortedSet(ss) = &mut entry.value else {
            return Err(WrongType);
        };

        let victims = select(ss);
        for member in &victims {
            ss.remove(member);
        }
        let is_empty = ss.is_empty();
        self.drop_if_empty(key, is_empty);
        Ok(victims.len())
    }

    /// Computes the combined member → score mapping across `keys`.
    ///
    /// The whole result is produced before any write, so a type error on a
    /// later source never leaves a destination partially overwritten.
    fn combine_scores(
        &mut self,
        keys: &[&str],
        intersect: bool,
        aggregate: Aggregate,
    ) -> Result<HashMap<String, f64>, WrongType> {
        for key in keys {
            self.remove_if_expired(key);
        }

        let mut sources: Vec<Option<&SortedSet>> = Vec::with_capacity(keys.len());
        for key in keys {
            match self.entries.get(*key) {
                None => sources.push(None),
                Some(entry) => match &entry.value {
                    Value::SortedSet(ss) => sources.push(Some(ss)),
                    _ => return Err(WrongType),
                },
            }
        }

        let mut combined: HashMap<String, f64> = HashMap::new();
        if intersect {
            // a missing source key has no members, so the intersection is empty
            if sources.iter().any(Option::is_none) {
                return Ok(combined);
            }
            let (first, rest) = sources.split_first().unwrap();
            let first = first.as_ref().unwrap();
            'members: for (member, score) in first.iter() {
                let mut acc = score;
                for source in rest {
                    match source.as_ref().unwrap().score(member) {
                        Some(other) => acc = aggregate.combine(acc, other),
                        None => continue 'members,
                    }
                }
                combined.insert(member.to_owned(), acc);
            }
        } else {
            for source in sources.into_iter().flatten() {
                for (member, score) in source.iter() {
                    match combined.get_mut(member) {
                        Some(acc) => *acc = aggregate.combine(*acc, score),
                        None => {
                            combined.insert(member.to_owned(), score);
                        }
                    }
                }
            }
        }
        Ok(combined)
    }

    /// Writes a combined score mapping into `dest`, deleting it when empty.
    fn store_zset(&mut self, dest: &str, combined: HashMap<String, f64>) -> usize {
        let size = combined.len();
        if combined.is_empty() {
            self.entries.remove(dest);
        } else {
            let mut ss = SortedSet::new();
            for (member, score) in combined {
                ss.insert(&member, score);
            }
            self.entries.insert(
                Box::from(dest),
                Entry::new(Value::SortedSet(Box::new(ss)), None),
            );
        }
        size
    }
}
