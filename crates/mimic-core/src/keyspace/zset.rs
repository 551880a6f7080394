use super::*;
use crate::coerce::Textual;
use crate::types::sorted_set::SortedSet;

impl Keyspace {
    /// Adds a member with a score, or updates its score unconditionally.
    ///
    /// Creates the sorted set if the key doesn't exist. Returns `true` only
    /// when the member was newly inserted; an update of an existing member's
    /// score returns `false`.
    pub fn zadd(&mut self, key: &str, member: impl Textual, score: f64) -> Result<bool, WrongType> {
        self.remove_if_expired(key);
        let ss = self.zset_payload(key)?;
        Ok(ss.insert(&member.render(), score))
    }

    /// Adds `delta` to a member's score, treating a missing member as 0.
    ///
    /// Returns the member's new score.
    pub fn zincrby(
        &mut self,
        key: &str,
        member: impl Textual,
        delta: f64,
    ) -> Result<f64, WrongType> {
        self.remove_if_expired(key);
        let member = member.render();
        let ss = self.zset_payload(key)?;
        let new_score = ss.score(&member).unwrap_or(0.0) + delta;
        ss.insert(&member, new_score);
        Ok(new_score)
    }

    /// Removes members from a sorted set. Returns the number removed.
    ///
    /// Deletes the key entirely when the last member is removed.
    pub fn zrem<I>(&mut self, key: &str, members: I) -> Result<usize, WrongType>
    where
        I: IntoIterator,
        I::Item: Textual,
    {
        if self.remove_if_expired(key) {
            return Ok(0);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        let Value::SortedSet(ss) = &mut entry.value else {
            return Err(WrongType);
        };

        let mut removed = 0;
        for member in members {
            if ss.remove(&member.render()) {
                removed += 1;
            }
        }
        let is_empty = ss.is_empty();
        self.drop_if_empty(key, is_empty);
        Ok(removed)
    }

    /// Returns the score for a member. `None` if the key or member is absent.
    pub fn zscore(&mut self, key: &str, member: impl Textual) -> Result<Option<f64>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(None);
        }
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::SortedSet(ss) => Ok(ss.score(&member.render())),
                _ => Err(WrongType),
            },
        }
    }

    /// Returns the number of members, 0 for a missing key.
    pub fn zcard(&mut self, key: &str) -> Result<usize, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(0);
        }
        match self.entries.get(key) {
            None => Ok(0),
            Some(entry) => match &entry.value {
                Value::SortedSet(ss) => Ok(ss.len()),
                _ => Err(WrongType),
            },
        }
    }

    /// Returns the 0-based ascending rank of a member (lowest score = 0).
    pub fn zrank(&mut self, key: &str, member: impl Textual) -> Result<Option<usize>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(None);
        }
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::SortedSet(ss) => Ok(ss.rank(&member.render())),
                _ => Err(WrongType),
            },
        }
    }

    /// Returns the 0-based descending rank (highest score = 0).
    pub fn zrevrank(
        &mut self,
        key: &str,
        member: impl Textual,
    ) -> Result<Option<usize>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(None);
        }
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::SortedSet(ss) => Ok(ss.rank(&member.render()).map(|r| ss.len() - 1 - r)),
                _ => Err(WrongType),
            },
        }
    }

    /// Gets the sorted-set payload for `key`, creating an empty one if the
    /// key is absent. Caller must have applied lazy expiry already.
    fn zset_payload(&mut self, key: &str) -> Result<&mut SortedSet, WrongType> {
        let is_new = self.ensure_collection_type(key, |v| matches!(v, Value::SortedSet(_)))?;
        if is_new {
            self.insert_empty(key, Value::SortedSet(Box::default()));
        }
        match self.entries.get_mut(key) {
            Some(Entry {
                value: Value::SortedSet(ss),
                ..
            }) => Ok(ss),
            _ => unreachable!("type verified by ensure_collection_type"),
        }
    }
}
