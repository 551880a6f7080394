use rand::seq::IteratorRandom;

use super::*;
use crate::coerce::Textual;

impl Keyspace {
    /// Adds members to a set, creating it if the key doesn't exist.
    ///
    /// Returns the number of members newly inserted — duplicates among the
    /// arguments and already-present members don't count.
    pub fn sadd<I>(&mut self, key: &str, members: I) -> Result<usize, WrongType>
    where
        I: IntoIterator,
        I::Item: Textual,
    {
        let members: Vec<String> = members.into_iter().map(|m| m.render()).collect();
        if members.is_empty() {
            return Ok(0);
        }

        self.remove_if_expired(key);
        let set = self.set_payload(key)?;
        let mut added = 0;
        for member in members {
            if set.insert(member) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Removes members from a set. Returns the number actually removed.
    ///
    /// Deletes the key entirely when the last member is removed.
    pub fn srem<I>(&mut self, key: &str, members: I) -> Result<usize, WrongType>
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
        let Value::Set(set) = &mut entry.value else {
            return Err(WrongType);
        };

        let mut removed = 0;
        for member in members {
            if set.remove(&member.render()) {
                removed += 1;
            }
        }
        let is_empty = set.is_empty();
        self.drop_if_empty(key, is_empty);
        Ok(removed)
    }

    /// Returns all members of a set. Empty for a missing key.
    pub fn smembers(&mut self, key: &str) -> Result<HashSet<String>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(HashSet::new());
        }
        match self.entries.get(key) {
            None => Ok(HashSet::new()),
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok((**set).clone()),
                _ => Err(WrongType),
            },
        }
    }

    /// Checks if a member exists in a set.
    pub fn sismember(&mut self, key: &str, member: impl Textual) -> Result<bool, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(false);
        }
        match self.entries.get(key) {
            None => Ok(false),
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.contains(&member.render())),
                _ => Err(WrongType),
            },
        }
    }

    /// Returns the cardinality of a set, 0 for a missing key.
    pub fn scard(&mut self, key: &str) -> Result<usize, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(0);
        }
        match self.entries.get(key) {
            None => Ok(0),
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.len()),
                _ => Err(WrongType),
            },
        }
    }

    /// Moves a member from one set to another.
    ///
    /// Returns `true` iff the member was present in `src`, in which case it
    /// is removed from `src` and added to `dst` in one step. Moving a member
    /// that `dst` already holds still succeeds without double-counting.
    /// An absent member leaves both sets unchanged.
    pub fn smove(
        &mut self,
        src: &str,
        dst: &str,
        member: impl Textual,
    ) -> Result<bool, WrongType> {
        self.remove_if_expired(src);
        self.remove_if_expired(dst);

        // verify both sides before mutating either
        let member = member.render();
        let src_has = match self.entries.get(src) {
            None => false,
            Some(entry) => match &entry.value {
                Value::Set(set) => set.contains(&member),
                _ => return Err(WrongType),
            },
        };
        self.ensure_collection_type(dst, |v| matches!(v, Value::Set(_)))?;
        if !src_has {
            return Ok(false);
        }

        let Some(entry) = self.entries.get_mut(src) else {
            unreachable!("source checked above");
        };
        let Value::Set(set) = &mut entry.value else {
            unreachable!("source checked above");
        };
        set.remove(&member);
        let src_empty = set.is_empty();
        self.drop_if_empty(src, src_empty);

        let dst_set = self.set_payload(dst)?;
        dst_set.insert(member);
        Ok(true)
    }

    /// Removes and returns one arbitrary member, or `None` if the set is
    /// missing or empty.
    pub fn spop(&mut self, key: &str) -> Result<Option<String>, WrongType> {
        Ok(self.spop_count(key, 1)?.into_iter().next())
    }

    /// Removes and returns up to `count` distinct members.
    pub fn spop_count(&mut self, key: &str, count: usize) -> Result<Vec<String>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(vec![]);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(vec![]);
        };
        let Value::Set(set) = &mut entry.value else {
            return Err(WrongType);
        };

        let mut rng = rand::rng();
        let picked: Vec<String> = set.iter().choose_multiple(&mut rng, count).into_iter().cloned().collect();
        for member in &picked {
            set.remove(member);
        }
        let is_empty = set.is_empty();
        self.drop_if_empty(key, is_empty);
        Ok(picked)
    }

    /// Returns one arbitrary member without removing it.
    pub fn srandmember(&mut self, key: &str) -> Result<Option<String>, WrongType> {
        Ok(self.srandmember_count(key, 1)?.into_iter().next())
    }

    /// Returns random members without removing them.
    ///
    /// A non-negative `count` selects up to that many distinct members. A
    /// negative `count` returns exactly `|count|` samples with repetition
    /// allowed.
    pub fn srandmember_count(&mut self, key: &str, count: i64) -> Result<Vec<String>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(vec![]);
        }
        let Some(entry) = self.entries.get(key) else {
            return Ok(vec![]);
        };
        let Value::Set(set) = &entry.value else {
            return Err(WrongType);
        };
        if set.is_empty() {
            return Ok(vec![]);
        }

        let mut rng = rand::rng();
        if count >= 0 {
            Ok(set
                .iter()
                .choose_multiple(&mut rng, count as usize)
                .into_iter()
                .cloned()
                .collect())
        } else {
            // sample with replacement: each draw is independent
            let wanted = count.unsigned_abs() as usize;
            let mut picked = Vec::with_capacity(wanted);
            for _ in 0..wanted {
                if let Some(member) = set.iter().choose(&mut rng) {
                    picked.push(member.clone());
                }
            }
            Ok(picked)
        }
    }

    /// Gets the set payload for `key`, creating an empty one if the key is
    /// absent. Caller must have applied lazy expiry already.
    fn set_payload(&mut self, key: &str) -> Result<&mut HashSet<String>, WrongType> {
        let is_new = self.ensure_collection_type(key, |v| matches!(v, Value::Set(_)))?;
        if is_new {
            self.insert_empty(key, Value::Set(Box::default()));
        }
        match self.entries.get_mut(key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => Ok(set),
            _ => unreachable!("type verified by ensure_collection_type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_set(members: &[&str]) -> HashSet<String> {
        members.iter().map(|m| (*m).to_owned()).collect()
    }

    #[test]
    fn sadd_creates_set() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.sadd("s", ["one", "uno", "two", "three"]).unwrap(), 4);
        assert_eq!(ks.value_type("s"), "set");
    }

    #[test]
    fn sadd_counts_only_new_members() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.sadd("s", ["one"]).unwrap(), 1);
        assert_eq!(ks.sadd("s", ["one"]).unwrap(), 0);
        assert_eq!(ks.sadd("s", ["one", "two"]).unwrap(), 1);
    }

    #[test]
    fn sadd_with_no_members_never_creates_the_key() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.sadd::<[&str; 0]>("s", []).unwrap(), 0);
        assert!(!ks.exists("s"));
    }

    #[test]
    fn sadd_duplicate_arguments_count_once() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.sadd("s", ["a", "a"]).unwrap(), 1);
        assert_eq!(ks.scard("s").unwrap(), 1);
    }

    #[test]
    fn sadd_coerces_members() {
        let mut ks = Keyspace::new();
        ks.sadd("s", [1]).unwrap();
        assert!(ks.sismember("s", "1").unwrap());
    }

    #[test]
    fn srem_counts_removed() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.srem("s", ["one"]).unwrap(), 0);
        ks.sadd("s", ["one", "two", "three"]).unwrap();
        assert_eq!(ks.srem("s", ["four"]).unwrap(), 0);
        assert_eq!(ks.srem("s", ["one", "three"]).unwrap(), 2);
        assert_eq!(ks.srem("s", ["two", "four"]).unwrap(), 1);
    }

    #[test]
    fn srem_auto_deletes_empty_set() {
        let mut ks = Keyspace::new();
        ks.sadd("s", ["only"]).unwrap();
        ks.srem("s", ["only"]).unwrap();
        assert_eq!(ks.value_type("s"), "none");
        assert!(!ks.exists("s"));
    }

    #[test]
    fn smembers_returns_all() {
        let mut ks = Keyspace::new();
        assert!(ks.smembers("s").unwrap().is_empty());
        ks.sadd("s", ["one"]).unwrap();
        assert_eq!(ks.smembers("s").unwrap(), string_set(&["one"]));
        ks.sadd("s", ["two"]).unwrap();
        assert_eq!(ks.smembers("s").unwrap(), string_set(&["one", "two"]));
    }

    #[test]
    fn scard_missing_key_is_zero_without_creating() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.scard("s").unwrap(), 0);
        assert!(!ks.exists("s"));
    }

    #[test]
    fn sismember_does_not_create_key() {
        let mut ks = Keyspace::new();
        assert!(!ks.sismember("s", "one").unwrap());
        assert!(!ks.exists("s"));
    }

    #[test]
    fn smove_transfers_member() {
        let mut ks = Keyspace::new();
        assert!(!ks.smove("x", "y", "one").unwrap());

        ks.sadd("x", ["one", "two"]).unwrap();
        assert!(!ks.smove("x", "y", "three").unwrap());
        assert_eq!(ks.smembers("x").unwrap(), string_set(&["one", "two"]));
        assert!(ks.smembers("y").unwrap().is_empty());

        assert!(ks.smove("x", "y", "one").unwrap());
        assert_eq!(ks.smembers("x").unwrap(), string_set(&["two"]));
        assert_eq!(ks.smembers("y").unwrap(), string_set(&["one"]));
    }

    #[test]
    fn smove_to_set_already_holding_member() {
        let mut ks = Keyspace::new();
        ks.sadd("x", ["shared"]).unwrap();
        ks.sadd("y", ["shared", "other"]).unwrap();
        assert!(ks.smove("x", "y", "shared").unwrap());
        assert!(!ks.exists("x"));
        assert_eq!(ks.scard("y").unwrap(), 2);
    }

    #[test]
    fn smove_wrong_type_on_either_side() {
        let mut ks = Keyspace::new();
        ks.sadd("s", ["m"]).unwrap();
        ks.set("str", "val");
        assert!(ks.smove("str", "s", "m").is_err());
        assert!(ks.smove("s", "str", "m").is_err());
    }

    #[test]
    fn spop_removes_and_returns() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.spop("s").unwrap(), None);

        ks.sadd("s", ["one"]).unwrap();
        assert_eq!(ks.spop("s").unwrap(), Some("one".to_owned()));
        assert_eq!(ks.scard("s").unwrap(), 0);

        ks.sadd("s", ["one", "two"]).unwrap();
        let first = ks.spop("s").unwrap().unwrap();
        assert!(["one", "two"].contains(&first.as_str()));
        assert_eq!(ks.scard("s").unwrap(), 1);
        let second = ks.spop("s").unwrap().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn spop_count_returns_distinct_members() {
        let mut ks = Keyspace::new();
        ks.sadd("s", ["a", "b", "c"]).unwrap();
        let popped = ks.spop_count("s", 2).unwrap();
        assert_eq!(popped.len(), 2);
        let distinct: HashSet<_> = popped.iter().collect();
        assert_eq!(distinct.len(), 2);
        assert_eq!(ks.scard("s").unwrap(), 1);
    }

    #[test]
    fn spop_count_larger_than_set() {
        let mut ks = Keyspace::new();
        ks.sadd("s", ["a", "b"]).unwrap();
        let popped = ks.spop_count("s", 10).unwrap();
        assert_eq!(popped.len(), 2);
        assert!(!ks.exists("s"));
    }

    #[test]
    fn srandmember_leaves_set_intact() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.srandmember("s").unwrap(), None);

        ks.sadd("s", ["one"]).unwrap();
        assert_eq!(ks.srandmember("s").unwrap(), Some("one".to_owned()));
        assert_eq!(ks.scard("s").unwrap(), 1);

        ks.sadd("s", ["two"]).unwrap();
        let picked = ks.srandmember("s").unwrap().unwrap();
        assert!(["one", "two"].contains(&picked.as_str()));
        assert_eq!(ks.scard("s").unwrap(), 2);
    }

    #[test]
    fn srandmember_positive_count_distinct() {
        let mut ks = Keyspace::new();
        assert!(ks.srandmember_count("empty", 1).unwrap().is_empty());

        ks.sadd("s", ["one", "two"]).unwrap();
        let sample = ks.srandmember_count("s", 2).unwrap();
        let distinct: HashSet<_> = sample.iter().cloned().collect();
        assert_eq!(distinct, string_set(&["one", "two"]));

        // asking for more than the set holds returns the whole set
        assert_eq!(ks.srandmember_count("s", 10).unwrap().len(), 2);
    }

    #[test]
    fn srandmember_negative_count_repeats() {
        let mut ks = Keyspace::new();
        assert!(ks.srandmember_count("empty", -1).unwrap().is_empty());

        ks.sadd("s", ["one", "two"]).unwrap();
        let sample = ks.srandmember_count("s", -5).unwrap();
        assert_eq!(sample.len(), 5);
        for member in &sample {
            assert!(["one", "two"].contains(&member.as_str()));
        }
        // nothing was removed
        assert_eq!(ks.scard("s").unwrap(), 2);
    }

    #[test]
    fn set_ops_on_string_key_return_wrongtype() {
        let mut ks = Keyspace::new();
        ks.set("s", "string");
        assert!(ks.sadd("s", ["m"]).is_err());
        assert!(ks.srem("s", ["m"]).is_err());
        assert!(ks.smembers("s").is_err());
        assert!(ks.sismember("s", "m").is_err());
        assert!(ks.scard("s").is_err());
        assert!(ks.spop("s").is_err());
        assert!(ks.srandmember("s").is_err());
    }
}
