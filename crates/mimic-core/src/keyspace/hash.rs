use bytes::Bytes;
use compact_str::CompactString;

use super::*;
use crate::coerce::{format_float, Textual};
use crate::error::{IncrError, IncrFloatError};
use crate::types::hash::HashValue;

impl Keyspace {
    /// Upserts a single field in a hash, creating the hash if needed.
    ///
    /// Returns `true` if the field was newly created. Field and value are
    /// coerced, so `hset(key, 1, 2)` and `hget(key, "1")` meet in the same
    /// mapping slot.
    pub fn hset(
        &mut self,
        key: &str,
        field: impl Textual,
        value: impl Textual,
    ) -> Result<bool, WrongType> {
        self.remove_if_expired(key);
        let map = self.hash_payload(key)?;
        Ok(map.set(CompactString::from(field.render()), value.to_bytes()))
    }

    /// Sets a field only if it does not already exist.
    ///
    /// Returns `true` iff the field was created.
    pub fn hsetnx(
        &mut self,
        key: &str,
        field: impl Textual,
        value: impl Textual,
    ) -> Result<bool, WrongType> {
        self.remove_if_expired(key);
        let field = field.render();
        let map = self.hash_payload(key)?;
        if map.contains(&field) {
            return Ok(false);
        }
        map.set(CompactString::from(field), value.to_bytes());
        Ok(true)
    }

    /// Bulk upsert of field-value pairs. An empty mapping is a no-op and
    /// never creates the key.
    pub fn hmset<F, V, I>(&mut self, key: &str, entries: I) -> Result<(), WrongType>
    where
        F: Textual,
        V: Textual,
        I: IntoIterator<Item = (F, V)>,
    {
        let entries: Vec<(CompactString, Bytes)> = entries
            .into_iter()
            .map(|(field, value)| (CompactString::from(field.render()), value.to_bytes()))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        self.remove_if_expired(key);
        let map = self.hash_payload(key)?;
        for (field, value) in entries {
            map.set(field, value);
        }
        Ok(())
    }

    /// Gets the value of a field. `None` if the key or field doesn't exist.
    pub fn hget(&mut self, key: &str, field: impl Textual) -> Result<Option<Bytes>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(None);
        }
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map.get(&field.render()).cloned()),
                _ => Err(WrongType),
            },
        }
    }

    /// Gets multiple field values, preserving input order and length.
    ///
    /// Fields that don't exist yield `None` in their position.
    pub fn hmget<I>(&mut self, key: &str, fields: I) -> Result<Vec<Option<Bytes>>, WrongType>
    where
        I: IntoIterator,
        I::Item: Textual,
    {
        if self.remove_if_expired(key) {
            return Ok(fields.into_iter().map(|_| None).collect());
        }
        match self.entries.get(key) {
            None => Ok(fields.into_iter().map(|_| None).collect()),
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(fields
                    .into_iter()
                    .map(|f| map.get(&f.render()).cloned())
                    .collect()),
                _ => Err(WrongType),
            },
        }
    }

    /// Deletes fields from a hash. Returns the number actually removed.
    ///
    /// Deletes the key entirely when the last field is removed.
    pub fn hdel<I>(&mut self, key: &str, fields: I) -> Result<usize, WrongType>
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
        let Value::Hash(map) = &mut entry.value else {
            return Err(WrongType);
        };

        let mut removed = 0;
        for field in fields {
            if map.remove(&field.render()) {
                removed += 1;
            }
        }
        let is_empty = map.is_empty();
        self.drop_if_empty(key, is_empty);
        Ok(removed)
    }

    /// Increments a field's integer value, creating hash and field at 0.
    pub fn hincrby(
        &mut self,
        key: &str,
        field: impl Textual,
        delta: i64,
    ) -> Result<i64, IncrError> {
        self.remove_if_expired(key);
        let field = field.render();
        let map = self.hash_payload(key)?;

        let current = match map.get(&field) {
            Some(data) => {
                let text = std::str::from_utf8(data).map_err(|_| IncrError::NotAnInteger)?;
                text.parse::<i64>().map_err(|_| IncrError::NotAnInteger)?
            }
            None => 0,
        };
        let new_val = current.checked_add(delta).ok_or(IncrError::Overflow)?;
        map.set(
            CompactString::from(field),
            Bytes::from(new_val.to_string()),
        );
        Ok(new_val)
    }

    /// Adds a float delta to a field, creating hash and field at 0.
    ///
    /// The stored text is the canonical float rendering, so
    /// `hincrbyfloat(h, k, 1.2)` then `hincrbyfloat(h, k, 2.3)` reads back
    /// `"3.5"`.
    pub fn hincrbyfloat(
        &mut self,
        key: &str,
        field: impl Textual,
        delta: f64,
    ) -> Result<f64, IncrFloatError> {
        self.remove_if_expired(key);
        let field = field.render();
        let map = self.hash_payload(key)?;

        let current = match map.get(&field) {
            Some(data) => {
                let text = std::str::from_utf8(data).map_err(|_| IncrFloatError::NotAFloat)?;
                text.parse::<f64>().map_err(|_| IncrFloatError::NotAFloat)?
            }
            None => 0.0,
        };
        let new_val = current + delta;
        if new_val.is_nan() || new_val.is_infinite() {
            return Err(IncrFloatError::NanOrInfinity);
        }
        map.set(
            CompactString::from(field),
            Bytes::from(format_float(new_val)),
        );
        Ok(new_val)
    }

    /// Returns all field names in a hash, in no particular order.
    pub fn hkeys(&mut self, key: &str) -> Result<Vec<String>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(vec![]);
        }
        match self.entries.get(key) {
            None => Ok(vec![]),
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map.iter().map(|(f, _)| f.to_owned()).collect()),
                _ => Err(WrongType),
            },
        }
    }

    /// Returns all values in a hash, in no particular order.
    pub fn hvals(&mut self, key: &str) -> Result<Vec<Bytes>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(vec![]);
        }
        match self.entries.get(key) {
            None => Ok(vec![]),
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map.iter().map(|(_, v)| v.clone()).collect()),
                _ => Err(WrongType),
            },
        }
    }

    /// Returns all field-value pairs. Empty for a missing key.
    pub fn hgetall(&mut self, key: &str) -> Result<Vec<(String, Bytes)>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(vec![]);
        }
        match self.entries.get(key) {
            None => Ok(vec![]),
            Some(entry) => match &entry.value {
                Value::Hash(map) => {
                    Ok(map.iter().map(|(f, v)| (f.to_owned(), v.clone())).collect())
                }
                _ => Err(WrongType),
            },
        }
    }

    /// Returns the number of fields in a hash, 0 for a missing key.
    pub fn hlen(&mut self, key: &str) -> Result<usize, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(0);
        }
        match self.entries.get(key) {
            None => Ok(0),
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map.len()),
                _ => Err(WrongType),
            },
        }
    }

    /// Checks if a field exists in a hash.
    pub fn hexists(&mut self, key: &str, field: impl Textual) -> Result<bool, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(false);
        }
        match self.entries.get(key) {
            None => Ok(false),
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map.contains(&field.render())),
                _ => Err(WrongType),
            },
        }
    }

    /// Gets the hash payload for `key`, creating an empty one if the key is
    /// absent. Caller must have applied lazy expiry already.
    fn hash_payload(&mut self, key: &str) -> Result<&mut HashValue, WrongType> {
        let is_new = self.ensure_collection_type(key, |v| matches!(v, Value::Hash(_)))?;
        if is_new {
            self.insert_empty(key, Value::Hash(Box::default()));
        }
        match self.entries.get_mut(key) {
            Some(Entry {
                value: Value::Hash(map),
                ..
            }) => Ok(map),
            _ => unreachable!("type verified by ensure_collection_type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hset_creates_hash() {
        let mut ks = Keyspace::new();
        assert!(ks.hset("h", "field1", "value1").unwrap());
        assert_eq!(ks.value_type("h"), "hash");
    }

    #[test]
    fn hset_reports_new_vs_updated() {
        let mut ks = Keyspace::new();
        assert!(ks.hset("h", "f", "v1").unwrap());
        assert!(!ks.hset("h", "f", "v2").unwrap());
        assert_eq!(ks.hget("h", "f").unwrap(), Some(Bytes::from("v2")));
    }

    #[test]
    fn numeric_field_and_text_field_are_the_same_slot() {
        let mut ks = Keyspace::new();
        ks.hset("h", 1, 2).unwrap();
        assert_eq!(ks.hget("h", "1").unwrap(), Some(Bytes::from("2")));
        assert_eq!(ks.hget("h", 1).unwrap(), Some(Bytes::from("2")));
    }

    #[test]
    fn hget_missing_field_and_key() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.hget("missing", "field").unwrap(), None);
        ks.hset("h", "a", "1").unwrap();
        assert_eq!(ks.hget("h", "b").unwrap(), None);
    }

    #[test]
    fn hsetnx_only_creates() {
        let mut ks = Keyspace::new();
        assert!(ks.hsetnx("h", "key", "value1").unwrap());
        assert!(!ks.hsetnx("h", "key", "value2").unwrap());
        assert_eq!(ks.hget("h", "key").unwrap(), Some(Bytes::from("value1")));
    }

    #[test]
    fn hmset_bulk_upsert() {
        let mut ks = Keyspace::new();
        ks.hmset("h", [("key1", "value1"), ("key2", "value2")])
            .unwrap();
        assert_eq!(ks.hget("h", "key1").unwrap(), Some(Bytes::from("value1")));
        assert_eq!(ks.hget("h", "key2").unwrap(), Some(Bytes::from("value2")));
    }

    #[test]
    fn hmset_coerces_integral_pairs() {
        let mut ks = Keyspace::new();
        ks.hmset("h", [(1, 2), (3, 4)]).unwrap();
        assert_eq!(ks.hget("h", "1").unwrap(), Some(Bytes::from("2")));
        assert_eq!(ks.hget("h", 3).unwrap(), Some(Bytes::from("4")));
    }

    #[test]
    fn hmset_with_no_pairs_never_creates_the_key() {
        let mut ks = Keyspace::new();
        ks.hmset::<&str, &str, [(&str, &str); 0]>("h", []).unwrap();
        assert!(!ks.exists("h"));
    }

    #[test]
    fn hmget_preserves_order_and_length() {
        let mut ks = Keyspace::new();
        ks.hmset("h", [(1, 2), (3, 4)]).unwrap();
        let values = ks.hmget("h", [1, 2, 3]).unwrap();
        assert_eq!(
            values,
            vec![Some(Bytes::from("2")), None, Some(Bytes::from("4"))]
        );
    }

    #[test]
    fn hmget_missing_key_is_all_none() {
        let mut ks = Keyspace::new();
        let values = ks.hmget("missing", ["a", "b"]).unwrap();
        assert_eq!(values, vec![None, None]);
    }

    #[test]
    fn hdel_counts_removed() {
        let mut ks = Keyspace::new();
        ks.hmset("h", [(1, 1), (2, 2), (3, 3)]).unwrap();
        assert_eq!(ks.hdel("h", ["foo"]).unwrap(), 0);
        assert_eq!(ks.hdel("h", ["1", "2"]).unwrap(), 2);
        assert_eq!(ks.hdel("h", ["3", "4"]).unwrap(), 1);
    }

    #[test]
    fn hdel_auto_deletes_empty_hash() {
        let mut ks = Keyspace::new();
        ks.hset("h", "only", "field").unwrap();
        ks.hdel("h", ["only"]).unwrap();
        assert_eq!(ks.value_type("h"), "none");
        assert!(!ks.exists("h"));
    }

    #[test]
    fn hlen_and_hexists() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.hlen("h").unwrap(), 0);
        assert!(!ks.hexists("h", "key").unwrap());

        ks.hset("h", "key", "value").unwrap();
        assert_eq!(ks.hlen("h").unwrap(), 1);
        assert!(ks.hexists("h", "key").unwrap());
        assert!(!ks.hexists("h", "key2").unwrap());
    }

    #[test]
    fn hincrby_new_and_existing() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.hincrby("h", "key", 1).unwrap(), 1);
        assert_eq!(ks.hincrby("h", "key", 2).unwrap(), 3);
        assert_eq!(ks.hget("h", "key").unwrap(), Some(Bytes::from("3")));
    }

    #[test]
    fn hincrby_negative_delta() {
        let mut ks = Keyspace::new();
        ks.hset("h", "n", 10).unwrap();
        assert_eq!(ks.hincrby("h", "n", -7).unwrap(), 3);
    }

    #[test]
    fn hincrby_non_integer_fails() {
        let mut ks = Keyspace::new();
        ks.hset("h", "s", "notanumber").unwrap();
        assert_eq!(ks.hincrby("h", "s", 1).unwrap_err(), IncrError::NotAnInteger);
    }

    #[test]
    fn hincrby_overflow() {
        let mut ks = Keyspace::new();
        ks.hset("h", "count", i64::MAX).unwrap();
        assert_eq!(ks.hincrby("h", "count", 1).unwrap_err(), IncrError::Overflow);
    }

    #[test]
    fn hincrbyfloat_accumulates() {
        let mut ks = Keyspace::new();
        assert_eq!(ks.hincrbyfloat("h", "key", 1.2).unwrap(), 1.2);
        assert_eq!(ks.hincrbyfloat("h", "key", 2.3).unwrap(), 3.5);
        assert_eq!(ks.hget("h", "key").unwrap(), Some(Bytes::from("3.5")));
    }

    #[test]
    fn hincrbyfloat_not_a_float_fails() {
        let mut ks = Keyspace::new();
        ks.hset("h", "s", "hello").unwrap();
        assert_eq!(
            ks.hincrbyfloat("h", "s", 1.0).unwrap_err(),
            IncrFloatError::NotAFloat
        );
    }

    #[test]
    fn hincrbyfloat_rejects_infinite_result() {
        let mut ks = Keyspace::new();
        ks.hset("h", "big", f64::MAX).unwrap();
        assert_eq!(
            ks.hincrbyfloat("h", "big", f64::MAX).unwrap_err(),
            IncrFloatError::NanOrInfinity
        );
    }

    #[test]
    fn hkeys_and_hvals() {
        let mut ks = Keyspace::new();
        ks.hmset("h", [(1, 2), (3, 4)]).unwrap();

        let mut keys = ks.hkeys("h").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["1", "3"]);

        let mut vals = ks.hvals("h").unwrap();
        vals.sort();
        assert_eq!(vals, vec![Bytes::from("2"), Bytes::from("4")]);
    }

    #[test]
    fn hgetall_returns_pairs() {
        let mut ks = Keyspace::new();
        assert!(ks.hgetall("h").unwrap().is_empty());
        ks.hset("h", "key", "value").unwrap();
        let all = ks.hgetall("h").unwrap();
        assert_eq!(all, vec![("key".to_owned(), Bytes::from("value"))]);
    }

    #[test]
    fn hash_ops_on_string_key_return_wrongtype() {
        let mut ks = Keyspace::new();
        ks.set("s", "string");
        assert!(ks.hset("s", "f", "v").is_err());
        assert!(ks.hsetnx("s", "f", "v").is_err());
        assert!(ks.hget("s", "f").is_err());
        assert!(ks.hmget("s", ["f"]).is_err());
        assert!(ks.hgetall("s").is_err());
        assert!(ks.hdel("s", ["f"]).is_err());
        assert!(ks.hexists("s", "f").is_err());
        assert!(ks.hlen("s").is_err());
        assert!(ks.hincrby("s", "f", 1).is_err());
        assert!(ks.hincrbyfloat("s", "f", 1.0).is_err());
        assert!(ks.hkeys("s").is_err());
        assert!(ks.hvals("s").is_err());
    }

    #[test]
    fn coerced_values_read_back_as_text() {
        let mut ks = Keyspace::new();
        ks.hset("h", "flag", true).unwrap();
        assert_eq!(ks.hget("h", "flag").unwrap(), Some(Bytes::from("true")));
    }
}
