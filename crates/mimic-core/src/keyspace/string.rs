use bytes::Bytes;

use super::*;
use crate::coerce::Textual;
use crate::error::IncrError;

impl Keyspace {
    /// Stores the coerced text of `value` under `key`.
    ///
    /// Overwrite semantics: any previous slot is replaced regardless of its
    /// kind, the type is forced to String, and any previous expiry is
    /// discarded.
    pub fn set(&mut self, key: &str, value: impl Textual) {
        self.entries
            .insert(Box::from(key), Entry::new(Value::String(value.to_bytes()), None));
    }

    /// Retrieves the string value for `key`, or `None` if missing/expired.
    ///
    /// Returns `Err(WrongType)` if the key holds a non-string value.
    /// Uses a single hash probe on the common (non-expired) path.
    pub fn get(&mut self, key: &str) -> Result<Option<Bytes>, WrongType> {
        let expired = match self.entries.get(key) {
            Some(e) if e.is_expired() => true,
            Some(e) => {
                return match &e.value {
                    Value::String(data) => Ok(Some(data.clone())),
                    _ => Err(WrongType),
                };
            }
            None => return Ok(None),
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    /// Increments the integer value of a key by 1.
    pub fn incr(&mut self, key: &str) -> Result<i64, IncrError> {
        self.incr_by(key, 1)
    }

    /// Decrements the integer value of a key by 1.
    pub fn decr(&mut self, key: &str) -> Result<i64, IncrError> {
        self.incr_by(key, -1)
    }

    /// Adds `delta` to the current integer value of the key.
    ///
    /// An absent key counts as 0. The stored text must parse as a base-10
    /// i64 or the operation fails with `NotAnInteger`. An existing TTL
    /// survives the increment.
    pub fn incr_by(&mut self, key: &str, delta: i64) -> Result<i64, IncrError> {
        self.remove_if_expired(key);

        let current = match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::String(data) => {
                    let text = std::str::from_utf8(data).map_err(|_| IncrError::NotAnInteger)?;
                    text.parse::<i64>().map_err(|_| IncrError::NotAnInteger)?
                }
                _ => return Err(IncrError::WrongType),
            },
            None => 0,
        };

        let new_val = current.checked_add(delta).ok_or(IncrError::Overflow)?;
        let new_bytes = Bytes::from(new_val.to_string());

        match self.entries.get_mut(key) {
            // write in place so an existing TTL survives
            Some(entry) => entry.value = Value::String(new_bytes),
            None => {
                self.entries
                    .insert(Box::from(key), Entry::new(Value::String(new_bytes), None));
            }
        }
        Ok(new_val)
    }

    /// Subtracts `delta` from the current integer value of the key.
    pub fn decr_by(&mut self, key: &str, delta: i64) -> Result<i64, IncrError> {
        self.incr_by(key, delta.checked_neg().ok_or(IncrError::Overflow)?)
    }
}
