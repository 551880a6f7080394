use std::collections::VecDeque;

use bytes::Bytes;

use super::*;
use crate::coerce::Textual;
use crate::types::normalize_range;

impl Keyspace {
    /// Pushes values to the head (left) of a list, creating it if needed.
    ///
    /// Returns the new length.
    pub fn lpush<I>(&mut self, key: &str, values: I) -> Result<usize, WrongType>
    where
        I: IntoIterator,
        I::Item: Textual,
    {
        self.list_push(key, values, true)
    }

    /// Pushes values to the tail (right) of a list, creating it if needed.
    ///
    /// Returns the new length.
    pub fn rpush<I>(&mut self, key: &str, values: I) -> Result<usize, WrongType>
    where
        I: IntoIterator,
        I::Item: Textual,
    {
        self.list_push(key, values, false)
    }

    /// Pops a value from the head (left) of a list.
    ///
    /// Returns `None` for a missing key. Removes the key if the list
    /// becomes empty.
    pub fn lpop(&mut self, key: &str) -> Result<Option<Bytes>, WrongType> {
        self.list_pop(key, true)
    }

    /// Pops a value from the tail (right) of a list.
    pub fn rpop(&mut self, key: &str) -> Result<Option<Bytes>, WrongType> {
        self.list_pop(key, false)
    }

    /// Returns a range of elements by index, inclusive on both ends.
    ///
    /// Negative indices count from the end; out-of-bounds indices clamp.
    pub fn lrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(vec![]);
        }
        match self.entries.get(key) {
            None => Ok(vec![]),
            Some(entry) => match &entry.value {
                Value::List(deque) => {
                    let (s, e) = normalize_range(start, stop, deque.len() as i64);
                    if s > e {
                        return Ok(vec![]);
                    }
                    Ok(deque
                        .iter()
                        .skip(s as usize)
                        .take((e - s + 1) as usize)
                        .cloned()
                        .collect())
                }
                _ => Err(WrongType),
            },
        }
    }

    /// Returns the length of a list, or 0 if the key doesn't exist.
    pub fn llen(&mut self, key: &str) -> Result<usize, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(0);
        }
        match self.entries.get(key) {
            None => Ok(0),
            Some(entry) => match &entry.value {
                Value::List(deque) => Ok(deque.len()),
                _ => Err(WrongType),
            },
        }
    }

    /// Internal push shared by lpush/rpush.
    fn list_push<I>(&mut self, key: &str, values: I, left: bool) -> Result<usize, WrongType>
    where
        I: IntoIterator,
        I::Item: Textual,
    {
        let values: Vec<Bytes> = values.into_iter().map(|v| v.to_bytes()).collect();

        self.remove_if_expired(key);
        let is_new = self.ensure_collection_type(key, |v| matches!(v, Value::List(_)))?;
        if is_new {
            if values.is_empty() {
                // nothing to push; never leave an empty list behind
                return Ok(0);
            }
            self.insert_empty(key, Value::List(VecDeque::new()));
        }

        let Some(Entry {
            value: Value::List(deque),
            ..
        }) = self.entries.get_mut(key)
        else {
            unreachable!("type verified by ensure_collection_type");
        };
        for value in values {
            if left {
                deque.push_front(value);
            } else {
                deque.push_back(value);
            }
        }
        Ok(deque.len())
    }

    /// Internal pop shared by lpop/rpop.
    fn list_pop(&mut self, key: &str, left: bool) -> Result<Option<Bytes>, WrongType> {
        if self.remove_if_expired(key) {
            return Ok(None);
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };
        let Value::List(deque) = &mut entry.value else {
            return Err(WrongType);
        };

        let popped = if left {
            deque.pop_front()
        } else {
            deque.pop_back()
        };
        let is_empty = deque.is_empty();
        self.drop_if_empty(key, is_empty);
        Ok(popped)
    }
}
