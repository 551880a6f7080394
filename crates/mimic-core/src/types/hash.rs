//! Hash payload with a size-adaptive representation.
//!
//! Small hashes live in a Vec and are scanned linearly; past a threshold the
//! payload promotes itself to a HashMap. Field names are `CompactString`, so
//! names up to 24 bytes stay inline with no heap allocation.

use std::collections::HashMap;

use bytes::Bytes;
use compact_str::CompactString;

/// Hashes with more fields than this promote to the map representation.
const COMPACT_THRESHOLD: usize = 32;

/// A field → value mapping with unique fields.
///
/// Typical hashes in a test workload carry a handful of fields, where a
/// contiguous Vec is both smaller and faster than a HashMap. The promotion
/// is one-way: a hash that has ever been large stays in map form.
#[derive(Debug, Clone)]
pub enum HashValue {
    /// Linear-scan storage for small hashes.
    Compact(Vec<(CompactString, Bytes)>),
    /// Map storage once the field count exceeds the threshold.
    Full(HashMap<CompactString, Bytes>),
}

impl Default for HashValue {
    fn default() -> Self {
        HashValue::Compact(Vec::new())
    }
}

impl HashValue {
    /// Upserts a field. Returns `true` if the field was newly created.
    pub fn set(&mut self, field: CompactString, value: Bytes) -> bool {
        match self {
            HashValue::Compact(fields) => {
                if let Some((_, slot)) = fields.iter_mut().find(|(name, _)| *name == field) {
                    *slot = value;
                    return false;
                }
                fields.push((field, value));
                if fields.len() > COMPACT_THRESHOLD {
                    let map = std::mem::take(fields).into_iter().collect();
                    *self = HashValue::Full(map);
                }
                true
            }
            HashValue::Full(map) => map.insert(field, value).is_none(),
        }
    }

    /// Returns the value stored under `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Bytes> {
        match self {
            HashValue::Compact(fields) => fields
                .iter()
                .find(|(name, _)| name.as_str() == field)
                .map(|(_, value)| value),
            HashValue::Full(map) => map.get(field),
        }
    }

    /// Removes a field. Returns `true` if it existed.
    pub fn remove(&mut self, field: &str) -> bool {
        match self {
            HashValue::Compact(fields) => {
                match fields.iter().position(|(name, _)| name.as_str() == field) {
                    Some(pos) => {
                        fields.swap_remove(pos);
                        true
                    }
                    None => false,
                }
            }
            HashValue::Full(map) => map.remove(field).is_some(),
        }
    }

    /// Returns `true` if `field` exists.
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        match self {
            HashValue::Compact(fields) => fields.len(),
            HashValue::Full(map) => map.len(),
        }
    }

    /// Returns `true` if the hash has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all field-value pairs in no particular order.
    pub fn iter(&self) -> FieldIter<'_> {
        match self {
            HashValue::Compact(fields) => FieldIter::Compact(fields.iter()),
            HashValue::Full(map) => FieldIter::Full(map.iter()),
        }
    }
}

impl PartialEq for HashValue {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(field, value)| other.get(field) == Some(value))
    }
}

/// Iterator over a hash's fields, independent of representation.
pub enum FieldIter<'a> {
    Compact(std::slice::Iter<'a, (CompactString, Bytes)>),
    Full(std::collections::hash_map::Iter<'a, CompactString, Bytes>),
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = (&'a str, &'a Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FieldIter::Compact(iter) => iter.next().map(|(name, value)| (name.as_str(), value)),
            FieldIter::Full(iter) => iter.next().map(|(name, value)| (name.as_str(), value)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            FieldIter::Compact(iter) => iter.size_hint(),
            FieldIter::Full(iter) => iter.size_hint(),
        }
    }
}
