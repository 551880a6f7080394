use super::*;
use crate::error::AlgebraError;

/// Which combination a multi-key set command applies.
#[derive(Debug, Clone, Copy)]
enum SetOp {
    Diff,
    Inter,
    Union,
}

impl Keyspace {
    /// Members of the first key's set not present in any of the remaining
    /// keys' sets (left-to-right subtraction).
    ///
    /// A non-existent key contributes the empty set. An empty key list is
    /// rejected with `NoSourceKeys`.
    pub fn sdiff(&mut self, keys: &[&str]) -> Result<HashSet<String>, AlgebraError> {
        self.combine(keys, SetOp::Diff)
    }

    /// Members present in every listed key's set.
    pub fn sinter(&mut self, keys: &[&str]) -> Result<HashSet<String>, AlgebraError> {
        self.combine(keys, SetOp::Inter)
    }

    /// Members present in at least one listed key's set.
    pub fn sunion(&mut self, keys: &[&str]) -> Result<HashSet<String>, AlgebraError> {
        self.combine(keys, SetOp::Union)
    }

    /// Computes `sdiff` and stores the result at `dest`.
    ///
    /// Returns the resulting cardinality. The destination is replaced
    /// whatever it held before; an empty result deletes it.
    pub fn sdiffstore(&mut self, dest: &str, keys: &[&str]) -> Result<usize, AlgebraError> {
        let result = self.sdiff(keys)?;
        Ok(self.store_set(dest, result))
    }

    /// Computes `sinter` and stores the result at `dest`.
    pub fn sinterstore(&mut self, dest: &str, keys: &[&str]) -> Result<usize, AlgebraError> {
        let result = self.sinter(keys)?;
        Ok(self.store_set(dest, result))
    }

    /// Computes `sunion` and stores the result at `dest`.
    pub fn sunionstore(&mut self, dest: &str, keys: &[&str]) -> Result<usize, AlgebraError> {
        let result = self.sunion(keys)?;
        Ok(self.store_set(dest, result))
    }

    /// Shared walk for the three combinations.
    ///
    /// The full result is computed before anything is written, so a type
    /// error part-way through can never leave a destination half-updated.
    fn combine(&mut self, keys: &[&str], op: SetOp) -> Result<HashSet<String>, AlgebraError> {
        if keys.is_empty() {
            return Err(AlgebraError::NoSourceKeys);
        }
        for key in keys {
            self.remove_if_expired(key);
        }

        let mut sources = Vec::with_capacity(keys.len());
        for key in keys {
            sources.push(self.read_set(key)?);
        }

        let mut result: HashSet<String> = match sources[0] {
            Some(set) => set.clone(),
            None => HashSet::new(),
        };
        for source in &sources[1..] {
            match (op, source) {
                (SetOp::Diff, Some(set)) => result.retain(|m| !set.contains(m)),
                (SetOp::Inter, Some(set)) => result.retain(|m| set.contains(m)),
                (SetOp::Inter, None) => result.clear(),
                (SetOp::Union, Some(set)) => result.extend(set.iter().cloned()),
                (SetOp::Diff | SetOp::Union, None) => {}
            }
        }
        Ok(result)
    }

    /// Writes a computed set into `dest`, deleting it when empty.
    fn store_set(&mut self, dest: &str, result: HashSet<String>) -> usize {
        let size = result.len();
        if result.is_empty() {
            self.entries.remove(dest);
        } else {
            self.entries.insert(
                Box::from(dest),
                Entry::new(Value::Set(Box::new(result)), None),
            );
        }
        size
    }
}
