//! Error types for the engine.
//!
//! Each command family has its own small error enum, displayed with the
//! message the real store would send. Absence of a key or member is never an
//! error — commands report it through their normal return value.

use thiserror::Error;

const WRONGTYPE_MSG: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

/// A command was used against a key holding the wrong kind of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{WRONGTYPE_MSG}")]
pub struct WrongType;

/// Errors from INCR/DECR-style integer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IncrError {
    /// Key (or hash field's key) holds a non-string type.
    #[error("{WRONGTYPE_MSG}")]
    WrongType,
    /// Stored text does not parse as a base-10 integer.
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    /// The result would overflow i64.
    #[error("ERR increment or decrement would overflow")]
    Overflow,
}

impl From<WrongType> for IncrError {
    fn from(_: WrongType) -> Self {
        IncrError::WrongType
    }
}

/// Errors from INCRBYFLOAT-style operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IncrFloatError {
    /// Key holds a non-compatible type.
    #[error("{WRONGTYPE_MSG}")]
    WrongType,
    /// Stored text does not parse as a float.
    #[error("ERR value is not a valid float")]
    NotAFloat,
    /// The result would be NaN or infinite.
    #[error("ERR increment would produce NaN or Infinity")]
    NanOrInfinity,
}

impl From<WrongType> for IncrFloatError {
    fn from(_: WrongType) -> Self {
        IncrFloatError::WrongType
    }
}

/// Errors from multi-key set operations (SDIFF/SINTER/SUNION and stores).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AlgebraError {
    /// One of the source keys holds a non-set value.
    #[error("{WRONGTYPE_MSG}")]
    WrongType,
    /// The operation was given no source keys at all.
    #[error("ERR wrong number of arguments: at least one source key is required")]
    NoSourceKeys,
}

impl From<WrongType> for AlgebraError {
    fn from(_: WrongType) -> Self {
        AlgebraError::WrongType
    }
}

/// Errors from the bulk ZADD entry point on the engine facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ZAddError {
    /// The key holds a non-sorted-set value.
    #[error("{WRONGTYPE_MSG}")]
    WrongType,
    /// The argument list does not split into score/member pairs.
    #[error("ERR syntax error: expected an even number of score/member arguments")]
    UnbalancedPairs,
    /// A score argument does not parse as a float.
    #[error("ERR value is not a valid float")]
    NotAFloat,
}

impl From<WrongType> for ZAddError {
    fn from(_: WrongType) -> Self {
        ZAddError::WrongType
    }
}
