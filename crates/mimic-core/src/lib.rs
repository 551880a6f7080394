//! mimic-core: an in-memory stand-in for a Redis-style store.
//!
//! Reproduces the observable command semantics — return values, ordering,
//! and edge cases — of the string, hash, set, sorted-set, and list command
//! families plus key expiry, without sockets, persistence, or background
//! threads. Built for tests: construct a [`Keyspace`] (or a shareable
//! [`Engine`]) per case, drive it, drop it.

pub mod coerce;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod keyspace;
pub mod time;
pub mod types;

pub use coerce::Textual;
pub use engine::{Engine, EngineConfig};
pub use error::{AlgebraError, IncrError, IncrFloatError, WrongType, ZAddError};
pub use keyspace::{Aggregate, Keyspace};
pub use types::Value;
