// core/src/error.rs
use std::fmt;

use uuid::Uuid;

/// Error taxonomy for the ledger/payout engine.
///
/// Mirrors the distinction the engine's callers actually need to act on:
/// a caller can retry `Transient`, must not retry `InvariantViolation`, and
/// should translate `Validation`/`NotFound` straight into an HTTP status.
#[derive(Debug)]
pub enum EngineError {
    /// Caller-supplied input failed validation before anything was written.
    Validation(String),
    /// An entity referenced by id/code/key does not exist.
    NotFound(String),
    /// A ledger entry referenced an `account_code` with no matching account.
    UnknownAccount(String),
    /// A unique-constraint race was resolved by re-reading the existing row.
    /// Callers that see this should treat it as "already happened" rather
    /// than a failure.
    Conflict(Uuid),
    /// The transaction did not balance, had the wrong entry count, or some
    /// other structural guarantee was violated. Never retried.
    InvariantViolation(String),
    /// Lock timeout, serialization failure, disconnect. Safe to retry with
    /// backoff.
    Transient(String),
    /// Opaque storage failure that does not fit the above buckets.
    Storage(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::UnknownAccount(code) => write!(f, "unknown account: {code}"),
            Self::Conflict(id) => write!(f, "conflict, existing id: {id}"),
            Self::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            Self::Transient(msg) => write!(f, "transient error: {msg}"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Whether a `TaskRunner` should re-enqueue with backoff instead of
    /// marking the payout FAILED outright.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
