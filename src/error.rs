//! Error taxonomy for the strike fund engine.
//!
//! Services return `EngineError` and propagate with `?`; handlers map
//! variants onto HTTP status codes in one place (`handlers::error_response`).
//! State conflicts always carry the actual current state so callers can
//! reconcile instead of guessing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input, rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced row does not exist within this organization's scope.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Transition attempted from a state that does not permit it.
    #[error("invalid state transition: expected {expected}, found {actual}")]
    StateConflict {
        expected: &'static str,
        actual: String,
    },

    /// Member already holds an open shift; carries the existing record id
    /// so the caller can prompt for checkout instead.
    #[error("member already checked in (attendance record {attendance_id})")]
    AlreadyCheckedIn { attendance_id: i32 },

    /// GPS verification failed: measured distance exceeds the allowed radius.
    #[error("check-in location is {distance_meters:.0}m from the picket line (allowed {allowed_radius_meters:.0}m)")]
    LocationRejected {
        distance_meters: f64,
        allowed_radius_meters: f64,
    },

    /// QR/NFC check-in token problem.
    #[error("check-in token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// Outbound collaborator (notification queue, payment processor) failure.
    #[error("collaborator call failed: {0}")]
    Collaborator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token does not match the requested fund/member")]
    Mismatch,
}
