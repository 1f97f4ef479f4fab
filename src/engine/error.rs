use ulid::Ulid;

use crate::model::BookingStatus;

#[derive(Debug)]
pub enum EngineError {
    /// No eligible room for the requested type and dates. An ordinary
    /// outcome, not a fault.
    NotAvailable { room_type_id: Ulid },
    /// The requested booking state change is not in the transition table.
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    /// Durable storage failed or timed out after the internal retry.
    Storage(String),
    /// A validated-upstream invariant reached the engine broken.
    InvariantViolation(&'static str),
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// Unique-field collision (email, room number).
    Duplicate(&'static str),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotAvailable { room_type_id } => {
                write!(f, "no room of type {room_type_id} available for the requested dates")
            }
            EngineError::InvalidTransition { from, to } => {
                write!(f, "invalid booking transition: {from} -> {to}")
            }
            EngineError::Storage(e) => write!(f, "storage failure: {e}"),
            EngineError::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::Duplicate(field) => write!(f, "duplicate {field}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
