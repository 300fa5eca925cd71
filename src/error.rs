use std::error::Error;
use std::fmt;

use crate::idempotency::IDEMPOTENCY_TABLE;
use crate::store::StoreError;
use crate::work_record::{Status, WORK_RECORDS_TABLE};

/// Action reported for a status conflict caught by the store, where the
/// command that lost the race is no longer known.
pub const CONCURRENT_CHANGE: &str = "change";

/// Error type for every command and query the core executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Malformed input (bad duration, blank narrative, mismatched references).
    Validation(String),
    /// Unknown id within the actor's tenant.
    NotFound(String),
    /// Role or ownership violation.
    Forbidden(String),
    /// A lifecycle precondition did not hold.
    InvalidTransition { status: Status, action: &'static str },
    /// An outbox event could not be serialized. Fatal for the whole command.
    Serialization(String),
    /// A concurrent request with the same idempotency key committed first.
    DuplicateInFlight(String),
    /// No authenticated actor could be resolved.
    Unauthenticated(String),
    /// Storage fault.
    Store(StoreError),
    /// The core was configured with values it cannot operate on.
    Misconfigured(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Validation(msg) => write!(f, "validation failed: {}", msg),
            CommandError::NotFound(id) => write!(f, "not found: {}", id),
            CommandError::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            CommandError::InvalidTransition { status, action } => {
                write!(f, "cannot {} a work record in status {}", action, status)
            }
            CommandError::Serialization(msg) => write!(f, "event serialization failed: {}", msg),
            CommandError::DuplicateInFlight(msg) => {
                write!(f, "duplicate request in flight: {}", msg)
            }
            CommandError::Unauthenticated(msg) => write!(f, "unauthenticated: {}", msg),
            CommandError::Store(e) => write!(f, "store error: {}", e),
            CommandError::Misconfigured(msg) => write!(f, "misconfigured: {}", msg),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CommandError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { table, key } if table == IDEMPOTENCY_TABLE => {
                CommandError::DuplicateInFlight(key)
            }
            StoreError::Conflict {
                table,
                id,
                expected,
                actual,
            } if table == WORK_RECORDS_TABLE => match actual.parse::<Status>() {
                Ok(status) => CommandError::InvalidTransition {
                    status,
                    action: CONCURRENT_CHANGE,
                },
                Err(_) => CommandError::Store(StoreError::Conflict {
                    table,
                    id,
                    expected,
                    actual,
                }),
            },
            other => CommandError::Store(other),
        }
    }
}

impl CommandError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            CommandError::Validation(_) => 422,
            CommandError::NotFound(_) => 404,
            CommandError::Forbidden(_) => 403,
            CommandError::InvalidTransition { .. } => 409,
            CommandError::Serialization(_) => 500,
            CommandError::DuplicateInFlight(_) => 409,
            CommandError::Unauthenticated(_) => 401,
            CommandError::Store(_) => 500,
            CommandError::Misconfigured(_) => 500,
        }
    }

    /// Whether the caller can correct the request and try again.
    ///
    /// Serialization, storage and configuration faults are not; the
    /// command's transaction has to be rolled back as a whole.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CommandError::Serialization(_) | CommandError::Store(_) | CommandError::Misconfigured(_)
        )
    }
}
