use std::fmt;

/// Error type for storage port operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The underlying lock primitive was poisoned (a writer panicked).
    LockPoisoned(&'static str),
    /// A uniqueness constraint rejected a write.
    UniqueViolation { table: &'static str, key: String },
    /// An optimistic precondition did not hold at write time.
    Conflict {
        table: &'static str,
        id: String,
        expected: String,
        actual: String,
    },
    /// An update targeted a row that does not exist.
    NotFound { table: &'static str, id: String },
    /// Row encoding or decoding failed.
    Serde(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::UniqueViolation { table, key } => {
                write!(f, "unique constraint violated on {} for key {}", table, key)
            }
            StoreError::Conflict {
                table,
                id,
                expected,
                actual,
            } => write!(
                f,
                "write conflict on {}:{} (expected {}, found {})",
                table, id, expected, actual
            ),
            StoreError::NotFound { table, id } => write!(f, "row not found: {}:{}", table, id),
            StoreError::Serde(message) => write!(f, "row serialization error: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}
