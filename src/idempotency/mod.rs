//! Idempotency-key replay guard for mutating commands.
//!
//! A client retrying a command with the same key gets the originally produced
//! result id back instead of a second execution. Only the SHA-256 digest of the
//! key is ever stored.

mod cache;
mod store;

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use cache::IdempotencyCache;
pub use store::{IdempotencyStore, IDEMPOTENCY_TABLE};

/// How long a stored result is replayed, in seconds. One value for every
/// operation.
pub const IDEMPOTENCY_TTL_SECS: i64 = 24 * 60 * 60;

/// The replay window as a `Duration`.
pub fn default_ttl() -> Duration {
    Duration::seconds(IDEMPOTENCY_TTL_SECS)
}

/// Operation kinds that accept an idempotency key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "work_record.create")]
    CreateWorkRecord,
    #[serde(rename = "work_record.approve")]
    ApproveWorkRecord,
}

impl Operation {
    /// Stable name, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateWorkRecord => "work_record.create",
            Operation::ApproveWorkRecord => "work_record.approve",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored replay entry. Unique on `(operation, actor_id, key_hash)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub id: String,
    pub operation: Operation,
    pub actor_id: String,
    pub tenant_id: String,
    pub key_hash: String,
    pub response_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Whether the entry still replays at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// The value the storage uniqueness constraint is enforced on.
    pub fn unique_key(&self) -> String {
        unique_key(self.operation, &self.actor_id, &self.key_hash)
    }
}

/// Uniqueness key for `(operation, actor, hash)`.
pub fn unique_key(operation: Operation, actor_id: &str, key_hash: &str) -> String {
    format!("{}:{}:{}", operation, actor_id, key_hash)
}

/// Hex-encoded SHA-256 of the trimmed key.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.trim().as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
