use chrono::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{default_ttl, hash_key, IdempotencyRecord, IdempotencyStore, Operation};
use crate::actor::CurrentActor;
use crate::clock::Clock;
use crate::error::CommandError;

/// Replays the result of a keyed command instead of executing it twice.
///
/// Lookup and insert run inside the caller's transaction but are still two
/// separate storage operations. Under truly concurrent duplicates the store's
/// uniqueness constraint decides, and the loser fails with
/// `CommandError::DuplicateInFlight`.
pub struct IdempotencyCache<C> {
    clock: C,
    ttl: Duration,
}

impl<C: Clock> IdempotencyCache<C> {
    /// Create a cache with the default 24h window.
    pub fn new(clock: C) -> Self {
        Self::with_ttl(clock, default_ttl())
    }

    /// Create a cache with a custom window.
    pub fn with_ttl(clock: C, ttl: Duration) -> Self {
        Self { clock, ttl }
    }

    /// Replay window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run `supplier` at most once per `(operation, actor, key)` within the TTL.
    ///
    /// A missing or blank key disables the guard: the supplier runs and its
    /// result is not recorded.
    pub fn execute<T, F>(
        &self,
        tx: &mut T,
        actor: &CurrentActor,
        key: Option<&str>,
        operation: Operation,
        supplier: F,
    ) -> Result<String, CommandError>
    where
        T: IdempotencyStore + ?Sized,
        F: FnOnce(&mut T) -> Result<String, CommandError>,
    {
        let Some(key) = key.filter(|k| !k.trim().is_empty()) else {
            return supplier(tx);
        };

        let key_hash = hash_key(key);
        let now = self.clock.now();

        if let Some(existing) = tx.find_idempotency(operation, &actor.user_id, &key_hash)? {
            if existing.is_live(now) {
                debug!(
                    %operation,
                    actor = %actor.user_id,
                    response_id = %existing.response_id,
                    "idempotent replay"
                );
                return Ok(existing.response_id);
            }
        }

        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            CommandError::Misconfigured(format!(
                "idempotency ttl of {}s overflows the expiry timestamp",
                self.ttl.num_seconds()
            ))
        })?;

        let response_id = supplier(tx)?;

        let record = IdempotencyRecord {
            id: Uuid::new_v4().to_string(),
            operation,
            actor_id: actor.user_id.clone(),
            tenant_id: actor.tenant_id.clone(),
            key_hash,
            response_id: response_id.clone(),
            created_at: now,
            expires_at,
        };

        tx.insert_idempotency(&record).map_err(|err| {
            let err = CommandError::from(err);
            if let CommandError::DuplicateInFlight(_) = err {
                warn!(%operation, actor = %actor.user_id, "concurrent duplicate request");
            }
            err
        })?;

        debug!(%operation, actor = %actor.user_id, %response_id, "idempotency key recorded");
        Ok(response_id)
    }
}
