//! # Idempotency Single-Flight Store
//!
//! §4.8: a client retrying the same `Idempotency-Key` within 24h must get
//! back the exact first response rather than re-running the request body.
//! Concurrent retries for a key still in flight wait (bounded) for that
//! first attempt to finish rather than racing the handler. A retry that
//! reuses the key with a *different* request body is a caller bug, not a
//! legitimate retry, and is rejected outright.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

const DEFAULT_TTL_HOURS: i64 = 24;

/// A crashed or cancelled handler leaves its slot `InProgress` forever
/// unless something reclaims it — this bounds how long a concurrent
/// retry has to wait before the key becomes claimable again.
const IN_PROGRESS_SENTINEL_TTL_SECS: i64 = 30;

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

enum Slot {
    InProgress {
        started_at: DateTime<Utc>,
        body_hash: String,
    },
    Completed {
        response: CachedResponse,
        body_hash: String,
        expires_at: DateTime<Utc>,
    },
}

pub enum IdempotencyOutcome {
    /// No prior attempt for this key — caller should run the handler and
    /// then call `complete`.
    Start,
    /// A prior attempt with this key and the same request body is still
    /// running — caller should poll `begin` again until it resolves.
    InProgress,
    /// A prior attempt already completed; replay its response verbatim.
    Replay(CachedResponse),
    /// This key is in use (in flight or completed) for a *different*
    /// request body (§4.8: "distinct request bodies under the same key
    /// are rejected").
    Conflict,
}

/// Keyed by `"{project_id}:{idempotency_key}"` so keys can't collide across
/// tenants.
#[derive(Default)]
pub struct IdempotencyStore {
    slots: DashMap<String, Slot>,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to claim `key` for a fresh request carrying `body_hash`
    /// (the sha256 digest of the raw request body). Sweeps the slot first
    /// if it holds an expired completed response or a stale in-progress
    /// sentinel, so a key becomes reusable after its TTL elapses.
    pub fn begin(&self, key: &str, body_hash: &str) -> IdempotencyOutcome {
        if let Some(slot) = self.slots.get(key) {
            match &*slot {
                Slot::InProgress { started_at, body_hash: existing_hash } => {
                    let age = (Utc::now() - *started_at).num_seconds();
                    if age < IN_PROGRESS_SENTINEL_TTL_SECS {
                        return if existing_hash == body_hash {
                            IdempotencyOutcome::InProgress
                        } else {
                            IdempotencyOutcome::Conflict
                        };
                    }
                }
                Slot::Completed { response, body_hash: existing_hash, expires_at } => {
                    if *expires_at > Utc::now() {
                        return if existing_hash == body_hash {
                            IdempotencyOutcome::Replay(response.clone())
                        } else {
                            IdempotencyOutcome::Conflict
                        };
                    }
                }
            }
        }
        self.slots.insert(
            key.to_string(),
            Slot::InProgress {
                started_at: Utc::now(),
                body_hash: body_hash.to_string(),
            },
        );
        IdempotencyOutcome::Start
    }

    /// Record the outcome of a request started via `begin`, making it
    /// available for replay for the default TTL.
    pub fn complete(&self, key: &str, body_hash: &str, response: CachedResponse) {
        self.slots.insert(
            key.to_string(),
            Slot::Completed {
                response,
                body_hash: body_hash.to_string(),
                expires_at: Utc::now() + chrono::Duration::hours(DEFAULT_TTL_HOURS),
            },
        );
    }

    /// Release a claimed-but-abandoned slot, e.g. when the handler errors
    /// before producing a response worth caching. Without this a failed
    /// request would permanently wedge the key in `InProgress`.
    pub fn abandon(&self, key: &str) {
        self.slots.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> CachedResponse {
        CachedResponse {
            status: 200,
            body: serde_json::json!({"ok": true}),
        }
    }

    #[test]
    fn first_call_starts() {
        let store = IdempotencyStore::new();
        assert!(matches!(store.begin("k", "hash-a"), IdempotencyOutcome::Start));
    }

    #[test]
    fn concurrent_call_with_same_body_sees_in_progress() {
        let store = IdempotencyStore::new();
        store.begin("k", "hash-a");
        assert!(matches!(store.begin("k", "hash-a"), IdempotencyOutcome::InProgress));
    }

    #[test]
    fn concurrent_call_with_different_body_conflicts() {
        let store = IdempotencyStore::new();
        store.begin("k", "hash-a");
        assert!(matches!(store.begin("k", "hash-b"), IdempotencyOutcome::Conflict));
    }

    #[test]
    fn completed_call_replays_for_same_body() {
        let store = IdempotencyStore::new();
        store.begin("k", "hash-a");
        store.complete("k", "hash-a", response());
        match store.begin("k", "hash-a") {
            IdempotencyOutcome::Replay(r) => assert_eq!(r.status, 200),
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn completed_call_conflicts_for_different_body() {
        let store = IdempotencyStore::new();
        store.begin("k", "hash-a");
        store.complete("k", "hash-a", response());
        assert!(matches!(store.begin("k", "hash-b"), IdempotencyOutcome::Conflict));
    }

    #[test]
    fn abandon_frees_the_key() {
        let store = IdempotencyStore::new();
        store.begin("k", "hash-a");
        store.abandon("k");
        assert!(matches!(store.begin("k", "hash-a"), IdempotencyOutcome::Start));
    }

    #[test]
    fn stale_in_progress_sentinel_becomes_claimable() {
        let store = IdempotencyStore::new();
        store.slots.insert(
            "k".to_string(),
            Slot::InProgress {
                started_at: Utc::now() - chrono::Duration::seconds(IN_PROGRESS_SENTINEL_TTL_SECS + 1),
                body_hash: "hash-a".to_string(),
            },
        );
        assert!(matches!(store.begin("k", "hash-b"), IdempotencyOutcome::Start));
    }

    #[test]
    fn distinct_keys_are_independent() {
        let store = IdempotencyStore::new();
        store.begin("a", "hash-a");
        assert!(matches!(store.begin("b", "hash-a"), IdempotencyOutcome::Start));
    }
}
