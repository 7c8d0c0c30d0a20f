//! # Read-Through TTL Cache
//!
//! Backs the validator caches (§4.2 email MX, §4.4 tax-id VIES, §4.3 geocode)
//! so repeated lookups for the same key inside the TTL window don't re-hit an
//! external collaborator.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// A TTL-keyed string cache. Values are caller-serialized (usually JSON) so a
/// single implementation serves every validator's result type.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String, ttl: chrono::Duration);
}

/// In-memory cache backed by a `DashMap`. Expired entries are removed lazily,
/// on the next `get` that observes them — there is no background sweeper.
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored, including ones that have expired
    /// but haven't been swept by a `get` yet. Exposed for tests and metrics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn set(&self, key: &str, value: String, ttl: chrono::Duration) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Utc::now() + ttl,
            },
        );
    }
}
