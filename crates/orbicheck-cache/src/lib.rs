//! Shared ephemeral state primitives: a read-through TTL cache, the fixed-window
//! rate limiter, the idempotency single-flight store, and the disposable-domain
//! set. Everything here is in-process (`DashMap`/`parking_lot`) — there is no
//! distributed cache in this workspace (§9/D4).

pub mod cache;
pub mod disposable;
pub mod idempotency;
pub mod rate_limit;

pub use cache::{Cache, InMemoryCache};
pub use disposable::DisposableDomainSet;
pub use idempotency::{CachedResponse, IdempotencyOutcome, IdempotencyStore};
pub use rate_limit::{RateLimitDecision, RateLimiter};
