//! # Rate Limiting (§4.7)
//!
//! Runs after auth, so a limiter key is always `{project_id}:{bucket}` —
//! unauthenticated traffic never reaches this layer and can't consume a
//! tenant's quota. `bucket` is the first two path segments (e.g.
//! `v1/orders`), grouping an endpoint family under one window rather than
//! one window per exact route.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use orbicheck_cache::RateLimitDecision;

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

fn bucket_of(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .take(2)
        .collect::<Vec<_>>()
        .join("/")
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let project_id = request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.project_id.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let bucket = bucket_of(request.uri().path());
    let key = format!("{project_id}:{bucket}");

    match state.rate_limiter.check(&key) {
        RateLimitDecision::Allowed { .. } => Ok(next.run(request).await),
        RateLimitDecision::Limited { retry_after_secs } => Err(ApiError::RateLimited {
            retry_after_secs: retry_after_secs.max(0) as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_groups_by_first_two_segments() {
        assert_eq!(bucket_of("/v1/orders/evaluate"), "v1/orders");
        assert_eq!(bucket_of("/v1/data/logs/123"), "v1/data");
    }

    #[test]
    fn bucket_handles_short_paths() {
        assert_eq!(bucket_of("/health"), "health");
    }
}
