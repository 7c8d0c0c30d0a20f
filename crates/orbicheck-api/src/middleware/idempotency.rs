//! # Idempotency (§4.8)
//!
//! Opt-in: a request without an `Idempotency-Key` header always runs fresh.
//! When present, a concurrent retry with the *same* request body waits
//! (bounded) for the in-flight attempt to finish rather than racing the
//! handler, and a replayed key gets back the exact first response rather
//! than re-running it. A retry that reuses the key with a *different* body
//! is rejected as `idempotency_conflict`. Keyed by
//! `{project_id}:{idempotency_key}` via [`orbicheck_cache::IdempotencyStore`].

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use orbicheck_cache::{CachedResponse, IdempotencyOutcome};
use orbicheck_crypto::sha256::sha256_hex;

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Upper bound on how long a concurrent retry waits for the in-flight
/// attempt to finish before giving up.
const IDEMPOTENCY_WAIT_BOUND_MS: u64 = 5_000;
const IDEMPOTENCY_POLL_INTERVAL_MS: u64 = 100;

pub async fn idempotency_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(idempotency_key) = request
        .headers()
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
    else {
        return Ok(next.run(request).await);
    };

    let project_id = request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.project_id.clone())
        .unwrap_or_else(|| "anonymous".to_string());
    let key = format!("{project_id}:{idempotency_key}");

    let (parts, body) = request.into_parts();
    let body_bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::internal("failed to buffer request body"))?;
    let body_hash = sha256_hex(&body_bytes);
    let request = Request::from_parts(parts, Body::from(body_bytes));

    match state.idempotency.begin(&key, &body_hash) {
        IdempotencyOutcome::Conflict => {
            return Err(ApiError::IdempotencyConflict(
                "this idempotency key was already used with a different request body".to_string(),
            ))
        }
        IdempotencyOutcome::Replay(cached) => return Ok(cached_response(cached)),
        IdempotencyOutcome::Start => {}
        IdempotencyOutcome::InProgress => {
            match wait_for_completion(&state, &key, &body_hash).await {
                Some(cached) => return Ok(cached_response(cached)),
                None => {
                    return Err(ApiError::IdempotencyConflict(
                        "a request with this idempotency key is still in progress".to_string(),
                    ))
                }
            }
        }
    }

    let response = next.run(request).await;
    let status = response.status();
    let (parts, body) = response.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            state.idempotency.abandon(&key);
            return Err(ApiError::internal("failed to buffer response body"));
        }
    };

    if status.is_server_error() {
        state.idempotency.abandon(&key);
    } else {
        let body_json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        state.idempotency.complete(
            &key,
            &body_hash,
            CachedResponse {
                status: status.as_u16(),
                body: body_json,
            },
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

/// Poll the store until the in-flight attempt for `key` completes or
/// `IDEMPOTENCY_WAIT_BOUND_MS` elapses. Returns `None` on timeout or on a
/// hash mismatch discovered mid-wait (the in-flight attempt was itself
/// replaced, which this caller's unchanged body hash can't match).
async fn wait_for_completion(state: &AppState, key: &str, body_hash: &str) -> Option<CachedResponse> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(IDEMPOTENCY_WAIT_BOUND_MS);
    loop {
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(IDEMPOTENCY_POLL_INTERVAL_MS)).await;
        match state.idempotency.begin(key, body_hash) {
            IdempotencyOutcome::Replay(cached) => return Some(cached),
            IdempotencyOutcome::InProgress => continue,
            IdempotencyOutcome::Conflict => return None,
            IdempotencyOutcome::Start => {
                // The original attempt's sentinel expired without completing.
                // `begin` just reclaimed the slot under this waiter, but this
                // call site has no handler to run to fill it — release it so
                // a future request isn't wedged behind a slot nobody owns.
                state.idempotency.abandon(key);
                return None;
            }
        }
    }
}

fn cached_response(cached: CachedResponse) -> Response {
    let status = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK);
    let mut response = (status, Json(cached.body)).into_response();
    response
        .headers_mut()
        .insert("idempotency-replayed", HeaderValue::from_static("true"));
    response
}
