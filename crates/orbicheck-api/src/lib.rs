//! # orbicheck-api — HTTP Surface for OrbiCheck
//!
//! Validation, deduplication, dedupe-merge, order risk evaluation, rule
//! catalogues, and event-log access for e-commerce order pipelines.
//!
//! ## API Surface
//!
//! | Prefix                               | Module              | Domain                 |
//! |---------------------------------------|---------------------|-------------------------|
//! | `/v1/validate/email`                  | [`routes::validate`]| Email validation (§4.2) |
//! | `/v1/validate/phone`                  | [`routes::validate`]| Phone validation (§4.3) |
//! | `/v1/verify/phone`                    | [`routes::verify`]  | OTP verification         |
//! | `/v1/validate/address`                | [`routes::validate`]| Address validation (§4.4)|
//! | `/v1/validate/tax-id`                 | [`routes::validate`]| Tax-id validation (§4.5) |
//! | `/v1/validate/name`                   | [`routes::validate`]| Name format check        |
//! | `/v1/normalize/address`                | [`routes::normalize`]| Cheap normalization      |
//! | `/v1/dedupe/customer`, `/address`, `/merge` | [`routes::dedupe`] | Dedupe (§4.6) |
//! | `/v1/orders/evaluate`                  | [`routes::orders`]  | Order risk eval (§4.11) |
//! | `/v1/rules`, `/rules/catalog`, `/rules/catalog/error-codes` | [`routes::rules`] | Catalogues |
//! | `/v1/data/logs[/:id]`, `/v1/data/usage` | [`routes::data`]   | Event log (§4.13)        |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! RequestIdMiddleware → TimeoutLayer(10s) → TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → IdempotencyMiddleware → Handler
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod webhook;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware so
/// they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    // Body size limit: 2 MiB. Individual routes needing larger payloads
    // would override with a route-level DefaultBodyLimit.
    //
    // Middleware execution order (outermost -> innermost):
    //   RequestIdMiddleware -> TimeoutLayer(10s) -> TraceLayer -> MetricsMiddleware
    //   -> AuthMiddleware -> RateLimitMiddleware -> IdempotencyMiddleware -> Handler
    //
    // Auth runs before rate limiting so unauthenticated requests are
    // rejected without consuming rate-limit quota. Request-id assignment
    // runs before everything else so every response, success or failure,
    // can carry the same id.
    let api = Router::new()
        .route("/v1/validate/email", post(routes::validate::validate_email))
        .route("/v1/validate/phone", post(routes::validate::validate_phone))
        .route("/v1/verify/phone", post(routes::verify::verify_phone))
        .route("/v1/validate/address", post(routes::validate::validate_address))
        .route("/v1/validate/tax-id", post(routes::validate::validate_tax_id))
        .route("/v1/validate/name", post(routes::validate::validate_name))
        .route("/v1/normalize/address", post(routes::normalize::normalize_address))
        .route("/v1/dedupe/customer", post(routes::dedupe::dedupe_customer))
        .route("/v1/dedupe/address", post(routes::dedupe::dedupe_address))
        .route("/v1/dedupe/merge", post(routes::dedupe::dedupe_merge))
        .route("/v1/orders/evaluate", post(routes::orders::evaluate_order))
        .route("/v1/rules", get(routes::rules::list_rules))
        .route("/v1/rules/catalog", get(routes::rules::rule_catalog))
        .route(
            "/v1/rules/catalog/error-codes",
            get(routes::rules::error_code_catalog),
        )
        .route(
            "/v1/data/logs",
            get(routes::data::list_logs).delete(routes::data::delete_all_logs),
        )
        .route("/v1/data/logs/:id", delete(routes::data::delete_log))
        .route("/v1/data/usage", get(routes::data::usage))
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn_with_state(state.clone(), middleware::idempotency::idempotency_middleware))
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(from_fn_with_state(state.clone(), middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            tower::ServiceBuilder::new()
                .layer(axum::error_handling::HandleErrorLayer::new(handle_request_timeout))
                .layer(TimeoutLayer::new(Duration::from_secs(10))),
        )
        .layer(axum::middleware::from_fn(middleware::request_id::request_id_middleware))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn handle_request_timeout(err: tower::BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("unhandled error: {err}"))
    }
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks the in-memory stores are reachable and, when a pool is
/// configured, that the database answers a trivial query.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.rule_engine.try_read();

    if let Some(pool) = &state.db_pool {
        if let Err(err) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %err, "database health check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
