//! Integration tests for orbicheck-api: health probes, auth enforcement,
//! and the happy/error paths of each route group, driven through the real
//! Axum router via `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use orbicheck_api::auth::ApiKeyRecord;
use orbicheck_api::config::Config;
use orbicheck_api::state::AppState;

async fn test_state() -> AppState {
    let mut config = Config::from_env();
    config.database_url = None;
    AppState::new(config, None).await
}

fn seed_api_key(state: &AppState, project_id: &str) -> String {
    let key = orbicheck_crypto::api_key::generate();
    state.credentials.insert_api_key(ApiKeyRecord {
        project_id: project_id.to_string(),
        prefix: key.prefix.clone(),
        hash: key.hash.clone(),
        scopes: vec!["runtime".to_string()],
    });
    key.token
}

async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn liveness_probe_returns_ok_without_auth() {
    let state = test_state().await;
    let app = orbicheck_api::app(state);
    let response = app
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readiness_probe_is_ok_without_a_database() {
    let state = test_state().await;
    let app = orbicheck_api::app(state);
    let response = app
        .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn validate_email_without_credentials_is_unauthorized() {
    let state = test_state().await;
    let app = orbicheck_api::app(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/validate/email")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"email":"test@example.com"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn validate_name_happy_path_with_api_key() {
    let state = test_state().await;
    let token = seed_api_key(&state, "proj_1");
    let app = orbicheck_api::app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/validate/name")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(r#"{"name":"Jane Doe"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn orders_evaluate_rejects_empty_order_id() {
    let state = test_state().await;
    let token = seed_api_key(&state, "proj_1");
    let app = orbicheck_api::app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/orders/evaluate")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    r#"{
                        "order_id": "",
                        "total_amount": 10.0,
                        "currency": "USD",
                        "customer": {"first_name": "A", "last_name": "B"},
                        "shipping_address": {
                            "line1": "1 Main St",
                            "city": "Springfield",
                            "postal_code": "12345",
                            "country": "US"
                        }
                    }"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dedupe_merge_rejects_empty_ids() {
    let state = test_state().await;
    let token = seed_api_key(&state, "proj_1");
    let app = orbicheck_api::app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/dedupe/merge")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(r#"{"type":"customer","ids":[],"canonical_id":"cust_1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dedupe_merge_rejects_canonical_id_inside_ids() {
    let state = test_state().await;
    let token = seed_api_key(&state, "proj_1");
    let app = orbicheck_api::app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/dedupe/merge")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    r#"{"type":"customer","ids":["cust_1"],"canonical_id":"cust_1"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rules_catalog_lists_action_kinds_and_fields() {
    let state = test_state().await;
    let token = seed_api_key(&state, "proj_1");
    let app = orbicheck_api::app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/rules/catalog")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["action_kinds"].as_array().unwrap().contains(&serde_json::json!("block")));
}

#[tokio::test]
async fn error_code_catalog_includes_known_reason_codes() {
    let state = test_state().await;
    let token = seed_api_key(&state, "proj_1");
    let app = orbicheck_api::app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/rules/catalog/error-codes")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let codes: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["code"].as_str().unwrap().to_string())
        .collect();
    assert!(codes.contains(&"email.invalid_format".to_string()));
}

#[tokio::test]
async fn data_usage_reflects_logged_events() {
    let state = test_state().await;
    let token = seed_api_key(&state, "proj_1");
    let app = orbicheck_api::app(state.clone());

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/dedupe/merge")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(r#"{"type":"customer","ids":["cust_1"],"canonical_id":"cust_2"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/data/usage")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["event_count"], 1);
}

#[tokio::test]
async fn data_is_scoped_per_project() {
    let state = test_state().await;
    let token_a = seed_api_key(&state, "proj_a");
    let token_b = seed_api_key(&state, "proj_b");
    let app = orbicheck_api::app(state.clone());

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/dedupe/merge")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token_a}"))
                .body(Body::from(r#"{"type":"customer","ids":["cust_1"],"canonical_id":"cust_2"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/data/usage")
                .header("authorization", format!("Bearer {token_b}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["event_count"], 0);
}

