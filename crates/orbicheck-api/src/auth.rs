//! # Auth (§4.9)
//!
//! A preHandler resolves credentials by detection order — session cookie,
//! then `Bearer` prefix (API key or PAT), then `HMAC ...` scheme — and
//! attaches an [`AuthContext`] to the request on success. Route classes
//! (*public*/*dashboard*/*management*/*runtime*) are encoded per-route via
//! [`require`] rather than a blanket middleware, since this service has no
//! dashboard surface of its own (§13 Non-goals) — every mounted route here
//! is *runtime* class and accepts any successful credential.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use dashmap::DashMap;

use orbicheck_crypto::{api_key, hmac_sign, pat};

use crate::error::ApiError;
use crate::state::AppState;

const HMAC_CLOCK_SKEW_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub project_id: String,
    pub user_id: Option<String>,
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub project_id: String,
    pub prefix: String,
    pub hash: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PatRecord {
    pub project_id: String,
    pub user_id: String,
    pub hash: String,
    pub pepper: String,
}

#[derive(Debug, Clone)]
pub struct HmacKeyRecord {
    pub project_id: String,
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub project_id: String,
    pub user_id: String,
}

/// In-memory credential directories. Seeded by tests and, in a real
/// deployment, by whatever management-route handlers create credentials —
/// those handlers are out of scope here (§13: user registration).
#[derive(Default, Clone)]
pub struct CredentialStore {
    api_keys_by_prefix: Arc<DashMap<String, ApiKeyRecord>>,
    pats_by_prefix: Arc<DashMap<String, PatRecord>>,
    hmac_keys: Arc<DashMap<String, HmacKeyRecord>>,
    sessions: Arc<DashMap<String, SessionRecord>>,
}

impl CredentialStore {
    pub fn insert_api_key(&self, record: ApiKeyRecord) {
        self.api_keys_by_prefix.insert(record.prefix.clone(), record);
    }

    pub fn insert_pat(&self, prefix: String, record: PatRecord) {
        self.pats_by_prefix.insert(prefix, record);
    }

    pub fn insert_hmac_key(&self, key_id: String, record: HmacKeyRecord) {
        self.hmac_keys.insert(key_id, record);
    }

    pub fn insert_session(&self, session_id: String, record: SessionRecord) {
        self.sessions.insert(session_id, record);
    }
}

/// Detect and verify a credential from the request, returning the resolved
/// [`AuthContext`] or the category-specific `401` for the failure mode.
pub async fn resolve(
    credentials: &CredentialStore,
    jar: &CookieJar,
    method: &str,
    url: &str,
    authorization: Option<&str>,
) -> Result<AuthContext, ApiError> {
    if let Some(session_id) = jar.get("orbicheck_session").map(|c| c.value().to_string()) {
        return credentials
            .sessions
            .get(&session_id)
            .map(|r| AuthContext {
                project_id: r.project_id.clone(),
                user_id: Some(r.user_id.clone()),
                scopes: None,
            })
            .ok_or_else(|| ApiError::InvalidToken("unknown session".to_string()));
    }

    let Some(header) = authorization else {
        return Err(ApiError::Unauthorized("missing credentials".to_string()));
    };

    if let Some(token) = header.strip_prefix("Bearer ") {
        return verify_bearer(credentials, token);
    }

    if let Some(params) = header.strip_prefix("HMAC ") {
        return verify_hmac(credentials, params, method, url);
    }

    Err(ApiError::Unauthorized("unrecognized auth scheme".to_string()))
}

fn verify_bearer(credentials: &CredentialStore, token: &str) -> Result<AuthContext, ApiError> {
    let prefix = api_key::prefix_of(token);
    let hash = api_key::hash_token(token);

    if let Some(record) = credentials.api_keys_by_prefix.get(&prefix) {
        if record.hash == hash {
            return Ok(AuthContext {
                project_id: record.project_id.clone(),
                user_id: None,
                scopes: Some(record.scopes.clone()),
            });
        }
    }

    if let Some(record) = credentials.pats_by_prefix.get(&prefix) {
        if pat::verify_with_pepper(token, &record.pepper, &record.hash).unwrap_or(false) {
            return Ok(AuthContext {
                project_id: record.project_id.clone(),
                user_id: Some(record.user_id.clone()),
                scopes: None,
            });
        }
    }

    Err(ApiError::InvalidToken("bearer token not recognized".to_string()))
}

/// Parses `keyId=...&ts=...&nonce=...&signature=...` and verifies per
/// Decision D3: `HMAC-SHA256(full_key, METHOD ∥ url ∥ ts ∥ nonce)`.
fn verify_hmac(
    credentials: &CredentialStore,
    params: &str,
    method: &str,
    url: &str,
) -> Result<AuthContext, ApiError> {
    let parsed = parse_hmac_params(params);
    let (key_id, ts, nonce, signature) = match (
        parsed.get("keyId"),
        parsed.get("ts"),
        parsed.get("nonce"),
        parsed.get("signature"),
    ) {
        (Some(k), Some(t), Some(n), Some(s)) => (k, t, n, s),
        _ => return Err(ApiError::InvalidToken("malformed HMAC scheme".to_string())),
    };

    let ts_value: i64 = ts
        .parse()
        .map_err(|_| ApiError::InvalidToken("malformed ts".to_string()))?;
    if (Utc::now().timestamp() - ts_value).abs() > HMAC_CLOCK_SKEW_SECS {
        return Err(ApiError::InvalidToken("ts outside allowed skew".to_string()));
    }

    let record = credentials
        .hmac_keys
        .get(key_id)
        .ok_or_else(|| ApiError::InvalidToken("unknown keyId".to_string()))?;

    let message = hmac_sign::canonical_request_message(method, url, ts, nonce);
    if !hmac_sign::verify_hex(record.secret.as_bytes(), &message, signature) {
        return Err(ApiError::InvalidToken("signature mismatch".to_string()));
    }

    Ok(AuthContext {
        project_id: record.project_id.clone(),
        user_id: None,
        scopes: None,
    })
}

fn parse_hmac_params(raw: &str) -> std::collections::HashMap<String, String> {
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Axum middleware wiring `resolve` into the request pipeline. Runs before
/// rate limiting (§: auth failures shouldn't burn rate-limit quota).
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = request.method().to_string();
    let url = request.uri().path_and_query().map(|p| p.as_str()).unwrap_or("").to_string();
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let ctx = resolve(
        &state.credentials,
        &jar,
        &method,
        &url,
        authorization.as_deref(),
    )
    .await?;

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Extract the project id an already-authenticated request resolved to,
/// or `500` — this would mean the middleware wasn't mounted on this route.
pub fn project_id(request: &Request) -> Result<String, ApiError> {
    request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.project_id.clone())
        .ok_or_else(|| ApiError::internal("auth middleware did not run for this route"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_api_key() -> (CredentialStore, String) {
        let store = CredentialStore::default();
        let generated = api_key::generate();
        store.insert_api_key(ApiKeyRecord {
            project_id: "proj_1".to_string(),
            prefix: generated.prefix.clone(),
            hash: generated.hash.clone(),
            scopes: vec!["runtime".to_string()],
        });
        (store, generated.token)
    }

    #[tokio::test]
    async fn bearer_api_key_resolves_project() {
        let (store, token) = store_with_api_key();
        let jar = CookieJar::new();
        let header = format!("Bearer {token}");
        let ctx = resolve(&store, &jar, "POST", "/v1/orders/evaluate", Some(&header))
            .await
            .unwrap();
        assert_eq!(ctx.project_id, "proj_1");
    }

    #[tokio::test]
    async fn wrong_bearer_token_is_rejected() {
        let (store, _token) = store_with_api_key();
        let jar = CookieJar::new();
        let ctx = resolve(&store, &jar, "POST", "/v1/orders/evaluate", Some("Bearer sk_live_wrong"))
            .await;
        assert!(matches!(ctx, Err(ApiError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn missing_authorization_is_unauthorized() {
        let store = CredentialStore::default();
        let jar = CookieJar::new();
        let ctx = resolve(&store, &jar, "POST", "/v1/orders/evaluate", None).await;
        assert!(matches!(ctx, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn valid_hmac_signature_resolves_project() {
        let store = CredentialStore::default();
        store.insert_hmac_key(
            "key_1".to_string(),
            HmacKeyRecord {
                project_id: "proj_2".to_string(),
                secret: "shh".to_string(),
            },
        );
        let ts = Utc::now().timestamp().to_string();
        let nonce = "n1";
        let message = hmac_sign::canonical_request_message("POST", "/v1/orders/evaluate", &ts, nonce);
        let signature = hmac_sign::sign_hex(b"shh", &message);
        let header = format!("HMAC keyId=key_1&ts={ts}&nonce={nonce}&signature={signature}");

        let jar = CookieJar::new();
        let ctx = resolve(&store, &jar, "POST", "/v1/orders/evaluate", Some(&header))
            .await
            .unwrap();
        assert_eq!(ctx.project_id, "proj_2");
    }

    #[tokio::test]
    async fn hmac_signature_over_wrong_path_is_rejected() {
        let store = CredentialStore::default();
        store.insert_hmac_key(
            "key_1".to_string(),
            HmacKeyRecord {
                project_id: "proj_2".to_string(),
                secret: "shh".to_string(),
            },
        );
        let ts = Utc::now().timestamp().to_string();
        let message = hmac_sign::canonical_request_message("POST", "/v1/orders/evaluate", &ts, "n1");
        let signature = hmac_sign::sign_hex(b"shh", &message);
        let header = format!("HMAC keyId=key_1&ts={ts}&nonce=n1&signature={signature}");

        let jar = CookieJar::new();
        let ctx = resolve(&store, &jar, "POST", "/v1/dedupe/customer", Some(&header)).await;
        assert!(matches!(ctx, Err(ApiError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn hmac_timestamp_outside_skew_is_rejected() {
        let store = CredentialStore::default();
        store.insert_hmac_key(
            "key_1".to_string(),
            HmacKeyRecord {
                project_id: "proj_2".to_string(),
                secret: "shh".to_string(),
            },
        );
        let stale_ts = (Utc::now().timestamp() - 10_000).to_string();
        let message = hmac_sign::canonical_request_message("POST", "/v1/orders/evaluate", &stale_ts, "n1");
        let signature = hmac_sign::sign_hex(b"shh", &message);
        let header = format!("HMAC keyId=key_1&ts={stale_ts}&nonce=n1&signature={signature}");

        let jar = CookieJar::new();
        let ctx = resolve(&store, &jar, "POST", "/v1/orders/evaluate", Some(&header)).await;
        assert!(matches!(ctx, Err(ApiError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn session_cookie_takes_priority_over_authorization_header() {
        let store = CredentialStore::default();
        store.insert_session(
            "sess_1".to_string(),
            SessionRecord {
                project_id: "proj_from_session".to_string(),
                user_id: "user_1".to_string(),
            },
        );
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            "orbicheck_session",
            "sess_1",
        ));
        let ctx = resolve(&store, &jar, "GET", "/v1/data/usage", Some("Bearer irrelevant"))
            .await
            .unwrap();
        assert_eq!(ctx.project_id, "proj_from_session");
    }
}
