//! `POST /v1/dedupe/{customer,address,merge}` (§4.6, §5).

use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;

use orbicheck_core::digest::canonical_json;
use orbicheck_core::TenantScoped;
use orbicheck_crypto::sha256::sha256_hex;
use orbicheck_dedupe::{
    address as address_dedupe, customer as customer_dedupe, AddressDedupeQuery, AddressRecord,
    CustomerDedupeQuery, CustomerRecord, DedupeResult,
};
use orbicheck_orders::{EventAppend, EventType};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomerDedupeRequest {
    pub normalized_email: Option<String>,
    pub normalized_phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

pub async fn dedupe_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CustomerDedupeRequest>,
) -> Result<Json<DedupeResult>, ApiError> {
    let query = CustomerDedupeQuery {
        normalized_email: body.normalized_email,
        normalized_phone: body.normalized_phone,
        first_name: body.first_name,
        last_name: body.last_name,
    };
    let existing: Vec<CustomerRecord> = state.customer_store.list(TenantScoped::new(&auth.project_id)).await;
    Ok(Json(customer_dedupe::find_candidates(&query, &existing)))
}

#[derive(Debug, Deserialize)]
pub struct AddressDedupeRequest {
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

pub async fn dedupe_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<AddressDedupeRequest>,
) -> Result<Json<DedupeResult>, ApiError> {
    let canonical = serde_json::json!({
        "line1": body.line1.trim().to_lowercase(),
        "city": body.city.trim().to_lowercase(),
        "postal_code": body.postal_code.trim().to_lowercase(),
        "country": body.country.trim().to_uppercase(),
    });
    let address_hash = sha256_hex(canonical_json(&canonical).as_bytes());

    let query = AddressDedupeQuery {
        address_hash,
        postal_code: body.postal_code,
        city: body.city,
        country: body.country,
        line1: body.line1,
    };
    let existing: Vec<AddressRecord> = state.address_store.list(TenantScoped::new(&auth.project_id)).await;
    Ok(Json(address_dedupe::find_candidates(&query, &existing)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeType {
    Customer,
    Address,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    #[serde(rename = "type")]
    pub merge_type: MergeType,
    pub ids: Vec<String>,
    pub canonical_id: String,
}

#[derive(Debug, serde::Serialize)]
pub struct MergeResponse {
    pub merged_ids: Vec<String>,
    pub canonical_id: String,
}

/// Re-points non-canonical records to `canonical_id` and appends a
/// `dedupe.merge` event-log entry (Decision D2).
pub async fn dedupe_merge(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, ApiError> {
    if body.ids.is_empty() {
        return Err(ApiError::InvalidIds("ids must not be empty".to_string()));
    }
    if body.ids.contains(&body.canonical_id) {
        return Err(ApiError::InvalidIds(
            "canonical_id must not appear in ids".to_string(),
        ));
    }

    let merged_ids: Vec<String> = body.ids;
    let tenant = TenantScoped::new(&auth.project_id);

    match body.merge_type {
        MergeType::Customer => state.customer_store.merge(tenant, &body.canonical_id, &merged_ids).await,
        MergeType::Address => state.address_store.merge(tenant, &body.canonical_id, &merged_ids).await,
    }

    state
        .event_log
        .append(
            tenant,
            EventAppend::new(
                EventType::DedupeMerge,
                "dedupe.merge",
                "merged",
                serde_json::json!({
                    "canonical_id": body.canonical_id,
                    "merged_ids": merged_ids,
                }),
            ),
        )
        .await;

    Ok(Json(MergeResponse {
        merged_ids,
        canonical_id: body.canonical_id,
    }))
}
