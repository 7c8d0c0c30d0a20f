//! `POST /v1/normalize/address` (§4.6 of the expanded spec) — cheap,
//! cache-free, no reason codes: just step 1 of the full address validator.

use axum::Json;

use orbicheck_validate::{address, AddressInput, NormalizedAddress};

use crate::error::ApiError;

pub async fn normalize_address(
    Json(body): Json<AddressInput>,
) -> Result<Json<NormalizedAddress>, ApiError> {
    if body.line1.trim().is_empty() {
        return Err(ApiError::Validation("line1 must not be empty".to_string()));
    }
    Ok(Json(address::normalize(&body)))
}
