//! `POST /v1/validate/{email,phone,address,tax-id,name}` (§4.2-§4.5, §4.5 new).

use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;

use orbicheck_core::RequestId;
use orbicheck_validate::{AddressInput, TaxIdInput};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

pub async fn validate_email(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<orbicheck_validate::EmailValidationResult>, ApiError> {
    if body.email.trim().is_empty() {
        return Err(ApiError::Validation("email must not be empty".to_string()));
    }
    let mut result = state.email_validator.validate(&body.email).await;
    result.request_id = request_id.to_string();
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct PhoneRequest {
    pub phone: String,
    pub country_hint: Option<String>,
    #[serde(default)]
    pub request_otp: bool,
}

pub async fn validate_phone(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<PhoneRequest>,
) -> Result<Json<orbicheck_validate::PhoneValidationResult>, ApiError> {
    if body.phone.trim().is_empty() {
        return Err(ApiError::Validation("phone must not be empty".to_string()));
    }
    let mut result = state
        .phone_validator
        .validate(&body.phone, body.country_hint.as_deref(), body.request_otp)
        .await;
    result.request_id = request_id.to_string();
    Ok(Json(result))
}

pub async fn validate_address(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<AddressInput>,
) -> Result<Json<orbicheck_validate::AddressValidationResult>, ApiError> {
    if body.line1.trim().is_empty() || body.country.trim().is_empty() {
        return Err(ApiError::Validation(
            "line1 and country must not be empty".to_string(),
        ));
    }
    let mut result = state.address_validator.validate(&body).await;
    result.request_id = request_id.to_string();
    Ok(Json(result))
}

pub async fn validate_tax_id(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<TaxIdInput>,
) -> Result<Json<orbicheck_validate::TaxIdValidationResult>, ApiError> {
    if body.value.trim().is_empty() {
        return Err(ApiError::Validation("value must not be empty".to_string()));
    }
    let mut result = state.taxid_validator.validate(&body).await;
    result.request_id = request_id.to_string();
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

pub async fn validate_name(
    Json(body): Json<NameRequest>,
) -> Result<Json<orbicheck_validate::NameValidationResult>, ApiError> {
    if body.name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    Ok(Json(orbicheck_validate::validate_name(&body.name)))
}
