//! `POST /v1/verify/phone` — confirm an OTP issued by `/v1/validate/phone`.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyPhoneRequest {
    pub verification_sid: String,
    pub code: String,
}

pub async fn verify_phone(
    State(state): State<AppState>,
    Json(body): Json<VerifyPhoneRequest>,
) -> Result<Json<orbicheck_validate::OtpCheckResult>, ApiError> {
    if body.verification_sid.trim().is_empty() || body.code.trim().is_empty() {
        return Err(ApiError::Validation(
            "verification_sid and code are required".to_string(),
        ));
    }
    Ok(Json(
        state
            .phone_validator
            .verify_otp(&body.verification_sid, &body.code)
            .await,
    ))
}
