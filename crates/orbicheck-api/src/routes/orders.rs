//! `POST /v1/orders/evaluate` (§4.11).

use axum::extract::{Extension, State};
use axum::Json;

use orbicheck_core::RequestId;
use orbicheck_orders::{OrderEvaluationResult, OrderInput};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn evaluate_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<OrderInput>,
) -> Result<Json<OrderEvaluationResult>, ApiError> {
    if body.order_id.trim().is_empty() {
        return Err(ApiError::Validation("order_id must not be empty".to_string()));
    }
    if body.total_amount < 0.0 {
        return Err(ApiError::Validation(
            "total_amount must not be negative".to_string(),
        ));
    }

    let mut result = state.order_evaluator.evaluate(&auth.project_id, body).await;
    result.request_id = request_id.to_string();
    Ok(Json(result))
}
