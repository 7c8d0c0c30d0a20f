//! `GET/DELETE /v1/data/logs[/:id]`, `GET /v1/data/usage` (§4.13).

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::Deserialize;

use orbicheck_core::TenantScoped;
use orbicheck_orders::{LogPage, DEFAULT_LOG_PAGE_SIZE};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListLogsQuery {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

/// Paginates by the opaque cursor `EventLog::list` hands back, in
/// descending `created_at` order (§4.13).
pub async fn list_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListLogsQuery>,
) -> Json<LogPage> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_PAGE_SIZE);
    Json(
        state
            .event_log
            .list(TenantScoped::new(&auth.project_id), query.cursor.as_deref(), limit)
            .await,
    )
}

pub async fn delete_all_logs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Json<DeleteSummary> {
    let deleted = state.event_log.delete(TenantScoped::new(&auth.project_id), None).await;
    Json(DeleteSummary { deleted })
}

pub async fn delete_log(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSummary>, ApiError> {
    let deleted = state
        .event_log
        .delete(TenantScoped::new(&auth.project_id), Some(&id))
        .await;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("log {id} not found")));
    }
    Ok(Json(DeleteSummary { deleted }))
}

#[derive(serde::Serialize)]
pub struct DeleteSummary {
    pub deleted: usize,
}

#[derive(serde::Serialize)]
pub struct UsageSummary {
    pub project_id: String,
    pub event_count: usize,
}

pub async fn usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Json<UsageSummary> {
    let tenant = TenantScoped::new(&auth.project_id);
    let mut event_count = 0;
    let mut cursor = None;
    loop {
        let page = state.event_log.list(tenant, cursor.as_deref(), orbicheck_orders::MAX_LOG_PAGE_SIZE).await;
        event_count += page.records.len();
        cursor = page.next_cursor;
        if cursor.is_none() {
            break;
        }
    }
    Json(UsageSummary {
        project_id: auth.project_id,
        event_count,
    })
}
