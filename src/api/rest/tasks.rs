//! Task batch endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use super::ApiError;
use crate::api::state::AppState;
use crate::types::Timestamp;

/// Query parameters for the batch endpoint
#[derive(Debug, Deserialize)]
pub struct TasksParams {
    /// Return the first batch starting strictly after this time
    #[serde(default)]
    pub start: Option<String>,
}

/// Parse `start`; empty or missing means "from the beginning"
pub fn parse_start(raw: Option<&str>) -> Result<Timestamp, std::num::ParseIntError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Timestamp::MIN),
        Some(s) => s.parse(),
    }
}

/// GET /tasks.json - Next batch after `start`
///
/// Waits while the batch hasn't been decoded yet. Once ingestion has ended
/// and nothing later exists, answers 404 with the terminal outcome.
pub async fn get_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TasksParams>,
) -> Response {
    let start = match parse_start(params.start.as_deref()) {
        Ok(start) => start,
        Err(e) => {
            let error = ApiError::bad_request(format!("invalid start: {}", e));
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    match state.store.read_batch_after(start).await {
        Ok(batch) => {
            debug!(start, id = batch.id, "serving batch");
            (StatusCode::OK, Json(batch.as_ref())).into_response()
        }
        Err(e) => {
            let error = ApiError::not_found(e.to_string());
            (StatusCode::NOT_FOUND, Json(error)).into_response()
        }
    }
}
