// study-planner/crates/study-planner/src/api/mod.rs
//! API module - HTTP handlers over the planner database
//!
//! Every handler answers 200 with JSON on success, 400 `{"error"}` for input
//! it cannot parse, and 500 `{"error": "Failed to <action>"}` when the store
//! fails. Missing ids on update or delete are store failures.

pub mod dashboard_api;
pub mod note_api;
pub mod progress_api;
pub mod session_api;
pub mod stats_api;
pub mod task_api;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use tracing::{error, warn};

use crate::planner_db::{InvalidDate, StoreError, StoreResult, UnknownVariant};

pub use dashboard_api::get_dashboard;
pub use note_api::{create_note, delete_note, get_notes, update_note};
pub use progress_api::{get_progress, upsert_progress};
pub use session_api::{create_session, delete_session, get_sessions, update_session};
pub use stats_api::{get_stats, upsert_stats};
pub use task_api::{create_task, delete_task, get_tasks, update_task};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to {action}")]
    Failed {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(message) => {
                warn!("Rejected request: {}", message);
                StatusCode::BAD_REQUEST
            }
            ApiError::Failed { action, source } => {
                error!("Failed to {}: {}", action, source);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<UnknownVariant> for ApiError {
    fn from(err: UnknownVariant) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<InvalidDate> for ApiError {
    fn from(err: InvalidDate) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Attaches the user-facing action to a store failure
pub trait OrFail<T> {
    fn or_fail(self, action: &'static str) -> Result<T, ApiError>;
}

impl<T> OrFail<T> for StoreResult<T> {
    fn or_fail(self, action: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| ApiError::Failed { action, source })
    }
}

/// Body of every successful delete
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: String,
}

impl DeleteResponse {
    pub fn new(id: String) -> Self {
        Self { success: true, id }
    }
}

/// Query-string values arrive as raw strings; blank means absent.
pub(crate) fn query_param(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses an optional enum filter, rejecting unknown values
pub(crate) fn enum_param<T>(raw: Option<String>) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = UnknownVariant>,
{
    Ok(query_param(raw).map(|value| value.parse()).transpose()?)
}
