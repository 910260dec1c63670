//! Subject progress endpoints

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use tracing::info;

use super::{ApiError, OrFail};
use crate::planner_db::{Exam, ProgressPatch, SubjectProgress};
use crate::shared_state::AppState;

/// Body of `PUT /progress`: the tracker key plus the fields to set
#[derive(Debug, Deserialize)]
pub struct ProgressUpsert {
    pub name: String,
    pub exam: Exam,
    #[serde(flatten)]
    pub patch: ProgressPatch,
}

pub async fn get_progress(State(state): State<AppState>) -> Result<Json<Vec<SubjectProgress>>, ApiError> {
    info!("Fetching subject progress");

    state.database.users.ensure(&state.user).or_fail("fetch progress")?;
    let progress = state.database.progress.list(&state.user).or_fail("fetch progress")?;
    Ok(Json(progress))
}

pub async fn upsert_progress(
    State(state): State<AppState>,
    payload: Result<Json<ProgressUpsert>, JsonRejection>,
) -> Result<Json<SubjectProgress>, ApiError> {
    let Json(body) = payload?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    info!("Upserting progress for {} / {}", name, body.exam);

    state.database.users.ensure(&state.user).or_fail("update progress")?;
    let progress = state
        .database
        .progress
        .upsert(&state.user, name, body.exam, &body.patch)
        .or_fail("update progress")?;
    Ok(Json(progress))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_body_flattens_patch() {
        let body: ProgressUpsert = serde_json::from_value(serde_json::json!({
            "name": "Polity",
            "exam": "UPSC",
            "progress": 80,
            "hoursSpent": 65.5
        }))
        .unwrap();
        assert_eq!(body.exam, Exam::Upsc);
        assert_eq!(body.patch.progress, Some(80));
        assert_eq!(body.patch.hours_spent, Some(65.5));
        assert_eq!(body.patch.total_topics, None);
    }

    #[tokio::test]
    async fn test_blank_name_is_bad_request() {
        let state = AppState::for_tests();
        let body = ProgressUpsert { name: "  ".into(), exam: Exam::Cat, patch: ProgressPatch::default() };
        let err = upsert_progress(State(state), Ok(Json(body))).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
