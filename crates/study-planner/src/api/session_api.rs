//! Study session endpoints

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{query_param, ApiError, DeleteResponse, OrFail};
use crate::planner_db::{parse_request_day, NewStudySession, StudySession, StudySessionPatch};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    /// `YYYY-MM-DD` or any RFC 3339 instant; only its UTC day is used
    pub date: Option<String>,
}

pub async fn get_sessions(
    State(state): State<AppState>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Json<Vec<StudySession>>, ApiError> {
    let Query(query) = query?;
    let day = query_param(query.date)
        .map(|raw| parse_request_day(&raw))
        .transpose()?;
    info!("Fetching study sessions (day: {:?})", day);

    state.database.users.ensure(&state.user).or_fail("fetch sessions")?;
    let sessions = state.database.sessions.list(&state.user, day).or_fail("fetch sessions")?;
    Ok(Json(sessions))
}

pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<NewStudySession>, JsonRejection>,
) -> Result<Json<StudySession>, ApiError> {
    let Json(new_session) = payload?;
    info!("Creating study session: {}", new_session.title);

    state.database.users.ensure(&state.user).or_fail("create session")?;
    let session = state
        .database
        .sessions
        .create(&state.user, &new_session)
        .or_fail("create session")?;
    Ok(Json(session))
}

pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StudySessionPatch>, JsonRejection>,
) -> Result<Json<StudySession>, ApiError> {
    let Json(patch) = payload?;
    info!("Updating study session: {}", id);

    let session = state
        .database
        .sessions
        .update(&state.user, &id, &patch)
        .or_fail("update session")?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    info!("Deleting study session: {}", id);

    state.database.sessions.delete(&state.user, &id).or_fail("delete session")?;
    Ok(Json(DeleteResponse::new(id)))
}
