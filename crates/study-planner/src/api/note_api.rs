//! Note endpoints

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{enum_param, query_param, ApiError, DeleteResponse, OrFail};
use crate::planner_db::{NewNote, Note, NoteFilter, NotePatch};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NoteQuery {
    pub exam: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "type")]
    pub note_type: Option<String>,
}

impl NoteQuery {
    fn into_filter(self) -> Result<NoteFilter, ApiError> {
        Ok(NoteFilter {
            exam: enum_param(self.exam)?,
            subject: query_param(self.subject),
            note_type: enum_param(self.note_type)?,
        })
    }
}

pub async fn get_notes(
    State(state): State<AppState>,
    query: Result<Query<NoteQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    info!(
        "Fetching notes (exam: {:?}, subject: {:?}, type: {:?})",
        filter.exam, filter.subject, filter.note_type
    );

    state.database.users.ensure(&state.user).or_fail("fetch notes")?;
    let notes = state.database.notes.list(&state.user, &filter).or_fail("fetch notes")?;
    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<NewNote>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Json(new_note) = payload?;
    info!("Creating note: {}", new_note.title);

    state.database.users.ensure(&state.user).or_fail("create note")?;
    let note = state.database.notes.create(&state.user, &new_note).or_fail("create note")?;
    Ok(Json(note))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NotePatch>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Json(patch) = payload?;
    info!("Updating note: {}", id);

    let note = state.database.notes.update(&state.user, &id, &patch).or_fail("update note")?;
    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    info!("Deleting note: {}", id);

    state.database.notes.delete(&state.user, &id).or_fail("delete note")?;
    Ok(Json(DeleteResponse::new(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner_db::{Exam, NoteType};

    #[tokio::test]
    async fn test_filter_by_type() {
        let state = AppState::for_tests();
        let mut summary = NewNote::new("Budget", "highlights", "Economy", Exam::Upsc);
        summary.note_type = Some(NoteType::Summary);
        let Json(_) = create_note(State(state.clone()), Ok(Json(summary))).await.unwrap();
        let Json(_) = create_note(State(state.clone()), Ok(Json(NewNote::new("RC", "tips", "Verbal", Exam::Cat))))
            .await
            .unwrap();

        let query = NoteQuery { note_type: Some("SUMMARY".into()), ..Default::default() };
        let Json(notes) = get_notes(State(state), Ok(Query(query))).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Budget");
    }

    #[tokio::test]
    async fn test_delete_missing_note_fails() {
        let state = AppState::for_tests();
        let err = delete_note(State(state), Path("missing".into())).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to delete note");
    }
}
