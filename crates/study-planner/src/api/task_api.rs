//! Task endpoints

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{enum_param, query_param, ApiError, DeleteResponse, OrFail};
use crate::planner_db::{NewTask, Task, TaskFilter, TaskPatch};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub exam: Option<String>,
    pub subject: Option<String>,
}

impl TaskQuery {
    fn into_filter(self) -> Result<TaskFilter, ApiError> {
        Ok(TaskFilter {
            exam: enum_param(self.exam)?,
            subject: query_param(self.subject),
        })
    }
}

/// Incomplete first, then by priority, newest first
pub async fn get_tasks(
    State(state): State<AppState>,
    query: Result<Query<TaskQuery>, QueryRejection>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    info!("Fetching tasks (exam: {:?}, subject: {:?})", filter.exam, filter.subject);

    state.database.users.ensure(&state.user).or_fail("fetch tasks")?;
    let tasks = state.database.tasks.list(&state.user, &filter).or_fail("fetch tasks")?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(new_task) = payload?;
    info!("Creating task: {}", new_task.title);

    state.database.users.ensure(&state.user).or_fail("create task")?;
    let task = state.database.tasks.create(&state.user, &new_task).or_fail("create task")?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(patch) = payload?;
    info!("Updating task: {}", id);

    let task = state.database.tasks.update(&state.user, &id, &patch).or_fail("update task")?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    info!("Deleting task: {}", id);

    state.database.tasks.delete(&state.user, &id).or_fail("delete task")?;
    Ok(Json(DeleteResponse::new(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner_db::{Exam, Priority};

    #[tokio::test]
    async fn test_create_then_filter_by_exam() {
        let state = AppState::for_tests();

        let Json(created) = create_task(
            State(state.clone()),
            Ok(Json(NewTask::new("Read Ch.1", "Economy", Exam::Upsc))),
        )
        .await
        .unwrap();
        assert_eq!(created.priority, Priority::Medium);
        assert!(!created.completed);

        let Json(_) = create_task(State(state.clone()), Ok(Json(NewTask::new("Mock", "Quant", Exam::Cat))))
            .await
            .unwrap();

        let query = TaskQuery { exam: Some("UPSC".into()), subject: None };
        let Json(tasks) = get_tasks(State(state), Ok(Query(query))).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, created.id);
    }

    #[tokio::test]
    async fn test_unknown_exam_filter_is_bad_request() {
        let state = AppState::for_tests();
        let query = TaskQuery { exam: Some("GMAT".into()), subject: None };
        let err = get_tasks(State(state), Ok(Query(query))).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_update_missing_task_fails() {
        let state = AppState::for_tests();
        let patch = TaskPatch { completed: Some(true), ..Default::default() };
        let err = update_task(State(state), Path("missing".into()), Ok(Json(patch)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to update task");
    }
}
