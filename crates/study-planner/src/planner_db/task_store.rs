//! Task storage: filtered listing, creation and partial updates
use crate::planner_db::error::{StoreError, StoreResult};
use crate::planner_db::schema::*;
use crate::planner_db::sql::{optional_timestamp_column, timestamp_column, Assignments};
use crate::planner_db::DbPool;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

const TASK_COLUMNS: &str =
    "id, title, description, subject, exam, priority, deadline, completed, created_at, user_id";

/// Incomplete first, then HIGH > MEDIUM > LOW, then newest first.
const TASK_ORDER: &str = "ORDER BY completed ASC,
     CASE priority WHEN 'HIGH' THEN 2 WHEN 'MEDIUM' THEN 1 ELSE 0 END DESC,
     created_at DESC, rowid DESC";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub exam: Option<Exam>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub subject: String,
    pub exam: Exam,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "request_date::optional_datetime")]
    pub deadline: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, subject: impl Into<String>, exam: Exam) -> Self {
        Self {
            title: title.into(),
            description: None,
            subject: subject.into(),
            exam,
            priority: None,
            deadline: None,
        }
    }
}

/// Fields left as `None` are not touched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub exam: Option<Exam>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "request_date::optional_datetime")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Clone)]
pub struct TaskStore {
    pool: DbPool,
}

impl TaskStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn list(&self, ctx: &UserContext, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let conn = self.pool.get()?;

        let mut query = format!("SELECT {} FROM tasks WHERE user_id = ?1", TASK_COLUMNS);
        let mut values: Vec<&dyn ToSql> = vec![&ctx.user_id];
        if let Some(exam) = filter.exam.as_ref() {
            values.push(exam);
            query.push_str(&format!(" AND exam = ?{}", values.len()));
        }
        if let Some(subject) = filter.subject.as_ref() {
            values.push(subject);
            query.push_str(&format!(" AND subject = ?{}", values.len()));
        }
        query.push(' ');
        query.push_str(TASK_ORDER);

        let mut stmt = conn.prepare(&query)?;
        let tasks = stmt
            .query_map(params_from_iter(values), row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Listed {} tasks for {}", tasks.len(), ctx.user_id);
        Ok(tasks)
    }

    /// Newest tasks regardless of completion, for the dashboard
    pub fn recent(&self, ctx: &UserContext, limit: usize) -> StoreResult<Vec<Task>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map(params![ctx.user_id, limit as i64], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn get(&self, ctx: &UserContext, id: &str) -> StoreResult<Option<Task>> {
        let conn = self.pool.get()?;
        Ok(fetch_task(&conn, &ctx.user_id, id)?)
    }

    pub fn create(&self, ctx: &UserContext, task: &NewTask) -> StoreResult<Task> {
        let conn = self.pool.get()?;
        let created = Task {
            id: Uuid::new_v4().to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            subject: task.subject.clone(),
            exam: task.exam,
            priority: task.priority.unwrap_or_default(),
            deadline: task.deadline.map(storage_precision),
            completed: false,
            created_at: db_now(),
            user_id: ctx.user_id.clone(),
        };

        conn.execute(
            "INSERT INTO tasks
             (id, title, description, subject, exam, priority, deadline, completed, created_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                created.id,
                created.title,
                created.description,
                created.subject,
                created.exam,
                created.priority,
                created.deadline.as_ref().map(to_db_timestamp),
                created.completed,
                to_db_timestamp(&created.created_at),
                created.user_id,
            ],
        )?;

        info!("Created task {} ({})", created.id, created.title);
        Ok(created)
    }

    pub fn update(&self, ctx: &UserContext, id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        let conn = self.pool.get()?;
        let deadline = patch.deadline.as_ref().map(to_db_timestamp);

        let mut assignments = Assignments::new();
        assignments.set_opt("title", &patch.title);
        assignments.set_opt("description", &patch.description);
        assignments.set_opt("subject", &patch.subject);
        assignments.set_opt("exam", &patch.exam);
        assignments.set_opt("priority", &patch.priority);
        assignments.set_opt("deadline", &deadline);
        assignments.set_opt("completed", &patch.completed);

        if !assignments.is_empty() && assignments.apply(&conn, "tasks", id, &ctx.user_id)? == 0 {
            return Err(StoreError::not_found("task", id));
        }

        let task = fetch_task(&conn, &ctx.user_id, id)?
            .ok_or_else(|| StoreError::not_found("task", id))?;
        debug!("Updated task {}", id);
        Ok(task)
    }

    pub fn delete(&self, ctx: &UserContext, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![id, ctx.user_id],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found("task", id));
        }
        info!("Deleted task {}", id);
        Ok(())
    }

    pub fn count_completed(&self, ctx: &UserContext) -> StoreResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND completed = 1",
            [&ctx.user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn fetch_task(conn: &Connection, user_id: &str, id: &str) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {} FROM tasks WHERE id = ?1 AND user_id = ?2", TASK_COLUMNS),
        params![id, user_id],
        row_to_task,
    )
    .optional()
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        subject: row.get(3)?,
        exam: row.get(4)?,
        priority: row.get(5)?,
        deadline: optional_timestamp_column(row, 6)?,
        completed: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
        user_id: row.get(9)?,
    })
}
