//! Study session scheduling storage
use crate::planner_db::error::{StoreError, StoreResult};
use crate::planner_db::schema::*;
use crate::planner_db::sql::{timestamp_column, Assignments};
use crate::planner_db::DbPool;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

const SESSION_COLUMNS: &str =
    "id, title, subject, exam, start_time, end_time, date, type, reminder, completed, user_id";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudySession {
    pub title: String,
    pub subject: String,
    pub exam: Exam,
    pub start_time: String,
    pub end_time: String,
    #[serde(deserialize_with = "request_date::datetime")]
    pub date: DateTime<Utc>,
    #[serde(default, rename = "type")]
    pub session_type: Option<SessionType>,
    #[serde(default)]
    pub reminder: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub exam: Option<Exam>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "request_date::optional_datetime")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, rename = "type")]
    pub session_type: Option<SessionType>,
    #[serde(default)]
    pub reminder: Option<bool>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Clone)]
pub struct SessionStore {
    pool: DbPool,
}

impl SessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Sessions in calendar order. With `day`, only rows whose date falls
    /// between that day's first and last millisecond (UTC).
    pub fn list(&self, ctx: &UserContext, day: Option<NaiveDate>) -> StoreResult<Vec<StudySession>> {
        let conn = self.pool.get()?;

        let mut query = format!("SELECT {} FROM study_sessions WHERE user_id = ?1", SESSION_COLUMNS);
        let bounds = day.map(|day| {
            (
                to_db_timestamp(&start_of_day(day)),
                to_db_timestamp(&end_of_day(day)),
            )
        });
        let mut values: Vec<&dyn ToSql> = vec![&ctx.user_id];
        if let Some((start, end)) = bounds.as_ref() {
            values.push(start);
            values.push(end);
            query.push_str(" AND date >= ?2 AND date <= ?3");
        }
        query.push_str(" ORDER BY date ASC, start_time ASC");

        let mut stmt = conn.prepare(&query)?;
        let sessions = stmt
            .query_map(params_from_iter(values), row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Listed {} study sessions for {}", sessions.len(), ctx.user_id);
        Ok(sessions)
    }

    pub fn get(&self, ctx: &UserContext, id: &str) -> StoreResult<Option<StudySession>> {
        let conn = self.pool.get()?;
        Ok(fetch_session(&conn, &ctx.user_id, id)?)
    }

    pub fn create(&self, ctx: &UserContext, session: &NewStudySession) -> StoreResult<StudySession> {
        let conn = self.pool.get()?;
        let created = StudySession {
            id: Uuid::new_v4().to_string(),
            title: session.title.clone(),
            subject: session.subject.clone(),
            exam: session.exam,
            start_time: session.start_time.clone(),
            end_time: session.end_time.clone(),
            date: storage_precision(session.date),
            session_type: session.session_type.unwrap_or_default(),
            reminder: session.reminder.unwrap_or(true),
            completed: false,
            user_id: ctx.user_id.clone(),
        };

        conn.execute(
            "INSERT INTO study_sessions
             (id, title, subject, exam, start_time, end_time, date, type, reminder, completed, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                created.id,
                created.title,
                created.subject,
                created.exam,
                created.start_time,
                created.end_time,
                to_db_timestamp(&created.date),
                created.session_type,
                created.reminder,
                created.completed,
                created.user_id,
            ],
        )?;

        info!("Created study session {} ({} {})", created.id, created.date.date_naive(), created.start_time);
        Ok(created)
    }

    pub fn update(
        &self,
        ctx: &UserContext,
        id: &str,
        patch: &StudySessionPatch,
    ) -> StoreResult<StudySession> {
        let conn = self.pool.get()?;
        let date = patch.date.as_ref().map(to_db_timestamp);

        let mut assignments = Assignments::new();
        assignments.set_opt("title", &patch.title);
        assignments.set_opt("subject", &patch.subject);
        assignments.set_opt("exam", &patch.exam);
        assignments.set_opt("start_time", &patch.start_time);
        assignments.set_opt("end_time", &patch.end_time);
        assignments.set_opt("date", &date);
        assignments.set_opt("type", &patch.session_type);
        assignments.set_opt("reminder", &patch.reminder);
        assignments.set_opt("completed", &patch.completed);

        if !assignments.is_empty()
            && assignments.apply(&conn, "study_sessions", id, &ctx.user_id)? == 0
        {
            return Err(StoreError::not_found("study session", id));
        }

        let session = fetch_session(&conn, &ctx.user_id, id)?
            .ok_or_else(|| StoreError::not_found("study session", id))?;
        debug!("Updated study session {}", id);
        Ok(session)
    }

    pub fn delete(&self, ctx: &UserContext, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM study_sessions WHERE id = ?1 AND user_id = ?2",
            params![id, ctx.user_id],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found("study session", id));
        }
        info!("Deleted study session {}", id);
        Ok(())
    }
}

fn fetch_session(conn: &Connection, user_id: &str, id: &str) -> rusqlite::Result<Option<StudySession>> {
    conn.query_row(
        &format!("SELECT {} FROM study_sessions WHERE id = ?1 AND user_id = ?2", SESSION_COLUMNS),
        params![id, user_id],
        row_to_session,
    )
    .optional()
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<StudySession> {
    Ok(StudySession {
        id: row.get(0)?,
        title: row.get(1)?,
        subject: row.get(2)?,
        exam: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        date: timestamp_column(row, 6)?,
        session_type: row.get(7)?,
        reminder: row.get(8)?,
        completed: row.get(9)?,
        user_id: row.get(10)?,
    })
}
