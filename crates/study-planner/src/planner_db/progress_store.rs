//! Per-subject progress trackers, keyed by (user, name, exam)
use crate::planner_db::error::{StoreError, StoreResult};
use crate::planner_db::schema::*;
use crate::planner_db::DbPool;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

const PROGRESS_COLUMNS: &str =
    "id, name, exam, progress, total_topics, completed_topics, hours_spent, user_id";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(default)]
    pub progress: Option<i32>,
    #[serde(default)]
    pub total_topics: Option<i32>,
    #[serde(default)]
    pub completed_topics: Option<i32>,
    #[serde(default)]
    pub hours_spent: Option<f64>,
}

#[derive(Clone)]
pub struct ProgressStore {
    pool: DbPool,
}

impl ProgressStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn list(&self, ctx: &UserContext) -> StoreResult<Vec<SubjectProgress>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM subject_progress WHERE user_id = ?1 ORDER BY name ASC, exam ASC",
            PROGRESS_COLUMNS
        ))?;
        let rows = stmt
            .query_map([&ctx.user_id], row_to_progress)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get(&self, ctx: &UserContext, name: &str, exam: Exam) -> StoreResult<Option<SubjectProgress>> {
        let conn = self.pool.get()?;
        Ok(fetch_progress(&conn, &ctx.user_id, name, exam)?)
    }

    /// Creates the tracker with zero defaults for absent fields, or patches
    /// only the supplied fields of the existing one.
    pub fn upsert(
        &self,
        ctx: &UserContext,
        name: &str,
        exam: Exam,
        patch: &ProgressPatch,
    ) -> StoreResult<SubjectProgress> {
        let conn = self.pool.get()?;
        let inserted = conn.execute(
            "INSERT INTO subject_progress
             (id, user_id, name, exam, progress, total_topics, completed_topics, hours_spent)
             VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 0), COALESCE(?6, 0), COALESCE(?7, 0), COALESCE(?8, 0))
             ON CONFLICT(user_id, name, exam) DO UPDATE SET
                 progress = COALESCE(?5, progress),
                 total_topics = COALESCE(?6, total_topics),
                 completed_topics = COALESCE(?7, completed_topics),
                 hours_spent = COALESCE(?8, hours_spent)",
            params![
                Uuid::new_v4().to_string(),
                ctx.user_id,
                name,
                exam,
                patch.progress,
                patch.total_topics,
                patch.completed_topics,
                patch.hours_spent,
            ],
        )?;
        debug!("Upserted progress for {} / {} ({} row)", name, exam, inserted);

        let row = fetch_progress(&conn, &ctx.user_id, name, exam)?
            .ok_or_else(|| StoreError::not_found("subject progress", format!("{}/{}", name, exam)))?;
        info!("Subject progress {} / {} now at {}%", name, exam, row.progress);
        Ok(row)
    }
}

fn fetch_progress(
    conn: &Connection,
    user_id: &str,
    name: &str,
    exam: Exam,
) -> rusqlite::Result<Option<SubjectProgress>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM subject_progress WHERE user_id = ?1 AND name = ?2 AND exam = ?3",
            PROGRESS_COLUMNS
        ),
        params![user_id, name, exam],
        row_to_progress,
    )
    .optional()
}

fn row_to_progress(row: &Row<'_>) -> rusqlite::Result<SubjectProgress> {
    Ok(SubjectProgress {
        id: row.get(0)?,
        name: row.get(1)?,
        exam: row.get(2)?,
        progress: row.get(3)?,
        total_topics: row.get(4)?,
        completed_topics: row.get(5)?,
        hours_spent: row.get(6)?,
        user_id: row.get(7)?,
    })
}
