//! Daily aggregate statistics, one row per calendar day
use crate::planner_db::error::{StoreError, StoreResult};
use crate::planner_db::schema::*;
use crate::planner_db::sql::day_column;
use crate::planner_db::DbPool;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

const STATS_COLUMNS: &str = "id, date, study_hours, tasks_completed, notes_created";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPatch {
    #[serde(default)]
    pub study_hours: Option<f64>,
    #[serde(default)]
    pub tasks_completed: Option<i32>,
    #[serde(default)]
    pub notes_created: Option<i32>,
}

#[derive(Clone)]
pub struct StatsStore {
    pool: DbPool,
}

impl StatsStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn upsert(&self, day: NaiveDate, patch: &StatsPatch) -> StoreResult<DailyStats> {
        let conn = self.pool.get()?;
        let date = to_db_day(&day);
        conn.execute(
            "INSERT INTO daily_stats (id, date, study_hours, tasks_completed, notes_created)
             VALUES (?1, ?2, COALESCE(?3, 0), COALESCE(?4, 0), COALESCE(?5, 0))
             ON CONFLICT(date) DO UPDATE SET
                 study_hours = COALESCE(?3, study_hours),
                 tasks_completed = COALESCE(?4, tasks_completed),
                 notes_created = COALESCE(?5, notes_created)",
            params![
                Uuid::new_v4().to_string(),
                date,
                patch.study_hours,
                patch.tasks_completed,
                patch.notes_created,
            ],
        )?;

        let stats = fetch_day(&conn, &date)?.ok_or_else(|| StoreError::not_found("daily stats", date.clone()))?;
        debug!("Upserted daily stats for {}", date);
        Ok(stats)
    }

    pub fn for_day(&self, day: NaiveDate) -> StoreResult<Option<DailyStats>> {
        let conn = self.pool.get()?;
        Ok(fetch_day(&conn, &to_db_day(&day))?)
    }

    /// Inclusive on both ends, oldest first
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<DailyStats>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM daily_stats WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC",
            STATS_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![to_db_day(&start), to_db_day(&end)], row_to_stats)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn fetch_day(conn: &Connection, date: &str) -> rusqlite::Result<Option<DailyStats>> {
    conn.query_row(
        &format!("SELECT {} FROM daily_stats WHERE date = ?1", STATS_COLUMNS),
        [date],
        row_to_stats,
    )
    .optional()
}

fn row_to_stats(row: &Row<'_>) -> rusqlite::Result<DailyStats> {
    Ok(DailyStats {
        id: row.get(0)?,
        date: day_column(row, 1)?,
        study_hours: row.get(2)?,
        tasks_completed: row.get(3)?,
        notes_created: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner_db::PlannerDatabase;

    #[test]
    fn test_upsert_normalizes_to_day() {
        let db = PlannerDatabase::new_in_memory().unwrap();
        let morning = parse_request_day("2025-01-15T06:00:00Z").unwrap();
        let evening = parse_request_day("2025-01-15T21:30:00Z").unwrap();

        let first = db.stats.upsert(morning, &StatsPatch { study_hours: Some(2.0), ..Default::default() }).unwrap();
        let second = db.stats.upsert(evening, &StatsPatch { tasks_completed: Some(3), ..Default::default() }).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.study_hours, 2.0);
        assert_eq!(second.tasks_completed, 3);
        assert_eq!(second.notes_created, 0);
    }

    #[test]
    fn test_range_is_inclusive_and_ordered() {
        let db = PlannerDatabase::new_in_memory().unwrap();
        for day in [17, 14, 15, 16] {
            let date = NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
            db.stats.upsert(date, &StatsPatch { study_hours: Some(day as f64), ..Default::default() }).unwrap();
        }

        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        let days: Vec<u32> = db
            .stats
            .range(start, end)
            .unwrap()
            .iter()
            .map(|s| chrono::Datelike::day(&s.date))
            .collect();
        assert_eq!(days, vec![15, 16]);
    }

    #[test]
    fn test_for_day_missing() {
        let db = PlannerDatabase::new_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert!(db.stats.for_day(date).unwrap().is_none());
    }
}
