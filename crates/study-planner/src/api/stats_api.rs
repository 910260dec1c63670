//! Daily statistics endpoints

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use super::{query_param, ApiError, OrFail};
use crate::planner_db::{parse_request_day, request_date, DailyStats, StatsPatch};
use crate::shared_state::AppState;

/// Days covered when `start` is omitted, counting `end`
const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl StatsQuery {
    /// `end` defaults to today and `start` to the week ending at `end`
    fn into_range(self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ApiError> {
        let end = match query_param(self.end) {
            Some(raw) => parse_request_day(&raw)?,
            None => today,
        };
        let start = match query_param(self.start) {
            Some(raw) => parse_request_day(&raw)?,
            None => end
                .checked_sub_signed(Duration::days(DEFAULT_WINDOW_DAYS - 1))
                .ok_or_else(|| ApiError::BadRequest(format!("no default window ends at {}", end)))?,
        };
        if start > end {
            return Err(ApiError::BadRequest(format!("start {} is after end {}", start, end)));
        }
        Ok((start, end))
    }
}

/// Body of `PUT /stats`
#[derive(Debug, Deserialize)]
pub struct StatsUpsert {
    #[serde(deserialize_with = "request_date::day")]
    pub date: NaiveDate,
    #[serde(flatten)]
    pub patch: StatsPatch,
}

pub async fn get_stats(
    State(state): State<AppState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<Vec<DailyStats>>, ApiError> {
    let Query(query) = query?;
    let (start, end) = query.into_range(Utc::now().date_naive())?;
    info!("Fetching daily stats {} ..= {}", start, end);

    let stats = state.database.stats.range(start, end).or_fail("fetch stats")?;
    Ok(Json(stats))
}

pub async fn upsert_stats(
    State(state): State<AppState>,
    payload: Result<Json<StatsUpsert>, JsonRejection>,
) -> Result<Json<DailyStats>, ApiError> {
    let Json(body) = payload?;
    info!("Upserting daily stats for {}", body.date);

    let stats = state.database.stats.upsert(body.date, &body.patch).or_fail("update stats")?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_defaults_to_trailing_week() {
        let (start, end) = StatsQuery::default().into_range(day(2025, 1, 15)).unwrap();
        assert_eq!((start, end), (day(2025, 1, 9), day(2025, 1, 15)));
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let query = StatsQuery { start: Some("2025-01-20".into()), end: Some("2025-01-10".into()) };
        assert!(matches!(query.into_range(day(2025, 1, 15)), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_default_window_before_first_day_is_rejected() {
        let query = StatsQuery { start: None, end: Some(NaiveDate::MIN.to_string()) };
        assert!(matches!(query.into_range(day(2025, 1, 15)), Err(ApiError::BadRequest(_))));

        let query = StatsQuery { start: Some(NaiveDate::MIN.to_string()), end: Some(NaiveDate::MIN.to_string()) };
        assert_eq!(query.into_range(day(2025, 1, 15)).unwrap(), (NaiveDate::MIN, NaiveDate::MIN));
    }

    #[tokio::test]
    async fn test_upsert_then_range() {
        let state = AppState::for_tests();
        let body: StatsUpsert = serde_json::from_value(serde_json::json!({
            "date": "2025-01-15T18:30:00Z",
            "studyHours": 4.5
        }))
        .unwrap();
        let Json(saved) = upsert_stats(State(state.clone()), Ok(Json(body))).await.unwrap();
        assert_eq!(saved.date, day(2025, 1, 15));

        let query = StatsQuery { start: Some("2025-01-15".into()), end: Some("2025-01-15".into()) };
        let Json(rows) = get_stats(State(state), Ok(Query(query))).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].study_hours, 4.5);
    }
}
