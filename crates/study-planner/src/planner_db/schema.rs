//! Row types, closed enums and date helpers for the planner schema
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a stored or submitted string is not a known enum value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Raised when a submitted date is neither `YYYY-MM-DD` nor RFC 3339
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid date: {0}")]
pub struct InvalidDate(pub String);

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident as $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_enum! {
    /// Target examination a row belongs to
    Exam as "exam" {
        Upsc => "UPSC",
        Cat => "CAT",
    }
}

text_enum! {
    Priority as "priority" {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
}

text_enum! {
    NoteType as "note type" {
        Learning => "LEARNING",
        Summary => "SUMMARY",
        Revision => "REVISION",
        Custom => "CUSTOM",
    }
}

text_enum! {
    SessionType as "session type" {
        Study => "STUDY",
        Revision => "REVISION",
        MockTest => "MOCK_TEST",
        Break => "BREAK",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Default for NoteType {
    fn default() -> Self {
        NoteType::Learning
    }
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Study
    }
}

/// Identity every store call acts on behalf of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub exam: Exam,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub subject: String,
    pub exam: Exam,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub exam: Exam,
    pub start_time: String,
    pub end_time: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub reminder: bool,
    pub completed: bool,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub id: String,
    pub name: String,
    pub exam: Exam,
    pub progress: i32,
    pub total_topics: i32,
    pub completed_topics: i32,
    pub hours_spent: f64,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub id: String,
    pub date: NaiveDate,
    pub study_hours: f64,
    pub tasks_completed: i32,
    pub notes_created: i32,
}

/// Aggregated view served by the dashboard.
///
/// Each part is read independently; the counts may be taken a moment
/// after the lists and nothing guarantees they agree with each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub tasks: Vec<Task>,
    pub subject_progress: Vec<SubjectProgress>,
    pub daily_stats: Option<DailyStats>,
    pub total_tasks: i64,
    pub total_notes: i64,
}

/// Storage form of an instant: RFC 3339 with fixed microsecond precision,
/// so text comparison in SQL matches time order.
pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drops precision the storage format cannot hold, so a freshly built row
/// compares equal to the same row read back.
pub fn storage_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

pub fn db_now() -> DateTime<Utc> {
    storage_precision(Utc::now())
}

pub fn parse_db_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

pub fn to_db_day(day: &NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable millisecond of `day`, matching a `<=` range bound.
/// Built from the time of day alone, so it holds for the last calendar day too.
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let (last_milli, _) = NaiveTime::MIN.overflowing_sub_signed(chrono::Duration::milliseconds(1));
    day.and_time(last_milli).and_utc()
}

/// Accepts a bare calendar day (midnight UTC), RFC 3339, or a zoneless
/// `YYYY-MM-DDTHH:MM[:SS[.fff]]` treated as UTC.
pub fn parse_request_datetime(raw: &str) -> Result<DateTime<Utc>, InvalidDate> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(start_of_day(day));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts.and_utc());
        }
    }
    Err(InvalidDate(raw.to_string()))
}

pub fn parse_request_day(raw: &str) -> Result<NaiveDate, InvalidDate> {
    parse_request_datetime(raw).map(|ts| ts.date_naive())
}

/// Serde adapters for request bodies carrying dates
pub mod request_date {
    use super::*;
    use serde::de::{Deserializer, Error as _};

    pub fn datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_request_datetime(&raw).map_err(D::Error::custom)
    }

    /// `null`, a missing field and an empty string all mean "not supplied"
    pub fn optional_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => {
                parse_request_datetime(&raw).map(Some).map_err(D::Error::custom)
            }
            _ => Ok(None),
        }
    }

    pub fn day<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_request_day(&raw).map_err(D::Error::custom)
    }
}
