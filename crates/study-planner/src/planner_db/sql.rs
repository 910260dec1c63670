//! Small helpers shared by the stores for reading columns and building
//! partial `UPDATE` statements.
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params_from_iter, Connection, Row, ToSql};

use crate::planner_db::schema::parse_db_timestamp;

pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_db_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        parse_db_timestamp(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn day_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn json_list_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Collects `column = ?` pairs for the fields a patch actually carries.
pub(crate) struct Assignments<'a> {
    columns: Vec<&'static str>,
    values: Vec<&'a dyn ToSql>,
}

impl<'a> Assignments<'a> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn set(&mut self, column: &'static str, value: &'a dyn ToSql) {
        self.columns.push(column);
        self.values.push(value);
    }

    pub fn set_opt<T: ToSql>(&mut self, column: &'static str, value: &'a Option<T>) {
        if let Some(value) = value {
            self.set(column, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Runs the update against one owned row and returns the affected count.
    pub fn apply(
        self,
        conn: &Connection,
        table: &'static str,
        id: &str,
        user_id: &str,
    ) -> rusqlite::Result<usize> {
        let set_clause = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let n = self.columns.len();
        let query = format!(
            "UPDATE {} SET {} WHERE id = ?{} AND user_id = ?{}",
            table,
            set_clause,
            n + 1,
            n + 2
        );

        let mut values: Vec<&dyn ToSql> = self.values;
        values.push(&id);
        values.push(&user_id);
        conn.execute(&query, params_from_iter(values))
    }
}
