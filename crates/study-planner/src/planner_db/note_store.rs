//! Note storage
use crate::planner_db::error::{StoreError, StoreResult};
use crate::planner_db::schema::*;
use crate::planner_db::sql::{json_list_column, timestamp_column, Assignments};
use crate::planner_db::DbPool;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

const NOTE_COLUMNS: &str =
    "id, title, content, subject, exam, tags, type, created_at, updated_at, user_id";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub exam: Option<Exam>,
    pub subject: Option<String>,
    pub note_type: Option<NoteType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub subject: String,
    pub exam: Exam,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, rename = "type")]
    pub note_type: Option<NoteType>,
}

impl NewNote {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        subject: impl Into<String>,
        exam: Exam,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            subject: subject.into(),
            exam,
            tags: None,
            note_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub exam: Option<Exam>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, rename = "type")]
    pub note_type: Option<NoteType>,
}

#[derive(Clone)]
pub struct NoteStore {
    pool: DbPool,
}

impl NoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Most recently edited first
    pub fn list(&self, ctx: &UserContext, filter: &NoteFilter) -> StoreResult<Vec<Note>> {
        let conn = self.pool.get()?;

        let mut query = format!("SELECT {} FROM notes WHERE user_id = ?1", NOTE_COLUMNS);
        let mut values: Vec<&dyn ToSql> = vec![&ctx.user_id];
        if let Some(exam) = filter.exam.as_ref() {
            values.push(exam);
            query.push_str(&format!(" AND exam = ?{}", values.len()));
        }
        if let Some(subject) = filter.subject.as_ref() {
            values.push(subject);
            query.push_str(&format!(" AND subject = ?{}", values.len()));
        }
        if let Some(note_type) = filter.note_type.as_ref() {
            values.push(note_type);
            query.push_str(&format!(" AND type = ?{}", values.len()));
        }
        query.push_str(" ORDER BY updated_at DESC, rowid DESC");

        let mut stmt = conn.prepare(&query)?;
        let notes = stmt
            .query_map(params_from_iter(values), row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Listed {} notes for {}", notes.len(), ctx.user_id);
        Ok(notes)
    }

    pub fn get(&self, ctx: &UserContext, id: &str) -> StoreResult<Option<Note>> {
        let conn = self.pool.get()?;
        Ok(fetch_note(&conn, &ctx.user_id, id)?)
    }

    pub fn create(&self, ctx: &UserContext, note: &NewNote) -> StoreResult<Note> {
        let conn = self.pool.get()?;
        let now = db_now();
        let created = Note {
            id: Uuid::new_v4().to_string(),
            title: note.title.clone(),
            content: note.content.clone(),
            subject: note.subject.clone(),
            exam: note.exam,
            tags: note.tags.clone().unwrap_or_default(),
            note_type: note.note_type.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            user_id: ctx.user_id.clone(),
        };

        conn.execute(
            "INSERT INTO notes
             (id, title, content, subject, exam, tags, type, created_at, updated_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                created.id,
                created.title,
                created.content,
                created.subject,
                created.exam,
                serde_json::to_string(&created.tags)?,
                created.note_type,
                to_db_timestamp(&created.created_at),
                to_db_timestamp(&created.updated_at),
                created.user_id,
            ],
        )?;

        info!("Created note {} ({})", created.id, created.title);
        Ok(created)
    }

    /// Applies the patch and always refreshes `updated_at`
    pub fn update(&self, ctx: &UserContext, id: &str, patch: &NotePatch) -> StoreResult<Note> {
        let conn = self.pool.get()?;
        let tags = patch.tags.as_ref().map(serde_json::to_string).transpose()?;
        let updated_at = to_db_timestamp(&db_now());

        let mut assignments = Assignments::new();
        assignments.set_opt("title", &patch.title);
        assignments.set_opt("content", &patch.content);
        assignments.set_opt("subject", &patch.subject);
        assignments.set_opt("exam", &patch.exam);
        assignments.set_opt("tags", &tags);
        assignments.set_opt("type", &patch.note_type);
        assignments.set("updated_at", &updated_at);

        if assignments.apply(&conn, "notes", id, &ctx.user_id)? == 0 {
            return Err(StoreError::not_found("note", id));
        }

        let note = fetch_note(&conn, &ctx.user_id, id)?
            .ok_or_else(|| StoreError::not_found("note", id))?;
        debug!("Updated note {}", id);
        Ok(note)
    }

    pub fn delete(&self, ctx: &UserContext, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
            params![id, ctx.user_id],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found("note", id));
        }
        info!("Deleted note {}", id);
        Ok(())
    }

    pub fn count(&self, ctx: &UserContext) -> StoreResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE user_id = ?1",
            [&ctx.user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn fetch_note(conn: &Connection, user_id: &str, id: &str) -> rusqlite::Result<Option<Note>> {
    conn.query_row(
        &format!("SELECT {} FROM notes WHERE id = ?1 AND user_id = ?2", NOTE_COLUMNS),
        params![id, user_id],
        row_to_note,
    )
    .optional()
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        subject: row.get(3)?,
        exam: row.get(4)?,
        tags: json_list_column(row, 5)?,
        note_type: row.get(6)?,
        created_at: timestamp_column(row, 7)?,
        updated_at: timestamp_column(row, 8)?,
        user_id: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner_db::PlannerDatabase;

    fn setup() -> (PlannerDatabase, UserContext) {
        let db = PlannerDatabase::new_in_memory().unwrap();
        let ctx = UserContext::new("default-user", "Study User", "user@example.com");
        db.users.ensure(&ctx).unwrap();
        (db, ctx)
    }

    #[test]
    fn test_create_defaults_and_tag_order() {
        let (db, ctx) = setup();
        let plain = db.notes.create(&ctx, &NewNote::new("Plain", "body", "Polity", Exam::Upsc)).unwrap();
        assert!(plain.tags.is_empty());
        assert_eq!(plain.note_type, NoteType::Learning);
        assert_eq!(plain.created_at, plain.updated_at);

        let mut tagged = NewNote::new("Tagged", "body", "Polity", Exam::Upsc);
        tagged.tags = Some(vec!["zeta".into(), "alpha".into(), "mid".into()]);
        let tagged = db.notes.create(&ctx, &tagged).unwrap();
        let stored = db.notes.get(&ctx, &tagged.id).unwrap().unwrap();
        assert_eq!(stored.tags, vec!["zeta", "alpha", "mid"]);
        assert_eq!(stored, tagged);
    }

    #[test]
    fn test_list_filters_by_type_exam_and_subject() {
        let (db, ctx) = setup();
        let mut summary = NewNote::new("Summary", "body", "Economy", Exam::Upsc);
        summary.note_type = Some(NoteType::Summary);
        db.notes.create(&ctx, &summary).unwrap();
        db.notes.create(&ctx, &NewNote::new("Learning", "body", "Economy", Exam::Upsc)).unwrap();
        db.notes.create(&ctx, &NewNote::new("Cat", "body", "Verbal Ability", Exam::Cat)).unwrap();

        let by_type = NoteFilter { note_type: Some(NoteType::Summary), ..Default::default() };
        let notes = db.notes.list(&ctx, &by_type).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Summary");

        let by_exam = NoteFilter { exam: Some(Exam::Upsc), subject: Some("Economy".into()), note_type: None };
        assert_eq!(db.notes.list(&ctx, &by_exam).unwrap().len(), 2);
    }

    #[test]
    fn test_update_refreshes_updated_at_and_reorders() {
        let (db, ctx) = setup();
        let first = db.notes.create(&ctx, &NewNote::new("First", "body", "Polity", Exam::Upsc)).unwrap();
        let second = db.notes.create(&ctx, &NewNote::new("Second", "body", "Polity", Exam::Upsc)).unwrap();
        assert_eq!(db.notes.list(&ctx, &NoteFilter::default()).unwrap()[0].id, second.id);

        std::thread::sleep(std::time::Duration::from_millis(2));
        let patch = NotePatch { content: Some("edited".into()), ..Default::default() };
        let updated = db.notes.update(&ctx, &first.id, &patch).unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.title, "First");
        assert!(updated.updated_at > first.updated_at);
        assert_eq!(updated.created_at, first.created_at);

        assert_eq!(db.notes.list(&ctx, &NoteFilter::default()).unwrap()[0].id, first.id);
    }

    #[test]
    fn test_empty_patch_still_touches_note() {
        let (db, ctx) = setup();
        let note = db.notes.create(&ctx, &NewNote::new("n", "body", "Polity", Exam::Upsc)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let updated = db.notes.update(&ctx, &note.id, &NotePatch::default()).unwrap();
        assert!(updated.updated_at > note.updated_at);
    }

    #[test]
    fn test_missing_note_fails() {
        let (db, ctx) = setup();
        assert!(db.notes.delete(&ctx, "missing").unwrap_err().is_not_found());
        assert!(db.notes.update(&ctx, "missing", &NotePatch::default()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_count() {
        let (db, ctx) = setup();
        for i in 0..3 {
            db.notes.create(&ctx, &NewNote::new(format!("n{}", i), "body", "Polity", Exam::Cat)).unwrap();
        }
        assert_eq!(db.notes.count(&ctx).unwrap(), 3);
    }
}
