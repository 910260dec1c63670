//! Sample data for a fresh planner database
use crate::planner_db::error::StoreResult;
use crate::planner_db::schema::*;
use crate::planner_db::{
    NewNote, NewStudySession, NewTask, PlannerDatabase, ProgressPatch, StatsPatch, StudySessionPatch,
    TaskPatch,
};
use chrono::{Duration, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

/// Row counts written by [`seed_sample_data`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub tasks: usize,
    pub notes: usize,
    pub sessions: usize,
    pub subject_progress: usize,
    pub daily_stats: usize,
}

struct SampleTask {
    title: &'static str,
    description: &'static str,
    subject: &'static str,
    exam: Exam,
    priority: Priority,
    deadline: Option<(i32, u32, u32)>,
    completed: bool,
}

const SAMPLE_TASKS: &[SampleTask] = &[
    SampleTask {
        title: "Current Affairs - January 2025",
        description: "Cover all major events from January 2025",
        subject: "Current Affairs",
        exam: Exam::Upsc,
        priority: Priority::High,
        deadline: Some((2025, 1, 15)),
        completed: false,
    },
    SampleTask {
        title: "Quantitative Aptitude - Percentages",
        description: "Complete all percentage problems and formulas",
        subject: "Quantitative Aptitude",
        exam: Exam::Cat,
        priority: Priority::Medium,
        deadline: Some((2025, 1, 20)),
        completed: true,
    },
    SampleTask {
        title: "Polity - Fundamental Rights",
        description: "Study Articles 12-35 in detail",
        subject: "Polity",
        exam: Exam::Upsc,
        priority: Priority::High,
        deadline: Some((2025, 1, 18)),
        completed: false,
    },
    SampleTask {
        title: "Verbal Ability - Reading Comprehension",
        description: "Practice RC passages and improve speed",
        subject: "Verbal Ability",
        exam: Exam::Cat,
        priority: Priority::Medium,
        deadline: None,
        completed: false,
    },
    SampleTask {
        title: "Economy - Budget 2025 Analysis",
        description: "Analyze key highlights and implications",
        subject: "Economy",
        exam: Exam::Upsc,
        priority: Priority::High,
        deadline: None,
        completed: false,
    },
];

const SAMPLE_NOTES: &[(&str, &str, &str, Exam, [&str; 3], NoteType)] = &[
    (
        "Fundamental Rights - Key Points",
        "Article 12-35 covers Fundamental Rights. Key points:\n\
         1. Right to Equality (Art 14-18)\n\
         2. Right to Freedom (Art 19-22)\n\
         3. Right against Exploitation (Art 23-24)\n\
         4. Right to Freedom of Religion (Art 25-28)\n\
         5. Cultural and Educational Rights (Art 29-30)\n\
         6. Right to Constitutional Remedies (Art 32)",
        "Polity",
        Exam::Upsc,
        ["fundamental-rights", "constitution", "articles"],
        NoteType::Learning,
    ),
    (
        "Percentage Formulas - Quick Reference",
        "Important percentage formulas:\n\
         1. Percentage = (Part/Whole) × 100\n\
         2. Increase% = (New-Old)/Old × 100\n\
         3. Decrease% = (Old-New)/Old × 100\n\
         4. Successive percentage: If two changes of a% and b%, final change = a + b + (ab/100)%",
        "Quantitative Aptitude",
        Exam::Cat,
        ["formulas", "percentage", "quick-reference"],
        NoteType::Revision,
    ),
    (
        "Current Affairs - January 2025 Summary",
        "Key events from January 2025:\n\
         1. Economic Survey highlights\n\
         2. Budget 2025 key announcements\n\
         3. International relations updates\n\
         4. Science and technology developments\n\
         5. Awards and recognitions",
        "Current Affairs",
        Exam::Upsc,
        ["january-2025", "budget", "economy"],
        NoteType::Summary,
    ),
    (
        "Essay Writing - Structure Template",
        "Standard essay structure:\n\
         1. Introduction (Hook + Background + Thesis)\n\
         2. Body Paragraph 1 (Topic sentence + Evidence + Analysis)\n\
         3. Body Paragraph 2 (Topic sentence + Evidence + Analysis)\n\
         4. Body Paragraph 3 (Counterargument + Refutation)\n\
         5. Conclusion (Restate thesis + Summary + Call to action)",
        "Essay Writing",
        Exam::Upsc,
        ["essay", "structure", "template"],
        NoteType::Custom,
    ),
];

/// (title, subject, exam, start, end, days from today, type, completed)
const SAMPLE_SESSIONS: &[(&str, &str, Exam, &str, &str, i64, SessionType, bool)] = &[
    ("Current Affairs Reading", "Current Affairs", Exam::Upsc, "09:00", "11:00", 0, SessionType::Study, false),
    ("Quantitative Aptitude Practice", "Quantitative Aptitude", Exam::Cat, "14:00", "16:00", 0, SessionType::Study, true),
    ("Polity Revision", "Polity", Exam::Upsc, "19:00", "21:00", 0, SessionType::Revision, false),
    ("CAT Mock Test", "Quantitative Aptitude", Exam::Cat, "10:00", "13:00", 1, SessionType::MockTest, false),
];

/// (name, exam, progress, total topics, completed topics, hours)
const SAMPLE_PROGRESS: &[(&str, Exam, i32, i32, i32, f64)] = &[
    ("Quantitative Aptitude", Exam::Cat, 75, 20, 15, 45.0),
    ("Verbal Ability", Exam::Cat, 60, 15, 9, 32.0),
    ("Logical Reasoning", Exam::Cat, 45, 18, 8, 28.0),
    ("Polity", Exam::Upsc, 80, 25, 20, 65.0),
    ("Economy", Exam::Upsc, 55, 22, 12, 38.0),
    ("Current Affairs", Exam::Upsc, 90, 12, 11, 42.0),
    ("Essay Writing", Exam::Upsc, 35, 10, 4, 15.0),
    ("History", Exam::Upsc, 70, 30, 21, 55.0),
];

/// Bootstraps the user and inserts the sample planner. Tasks, notes and
/// sessions are appended on every run; progress and stats are upserts.
pub fn seed_sample_data(db: &PlannerDatabase, ctx: &UserContext) -> StoreResult<SeedReport> {
    let user = db.users.ensure(ctx)?;
    info!("Seeding sample data for {} ({})", user.id, user.email);

    let mut report = SeedReport::default();
    let done = TaskPatch { completed: Some(true), ..Default::default() };

    for sample in SAMPLE_TASKS {
        let task = db.tasks.create(
            ctx,
            &NewTask {
                title: sample.title.to_string(),
                description: Some(sample.description.to_string()),
                subject: sample.subject.to_string(),
                exam: sample.exam,
                priority: Some(sample.priority),
                deadline: sample
                    .deadline
                    .and_then(|(y, m, d)| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single()),
            },
        )?;
        if sample.completed {
            db.tasks.update(ctx, &task.id, &done)?;
        }
        report.tasks += 1;
    }

    for (title, content, subject, exam, tags, note_type) in SAMPLE_NOTES {
        db.notes.create(
            ctx,
            &NewNote {
                title: title.to_string(),
                content: content.to_string(),
                subject: subject.to_string(),
                exam: *exam,
                tags: Some(tags.iter().map(|t| t.to_string()).collect()),
                note_type: Some(*note_type),
            },
        )?;
        report.notes += 1;
    }

    let now = db_now();
    for (title, subject, exam, start, end, offset, session_type, completed) in SAMPLE_SESSIONS {
        let session = db.sessions.create(
            ctx,
            &NewStudySession {
                title: title.to_string(),
                subject: subject.to_string(),
                exam: *exam,
                start_time: start.to_string(),
                end_time: end.to_string(),
                date: now + Duration::days(*offset),
                session_type: Some(*session_type),
                reminder: Some(true),
            },
        )?;
        if *completed {
            db.sessions.update(
                ctx,
                &session.id,
                &StudySessionPatch { completed: Some(true), ..Default::default() },
            )?;
        }
        report.sessions += 1;
    }

    for (name, exam, progress, total, completed, hours) in SAMPLE_PROGRESS {
        db.progress.upsert(
            ctx,
            name,
            *exam,
            &ProgressPatch {
                progress: Some(*progress),
                total_topics: Some(*total),
                completed_topics: Some(*completed),
                hours_spent: Some(*hours),
            },
        )?;
        report.subject_progress += 1;
    }

    db.stats.upsert(
        now.date_naive(),
        &StatsPatch {
            study_hours: Some(6.0),
            tasks_completed: Some(2),
            notes_created: Some(1),
        },
    )?;
    report.daily_stats = 1;

    info!(
        "Seeded {} tasks, {} notes, {} sessions, {} subjects",
        report.tasks, report.notes, report.sessions, report.subject_progress
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner_db::{NoteFilter, TaskFilter};

    #[tokio::test]
    async fn test_seed_populates_dashboard() {
        let db = PlannerDatabase::new_in_memory().unwrap();
        let ctx = UserContext::new("default-user", "Study User", "user@example.com");

        let report = seed_sample_data(&db, &ctx).unwrap();
        assert_eq!(report.tasks, 5);
        assert_eq!(report.notes, 4);
        assert_eq!(report.sessions, 4);
        assert_eq!(report.subject_progress, 8);

        let tasks = db.tasks.list(&ctx, &TaskFilter::default()).unwrap();
        assert_eq!(tasks.len(), 5);
        assert!(tasks.last().unwrap().completed);

        let today = db.sessions.list(&ctx, Some(Utc::now().date_naive())).unwrap();
        assert!(today.len() >= 3);

        let snapshot = db.dashboard_snapshot(&ctx).await.unwrap();
        assert_eq!(snapshot.total_tasks, 1);
        assert_eq!(snapshot.total_notes, 4);
        assert_eq!(snapshot.subject_progress.len(), 8);
        assert_eq!(snapshot.daily_stats.map(|s| s.tasks_completed), Some(2));
    }

    #[test]
    fn test_seed_twice_keeps_progress_unique() {
        let db = PlannerDatabase::new_in_memory().unwrap();
        let ctx = UserContext::new("default-user", "Study User", "user@example.com");
        seed_sample_data(&db, &ctx).unwrap();
        seed_sample_data(&db, &ctx).unwrap();

        assert_eq!(db.progress.list(&ctx).unwrap().len(), 8);
        assert_eq!(db.notes.list(&ctx, &NoteFilter::default()).unwrap().len(), 8);
    }
}
