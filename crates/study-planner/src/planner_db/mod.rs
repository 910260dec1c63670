//! Planner database module - SQLite-backed storage for tasks, notes, study
//! sessions, subject progress and daily statistics
pub mod error;
pub mod migration;
pub mod note_store;
pub mod progress_store;
pub mod schema;
pub mod seed;
pub mod session_store;
mod sql;
pub mod stats_store;
pub mod task_store;
pub mod user_store;

pub use error::{StoreError, StoreResult};
pub use migration::MigrationManager;
pub use note_store::{NewNote, NoteFilter, NotePatch, NoteStore};
pub use progress_store::{ProgressPatch, ProgressStore};
pub use schema::*;
pub use session_store::{NewStudySession, SessionStore, StudySessionPatch};
pub use stats_store::{StatsPatch, StatsStore};
pub use task_store::{NewTask, TaskFilter, TaskPatch, TaskStore};
pub use user_store::UserStore;

use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub type DbPool = Arc<Pool<SqliteConnectionManager>>;

/// Number of tasks the dashboard shows
pub const DASHBOARD_RECENT_TASKS: usize = 10;

const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;
     PRAGMA busy_timeout = 5000;";

pub struct PlannerDatabase {
    pub users: UserStore,
    pub tasks: TaskStore,
    pub notes: NoteStore,
    pub sessions: SessionStore,
    pub progress: ProgressStore,
    pub stats: StatsStore,
    pool: DbPool,
    file_backed: bool,
}

impl PlannerDatabase {
    /// Open (or create) the database file and bring its schema up to date
    pub fn new(db_path: &Path, pool_size: u32) -> anyhow::Result<Self> {
        info!("Opening planner database at: {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                    | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
            )
            .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;

        {
            let mut conn = pool.get()?;
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
            info!("Journal mode: {}", journal_mode);
            MigrationManager::new(&mut conn).initialize_database()?;
        }

        info!("Planner database initialized successfully");
        Ok(Self::from_pool(Arc::new(pool), true))
    }

    /// Private in-memory database. The pool holds a single connection that
    /// is never recycled, since every SQLite memory connection is its own
    /// database.
    pub fn new_in_memory() -> anyhow::Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        {
            let mut conn = pool.get()?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }
        Ok(Self::from_pool(Arc::new(pool), false))
    }

    fn from_pool(pool: DbPool, file_backed: bool) -> Self {
        Self {
            users: UserStore::new(Arc::clone(&pool)),
            tasks: TaskStore::new(Arc::clone(&pool)),
            notes: NoteStore::new(Arc::clone(&pool)),
            sessions: SessionStore::new(Arc::clone(&pool)),
            progress: ProgressStore::new(Arc::clone(&pool)),
            stats: StatsStore::new(Arc::clone(&pool)),
            pool,
            file_backed,
        }
    }

    pub fn connection(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Recent tasks, subject progress and today's stats are fetched
    /// concurrently on separate pooled connections, then the two counts.
    /// No transaction spans the reads.
    pub async fn dashboard_snapshot(&self, ctx: &UserContext) -> StoreResult<DashboardSnapshot> {
        let today = Utc::now().date_naive();

        let (tasks, subject_progress, daily_stats) = tokio::try_join!(
            run_blocking({
                let store = self.tasks.clone();
                let ctx = ctx.clone();
                move || store.recent(&ctx, DASHBOARD_RECENT_TASKS)
            }),
            run_blocking({
                let store = self.progress.clone();
                let ctx = ctx.clone();
                move || store.list(&ctx)
            }),
            run_blocking({
                let store = self.stats.clone();
                move || store.for_day(today)
            }),
        )?;

        let total_tasks = run_blocking({
            let store = self.tasks.clone();
            let ctx = ctx.clone();
            move || store.count_completed(&ctx)
        })
        .await?;
        let total_notes = run_blocking({
            let store = self.notes.clone();
            let ctx = ctx.clone();
            move || store.count(&ctx)
        })
        .await?;

        Ok(DashboardSnapshot {
            tasks,
            subject_progress,
            daily_stats,
            total_tasks,
            total_notes,
        })
    }
}

impl Drop for PlannerDatabase {
    fn drop(&mut self) {
        if !self.file_backed {
            return;
        }
        if let Ok(conn) = self.pool.get() {
            let _ = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
        }
    }
}

async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
