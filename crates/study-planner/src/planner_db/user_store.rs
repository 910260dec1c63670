//! User bootstrap and lookup
use crate::planner_db::error::StoreResult;
use crate::planner_db::schema::{User, UserContext};
use crate::planner_db::DbPool;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

#[derive(Clone)]
pub struct UserStore {
    pool: DbPool,
}

impl UserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert the context's user unless it already exists. Safe to call on
    /// every request.
    pub fn ensure(&self, ctx: &UserContext) -> StoreResult<User> {
        let conn = self.pool.get()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, name, email) VALUES (?1, ?2, ?3)",
            params![ctx.user_id, ctx.name, ctx.email],
        )?;
        if inserted > 0 {
            info!("Created user {}", ctx.user_id);
        } else {
            debug!("User {} already present", ctx.user_id);
        }

        let user = conn.query_row(
            "SELECT id, name, email FROM users WHERE id = ?1",
            [&ctx.user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                })
            },
        )?;
        Ok(user)
    }

    pub fn get(&self, user_id: &str) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                "SELECT id, name, email FROM users WHERE id = ?1",
                [user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}
