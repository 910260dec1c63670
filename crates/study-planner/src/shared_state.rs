//! Shared state handed to every API handler

use std::sync::Arc;

use crate::{
    config::Config,
    planner_db::{PlannerDatabase, UserContext},
};

/// Unified application state for all API handlers. Cloned per request;
/// everything behind it is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<PlannerDatabase>,
    pub config: Arc<Config>,
    pub user: UserContext,
}

impl AppState {
    pub fn new(database: Arc<PlannerDatabase>, config: Arc<Config>) -> Self {
        let user = config.user_context();
        Self {
            database,
            config,
            user,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// Default configuration over a private in-memory database
    pub fn for_tests() -> Self {
        let config = Config::from_lookup(|_| None).unwrap();
        let database = PlannerDatabase::new_in_memory().unwrap();
        Self::new(Arc::new(database), Arc::new(config))
    }
}
