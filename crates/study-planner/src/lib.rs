// study-planner/crates/study-planner/src/lib.rs

pub mod api;
pub mod config;
pub mod metrics;
pub mod planner_db;
pub mod server;
pub mod shared_state;
pub mod telemetry;

// Public API exports
pub use config::Config;
pub use planner_db::{PlannerDatabase, StoreError, UserContext};
pub use server::{build_router, run_server};
pub use shared_state::AppState;
