//! Dashboard snapshot endpoint

use axum::{extract::State, Json};
use tracing::info;

use super::{ApiError, OrFail};
use crate::planner_db::DashboardSnapshot;
use crate::shared_state::AppState;

/// Recent tasks, subject progress, today's stats and the two counters
pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardSnapshot>, ApiError> {
    info!("Fetching dashboard for {}", state.user.user_id);

    state
        .database
        .users
        .ensure(&state.user)
        .or_fail("fetch dashboard data")?;
    let snapshot = state
        .database
        .dashboard_snapshot(&state.user)
        .await
        .or_fail("fetch dashboard data")?;

    Ok(Json(snapshot))
}
