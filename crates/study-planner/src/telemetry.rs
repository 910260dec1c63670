// study-planner/crates/study-planner/src/telemetry.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Planner and HTTP layer at `info`, everything else at `warn`
const DEFAULT_DIRECTIVES: &str = "warn,study_planner=info,tower_http=info";

/// Filter from `RUST_LOG` when it is set and valid, otherwise the defaults.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global fmt subscriber. Returns false when one was already
/// installed, so both `serve` and `seed` can call it unconditionally.
pub fn init_tracing() -> bool {
    let rust_log = std::env::var("RUST_LOG").ok();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
