pub mod core;
pub mod plugins;
pub mod shared;
pub mod storage;
pub mod sync;
pub mod views;

use crate::core::logging::{init_logging, LoggingGuards};
use crate::core::settings::{load_settings, AppSettings};
use plugins::planner::{init_planner, PlannerState};
use shared::paths::{get_database_path, get_log_dir};

/// A running planner plus the logging guards that must outlive it.
pub struct App {
    pub settings: AppSettings,
    pub planner: PlannerState,
    _logging: LoggingGuards,
}

/// Initialize logging, settings and the planner from the default data directory.
pub fn start() -> Result<App, Box<dyn std::error::Error>> {
    let settings = load_settings();

    // Logging first, before anything else can emit
    let logging = init_logging(&get_log_dir(), &settings.log_filter)?;

    let planner = init_planner(&settings, &get_database_path())
        .map_err(|e| format!("Failed to initialize planner: {}", e))?;

    tracing::info!(
        target: "system",
        remote = settings.remote().is_some(),
        view = ?settings.default_view,
        "Study planner started"
    );

    Ok(App {
        settings,
        planner,
        _logging: logging,
    })
}
