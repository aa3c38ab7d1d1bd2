pub mod commands;
pub mod helpers;
pub mod types;

use crate::core::session::SessionManager;
use crate::core::settings::AppSettings;
use crate::storage::{init_database, KeyValueStore};
use crate::sync::{
    DisconnectedStore, FolderRepository, PostgrestStore, RecordStore, TodoRepository,
};
use crate::views::{CalendarMode, CalendarNavigator};
use chrono::Local;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use types::{Folder, Todo};

/// Swatches offered when creating a folder. The first one is the default.
pub const PRESET_COLORS: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B88B", "#76D7C4",
];

/// The collection the views are projected from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerData {
    pub todos: Vec<Todo>,
    pub folders: Vec<Folder>,
}

/// Thread-safe in-memory collection.
pub struct PlannerStore(RwLock<PlannerData>);

impl PlannerStore {
    pub fn new(data: PlannerData) -> Self {
        Self(RwLock::new(data))
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, PlannerData>, String> {
        self.0.read().map_err(|e| e.to_string())
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, PlannerData>, String> {
        self.0.write().map_err(|e| e.to_string())
    }
}

pub struct PlannerState {
    pub session: Arc<SessionManager>,
    pub todos: TodoRepository,
    pub folders: FolderRepository,
    pub store: PlannerStore,
    pub navigator: RwLock<CalendarNavigator>,
}

impl PlannerState {
    pub fn new(
        session: Arc<SessionManager>,
        remote: Arc<dyn RecordStore>,
        local: Arc<dyn KeyValueStore>,
        default_view: CalendarMode,
    ) -> Self {
        Self {
            session,
            todos: TodoRepository::new(remote.clone(), local.clone()),
            folders: FolderRepository::new(remote, local),
            store: PlannerStore::new(PlannerData::default()),
            navigator: RwLock::new(CalendarNavigator::new(
                default_view,
                Local::now().date_naive(),
            )),
        }
    }
}

/// Open the local database at `db_path` and wire the repositories to the
/// configured remote, or to a disconnected store when none is configured.
pub fn init_planner(
    settings: &AppSettings,
    db_path: &Path,
) -> Result<PlannerState, Box<dyn std::error::Error>> {
    let local: Arc<dyn KeyValueStore> = Arc::new(init_database(db_path)?);
    let mut session = SessionManager::new(local.clone());

    let remote: Arc<dyn RecordStore> = match settings.remote() {
        Some((url, key)) => {
            let postgrest = Arc::new(PostgrestStore::new(url, key)?);
            session = session.with_remote(postgrest.clone());
            tracing::info!(target: "planner", remote = %url, "Remote record store configured");
            postgrest
        }
        None => {
            tracing::info!(target: "planner", "No remote configured, running on local storage");
            Arc::new(DisconnectedStore)
        }
    };

    Ok(PlannerState::new(
        Arc::new(session),
        remote,
        local,
        settings.default_view,
    ))
}
