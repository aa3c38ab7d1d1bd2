//! Pure projections of the in-memory collection. Nothing here is persisted.

pub mod calendar;
pub mod list;
pub mod timeline;

use crate::plugins::planner::types::Folder;
use std::collections::HashMap;

/// Alpha suffix appended to a folder color for task backgrounds.
pub const TINT_ALPHA: &str = "30";
/// Background for tasks without a folder.
pub const NEUTRAL_TINT: &str = "#E5E7EB30";
/// Accent (border / dot) for tasks without a folder.
pub const NEUTRAL_ACCENT: &str = "#9CA3AF";

/// Folders by id.
pub type FolderIndex<'a> = HashMap<&'a str, &'a Folder>;

pub fn index_folders(folders: &[Folder]) -> FolderIndex<'_> {
    folders.iter().map(|f| (f.id.as_str(), f)).collect()
}

/// Resolve a todo's folder, ignoring dangling references.
pub fn folder_for<'a>(index: &FolderIndex<'a>, folder_id: Option<&str>) -> Option<&'a Folder> {
    folder_id.and_then(|id| index.get(id).copied())
}

pub use calendar::{project_calendar, CalendarMode, CalendarNavigator, CalendarView};
pub use list::{project_list, ListView};
pub use timeline::{project_timeline, TimelineView};
