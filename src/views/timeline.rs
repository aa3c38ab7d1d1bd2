use super::{folder_for, index_folders, NEUTRAL_ACCENT};
use crate::plugins::planner::types::{DueDate, Folder, Todo};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const NO_FOLDER_LABEL: &str = "Free Time / No Category";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Past,
    Today,
    Future,
}

impl DayStatus {
    pub fn classify(date: NaiveDate, today: NaiveDate) -> Self {
        match date.cmp(&today) {
            std::cmp::Ordering::Less => DayStatus::Past,
            std::cmp::Ordering::Equal => DayStatus::Today,
            std::cmp::Ordering::Greater => DayStatus::Future,
        }
    }
}

/// Maps instants between the earliest and latest due date onto 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineScale {
    pub earliest: NaiveDateTime,
    pub latest: NaiveDateTime,
}

impl TimelineScale {
    pub fn new(earliest: NaiveDateTime, latest: NaiveDateTime) -> Self {
        Self { earliest, latest }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.earliest <= at && at <= self.latest
    }

    /// A single-instant range puts everything in the middle.
    pub fn position(&self, at: NaiveDateTime) -> f64 {
        let span = (self.latest - self.earliest).num_milliseconds();
        if span <= 0 {
            return 50.0;
        }
        let offset = (at - self.earliest).num_milliseconds();
        (offset as f64 / span as f64 * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub due_date: DueDate,
    /// `HH:MM`, only for timed due dates.
    pub time: Option<String>,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderGroup {
    /// `None` for the no-folder bucket.
    pub folder_id: Option<String>,
    pub name: String,
    pub color: String,
    pub tasks: Vec<TimelineTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDay {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub pending: usize,
    pub completed: usize,
    pub groups: Vec<FolderGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineView {
    pub earliest: NaiveDateTime,
    pub latest: NaiveDateTime,
    /// Present only while `now` lies within the range.
    pub now_position: Option<f64>,
    pub days: Vec<TimelineDay>,
}

impl TimelineView {
    pub fn tasks(&self) -> impl Iterator<Item = &TimelineTask> {
        self.days
            .iter()
            .flat_map(|day| day.groups.iter())
            .flat_map(|group| group.tasks.iter())
    }
}

/// Build the timeline for `todos` as seen at `now` (local wall-clock time).
///
/// Returns `None` when no todo has a due date.
pub fn project_timeline(todos: &[Todo], folders: &[Folder], now: NaiveDateTime) -> Option<TimelineView> {
    let mut dated: Vec<(&Todo, DueDate)> = todos
        .iter()
        .filter_map(|todo| todo.due_date.map(|due| (todo, due)))
        .collect();
    // stable: equal due dates keep collection order
    dated.sort_by(|a, b| a.1.cmp(&b.1));

    let earliest = dated.first()?.1.instant();
    let latest = dated.last()?.1.instant();
    let scale = TimelineScale::new(earliest, latest);
    let folders = index_folders(folders);
    let today = now.date();

    let mut days: Vec<TimelineDay> = Vec::new();
    for (todo, due) in dated {
        let date = due.date();
        if days.last().map(|d| d.date) != Some(date) {
            days.push(TimelineDay {
                date,
                status: DayStatus::classify(date, today),
                pending: 0,
                completed: 0,
                groups: Vec::new(),
            });
        }
        let Some(day) = days.last_mut() else {
            continue;
        };

        if todo.completed {
            day.completed += 1;
        } else {
            day.pending += 1;
        }

        let task = TimelineTask {
            id: todo.id.clone(),
            title: todo.title.clone(),
            completed: todo.completed,
            due_date: due,
            time: due.time_label(),
            position: scale.position(due.instant()),
        };

        // Ids of deleted folders share the no-folder group.
        let folder = folder_for(&folders, todo.folder_id.as_deref());
        let key = folder.map(|f| f.id.clone());
        match day.groups.iter_mut().find(|g| g.folder_id == key) {
            Some(group) => group.tasks.push(task),
            None => {
                day.groups.push(FolderGroup {
                    folder_id: key,
                    name: folder.map_or_else(|| NO_FOLDER_LABEL.to_string(), |f| f.name.clone()),
                    color: folder.map_or_else(|| NEUTRAL_ACCENT.to_string(), |f| f.color.clone()),
                    tasks: vec![task],
                });
            }
        }
    }

    Some(TimelineView {
        earliest,
        latest,
        now_position: scale.contains(now).then(|| scale.position(now)),
        days,
    })
}
