use crate::sync::record::{owned_payload, SyncRecord};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Due dates
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid due date: {0}")]
pub struct DueDateError(String);

/// A due date is either a whole calendar day or a wall-clock moment (local time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DueDate {
    Day(NaiveDate),
    At(NaiveDateTime),
}

impl DueDate {
    /// Calendar day used for bucketing; time of day is ignored.
    pub fn date(&self) -> NaiveDate {
        match self {
            DueDate::Day(date) => *date,
            DueDate::At(at) => at.date(),
        }
    }

    /// Moment used for ordering and timeline positions. Whole days sit at midnight.
    pub fn instant(&self) -> NaiveDateTime {
        match self {
            DueDate::Day(date) => date.and_time(chrono::NaiveTime::MIN),
            DueDate::At(at) => *at,
        }
    }

    /// `HH:MM` for dated-and-timed entries.
    pub fn time_label(&self) -> Option<String> {
        match self {
            DueDate::Day(_) => None,
            DueDate::At(at) => Some(at.format("%H:%M").to_string()),
        }
    }
}

impl Ord for DueDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant()
            .cmp(&other.instant())
            .then_with(|| matches!(self, DueDate::At(_)).cmp(&matches!(other, DueDate::At(_))))
    }
}

impl PartialOrd for DueDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl FromStr for DueDate {
    type Err = DueDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(DueDate::Day(date));
        }

        for format in DATE_TIME_FORMATS {
            if let Ok(at) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(DueDate::At(at));
            }
        }

        // Offset-carrying timestamps (as returned by timestamptz columns) are shown in local time.
        if let Ok(at) = DateTime::parse_from_rfc3339(s) {
            return Ok(DueDate::At(at.with_timezone(&Local).naive_local()));
        }

        Err(DueDateError(s.to_string()))
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDate::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DueDate::At(at) if at.second() == 0 && at.nanosecond() == 0 => {
                write!(f, "{}", at.format("%Y-%m-%dT%H:%M"))
            }
            DueDate::At(at) => write!(f, "{}", at.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl Serialize for DueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Forms submit an empty string for "no date"; treat it like null.
fn optional_due_date<'de, D>(deserializer: D) -> Result<Option<DueDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Absent field → `None`, explicit null → `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "optional_due_date")]
    pub due_date: Option<DueDate>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// The folder color with a two-hex-digit alpha suffix appended (`#FF6B6B` + `30`).
    pub fn tint(&self, alpha: &str) -> String {
        format!("{}{}", self.color, alpha)
    }
}

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTodoInput {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_due_date"
    )]
    pub due_date: Option<DueDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl CreateTodoInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial todo update. Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTodoInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub due_date: Option<Option<DueDate>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub folder_id: Option<Option<String>>,
}

impl UpdateTodoInput {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn clear_folder() -> Self {
        Self {
            folder_id: Some(None),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateFolderInput {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateFolderInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// ============================================================================
// Sync wiring
// ============================================================================

impl SyncRecord for Todo {
    type Create = CreateTodoInput;
    type Patch = UpdateTodoInput;

    const TABLE: &'static str = "todos";
    const LOCAL_PREFIX: &'static str = "local_todos_";

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn new_local(id: String, owner_id: &str, input: &CreateTodoInput, now: DateTime<Utc>) -> Self {
        Todo {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            completed: false,
            due_date: input.due_date,
            folder_id: input.folder_id.clone(),
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: &UpdateTodoInput, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(folder_id) = &patch.folder_id {
            self.folder_id = folder_id.clone();
        }
        self.updated_at = now;
    }

    fn insert_payload(
        owner_id: &str,
        input: &CreateTodoInput,
    ) -> Result<serde_json::Value, serde_json::Error> {
        let mut payload = owned_payload(owner_id, input)?;
        if let Some(object) = payload.as_object_mut() {
            object.insert("completed".to_string(), serde_json::Value::Bool(false));
        }
        Ok(payload)
    }
}

impl SyncRecord for Folder {
    type Create = CreateFolderInput;
    type Patch = UpdateFolderInput;

    const TABLE: &'static str = "folders";
    const LOCAL_PREFIX: &'static str = "local_folders_";

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn new_local(
        id: String,
        owner_id: &str,
        input: &CreateFolderInput,
        now: DateTime<Utc>,
    ) -> Self {
        Folder {
            id,
            name: input.name.clone(),
            color: input.color.clone(),
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: &UpdateFolderInput, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        self.updated_at = now;
    }
}
