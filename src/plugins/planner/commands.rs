//! Host-facing planner operations.
//!
//! Every command keeps the in-memory collection in step with what the
//! repositories returned and reports failures as plain strings. No lock is
//! held across a repository call.

use super::helpers::{non_blank, replace_folder, replace_todo, todos_in_folder};
use super::types::{
    CreateFolderInput, CreateTodoInput, Folder, Todo, UpdateFolderInput, UpdateTodoInput,
};
use super::{PlannerData, PlannerState, PRESET_COLORS};
use crate::core::session::{Identity, OwnerProvider};
use crate::views::{
    project_list, project_timeline, CalendarMode, CalendarView, ListView, TimelineView,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

fn owner_id(state: &PlannerState) -> Result<String, String> {
    state.session.ensure_owner_id().map_err(|e| e.to_string())
}

/// Fetch todos and folders for the active owner and replace the collection.
pub async fn planner_load(state: &PlannerState) -> Result<PlannerData, String> {
    let owner_id = owner_id(state)?;

    let todos = state.todos.list(&owner_id).await.map_err(|e| e.to_string())?;
    let folders = state
        .folders
        .list(&owner_id)
        .await
        .map_err(|e| e.to_string())?;

    let mut data = state.store.write()?;
    data.todos = todos;
    data.folders = folders;

    tracing::info!(
        target: "planner",
        owner_id = %owner_id,
        todos = data.todos.len(),
        folders = data.folders.len(),
        "Planner loaded"
    );
    Ok(data.clone())
}

pub fn todo_get_all(state: &PlannerState) -> Result<Vec<Todo>, String> {
    Ok(state.store.read()?.todos.clone())
}

pub async fn todo_create(state: &PlannerState, input: CreateTodoInput) -> Result<Todo, String> {
    let title = non_blank(&input.title).ok_or_else(|| "Title is required".to_string())?;
    let input = CreateTodoInput {
        title,
        description: input.description.as_deref().and_then(non_blank),
        due_date: input.due_date,
        folder_id: input.folder_id.as_deref().and_then(non_blank),
    };

    let owner_id = owner_id(state)?;
    let todo = state
        .todos
        .create(&owner_id, &input)
        .await
        .map_err(|e| e.to_string())?;

    state.store.write()?.todos.insert(0, todo.clone());
    crate::log_target!("planner", debug, id = %todo.id, "Todo created");
    Ok(todo)
}

pub async fn todo_update(
    state: &PlannerState,
    id: String,
    input: UpdateTodoInput,
) -> Result<Todo, String> {
    let mut input = input;
    if let Some(title) = &input.title {
        input.title = Some(non_blank(title).ok_or_else(|| "Title cannot be empty".to_string())?);
    }
    if let Some(Some(folder_id)) = &input.folder_id {
        input.folder_id = Some(non_blank(folder_id));
    }

    let todo = state
        .todos
        .update(&id, &input)
        .await
        .map_err(|e| e.to_string())?;

    replace_todo(&mut *state.store.write()?, todo.clone());
    Ok(todo)
}

pub async fn todo_toggle(state: &PlannerState, id: String, completed: bool) -> Result<Todo, String> {
    let todo = state
        .todos
        .toggle(&id, completed)
        .await
        .map_err(|e| e.to_string())?;

    replace_todo(&mut *state.store.write()?, todo.clone());
    Ok(todo)
}

pub async fn todo_delete(state: &PlannerState, id: String) -> Result<(), String> {
    state.todos.delete(&id).await.map_err(|e| e.to_string())?;

    state.store.write()?.todos.retain(|todo| todo.id != id);
    Ok(())
}

pub fn folder_get_all(state: &PlannerState) -> Result<Vec<Folder>, String> {
    Ok(state.store.read()?.folders.clone())
}

pub async fn folder_create(state: &PlannerState, input: CreateFolderInput) -> Result<Folder, String> {
    let name = non_blank(&input.name).ok_or_else(|| "Folder name is required".to_string())?;
    let color = non_blank(&input.color).unwrap_or_else(|| PRESET_COLORS[0].to_string());

    let owner_id = owner_id(state)?;
    let folder = state
        .folders
        .create(&owner_id, &CreateFolderInput { name, color })
        .await
        .map_err(|e| e.to_string())?;

    state.store.write()?.folders.insert(0, folder.clone());
    Ok(folder)
}

pub async fn folder_update(
    state: &PlannerState,
    id: String,
    input: UpdateFolderInput,
) -> Result<Folder, String> {
    let input = UpdateFolderInput {
        name: match &input.name {
            Some(name) => {
                Some(non_blank(name).ok_or_else(|| "Folder name cannot be empty".to_string())?)
            }
            None => None,
        },
        color: input.color.as_deref().and_then(non_blank),
    };

    let folder = state
        .folders
        .update(&id, &input)
        .await
        .map_err(|e| e.to_string())?;

    replace_folder(&mut *state.store.write()?, folder.clone());
    Ok(folder)
}

/// Delete a folder. Its todos stay, with `folder_id` cleared.
/// Returns how many todos were unfiled.
pub async fn folder_delete(state: &PlannerState, id: String) -> Result<usize, String> {
    let owner_id = owner_id(state)?;
    state.folders.delete(&id).await.map_err(|e| e.to_string())?;

    // Persisted todos may not be loaded yet; unfile those as well as the loaded ones.
    let stored = state
        .todos
        .list(&owner_id)
        .await
        .map_err(|e| e.to_string())?;
    let mut filed = todos_in_folder(&stored, &id);
    let loaded = todos_in_folder(&state.store.read()?.todos, &id);
    for todo_id in loaded {
        if !filed.contains(&todo_id) {
            filed.push(todo_id);
        }
    }
    let clear = UpdateTodoInput::clear_folder();

    let mut unfiled = Vec::with_capacity(filed.len());
    for todo_id in &filed {
        match state.todos.update(todo_id, &clear).await {
            Ok(todo) => unfiled.push(todo),
            Err(e) => tracing::warn!(
                target: "planner",
                id = %todo_id,
                error = %e,
                "Could not unfile todo, clearing it in memory only"
            ),
        }
    }

    let mut data = state.store.write()?;
    for todo in unfiled {
        replace_todo(&mut *data, todo);
    }
    for todo in data.todos.iter_mut() {
        if todo.folder_id.as_deref() == Some(id.as_str()) {
            todo.folder_id = None;
        }
    }
    data.folders.retain(|folder| folder.id != id);

    tracing::info!(target: "planner", id = %id, unfiled = filed.len(), "Folder deleted");
    Ok(filed.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarAction {
    Previous,
    Next,
    Today,
}

fn project_calendar_state(state: &PlannerState, today: NaiveDate) -> Result<CalendarView, String> {
    let navigator = *state.navigator.read().map_err(|e| e.to_string())?;
    let data = state.store.read()?;
    Ok(navigator.project(&data.todos, &data.folders, today))
}

/// Calendar around `reference` in `mode`; omitted values keep the current navigation.
pub fn calendar_view(
    state: &PlannerState,
    reference: Option<NaiveDate>,
    mode: Option<CalendarMode>,
) -> Result<CalendarView, String> {
    {
        let mut navigator = state.navigator.write().map_err(|e| e.to_string())?;
        if let Some(reference) = reference {
            *navigator = crate::views::CalendarNavigator::new(navigator.mode(), reference);
        }
        if let Some(mode) = mode {
            navigator.set_mode(mode);
        }
    }

    project_calendar_state(state, Local::now().date_naive())
}

pub fn calendar_navigate(state: &PlannerState, action: CalendarAction) -> Result<CalendarView, String> {
    let today = Local::now().date_naive();
    {
        let mut navigator = state.navigator.write().map_err(|e| e.to_string())?;
        match action {
            CalendarAction::Previous => navigator.previous(),
            CalendarAction::Next => navigator.next(),
            CalendarAction::Today => navigator.today(today),
        }
    }

    project_calendar_state(state, today)
}

pub fn timeline_view(state: &PlannerState) -> Result<Option<TimelineView>, String> {
    let data = state.store.read()?;
    Ok(project_timeline(
        &data.todos,
        &data.folders,
        Local::now().naive_local(),
    ))
}

pub fn list_view(state: &PlannerState) -> Result<ListView, String> {
    Ok(project_list(&state.store.read()?.todos))
}

/// Switch to an authenticated user and reload their records.
pub async fn sign_in(
    state: &PlannerState,
    user_id: String,
    email: Option<String>,
    access_token: Option<String>,
) -> Result<PlannerData, String> {
    let user_id = non_blank(&user_id).ok_or_else(|| "User id is required".to_string())?;
    state
        .session
        .sign_in(&user_id, email, access_token)
        .map_err(|e| e.to_string())?;
    planner_load(state).await
}

/// Forget the authenticated user and empty the collection.
pub fn sign_out(state: &PlannerState) -> Result<(), String> {
    state.session.sign_out().map_err(|e| e.to_string())?;
    *state.store.write()? = PlannerData::default();
    Ok(())
}

pub fn current_identity(state: &PlannerState) -> Option<Identity> {
    state.session.identity()
}
