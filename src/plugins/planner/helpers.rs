use super::types::{Folder, Todo};
use super::PlannerData;

/// Swap in `todo` where its id already sits. Returns false when absent.
pub fn replace_todo(data: &mut PlannerData, todo: Todo) -> bool {
    match data.todos.iter_mut().find(|t| t.id == todo.id) {
        Some(slot) => {
            *slot = todo;
            true
        }
        None => false,
    }
}

pub fn replace_folder(data: &mut PlannerData, folder: Folder) -> bool {
    match data.folders.iter_mut().find(|f| f.id == folder.id) {
        Some(slot) => {
            *slot = folder;
            true
        }
        None => false,
    }
}

/// Ids of todos filed under `folder_id`.
pub fn todos_in_folder(todos: &[Todo], folder_id: &str) -> Vec<String> {
    todos
        .iter()
        .filter(|todo| todo.folder_id.as_deref() == Some(folder_id))
        .map(|todo| todo.id.clone())
        .collect()
}

/// Trimmed text, or `None` when nothing is left.
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
