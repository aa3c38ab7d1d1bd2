use crate::plugins::planner::types::Todo;
use serde::Serialize;

/// Pending and completed sections, each in collection order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub pending: Vec<Todo>,
    pub completed: Vec<Todo>,
}

impl ListView {
    pub fn total(&self) -> usize {
        self.pending.len() + self.completed.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }
}

pub fn project_list(todos: &[Todo]) -> ListView {
    let (completed, pending) = todos.iter().cloned().partition(|todo| todo.completed);
    ListView { pending, completed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::planner::types::CreateTodoInput;
    use crate::sync::SyncRecord;
    use chrono::Utc;

    #[test]
    fn test_splits_and_keeps_order() {
        let todos: Vec<Todo> = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let mut todo = Todo::new_local(
                    id.to_string(),
                    "o1",
                    &CreateTodoInput::titled(*id),
                    Utc::now(),
                );
                todo.completed = i % 2 == 1;
                todo
            })
            .collect();

        let view = project_list(&todos);
        let pending: Vec<&str> = view.pending.iter().map(|t| t.id.as_str()).collect();
        let completed: Vec<&str> = view.completed.iter().map(|t| t.id.as_str()).collect();

        assert_eq!(pending, vec!["a", "c"]);
        assert_eq!(completed, vec!["b", "d"]);
        assert_eq!(
            (view.total(), view.pending_count(), view.completed_count()),
            (4, 2, 2)
        );
    }
}
