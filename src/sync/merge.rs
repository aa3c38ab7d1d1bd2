use super::record::SyncRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Which store a listed record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub origin: Origin,
    pub record: T,
}

impl<T> Sourced<T> {
    pub fn local(record: T) -> Self {
        Self {
            origin: Origin::Local,
            record,
        }
    }

    pub fn remote(record: T) -> Self {
        Self {
            origin: Origin::Remote,
            record,
        }
    }
}

/// Local entries first, then remote entries, each list in its own order.
///
/// When the same id is present in both lists only one entry survives, in the
/// local slot: whichever has the later `updated_at` (local wins ties).
pub fn merge_local_first<T: SyncRecord>(local: Vec<T>, remote: Vec<T>) -> Vec<Sourced<T>> {
    let mut merged: Vec<Sourced<T>> = local.into_iter().map(Sourced::local).collect();
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(merged.len());
    for (slot, entry) in merged.iter().enumerate() {
        slots.entry(entry.record.id().to_string()).or_insert(slot);
    }

    for record in remote {
        match slots.get(record.id()) {
            Some(&slot) => {
                if record.updated_at() > merged[slot].record.updated_at() {
                    tracing::debug!(
                        target: "sync::merge",
                        id = %record.id(),
                        "Remote copy is newer than local copy"
                    );
                    merged[slot] = Sourced::remote(record);
                }
            }
            None => merged.push(Sourced::remote(record)),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::planner::types::{CreateTodoInput, Todo};
    use chrono::{Duration, Utc};

    fn todo(id: &str, title: &str, age_secs: i64) -> Todo {
        Todo::new_local(
            id.to_string(),
            "o1",
            &CreateTodoInput::titled(title),
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    fn ids(merged: &[Sourced<Todo>]) -> Vec<(&str, Origin)> {
        merged
            .iter()
            .map(|s| (s.record.id.as_str(), s.origin))
            .collect()
    }

    #[test]
    fn test_local_entries_precede_remote() {
        let merged = merge_local_first(
            vec![todo("l1", "a", 0), todo("l2", "b", 0)],
            vec![todo("r1", "c", 0)],
        );
        assert_eq!(
            ids(&merged),
            vec![
                ("l1", Origin::Local),
                ("l2", Origin::Local),
                ("r1", Origin::Remote)
            ]
        );
    }

    #[test]
    fn test_colliding_id_keeps_newer_copy_in_local_slot() {
        let merged = merge_local_first(
            vec![todo("l1", "local", 0), todo("x", "stale local", 60)],
            vec![todo("x", "fresh remote", 0), todo("r1", "r", 0)],
        );

        assert_eq!(
            ids(&merged),
            vec![
                ("l1", Origin::Local),
                ("x", Origin::Remote),
                ("r1", Origin::Remote)
            ]
        );
        assert_eq!(merged[1].record.title, "fresh remote");
    }

    #[test]
    fn test_colliding_id_prefers_local_when_newer() {
        let merged = merge_local_first(
            vec![todo("x", "fresh local", 0)],
            vec![todo("x", "stale remote", 60)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].origin, Origin::Local);
        assert_eq!(merged[0].record.title, "fresh local");
    }
}
