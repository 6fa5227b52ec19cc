use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// A task still on the to-do list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTask {
    pub id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A task that has been checked off. `created_at` is dropped on the
/// transition; only the completion time is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

/// Derived per-user counts, either computed from the lists or read straight
/// off the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct TaskStats {
    pub active_count: i64,
    pub completed_count: i64,
}

/// Both task lists of one user plus the id allocator that keeps ids unique
/// across the union of the two lists for the lifetime of the account.
#[derive(Debug, Clone, PartialEq)]
pub struct UserTasks {
    pub todos: Vec<ActiveTask>,
    pub completed: Vec<CompletedTask>,
    pub next_task_id: i64,
}

impl UserTasks {
    pub fn new() -> Self {
        Self {
            todos: Vec::new(),
            completed: Vec::new(),
            next_task_id: 1,
        }
    }

    /// Append a new active task, consuming the next id. Ids are never
    /// reused, even after completion or deletion.
    pub fn add(&mut self, text: &str, now: OffsetDateTime) -> ActiveTask {
        let task = ActiveTask {
            id: self.next_task_id,
            text: text.to_string(),
            created_at: now,
        };
        self.next_task_id += 1;
        self.todos.push(task.clone());
        task
    }

    /// Move a task from `todos` to `completed`, stamping the completion
    /// time. Returns `None` if the id is not currently active.
    pub fn complete(&mut self, task_id: i64, now: OffsetDateTime) -> Option<CompletedTask> {
        let pos = self.todos.iter().position(|t| t.id == task_id)?;
        let task = self.todos.remove(pos);
        let done = CompletedTask {
            id: task.id,
            text: task.text,
            completed_at: now,
        };
        self.completed.push(done.clone());
        Some(done)
    }

    /// Remove a task from whichever list holds it. Returns false if the id
    /// is in neither.
    pub fn delete(&mut self, task_id: i64) -> bool {
        if let Some(pos) = self.todos.iter().position(|t| t.id == task_id) {
            self.todos.remove(pos);
            return true;
        }
        if let Some(pos) = self.completed.iter().position(|t| t.id == task_id) {
            self.completed.remove(pos);
            return true;
        }
        false
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats {
            active_count: self.todos.len() as i64,
            completed_count: self.completed.len() as i64,
        }
    }
}

impl Default for UserTasks {
    fn default() -> Self {
        Self::new()
    }
}

/// A user account as stored: credentials plus the embedded task lists.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    /// Salted argon2 hash, never the plaintext.
    pub password: String,
    pub tasks: UserTasks,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn now() -> OffsetDateTime {
        datetime!(2026-01-15 12:00 UTC)
    }

    #[test]
    fn ids_are_strictly_increasing_and_never_reused() {
        let mut tasks = UserTasks::new();
        let a = tasks.add("one", now());
        let b = tasks.add("two", now());
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        assert!(tasks.delete(b.id));
        let c = tasks.add("three", now());
        // The deleted id 2 is gone for good.
        assert_eq!(c.id, 3);

        tasks.complete(a.id, now()).expect("task 1 is active");
        let d = tasks.add("four", now());
        assert_eq!(d.id, 4);
    }

    #[test]
    fn complete_moves_task_and_swaps_timestamps() {
        let mut tasks = UserTasks::new();
        let created = tasks.add("buy milk", now());
        let completed_at = datetime!(2026-01-16 09:30 UTC);

        let done = tasks.complete(created.id, completed_at).expect("active task");
        assert_eq!(done.id, created.id);
        assert_eq!(done.text, "buy milk");
        assert_eq!(done.completed_at, completed_at);

        assert!(tasks.todos.iter().all(|t| t.id != created.id));
        let in_completed: Vec<_> = tasks.completed.iter().filter(|t| t.id == created.id).collect();
        assert_eq!(in_completed.len(), 1);
    }

    #[test]
    fn complete_unknown_id_leaves_state_unchanged() {
        let mut tasks = UserTasks::new();
        tasks.add("only", now());
        let before = tasks.clone();

        assert!(tasks.complete(99, now()).is_none());
        assert_eq!(tasks, before);

        // Completing twice fails the second time.
        tasks.complete(1, now()).expect("first completion");
        assert!(tasks.complete(1, now()).is_none());
    }

    #[test]
    fn delete_removes_from_either_list() {
        let mut tasks = UserTasks::new();
        let a = tasks.add("active", now());
        let b = tasks.add("done", now());
        tasks.complete(b.id, now()).expect("active task");

        assert!(tasks.delete(a.id));
        assert!(tasks.delete(b.id));
        assert!(!tasks.delete(a.id));
        assert!(tasks.todos.is_empty());
        assert!(tasks.completed.is_empty());
    }

    #[test]
    fn stats_count_both_lists() {
        let mut tasks = UserTasks::new();
        tasks.add("a", now());
        tasks.add("b", now());
        tasks.add("c", now());
        tasks.complete(1, now()).expect("active task");

        let stats = tasks.stats();
        assert_eq!(stats.active_count, 2);
        assert_eq!(stats.completed_count, 1);
    }

    #[test]
    fn alice_lifecycle() {
        let mut tasks = UserTasks::new();
        let milk = tasks.add("buy milk", now());
        let bills = tasks.add("pay bills", now());
        assert_eq!(milk.id, 1);
        assert_eq!(bills.id, 2);

        tasks.complete(1, now()).expect("buy milk is active");
        assert_eq!(tasks.todos.len(), 1);
        assert_eq!(tasks.todos[0].text, "pay bills");
        assert_eq!(tasks.completed.len(), 1);
        assert_eq!(tasks.completed[0].text, "buy milk");

        assert!(tasks.delete(2));
        assert!(tasks.todos.is_empty());
        assert_eq!(tasks.completed.len(), 1);
        assert_eq!(tasks.completed[0].id, 1);
    }

    #[test]
    fn stored_document_shape() {
        let mut tasks = UserTasks::new();
        tasks.add("write report", now());
        tasks.add("send report", now());
        tasks.complete(2, datetime!(2026-01-15 18:00 UTC)).expect("active task");

        let todos = serde_json::to_value(&tasks.todos).expect("serialize todos");
        assert_eq!(todos[0]["id"], 1);
        assert_eq!(todos[0]["text"], "write report");
        assert_eq!(todos[0]["created_at"], "2026-01-15T12:00:00Z");

        let completed = serde_json::to_value(&tasks.completed).expect("serialize completed");
        assert_eq!(completed[0]["id"], 2);
        assert_eq!(completed[0]["completed_at"], "2026-01-15T18:00:00Z");
        // Completed entries carry no creation timestamp.
        assert!(completed[0].get("created_at").is_none());
    }
}
