use serde::{Deserialize, Serialize};

use crate::store::{ActiveTask, CompletedTask};

/// Request body for adding a task.
#[derive(Debug, Deserialize)]
pub struct AddTaskRequest {
    pub text: String,
}

/// Both lists of the caller's tasks, in display order.
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub todos: Vec<ActiveTask>,
    pub completed: Vec<CompletedTask>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn task_list_response_serialization() {
        let response = TaskListResponse {
            todos: vec![ActiveTask {
                id: 2,
                text: "pay bills".into(),
                created_at: datetime!(2026-01-15 12:00 UTC),
            }],
            completed: vec![CompletedTask {
                id: 1,
                text: "buy milk".into(),
                completed_at: datetime!(2026-01-15 13:00 UTC),
            }],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["todos"][0]["text"], "pay bills");
        assert_eq!(json["completed"][0]["id"], 1);
        assert_eq!(json["completed"][0]["completed_at"], "2026-01-15T13:00:00Z");
    }
}
