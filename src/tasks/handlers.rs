use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::jwt::AuthUser,
    state::AppState,
    store::{ActiveTask, CompletedTask, StoreError, TaskStats},
};

use super::dto::{AddTaskRequest, TaskListResponse};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/stats", get(get_stats))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(add_task))
        .route("/tasks/:id/complete", post(complete_task))
        .route("/tasks/:id", delete(delete_task))
}

/// Map a storage failure to an HTTP reply. A vanished account reads as an
/// expired session, a vanished task as 404.
fn store_err(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::UserNotFound => (StatusCode::UNAUTHORIZED, "Session expired".into()),
        StoreError::TaskNotFound => (StatusCode::NOT_FOUND, "Task not found".into()),
        StoreError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
        e => {
            error!(error = %e, "store operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".into())
        }
    }
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<TaskListResponse>, (StatusCode, String)> {
    let tasks = state.store.get_tasks(&username).await.map_err(store_err)?;
    Ok(Json(TaskListResponse {
        todos: tasks.todos,
        completed: tasks.completed,
    }))
}

#[instrument(skip(state, payload))]
pub async fn add_task(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(payload): Json<AddTaskRequest>,
) -> Result<(StatusCode, Json<ActiveTask>), (StatusCode, String)> {
    let task = state
        .store
        .add_task(&username, &payload.text)
        .await
        .map_err(store_err)?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state))]
pub async fn complete_task(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<CompletedTask>, (StatusCode, String)> {
    let done = state
        .store
        .complete_task(&username, id)
        .await
        .map_err(store_err)?;
    Ok(Json(done))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .delete_task(&username, id)
        .await
        .map_err(store_err)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<TaskStats>, (StatusCode, String)> {
    let stats = state.store.get_stats(&username).await.map_err(store_err)?;
    Ok(Json(stats))
}
