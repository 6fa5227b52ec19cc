//! Storage layer: sole owner of persistent state. Accounts and their
//! embedded task lists live in one `users` row each; every read and write
//! of user or task data goes through [`Store`].

use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use tracing::info;

pub mod error;
pub mod model;
pub mod password;

pub use error::StoreError;
pub use model::{ActiveTask, CompletedTask, TaskStats, UserRecord, UserTasks};

const MIN_CREDENTIAL_LEN: usize = 4;

/// Handle to the backing database. Cheap to clone; all operations are
/// scoped to a single username and complete as one row-level write.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

/// Row image of a user document. JSONB columns decode straight into the
/// typed task lists.
#[derive(Debug, FromRow)]
struct UserRow {
    username: String,
    password: String,
    todos: Json<Vec<ActiveTask>>,
    completed: Json<Vec<CompletedTask>>,
    next_task_id: i64,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            username: row.username,
            password: row.password,
            tasks: UserTasks {
                todos: row.todos.0,
                completed: row.completed.0,
                next_task_id: row.next_task_id,
            },
            created_at: row.created_at,
        }
    }
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database named by the connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("connected to database");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Register a new account with empty task lists.
    ///
    /// Usernames are case-sensitive and must be unique; the plaintext
    /// password is hashed before it touches the database. Length limits are
    /// re-checked here even though handlers validate first.
    pub async fn create_user(&self, username: &str, password: &str) -> Result<UserRecord, StoreError> {
        if username.len() < MIN_CREDENTIAL_LEN {
            return Err(StoreError::InvalidInput(
                "username must be at least 4 characters",
            ));
        }
        if password.len() < MIN_CREDENTIAL_LEN {
            return Err(StoreError::InvalidInput(
                "password must be at least 4 characters",
            ));
        }
        if self.user_exists(username).await? {
            return Err(StoreError::AlreadyExists);
        }

        let hash = password::hash_password(password)?;
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password)
            VALUES ($1, $2)
            RETURNING username, password, todos, completed, next_task_id, created_at
            "#,
        )
        .bind(username)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // Two concurrent signups can both pass the exists check; the
            // unique index settles it.
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::AlreadyExists
            }
            _ => StoreError::Unavailable(e),
        })?;

        info!(username = %username, "user created");
        Ok(row.into())
    }

    /// Check a login attempt. Unknown user and wrong password both come
    /// back as `InvalidCredentials`.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let user = match self.get_user(username).await {
            Ok(u) => u,
            Err(StoreError::UserNotFound) => return Err(StoreError::InvalidCredentials),
            Err(e) => return Err(e),
        };
        if password::verify_password(password, &user.password)? {
            Ok(())
        } else {
            Err(StoreError::InvalidCredentials)
        }
    }

    pub async fn user_exists(&self, username: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)"#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Append a task to the user's to-do list and return it with its
    /// freshly allocated id.
    pub async fn add_task(&self, username: &str, text: &str) -> Result<ActiveTask, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::InvalidInput("task text must not be empty"));
        }

        let mut user = self.get_user(username).await?;
        let task = user.tasks.add(text, OffsetDateTime::now_utc());
        self.persist_tasks(&user).await?;
        Ok(task)
    }

    /// Move a task from `todos` to `completed`, stamping the completion
    /// time. Both lists and the counter are written in one statement, so
    /// the task is never observably in both lists or in neither.
    pub async fn complete_task(&self, username: &str, task_id: i64) -> Result<CompletedTask, StoreError> {
        let mut user = self.get_user(username).await?;
        let done = user
            .tasks
            .complete(task_id, OffsetDateTime::now_utc())
            .ok_or(StoreError::TaskNotFound)?;
        self.persist_tasks(&user).await?;
        Ok(done)
    }

    /// Permanently remove a task from whichever list currently holds it.
    pub async fn delete_task(&self, username: &str, task_id: i64) -> Result<(), StoreError> {
        let mut user = self.get_user(username).await?;
        if !user.tasks.delete(task_id) {
            return Err(StoreError::TaskNotFound);
        }
        self.persist_tasks(&user).await?;
        Ok(())
    }

    /// Read-only projection of both lists for rendering.
    pub async fn get_tasks(&self, username: &str) -> Result<UserTasks, StoreError> {
        let user = self.get_user(username).await?;
        Ok(user.tasks)
    }

    /// Active/completed counts, computed on the stored document.
    pub async fn get_stats(&self, username: &str) -> Result<TaskStats, StoreError> {
        sqlx::query_as::<_, TaskStats>(
            r#"
            SELECT jsonb_array_length(todos)::BIGINT     AS active_count,
                   jsonb_array_length(completed)::BIGINT AS completed_count
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::UserNotFound)
    }

    /// Load a user's whole document.
    pub async fn get_user(&self, username: &str) -> Result<UserRecord, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT username, password, todos, completed, next_task_id, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::UserNotFound)?;
        Ok(row.into())
    }

    /// Write back both lists and the id counter in a single statement.
    /// Concurrent mutations of the same user are last-write-wins.
    async fn persist_tasks(&self, user: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET todos = $2, completed = $3, next_task_id = $4
            WHERE username = $1
            "#,
        )
        .bind(&user.username)
        .bind(Json(&user.tasks.todos))
        .bind(Json(&user.tasks.completed))
        .bind(user.tasks.next_task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
