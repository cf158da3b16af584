use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Columns that `GET /tasks?sortBy=...` may order by.
const SORTABLE_COLUMNS: &[&str] = &["created_at", "updated_at", "description", "completed"];

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// What the task is about. Required and non-empty.
    #[validate(length(min = 1, max = 1000))]
    pub description: String,

    /// Whether the task is already done. Defaults to false.
    #[serde(default)]
    pub completed: bool,
}

/// Input structure for `PATCH /tasks/{id}`.
///
/// Only `description` and `completed` may be updated; any other key in the
/// body fails deserialization (400).
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 1000))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTaskInput {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.completed.is_none()
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// What the task is about.
    pub description: String,
    /// Whether the task is done.
    pub completed: bool,
    /// Identifier of the user who owns the task.
    pub owner_id: i32,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for `GET /tasks`.
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    /// Filter by completion state.
    pub completed: Option<bool>,
    /// Page size.
    pub limit: Option<i64>,
    /// Offset into the result set.
    pub skip: Option<i64>,
    /// `column:direction`, e.g. `created_at:desc`. Direction defaults to
    /// ascending when omitted.
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

impl TaskQuery {
    /// Resolves `sort_by` into a safe ORDER BY clause.
    ///
    /// Only whitelisted column names are interpolated into SQL; everything
    /// else is rejected before a query is built.
    pub fn order_clause(&self) -> Result<String, AppError> {
        let Some(sort_by) = &self.sort_by else {
            return Ok("created_at DESC".to_string());
        };

        let (column, direction) = match sort_by.split_once(':') {
            Some((column, direction)) => (column, direction),
            None => (sort_by.as_str(), "asc"),
        };

        if !SORTABLE_COLUMNS.contains(&column) {
            return Err(AppError::BadRequest(format!(
                "Cannot sort by '{}'",
                column
            )));
        }

        let direction = match direction.to_lowercase().as_str() {
            "asc" => "ASC",
            "desc" => "DESC",
            other => {
                return Err(AppError::BadRequest(format!(
                    "Invalid sort direction '{}'",
                    other
                )))
            }
        };

        Ok(format!("{} {}", column, direction))
    }
}

impl Task {
    /// Creates a new `Task` instance from `TaskInput` and the owner's user id.
    /// Sets `created_at`, `updated_at` to the current time, and `id` to a new UUID.
    pub fn new(input: TaskInput, owner_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description,
            completed: input.completed,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}
