use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{Task, TaskInput, TaskQuery, UpdateTaskInput},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const TASK_COLUMNS: &str = "id, description, completed, owner_id, created_at, updated_at";

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `description`: what the task is about (required, non-empty).
/// - `completed` (optional): defaults to false.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `400 Bad Request`: If the body is malformed or fails validation.
/// - `401 Unauthorized`: If the request lacks a valid session token.
#[post("/tasks")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    // Validate input
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), current.user.id);

    // Insert task
    let result = sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (id, description, completed, owner_id)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(task.id)
    .bind(task.description)
    .bind(task.completed)
    .bind(task.owner_id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(result))
}

/// Retrieves the authenticated user's tasks.
///
/// Only tasks owned by the caller are returned.
///
/// ## Query Parameters:
/// - `completed` (optional): filter by completion state.
/// - `limit` / `skip` (optional): pagination.
/// - `sortBy` (optional): `column:direction`, e.g. `created_at:desc`;
///   only whitelisted columns are accepted.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects.
/// - `400 Bad Request`: On an unknown sort column or negative pagination values.
/// - `401 Unauthorized`: If the request lacks a valid session token.
#[get("/tasks")]
pub async fn list_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskQuery>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    let order_clause = query_params.order_clause()?;

    if query_params.limit.is_some_and(|limit| limit < 0)
        || query_params.skip.is_some_and(|skip| skip < 0)
    {
        return Err(AppError::BadRequest(
            "limit and skip must not be negative".into(),
        ));
    }

    // Base query scoped to the owner; filter and pagination clauses are
    // appended with numbered binds, the order clause comes pre-validated.
    let mut sql = format!(
        "SELECT {} FROM tasks WHERE owner_id = $1",
        TASK_COLUMNS
    );
    let mut param_count = 2;

    if query_params.completed.is_some() {
        sql.push_str(&format!(" AND completed = ${}", param_count));
        param_count += 1;
    }

    sql.push_str(&format!(" ORDER BY {}", order_clause));

    if query_params.limit.is_some() {
        sql.push_str(&format!(" LIMIT ${}", param_count));
        param_count += 1;
    }
    if query_params.skip.is_some() {
        sql.push_str(&format!(" OFFSET ${}", param_count));
    }

    let mut query_builder = sqlx::query_as::<_, Task>(&sql);

    query_builder = query_builder.bind(current.user.id);

    if let Some(completed) = query_params.completed {
        query_builder = query_builder.bind(completed);
    }
    if let Some(limit) = query_params.limit {
        query_builder = query_builder.bind(limit);
    }
    if let Some(skip) = query_params.skip {
        query_builder = query_builder.bind(skip);
    }

    let tasks = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Retrieves a specific task by its ID.
///
/// Tasks owned by someone else are indistinguishable from missing ones.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task` object as JSON.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If the task does not exist or is not owned by the caller.
#[get("/tasks/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2",
        TASK_COLUMNS
    ))
    .bind(task_id.into_inner())
    .bind(current.user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Updates an existing task.
///
/// Only `description` and `completed` may change; any other key in the
/// body fails deserialization with 400.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task` object as JSON.
/// - `400 Bad Request`: On unknown fields or validation failures.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If the task does not exist or is not owned by the caller.
#[patch("/tasks/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<UpdateTaskInput>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task_uuid = task_id.into_inner();
    let update = task_data.into_inner();

    let task = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2",
        TASK_COLUMNS
    ))
    .bind(task_uuid)
    .bind(current.user.id)
    .fetch_optional(&**pool)
    .await?;

    let mut task = match task {
        Some(task) => task,
        None => return Err(AppError::NotFound("Task not found".into())),
    };

    if update.is_empty() {
        return Ok(HttpResponse::Ok().json(task));
    }

    if let Some(description) = update.description {
        task.description = description;
    }
    if let Some(completed) = update.completed {
        task.completed = completed;
    }

    let result = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET description = $1, completed = $2, updated_at = now()
         WHERE id = $3 AND owner_id = $4
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(&task.description)
    .bind(task.completed)
    .bind(task_uuid)
    .bind(current.user.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(result))
}

/// Deletes a task by its ID.
///
/// ## Responses:
/// - `200 OK`: Returns the deleted `Task` object as JSON.
/// - `401 Unauthorized`: If the request lacks a valid session token.
/// - `404 Not Found`: If the task does not exist or is not owned by the caller.
#[delete("/tasks/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    let deleted = sqlx::query_as::<_, Task>(&format!(
        "DELETE FROM tasks WHERE id = $1 AND owner_id = $2 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(task_id.into_inner())
    .bind(current.user.id)
    .fetch_optional(&**pool)
    .await?;

    match deleted {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}
