use crate::task::{NewTask, Task, TaskService, TaskServiceError, TaskState, TaskStatus, date};
use axum::{
    Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskJson {
    /// Unique identifier assigned on creation
    id: i32,
    /// Title of the task
    #[serde(rename = "titulo")]
    title: String,
    /// Optional free-form description
    #[serde(rename = "descricao")]
    description: Option<String>,
    /// When the task is due
    #[serde(rename = "data")]
    due_date: NaiveDateTime,
    /// Current status
    status: TaskStatus,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            due_date: task.due_date(),
            status: task.status(),
        }
    }
}

/// Request body for creating or updating a task. Any `id` in the body is ignored.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TaskPayload {
    /// Title of the task
    #[serde(default, rename = "titulo", alias = "title")]
    pub title: Option<String>,
    /// Optional free-form description
    #[serde(default, rename = "descricao", alias = "description")]
    pub description: Option<String>,
    /// When the task is due. Required; `0001-01-01T00:00:00` counts as blank.
    #[serde(
        default,
        rename = "data",
        alias = "dueDate",
        deserialize_with = "date::deserialize_optional"
    )]
    #[schema(value_type = Option<String>, format = DateTime, example = "2024-01-01T00:00:00")]
    pub due_date: Option<NaiveDateTime>,
    /// Status name or code, `Pendente` when omitted
    #[serde(default)]
    pub status: TaskStatus,
}

impl From<TaskPayload> for NewTask {
    fn from(payload: TaskPayload) -> Self {
        Self {
            title: payload.title.unwrap_or_default(),
            description: payload.description,
            due_date: payload.due_date,
            status: payload.status,
        }
    }
}

/// JSON body of a 400 response. The `Erro` key is what existing clients read.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[serde(rename = "Erro")]
    pub erro: String,
}

impl ErrorResponse {
    pub fn new(erro: String) -> Self {
        Self { erro }
    }
}

/// Query parameters for filtering tasks by title.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleQuery {
    /// Substring the title must contain
    #[serde(default)]
    titulo: String,
}

/// Query parameters for filtering tasks by date.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// Any date-time on the wanted day; the time of day is ignored
    #[serde(default, deserialize_with = "date::deserialize_optional")]
    #[param(value_type = Option<String>, format = DateTime)]
    data: Option<NaiveDateTime>,
}

/// Query parameters for filtering tasks by status.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Status name or code
    #[serde(default)]
    #[param(value_type = Option<String>)]
    status: TaskStatus,
}

/// Error type for the task handlers.
#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    #[error("Task not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("Invalid request body")]
    InvalidBody(#[from] JsonRejection),
    #[error("Database error")]
    Database(#[source] sea_orm::DbErr),
}

impl From<TaskServiceError> for TaskApiError {
    fn from(err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::TaskNotFound(_) => TaskApiError::NotFound,
            TaskServiceError::EmptyDate => {
                TaskApiError::Validation(TaskServiceError::EmptyDate.to_string())
            }
            TaskServiceError::Database(db_err) => TaskApiError::Database(db_err),
        }
    }
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        match self {
            TaskApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            TaskApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
            TaskApiError::InvalidBody(rejection) => {
                let status = match &rejection {
                    JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    other => other.status(),
                };
                (status, Json(ErrorResponse::new(rejection.body_text()))).into_response()
            }
            TaskApiError::Database(err) => {
                tracing::error!("Task storage failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn to_json(tasks: Vec<Task>) -> Json<Vec<TaskJson>> {
    Json(tasks.into_iter().map(TaskJson::from).collect())
}

/// Handler for GET /Tarefa/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "ID of the task")),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 404, description = "No task with that ID")
    ),
    tag = "Tarefa"
)]
pub async fn get_task_handler(
    State(state): State<TaskState>,
    Path(id): Path<i32>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let task = TaskService::new(&state.db).get_task_by_id(id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for GET /Tarefa/ObterTodos.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterTodos",
    responses((status = 200, description = "Every task", body = [TaskJson])),
    tag = "Tarefa"
)]
pub async fn get_all_tasks_handler(
    State(state): State<TaskState>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = TaskService::new(&state.db).get_all_tasks().await?;
    Ok(to_json(tasks))
}

/// Handler for GET /Tarefa/ObterPorTitulo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorTitulo",
    params(TitleQuery),
    responses((status = 200, description = "Tasks whose title contains the text", body = [TaskJson])),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_title_handler(
    State(state): State<TaskState>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = TaskService::new(&state.db)
        .get_tasks_by_title(&query.titulo)
        .await?;
    Ok(to_json(tasks))
}

/// Handler for GET /Tarefa/ObterPorData.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorData",
    params(DateQuery),
    responses((status = 200, description = "Tasks due on the given day", body = [TaskJson])),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_date_handler(
    State(state): State<TaskState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let day = query.data.unwrap_or_else(date::empty_date).date();
    let tasks = TaskService::new(&state.db).get_tasks_by_date(day).await?;
    Ok(to_json(tasks))
}

/// Handler for GET /Tarefa/ObterPorStatus.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/Tarefa/ObterPorStatus",
    params(StatusQuery),
    responses((status = 200, description = "Tasks with the given status", body = [TaskJson])),
    tag = "Tarefa"
)]
pub async fn get_tasks_by_status_handler(
    State(state): State<TaskState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = TaskService::new(&state.db)
        .get_tasks_by_status(query.status)
        .await?;
    Ok(to_json(tasks))
}

/// Handler for POST /Tarefa.
///
/// Responds 201 with the created task and a `Location` pointing at it.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/Tarefa",
    request_body = TaskPayload,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Blank date or malformed body", body = ErrorResponse)
    ),
    tag = "Tarefa"
)]
pub async fn create_task_handler(
    State(state): State<TaskState>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<impl IntoResponse, TaskApiError> {
    let Json(payload) = payload?;
    let task = TaskService::new(&state.db)
        .create_task(NewTask::from(payload))
        .await?;

    let location = format!("/Tarefa/{}", task.id());
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TaskJson::from(task)),
    ))
}

/// Handler for PUT /Tarefa/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "ID of the task")),
    request_body = TaskPayload,
    responses(
        (status = 200, description = "Task updated"),
        (status = 400, description = "Blank date or malformed body", body = ErrorResponse),
        (status = 404, description = "No task with that ID")
    ),
    tag = "Tarefa"
)]
pub async fn update_task_handler(
    State(state): State<TaskState>,
    Path(id): Path<i32>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<StatusCode, TaskApiError> {
    let Json(payload) = payload?;
    TaskService::new(&state.db)
        .update_task_by_id(id, NewTask::from(payload))
        .await?;
    Ok(StatusCode::OK)
}

/// Handler for DELETE /Tarefa/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/Tarefa/{id}",
    params(("id" = i32, Path, description = "ID of the task")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No task with that ID")
    ),
    tag = "Tarefa"
)]
pub async fn delete_task_handler(
    State(state): State<TaskState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, TaskApiError> {
    TaskService::new(&state.db).delete_task_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and returns the task router with all task routes.
pub fn create_task_router(state: TaskState) -> Router {
    Router::new()
        .route("/Tarefa", post(create_task_handler))
        .route("/Tarefa/ObterTodos", get(get_all_tasks_handler))
        .route("/Tarefa/ObterPorTitulo", get(get_tasks_by_title_handler))
        .route("/Tarefa/ObterPorData", get(get_tasks_by_date_handler))
        .route("/Tarefa/ObterPorStatus", get(get_tasks_by_status_handler))
        .route(
            "/Tarefa/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}
