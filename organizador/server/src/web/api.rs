use crate::task::TaskStatus;
use crate::task::api::{self, ErrorResponse, TaskJson, TaskPayload};
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for the task endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(
        api::get_task_handler,
        api::get_all_tasks_handler,
        api::get_tasks_by_title_handler,
        api::get_tasks_by_date_handler,
        api::get_tasks_by_status_handler,
        api::create_task_handler,
        api::update_task_handler,
        api::delete_task_handler,
    ),
    components(schemas(TaskJson, TaskPayload, ErrorResponse, TaskStatus)),
    tags((name = "Tarefa", description = "Task management"))
)]
pub struct ApiDoc;

/// Serves the OpenAPI document at `/api-docs/openapi.json` and Swagger UI at `/swagger-ui`.
pub fn create_api_docs_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
