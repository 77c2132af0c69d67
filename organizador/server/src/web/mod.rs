use axum::Router;
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::task::TaskState;
use crate::task::api::create_task_router;

pub mod api;

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let app = create_app(Arc::new(db));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Web server stopped");
    Ok(())
}

/// Builds the full application router over an open database connection.
pub fn create_app(db: Arc<DatabaseConnection>) -> Router {
    let task_state = TaskState { db };

    Router::new()
        .route("/health", get(health_check_handler))
        .merge(create_task_router(task_state))
        .merge(api::create_api_docs_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        create_app(Arc::new(db))
    }

    #[tokio::test]
    async fn can_check_health_endpoint() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn can_serve_openapi_document() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(doc["paths"]["/Tarefa/{id}"]["get"].is_object());
        assert!(doc["components"]["schemas"]["TaskJson"].is_object());
    }
}
