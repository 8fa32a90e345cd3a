pub mod auth;
pub mod config;
pub mod db;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod response;
pub mod todo_handlers;
pub mod user_handlers;

use anyhow::{Context, Result};
use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::{get, patch, post, put},
    BoxError, Router,
};
use hyper::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use std::{sync::Arc, time::Duration};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::{cors::Any, trace::TraceLayer};

use config::{AppState, Config};
use db::sqlite::SqlDB;
use handlers::TodoApi;
use response::ResponseError;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Connect to the database, bring the schema up to date and serve the API
/// until a shutdown signal arrives.
pub async fn app(config: Config) -> Result<()> {
    let db = SqlDB::new(&config.database_url, config.max_connections)
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to migrate database")?;
    log::info!("Using SQLite database at: {}", config.database_url);

    let app_state = Arc::new(AppState { db, config });
    let app = router(app_state.clone());

    let address = format!("{}:{}", app_state.config.host, app_state.config.port);
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .context("failed to bind address")?;

    log::info!(
        "🚀 Server started successfully at {}:{}",
        app_state.config.host,
        app_state.config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("failed to serve listener")?;

    Ok(())
}

pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let authorize = middleware::from_fn_with_state(app_state.clone(), auth::authorize);

    let users = post(user_handlers::create_user_handler).get(user_handlers::read_users_handler);
    let user = get(user_handlers::read_user_handler).merge(
        put(user_handlers::update_user_handler)
            .delete(user_handlers::delete_user_handler)
            .route_layer(authorize.clone()),
    );
    let todos = post(todo_handlers::create_todo_handler)
        .get(todo_handlers::list_todos_handler)
        .route_layer(authorize.clone());
    let todo = patch(todo_handlers::patch_todo_handler)
        .delete(todo_handlers::delete_todo_handler)
        .route_layer(authorize.clone());

    let routes = Router::new()
        .route("/", get(handlers::health_check_handler))
        .route("/auth/token", post(auth::sign_in_handler))
        .route(
            "/auth/refresh_token",
            post(auth::refresh_token_handler).route_layer(authorize),
        )
        .route("/users", users.clone())
        .route("/users/", users)
        .route("/users/:user_id", user)
        .route("/todos", todos.clone())
        .route("/todos/", todos)
        .route("/todos/:todo_id", todo);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", TodoApi::openapi()))
        .merge(routes)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(10))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(app_state)
        .layer(cors)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("shutting down");
}

async fn handle_error(error: BoxError) -> ResponseError {
    if error.is::<tower::timeout::error::Elapsed>() {
        return ResponseError::RequestTimeout("request timed out".to_string());
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        return ResponseError::ServiceUnavailable(
            "service is overloaded, try again later".to_string(),
        );
    }

    log::error!("unhandled internal error: {}", error);
    ResponseError::InternalServerError
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    async fn detail(error: BoxError) -> (StatusCode, String) {
        let response = handle_error(error).await.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        (status, body["detail"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_middleware_errors_use_detail_body() {
        let (status, msg) = detail(Box::new(tower::timeout::error::Elapsed::new())).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(msg, "request timed out");

        let (status, msg) = detail(Box::new(tower::load_shed::error::Overloaded::new())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(msg, "service is overloaded, try again later");

        let (status, msg) = detail("boom".into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "Internal server error");
    }
}
