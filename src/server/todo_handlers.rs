use axum::{extract::State, Extension};
use axum_macros::debug_handler;
use std::sync::Arc;

use crate::server::{
    config::AppState,
    db::DB,
    extract::{Json, Path, Query},
    models::{Message, TodoFilter, TodoList, TodoPublic, TodoSchema, TodoUpdate, User},
    response::{ErrorResponse, ResponseError, ResponseResult},
};

fn task_not_found() -> ResponseError {
    ResponseError::NotFound("Task not found.".to_string())
}

#[utoipa::path(
    post,
    path = "/todos/",
    tag = "Todos",
    request_body = TodoSchema,
    responses(
        (status = 201, description = "Todo created", body = TodoPublic),
        (status = 401, description = "Could not validate credentials", body = ErrorResponse),
        (status = 422, description = "Malformed body or unknown state", body = ErrorResponse),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
#[debug_handler]
pub async fn create_todo_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(todo): Json<TodoSchema>,
) -> Result<ResponseResult, ResponseError> {
    match state.db.create_todo(current_user.id, &todo).await {
        Ok(todo) => Ok(ResponseResult::TodoCreated(todo.into())),
        Err(err) => {
            log::error!(
                "failed to create todo for user {} with error {}",
                current_user.id,
                err
            );
            Err(ResponseError::InternalServerError)
        }
    }
}

/// List the current user's todos.
#[utoipa::path(
    get,
    path = "/todos/",
    tag = "Todos",
    params(TodoFilter),
    responses(
        (status = 200, description = "Matching todos", body = TodoList),
        (status = 401, description = "Could not validate credentials", body = ErrorResponse),
        (status = 422, description = "Invalid filter", body = ErrorResponse),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
#[debug_handler]
pub async fn list_todos_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(filter): Query<TodoFilter>,
) -> Result<ResponseResult, ResponseError> {
    let todos = state
        .db
        .list_todos(current_user.id, &filter)
        .await
        .map_err(|err| {
            log::error!(
                "failed to list todos for user {} with error {}",
                current_user.id,
                err
            );
            ResponseError::InternalServerError
        })?;

    Ok(ResponseResult::Todos(TodoList {
        todos: todos.into_iter().map(TodoPublic::from).collect(),
    }))
}

/// Change the given fields of one of the current user's todos.
#[utoipa::path(
    patch,
    path = "/todos/{todo_id}",
    tag = "Todos",
    request_body = TodoUpdate,
    params(
        ("todo_id" = i64, Path, description = "Todo id")
    ),
    responses(
        (status = 200, description = "Todo updated", body = TodoPublic),
        (status = 401, description = "Could not validate credentials", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 422, description = "Malformed body or unknown state", body = ErrorResponse),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
#[debug_handler]
pub async fn patch_todo_handler(
    State(state): State<Arc<AppState>>,
    Path(todo_id): Path<i64>,
    Extension(current_user): Extension<User>,
    Json(update): Json<TodoUpdate>,
) -> Result<ResponseResult, ResponseError> {
    match state.db.update_todo(current_user.id, todo_id, &update).await {
        Ok(Some(todo)) => Ok(ResponseResult::Todo(todo.into())),
        Ok(None) => Err(task_not_found()),
        Err(err) => {
            log::error!("failed to update todo {} with error {}", todo_id, err);
            Err(ResponseError::InternalServerError)
        }
    }
}

#[utoipa::path(
    delete,
    path = "/todos/{todo_id}",
    tag = "Todos",
    params(
        ("todo_id" = i64, Path, description = "Todo id")
    ),
    responses(
        (status = 200, description = "Todo deleted", body = Message),
        (status = 401, description = "Could not validate credentials", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
#[debug_handler]
pub async fn delete_todo_handler(
    State(state): State<Arc<AppState>>,
    Path(todo_id): Path<i64>,
    Extension(current_user): Extension<User>,
) -> Result<ResponseResult, ResponseError> {
    match state.db.delete_todo(current_user.id, todo_id).await {
        Ok(true) => Ok(ResponseResult::Deleted(Message::new(
            "Task has been deleted successfully.",
        ))),
        Ok(false) => Err(task_not_found()),
        Err(err) => {
            log::error!("failed to delete todo {} with error {}", todo_id, err);
            Err(ResponseError::InternalServerError)
        }
    }
}
