use axum::{
    body::Body,
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::server::{
    auth::Token,
    models::{Message, TodoList, TodoPublic, UserList, UserPublic},
};

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug)]
pub enum ResponseError {
    InternalServerError,
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    RequestTimeout(String),
    ServiceUnavailable(String),
}

fn detail<S: Into<String>>(status: StatusCode, msg: S) -> Response<Body> {
    (status, Json(ErrorResponse { detail: msg.into() })).into_response()
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> Response<Body> {
        match self {
            ResponseError::InternalServerError => {
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            ResponseError::BadRequest(msg) => detail(StatusCode::BAD_REQUEST, msg),
            ResponseError::Unauthorized(msg) => {
                let mut resp = detail(StatusCode::UNAUTHORIZED, msg);
                resp.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    header::HeaderValue::from_static("Bearer"),
                );
                resp
            }
            ResponseError::Forbidden(msg) => detail(StatusCode::FORBIDDEN, msg),
            ResponseError::NotFound(msg) => detail(StatusCode::NOT_FOUND, msg),
            ResponseError::Conflict(msg) => detail(StatusCode::CONFLICT, msg),
            ResponseError::Unprocessable(msg) => detail(StatusCode::UNPROCESSABLE_ENTITY, msg),
            ResponseError::RequestTimeout(msg) => detail(StatusCode::REQUEST_TIMEOUT, msg),
            ResponseError::ServiceUnavailable(msg) => detail(StatusCode::SERVICE_UNAVAILABLE, msg),
        }
    }
}

// Any payload, query or path that fails to deserialize is a 422.

impl From<JsonRejection> for ResponseError {
    fn from(rejection: JsonRejection) -> Self {
        ResponseError::Unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ResponseError {
    fn from(rejection: QueryRejection) -> Self {
        ResponseError::Unprocessable(rejection.body_text())
    }
}

impl From<FormRejection> for ResponseError {
    fn from(rejection: FormRejection) -> Self {
        ResponseError::Unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for ResponseError {
    fn from(rejection: PathRejection) -> Self {
        ResponseError::Unprocessable(rejection.body_text())
    }
}

pub enum ResponseResult {
    Health,
    SignedIn(Token),
    UserCreated(UserPublic),
    User(UserPublic),
    Users(UserList),
    TodoCreated(TodoPublic),
    Todo(TodoPublic),
    Todos(TodoList),
    Deleted(Message),
}

impl IntoResponse for ResponseResult {
    fn into_response(self) -> Response<Body> {
        match self {
            ResponseResult::Health => {
                (StatusCode::OK, Json(Message::new("Hello World"))).into_response()
            }
            ResponseResult::SignedIn(token) => (StatusCode::OK, Json(token)).into_response(),
            ResponseResult::UserCreated(user) => (StatusCode::CREATED, Json(user)).into_response(),
            ResponseResult::User(user) => (StatusCode::OK, Json(user)).into_response(),
            ResponseResult::Users(users) => (StatusCode::OK, Json(users)).into_response(),
            ResponseResult::TodoCreated(todo) => (StatusCode::CREATED, Json(todo)).into_response(),
            ResponseResult::Todo(todo) => (StatusCode::OK, Json(todo)).into_response(),
            ResponseResult::Todos(todos) => (StatusCode::OK, Json(todos)).into_response(),
            ResponseResult::Deleted(msg) => (StatusCode::OK, Json(msg)).into_response(),
        }
    }
}
