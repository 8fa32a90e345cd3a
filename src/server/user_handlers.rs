use axum::{extract::State, Extension};
use axum_macros::debug_handler;
use std::sync::Arc;

use crate::server::{
    auth,
    config::AppState,
    db::{self, DB},
    extract::{Json, Path, Query},
    models::{FilterPage, Message, NewUser, User, UserList, UserPublic, UserSchema},
    response::{ErrorResponse, ResponseError, ResponseResult},
};

fn not_enough_permissions() -> ResponseError {
    ResponseError::Forbidden("Not enough permissions".to_string())
}

fn hashed(user: UserSchema) -> Result<NewUser, ResponseError> {
    let password = auth::hash_password(&user.password).map_err(|err| {
        log::error!("failed to hash password with error {}", err);
        ResponseError::InternalServerError
    })?;

    Ok(NewUser {
        username: user.username,
        email: user.email,
        password,
    })
}

/// Register a new user.
#[utoipa::path(
    post,
    path = "/users/",
    tag = "Users",
    request_body = UserSchema,
    responses(
        (status = 201, description = "User created", body = UserPublic),
        (status = 400, description = "Username or email already registered", body = ErrorResponse),
        (status = 422, description = "Malformed body", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
#[debug_handler]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(user): Json<UserSchema>,
) -> Result<ResponseResult, ResponseError> {
    let new_user = hashed(user)?;

    match state.db.create_user(&new_user).await {
        Ok(user) => {
            log::info!("registered user `{}` with id {}", user.username, user.id);
            Ok(ResponseResult::UserCreated(user.into()))
        }
        Err(db::Error::UsernameTaken) => Err(ResponseError::BadRequest(
            "Username already registered".to_string(),
        )),
        Err(db::Error::EmailTaken) => Err(ResponseError::BadRequest(
            "Email already registered".to_string(),
        )),
        // lost a race with a concurrent registration
        Err(db::Error::Conflict(_)) => Err(ResponseError::BadRequest(
            "Username or Email already registered".to_string(),
        )),
        Err(err) => {
            log::error!("failed to create user `{}` with error {}", new_user.username, err);
            Err(ResponseError::InternalServerError)
        }
    }
}

#[utoipa::path(
    get,
    path = "/users/",
    tag = "Users",
    params(FilterPage),
    responses(
        (status = 200, description = "A page of users", body = UserList),
        (status = 422, description = "Invalid pagination", body = ErrorResponse),
    )
)]
#[debug_handler]
pub async fn read_users_handler(
    State(state): State<Arc<AppState>>,
    Query(page): Query<FilterPage>,
) -> Result<ResponseResult, ResponseError> {
    let users = state.db.list_users(&page).await.map_err(|err| {
        log::error!("failed to list users with error {}", err);
        ResponseError::InternalServerError
    })?;

    Ok(ResponseResult::Users(UserList {
        users: users.into_iter().map(UserPublic::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "Users",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User found", body = UserPublic),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
#[debug_handler]
pub async fn read_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<ResponseResult, ResponseError> {
    match state.db.get_user(user_id).await {
        Ok(Some(user)) => Ok(ResponseResult::User(user.into())),
        Ok(None) => Err(ResponseError::NotFound("User not found".to_string())),
        Err(err) => {
            log::error!("failed to get user {} with error {}", user_id, err);
            Err(ResponseError::InternalServerError)
        }
    }
}

/// Replace the current user's username, email and password.
#[utoipa::path(
    put,
    path = "/users/{user_id}",
    tag = "Users",
    request_body = UserSchema,
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User updated", body = UserPublic),
        (status = 401, description = "Could not validate credentials", body = ErrorResponse),
        (status = 403, description = "Not enough permissions", body = ErrorResponse),
        (status = 409, description = "Username or email already exists", body = ErrorResponse),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
#[debug_handler]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Extension(current_user): Extension<User>,
    Json(user): Json<UserSchema>,
) -> Result<ResponseResult, ResponseError> {
    if current_user.id != user_id {
        return Err(not_enough_permissions());
    }

    let new_user = hashed(user)?;
    match state.db.update_user(user_id, &new_user).await {
        Ok(user) => Ok(ResponseResult::User(user.into())),
        Err(db::Error::Conflict(_)) => Err(ResponseError::Conflict(
            "Username or Email already exists".to_string(),
        )),
        Err(db::Error::NotFound) => Err(ResponseError::NotFound("User not found".to_string())),
        Err(err) => {
            log::error!("failed to update user {} with error {}", user_id, err);
            Err(ResponseError::InternalServerError)
        }
    }
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    tag = "Users",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User deleted", body = Message),
        (status = 401, description = "Could not validate credentials", body = ErrorResponse),
        (status = 403, description = "Not enough permissions", body = ErrorResponse),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
#[debug_handler]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Extension(current_user): Extension<User>,
) -> Result<ResponseResult, ResponseError> {
    if current_user.id != user_id {
        return Err(not_enough_permissions());
    }

    match state.db.delete_user(user_id).await {
        Ok(true) => {
            log::info!("deleted user `{}`", current_user.username);
            Ok(ResponseResult::Deleted(Message::new("User deleted")))
        }
        Ok(false) => Err(ResponseError::NotFound("User not found".to_string())),
        Err(err) => {
            log::error!("failed to delete user {} with error {}", user_id, err);
            Err(ResponseError::InternalServerError)
        }
    }
}
