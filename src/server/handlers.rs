use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::server::{
    auth::{self, SignInBody, Token},
    models::{
        FilterPage, Message, TodoFilter, TodoList, TodoPublic, TodoSchema, TodoState, TodoUpdate,
        UserList, UserPublic, UserSchema,
    },
    response::{ErrorResponse, ResponseResult},
    todo_handlers, user_handlers,
};

// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_handler,
        auth::sign_in_handler, auth::refresh_token_handler,
        user_handlers::create_user_handler, user_handlers::read_users_handler, user_handlers::read_user_handler,
        user_handlers::update_user_handler, user_handlers::delete_user_handler,
        todo_handlers::create_todo_handler, todo_handlers::list_todos_handler,
        todo_handlers::patch_todo_handler, todo_handlers::delete_todo_handler,
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            ErrorResponse, Message, FilterPage,
            SignInBody, Token,
            UserSchema, UserPublic, UserList,
            TodoState, TodoSchema, TodoUpdate, TodoPublic, TodoList, TodoFilter,
        )
    ),
    tags(
        (name = "System", description = "System health and status"),
        (name = "Authentication", description = "Authentication endpoints"),
        (name = "Users", description = "User registration and management"),
        (name = "Todos", description = "Todo management for the current user"),
    )
)]
pub struct TodoApi;

#[utoipa::path(
    get,
    path = "/",
    tag = "System",
    responses(
        (status = 200, description = "todo server is working", body = Message)
    )
)]
pub async fn health_check_handler() -> ResponseResult {
    ResponseResult::Health
}
