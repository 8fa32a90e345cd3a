use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http,
    middleware::Next,
    response::Response,
    Extension,
};
use axum_macros::debug_handler;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::server::{
    config::{AppState, Config},
    db::DB,
    extract::Form,
    models::User,
    response::{ErrorResponse, ResponseError, ResponseResult},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize,       // Expiry time of the token
    pub iat: usize,       // Issued at time of the token
    pub username: String, // Username associated with the token
}

#[derive(Deserialize, ToSchema)]
pub struct SignInBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Token {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

fn invalid_credentials() -> ResponseError {
    ResponseError::Unauthorized("Could not validate credentials".to_string())
}

#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "Authentication",
    request_body(content = SignInBody, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "User signed in successfully", body = Token),
        (status = 401, description = "Incorrect username or password", body = ErrorResponse),
        (status = 422, description = "Malformed form body", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
#[debug_handler]
pub async fn sign_in_handler(
    State(state): State<Arc<AppState>>,
    Form(body): Form<SignInBody>,
) -> Result<ResponseResult, ResponseError> {
    let user = match state.db.get_user_by_username(&body.username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Err(ResponseError::Unauthorized(
                "Incorrect username or password".to_string(),
            ));
        }
        Err(err) => {
            log::error!("failed to look up user `{}` with error {}", body.username, err);
            return Err(ResponseError::InternalServerError);
        }
    };

    if !verify_password(&body.password, &user.password) {
        return Err(ResponseError::Unauthorized(
            "Incorrect username or password".to_string(),
        ));
    }

    issue_token(&state.config, &user.username)
}

#[utoipa::path(
    post,
    path = "/auth/refresh_token",
    tag = "Authentication",
    responses(
        (status = 200, description = "A fresh token for the current user", body = Token),
        (status = 401, description = "Could not validate credentials", body = ErrorResponse),
    ),
    security(
        ("bearerAuth" = [])
    )
)]
#[debug_handler]
pub async fn refresh_token_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<ResponseResult, ResponseError> {
    issue_token(&state.config, &current_user.username)
}

fn issue_token(cfg: &Config, username: &str) -> Result<ResponseResult, ResponseError> {
    let token = encode_jwt(username, &cfg.jwt_secret, cfg.jwt_expire_minutes).map_err(|err| {
        log::error!("failed to encode token for `{}` with error {}", username, err);
        ResponseError::InternalServerError
    })?;

    Ok(ResponseResult::SignedIn(Token::bearer(token)))
}

/// Hash a password into an argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;

    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::warn!("stored password hash is malformed: {}", err);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn encode_jwt(
    username: &str,
    jwt_secret: &str,
    expire_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp: usize = (now + Duration::minutes(expire_minutes)).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        username: username.to_string(),
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
}

pub fn decode_jwt(
    jwt_token: &str,
    jwt_secret: &str,
) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    decode(
        jwt_token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
}

/// Resolve the bearer token into the current [`User`] and hand it to the
/// handler as an extension.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ResponseError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(invalid_credentials)?;

    let mut header = auth_header.split_whitespace();
    let token = match (header.next(), header.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => token,
        _ => return Err(invalid_credentials()),
    };

    let token_data = decode_jwt(token, &state.config.jwt_secret).map_err(|err| {
        log::debug!("rejected token: {}", err);
        invalid_credentials()
    })?;

    let current_user = match state.db.get_user_by_username(&token_data.claims.username).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(invalid_credentials()),
        Err(err) => {
            log::error!("failed to look up token owner with error {}", err);
            return Err(ResponseError::InternalServerError);
        }
    };

    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}
