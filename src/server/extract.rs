//! Wrappers over the axum extractors that turn rejections into
//! [`ResponseError`] so failures share the `{detail}` error body.

use axum_macros::{FromRequest, FromRequestParts};

use crate::server::response::ResponseError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ResponseError))]
pub struct Json<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(ResponseError))]
pub struct Form<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ResponseError))]
pub struct Query<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ResponseError))]
pub struct Path<T>(pub T);
