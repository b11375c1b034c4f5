//! Request extractors whose rejections are `AppError`s

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body; malformed or mistyped bodies answer 400 with a `kind`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Path parameters; unparseable segments answer 400 with a `kind`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);
