//! Request extractors shared by the route handlers.

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON request body whose rejections answer as [`AppError::BadRequest`].
///
/// A body that is not JSON, or does not fit the target type, gets the same
/// `{"error": ...}` response shape as every other client error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
