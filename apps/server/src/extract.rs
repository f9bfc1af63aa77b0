//! Request extractors with API-shaped rejections.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` whose rejection is a 400 [`ApiError`] body instead of
/// axum's plain-text response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
