//! Success envelope shared by all JSON endpoints.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// `{ "success": true, "message": "...", "data": ... }`
///
/// `data` is omitted when there is nothing to return (e.g. after a delete).
/// Error responses use [`crate::ErrorResponse`], which shares the
/// `success`/`message` fields.
///
/// ```ignore
/// async fn get_user(..) -> Result<ApiResponse<User>, AppError> {
///     Ok(ApiResponse::ok("User retrieved successfully", user))
/// }
///
/// // 201 with the same body
/// (StatusCode::CREATED, ApiResponse::ok("User created successfully", user))
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
