use aide::OperationOutput;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::{http::StatusCode, response::IntoResponse, Json};
use log::error;
use schemars::JsonSchema;
use serde_json::json;

/// Represent errors in the application
///
/// All `ServiceError`s can be transformed to http errors. The response body always has
/// the shape `{ "success": false, "message": ... }`.
#[derive(Debug, Clone, PartialEq, JsonSchema)]
pub enum ServiceError {
    /// Unexpected backend failure. The cause is logged but never sent to the client.
    InternalServerError(String),
    /// Missing or malformed input.
    BadRequest(String),
    /// Missing, malformed, forged or expired session token, or wrong credentials.
    Unauthorized(&'static str),
    /// Valid session, insufficient role.
    Forbidden,
    NotFound(&'static str),
    /// Duplicate registration or duplicate stamp.
    Conflict(&'static str),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ServiceError::InternalServerError(_) => "Internal server error".to_owned(),
            ServiceError::BadRequest(message) => message.clone(),
            ServiceError::Unauthorized(message) => (*message).to_owned(),
            ServiceError::Forbidden => "Missing permissions".to_owned(),
            ServiceError::NotFound(message) => (*message).to_owned(),
            ServiceError::Conflict(message) => (*message).to_owned(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for ServiceError {}

impl From<sqlx::Error> for ServiceError {
    fn from(value: sqlx::Error) -> Self {
        ServiceError::InternalServerError(value.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        ServiceError::InternalServerError(value.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(value: JsonRejection) -> Self {
        ServiceError::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(value: PathRejection) -> Self {
        ServiceError::BadRequest(value.body_text())
    }
}

impl From<MultipartRejection> for ServiceError {
    fn from(value: MultipartRejection) -> Self {
        ServiceError::BadRequest(value.body_text())
    }
}

/// Helper for `ServiceError` result
pub type ServiceResult<T> = Result<T, ServiceError>;

impl OperationOutput for ServiceError {
    type Inner = String;
}
impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        if let ServiceError::InternalServerError(ref cause) = self {
            error!("Internal server error: {}", cause);
        }

        (
            self.status_code(),
            Json(json!({
                "success": false,
                "message": self.message(),
            })),
        )
            .into_response()
    }
}
