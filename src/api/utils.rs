use aide::OperationOutput;
use axum::extract::{Multipart, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::WithRejection;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Successful response body: `{ "success": true, ...body }`.
#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct Success<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Success<T> {
    pub fn new(body: T) -> Self {
        Self {
            success: true,
            body,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct DataDto<T> {
    pub data: T,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct MessageDto {
    pub message: String,
}

/// Json request body. Malformed bodies are answered as `BadRequest` in the usual error shape.
pub type JsonBody<T> = WithRejection<Json<T>, ServiceError>;

pub type PathParam<T> = WithRejection<Path<T>, ServiceError>;

pub type MultipartForm = WithRejection<Multipart, ServiceError>;

/// `{ "success": true, "data": data }`
pub fn data<T>(data: T) -> Json<Success<DataDto<T>>> {
    Json(Success::new(DataDto { data }))
}

pub fn message(message: &str) -> Json<Success<MessageDto>> {
    Json(Success::new(MessageDto {
        message: message.to_owned(),
    }))
}

/// Json body answered with `201 Created`.
#[derive(Debug, PartialEq)]
pub struct Created<T>(pub T);

impl<T> OperationOutput for Created<T> {
    type Inner = T;
}
impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// Numbers sent by the frontend, either as json number or as the string it read from the DOM.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(i64),
    Text(String),
}

impl NumberOrString {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Number(value) => Some(*value),
            NumberOrString::Text(value) => value.trim().parse().ok(),
        }
    }
}

/// Read a required id field, `BadRequest` if it is missing or not a positive number.
pub fn require_id(value: Option<&NumberOrString>, field: &str) -> ServiceResult<u64> {
    value
        .and_then(NumberOrString::as_i64)
        .filter(|v| *v > 0)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| ServiceError::BadRequest(format!("Missing or invalid field '{field}'")))
}

/// Read a required text field, `BadRequest` if it is missing or blank.
pub fn require_text(value: Option<&str>, field: &str) -> ServiceResult<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_owned()),
        _ => Err(ServiceError::BadRequest(format!("Missing field '{field}'"))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_number_or_string() {
        let number: NumberOrString = serde_json::from_value(json!(5)).unwrap();
        let text: NumberOrString = serde_json::from_value(json!(" 5 ")).unwrap();
        let garbage: NumberOrString = serde_json::from_value(json!("five")).unwrap();

        assert_eq!(number.as_i64(), Some(5));
        assert_eq!(text.as_i64(), Some(5));
        assert_eq!(garbage.as_i64(), None);
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(Some(&NumberOrString::Number(3)), "id"), Ok(3));
        assert_eq!(
            require_id(Some(&NumberOrString::Text("12".to_owned())), "id"),
            Ok(12)
        );
        assert!(require_id(None, "id").is_err());
        assert!(require_id(Some(&NumberOrString::Number(0)), "id").is_err());
        assert!(require_id(Some(&NumberOrString::Number(-4)), "id").is_err());
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text(Some("  Ana "), "nombre"), Ok("Ana".to_owned()));
        assert_eq!(
            require_text(Some("   "), "nombre"),
            Err(ServiceError::BadRequest("Missing field 'nombre'".to_owned()))
        );
        assert!(require_text(None, "nombre").is_err());
    }

    #[test]
    fn test_success_body_is_flattened() {
        let body = serde_json::to_value(data(vec![1, 2]).0).unwrap();
        assert_eq!(body, json!({ "success": true, "data": [1, 2] }));

        let body = serde_json::to_value(message("done").0).unwrap();
        assert_eq!(body, json!({ "success": true, "message": "done" }));
    }
}
