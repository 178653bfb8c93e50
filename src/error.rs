//! Typed errors and HTTP mapping.

use crate::config::ErrorStyle;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} id '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate entity id: {0}")]
    DuplicateEntity(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("{entity}: unknown column '{column}'")]
    UnknownColumn { entity: String, column: String },
    #[error("{entity}.{column}: unknown column type '{type_name}'")]
    UnknownType {
        entity: String,
        column: String,
        type_name: String,
    },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// One failed field rule, as reported in a 400 body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub field: String,
    pub location: &'static str,
    pub rule: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        location: &'static str,
        rule: &'static str,
        message: impl Into<String>,
        value: Option<Value>,
    ) -> Self {
        FieldError {
            kind: "field",
            field: field.into(),
            location,
            rule,
            message: message.into(),
            value,
        }
    }
}

#[derive(Serialize)]
pub struct ValidationBody<'a> {
    pub errors: &'a [FieldError],
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    NotFound(String),
    #[error("Cannot find resource '{0}'")]
    UnknownResource(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::UnknownResource(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render with the body shape the owning entity uses for 404 and 500 answers.
    pub fn render(self, style: ErrorStyle) -> Response {
        let status = self.status();
        if let AppError::Validation(errors) = &self {
            return (status, Json(ValidationBody { errors })).into_response();
        }
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let message = self.to_string();
        match (style, status) {
            (ErrorStyle::Message, StatusCode::NOT_FOUND) => (status, message).into_response(),
            (ErrorStyle::Message, _) => {
                (status, Json(serde_json::json!({ "message": message }))).into_response()
            }
            (ErrorStyle::JsonString, _) => (status, Json(Value::String(message))).into_response(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.render(ErrorStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Operation;
    use axum::body::to_bytes;
    use axum::http::header::CONTENT_TYPE;

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn validation_lists_every_field() {
        let err = AppError::Validation(vec![FieldError::new(
            "categoryName",
            "body",
            "isString",
            "categoryName must be a string",
            None,
        )]);
        let resp = err.render(ErrorStyle::Message);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["errors"][0]["field"], "categoryName");
        assert_eq!(body["errors"][0]["type"], "field");
        assert_eq!(body["errors"][0]["location"], "body");
        assert!(body["errors"][0].get("value").is_none());
    }

    #[tokio::test]
    async fn not_found_as_json_string() {
        let resp = AppError::NotFound("Item not found".into()).render(ErrorStyle::JsonString);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(resp).await, "\"Item not found\"");
    }

    #[tokio::test]
    async fn not_found_as_plain_text() {
        let resp = AppError::NotFound("Store stock card not found".into()).render(ErrorStyle::Message);
        assert!(resp.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body_text(resp).await, "Store stock card not found");
    }

    #[tokio::test]
    async fn store_failure_keeps_raw_message() {
        let err = AppError::Store(StoreError::RecordNotFound {
            operation: Operation::Delete,
        });
        let resp = err.render(ErrorStyle::Message);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["message"], "Record to delete does not exist.");

        let err = AppError::Store(StoreError::Constraint("boom".into()));
        assert_eq!(body_text(err.into_response()).await, "\"boom\"");
    }
}
