//! Error types for web handlers.
//!
//! Bridges domain errors and HTTP responses through Axum's `IntoResponse`.
//! Validation failures can name the request fields they belong to, so clients
//! can show each message next to the input that caused it.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field name → messages for that field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Field used for errors that are not tied to one input.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Room>, AppError> {
///     let room = find_room(pk).await
///         .map_err(|_| AppError::not_found("Room", pk))?;
///     Ok(Json(room))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Per-field messages, when the error can be attributed to inputs
    fields: Option<FieldErrors>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            fields: None,
            source: None,
        }
    }

    /// Attach the error that caused this one (logged, never sent to clients).
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Attribute a message to a request field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.fields
            .get_or_insert_with(FieldErrors::new)
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Per-field messages, if any.
    #[must_use]
    pub const fn fields(&self) -> Option<&FieldErrors> {
        self.fields.as_ref()
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            message.into(),
            "CONFLICT".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 422 error attributed to a single field.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::validation(message.clone()).with_field(field, message)
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Messages keyed by the request field they belong to.
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        } else {
            tracing::debug!(status = %self.status, code = %self.code, "Request rejected");
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            fields: self.fields,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Render a rejected JSON body like any other validation failure.
///
/// Type errors are attributed to the field serde reports (`check_in`,
/// `amenities[2]`, ...) and missing fields to the field itself. Anything
/// serde cannot pin to a field lands in [`NON_FIELD_ERRORS`].
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(error) => {
                let (field, message) = split_data_error(&error.body_text());
                Self::invalid_field(field, message)
            },
            JsonRejection::JsonSyntaxError(error) => {
                let message = error.body_text();
                Self::bad_request(message.clone()).with_field(NON_FIELD_ERRORS, message)
            },
            JsonRejection::MissingJsonContentType(error) => Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                error.body_text(),
                "UNSUPPORTED_MEDIA_TYPE".to_string(),
            ),
            other => Self::bad_request(other.body_text()),
        }
    }
}

/// Split axum's data-error text into the offending field and serde's message.
fn split_data_error(text: &str) -> (String, String) {
    // "Failed to deserialize ...: <path>: <message>" or "...: <message>"
    let detail = text.split_once(": ").map_or(text, |(_, detail)| detail);

    if let Some(rest) = detail.strip_prefix("missing field `") {
        if let Some((field, _)) = rest.split_once('`') {
            return (field.to_string(), "This field is required.".to_string());
        }
    }

    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(char::is_whitespace) => {
            (path.to_string(), message.to_string())
        },
        _ => (NON_FIELD_ERRORS.to_string(), detail.to_string()),
    }
}
