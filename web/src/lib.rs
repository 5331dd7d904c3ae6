//! Axum integration for the Stayhub booking backend.
//!
//! The application crate keeps its business rules in reducers and stores;
//! this crate is the thin shell around them:
//!
//! - [`AppError`]: one error type for every handler, rendered as
//!   `{"code", "message", "fields"}` JSON with the right status code
//! - [`correlation_id_layer`]: request correlation IDs for tracing
//! - [`CorrelationId`], [`PageQuery`] and [`JsonBody`] extractors
//! - [`handlers::health`]: liveness and readiness responses
//!
//! # Example
//!
//! ```ignore
//! use stayhub_web::{AppError, WebResult};
//!
//! async fn get_room(Path(pk): Path<i64>) -> WebResult<Json<Room>> {
//!     let room = rooms.get(pk).await.map_err(|_| AppError::not_found("Room", pk))?;
//!     Ok(Json(room))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::{AppError, FieldErrors, NON_FIELD_ERRORS};
pub use extractors::{CorrelationId, JsonBody, PageQuery};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
