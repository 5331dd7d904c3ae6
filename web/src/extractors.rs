//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request correlation ID (header or freshly generated)
//! - `PageQuery`: the 1-based `?page=` parameter used by paginated lists
//! - `JsonBody`: a JSON request body whose rejections render as [`AppError`]

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;

/// JSON request body.
///
/// Same as [`axum::Json`] on the way in, but a body that fails to parse is
/// answered with the usual error JSON, attributed to the offending field.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Correlation ID for request tracing.
///
/// Reads the ID stored by [`crate::correlation_id_layer`]; without the layer
/// it falls back to the `X-Correlation-ID` header, then to a new UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Requested page of a paginated list.
///
/// Never rejects: a missing, malformed or non-positive `page` parameter
/// reads as page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery(pub u32);

/// Raw query parameters behind [`PageQuery`].
#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<String>,
}

impl PageQuery {
    fn from_params(params: Option<PageParams>) -> Self {
        let page = params
            .and_then(|params| params.page)
            .and_then(|value| value.trim().parse::<u32>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1);
        Self(page)
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self(1)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PageQuery
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = Query::<PageParams>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|Query(params)| params);
        Ok(Self::from_params(params))
    }
}
