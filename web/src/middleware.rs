//! Correlation ID middleware.
//!
//! Every request gets a correlation ID: the client's `X-Correlation-ID` when
//! it is a valid UUID, a fresh UUID v4 otherwise. The ID is stored in request
//! extensions, recorded on the request's tracing span and echoed back in the
//! response header.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/api/v1/rooms", get(list_rooms))
//!     .layer(correlation_id_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::extractors::CorrelationId;
    use axum::{Router, body::Body, http::Request, routing::post};
    use tower::ServiceExt;

    /// A booking endpoint that reports the correlation id it would log.
    fn booking_app() -> Router {
        Router::new()
            .route(
                "/rooms/1/bookings",
                post(|CorrelationId(id): CorrelationId| async move { id.to_string() }),
            )
            .layer(correlation_id_layer())
    }

    /// Send a booking request; return (echoed header, id seen by the handler).
    async fn book(header: Option<&str>) -> (String, String) {
        let mut request = Request::builder().method("POST").uri("/rooms/1/bookings");
        if let Some(value) = header {
            request = request.header(CORRELATION_ID_HEADER, value);
        }
        let response = booking_app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let echoed = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (echoed, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_generated_id_reaches_the_handler() {
        let (echoed, logged) = book(None).await;
        assert!(Uuid::parse_str(&echoed).is_ok());
        assert_eq!(echoed, logged);
    }

    #[tokio::test]
    async fn test_client_id_is_kept_for_the_booking() {
        let client = Uuid::new_v4().to_string();
        let (echoed, logged) = book(Some(&client)).await;
        assert_eq!(echoed, client);
        assert_eq!(logged, client);
    }

    #[tokio::test]
    async fn test_invalid_client_id_is_replaced_everywhere() {
        let (echoed, logged) = book(Some("booking-42")).await;
        assert_ne!(echoed, "booking-42");
        assert!(Uuid::parse_str(&echoed).is_ok());
        assert_eq!(echoed, logged);
    }

    #[tokio::test]
    async fn test_each_booking_gets_its_own_id() {
        let (first, _) = book(None).await;
        let (second, _) = book(None).await;
        assert_ne!(first, second);
    }
}
