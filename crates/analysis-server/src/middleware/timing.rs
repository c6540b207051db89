//! Request timing middleware.
//!
//! Logs the duration of each HTTP request. Engine searches dominate request
//! time, so the slow threshold is configurable.

use std::time::{Duration, Instant};

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

/// Requests taking longer than this are logged as warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowRequestThreshold(pub Duration);

impl Default for SlowRequestThreshold {
    fn default() -> Self {
        Self(Duration::from_millis(100))
    }
}

/// Middleware that logs request timing.
///
/// Logs slow requests as warnings and normal requests as debug.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use analysis_server::middleware::{timing_layer, SlowRequestThreshold};
///
/// let app = Router::new()
///     .route("/api/example", get(handler))
///     .layer(middleware::from_fn_with_state(SlowRequestThreshold::default(), timing_layer));
/// ```
pub async fn timing_layer(
    State(threshold): State<SlowRequestThreshold>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();

    if duration > threshold.0 {
        tracing::warn!(
            method = %method,
            path = %uri,
            status = status,
            duration_ms = duration.as_millis(),
            "Slow request"
        );
    } else {
        tracing::debug!(
            method = %method,
            path = %uri,
            status = status,
            duration_ms = duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "ok"
    }

    async fn slow_handler() -> &'static str {
        tokio::time::sleep(Duration::from_millis(30)).await;
        "slow"
    }

    fn app(threshold: Duration) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .route("/slow", get(slow_handler))
            .layer(middleware::from_fn_with_state(
                SlowRequestThreshold(threshold),
                timing_layer,
            ))
    }

    #[tokio::test]
    async fn test_timing_middleware_fast_request() {
        let response = app(Duration::from_secs(1))
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_timing_middleware_slow_request() {
        let response = app(Duration::from_millis(1))
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_timing_middleware_preserves_response() {
        let response = app(Duration::from_secs(1))
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_timing_middleware_passes_errors_through() {
        let response = app(Duration::from_secs(1))
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_default_threshold() {
        assert_eq!(SlowRequestThreshold::default().0, Duration::from_millis(100));
    }
}
