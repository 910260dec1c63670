use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::error;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}
static REQ_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static REQ_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Registers the request collectors. Safe to call more than once.
pub fn init_metrics() {
    if REQ_COUNTER.get().is_none() {
        match IntCounterVec::new(
            prometheus::opts!("requests_total", "Total requests per route"),
            &["route", "status"],
        ) {
            Ok(counter) => {
                if REQ_COUNTER.set(counter.clone()).is_ok() {
                    REGISTRY.register(Box::new(counter)).ok();
                }
            }
            Err(e) => error!("Failed to create request counter: {}", e),
        }
    }

    if REQ_DURATION.get().is_none() {
        match HistogramVec::new(
            prometheus::HistogramOpts::new(
                "request_duration_seconds",
                "Time spent handling a request",
            ),
            &["route"],
        ) {
            Ok(histogram) => {
                if REQ_DURATION.set(histogram.clone()).is_ok() {
                    REGISTRY.register(Box::new(histogram)).ok();
                }
            }
            Err(e) => error!("Failed to create request histogram: {}", e),
        }
    }
}

pub fn inc_request(route: &str, status: &str) {
    if let Some(counter) = REQ_COUNTER.get() {
        counter.with_label_values(&[route, status]).inc();
    }
}

pub fn observe_request(route: &str, seconds: f64) {
    if let Some(histogram) = REQ_DURATION.get() {
        histogram.with_label_values(&[route]).observe(seconds);
    }
}

/// Route-level middleware: counts and times every matched request under its
/// route template, so `/tasks/:id` is one series regardless of the id.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let started = Instant::now();

    let response = next.run(req).await;

    observe_request(&route, started.elapsed().as_secs_f64());
    inc_request(&route, response.status().as_str());
    response
}

pub async fn get_metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counter_appears_in_exposition() {
        init_metrics();
        init_metrics();
        inc_request("/metrics-test", "200");
        observe_request("/metrics-test", 0.01);

        let response = get_metrics().await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("requests_total"));
        assert!(text.contains("route=\"/metrics-test\""));
        assert!(text.contains("request_duration_seconds"));
    }
}
