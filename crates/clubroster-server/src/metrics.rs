use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[derive(Debug, Default)]
pub struct Metrics {
    request_total: AtomicU64,
    request_success: AtomicU64,
    request_error: AtomicU64,
    auth_failures: AtomicU64,
    access_denials: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.request_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.request_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.request_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_access_denial(&self) {
        self.access_denials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_total(&self) -> u64 {
        self.request_total.load(Ordering::Relaxed)
    }

    pub fn request_success(&self) -> u64 {
        self.request_success.load(Ordering::Relaxed)
    }

    pub fn request_error(&self) -> u64 {
        self.request_error.load(Ordering::Relaxed)
    }

    pub fn auth_failures(&self) -> u64 {
        self.auth_failures.load(Ordering::Relaxed)
    }

    pub fn access_denials(&self) -> u64 {
        self.access_denials.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let mut output = String::new();
        output.push_str("# HELP clubroster_requests_total Total number of requests.\n");
        output.push_str("# TYPE clubroster_requests_total counter\n");
        output.push_str(&format!(
            "clubroster_requests_total {}\n",
            self.request_total()
        ));
        output.push_str("# HELP clubroster_requests_success_total Total successful requests.\n");
        output.push_str("# TYPE clubroster_requests_success_total counter\n");
        output.push_str(&format!(
            "clubroster_requests_success_total {}\n",
            self.request_success()
        ));
        output.push_str("# HELP clubroster_requests_error_total Total failed requests.\n");
        output.push_str("# TYPE clubroster_requests_error_total counter\n");
        output.push_str(&format!(
            "clubroster_requests_error_total {}\n",
            self.request_error()
        ));
        output.push_str("# HELP clubroster_auth_failures_total Failed authentications.\n");
        output.push_str("# TYPE clubroster_auth_failures_total counter\n");
        output.push_str(&format!(
            "clubroster_auth_failures_total {}\n",
            self.auth_failures()
        ));
        output.push_str("# HELP clubroster_access_denials_total Authorization denials.\n");
        output.push_str("# TYPE clubroster_access_denials_total counter\n");
        output.push_str(&format!(
            "clubroster_access_denials_total {}\n",
            self.access_denials()
        ));
        output
    }
}

pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render_prometheus(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_independently() {
        let metrics = Metrics::new();
        metrics.record_request();
        metrics.record_request();
        metrics.record_success();
        metrics.record_error();
        metrics.record_auth_failure();

        assert_eq!(metrics.request_total(), 2);
        assert_eq!(metrics.request_success(), 1);
        assert_eq!(metrics.request_error(), 1);
        assert_eq!(metrics.auth_failures(), 1);
        assert_eq!(metrics.access_denials(), 0);
    }

    #[test]
    fn prometheus_output_contains_all_series() {
        let metrics = Metrics::new();
        metrics.record_request();

        let output = metrics.render_prometheus();
        assert!(output.contains("clubroster_requests_total 1"));
        assert!(output.contains("clubroster_requests_success_total 0"));
        assert!(output.contains("clubroster_auth_failures_total 0"));
        assert!(output.contains("clubroster_access_denials_total 0"));
    }
}
