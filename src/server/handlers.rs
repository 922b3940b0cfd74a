//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use tracing::{debug, instrument};

use super::AppState;
use crate::collector::table::metric_name;
use crate::registry::formatter::CONTENT_TYPE;
use crate::registry::{FamilySnapshot, MetricKind, PrometheusFormatter, SeriesSnapshot, SeriesValue};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>rTomcat-Exporter</title>
</head>
<body>
    <h1>rTomcat-Exporter</h1>
    <p>Version: {}</p>
    <p>Jolokia: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        state.config.jolokia.url,
        state.config.server.path
    );
    Html(html)
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint - runs one collection pass and returns Prometheus format
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let mut families = state.registry.gather().await;
    let series_count: usize = families.iter().map(|f| f.series.len()).sum();

    families.push(scrape_duration(
        &state.config.exporter.namespace,
        start.elapsed().as_secs_f64(),
    ));

    let output = PrometheusFormatter::new().format(&families);

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        families = families.len(),
        series = series_count,
        "Metrics collection complete"
    );

    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], output)
}

/// Exporter self-metric; not stored in the registry
fn scrape_duration(namespace: &str, seconds: f64) -> FamilySnapshot {
    FamilySnapshot {
        name: metric_name(namespace, "exporter_scrape_duration_seconds"),
        help: "Time spent collecting metrics".to_string(),
        kind: MetricKind::Gauge,
        label_names: Vec::new(),
        series: vec![SeriesSnapshot {
            labels: Vec::new(),
            value: SeriesValue::Value(seconds),
        }],
    }
}
