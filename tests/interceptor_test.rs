//! Query interceptor integration tests
//!
//! These tests verify:
//! - Latency bucketing of successful and failed queries
//! - Per-query failure counting
//! - Slow query tracking against the threshold

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rtomcat_exporter::interceptor::{InterceptorConfig, QueryInterceptor, QueryObserver};
use rtomcat_exporter::registry::{PrometheusFormatter, Registry, SeriesValue};

const QUERY: &str = "SELECT * FROM orders WHERE id = ?";

fn config(pairs: &[(&str, &str)]) -> InterceptorConfig {
    let properties: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    InterceptorConfig::from_properties(&properties).unwrap()
}

fn histogram(
    registry: &Registry,
    family: &str,
    labels: &[&str],
) -> Option<(Vec<(f64, u64)>, f64, u64)> {
    let snapshot = registry.get(family)?.snapshot();
    match snapshot.series(labels)?.value.clone() {
        SeriesValue::Histogram {
            buckets,
            sum,
            count,
        } => Some((buckets, sum, count)),
        SeriesValue::Value(_) => None,
    }
}

fn bucket(buckets: &[(f64, u64)], bound: f64) -> u64 {
    buckets
        .iter()
        .find(|(b, _)| *b == bound)
        .map(|(_, c)| *c)
        .unwrap_or_else(|| panic!("no bucket {}", bound))
}

#[test]
fn test_fast_success_lands_in_lowest_bucket() {
    let registry = Registry::new();
    let interceptor = QueryInterceptor::new(&registry, &config(&[]));

    interceptor.on_success(QUERY, Duration::from_millis(5));

    let (buckets, sum, count) =
        histogram(&registry, "tomcat_jdbc_query_seconds", &["success"]).unwrap();
    assert_eq!(count, 1);
    assert!((sum - 0.005).abs() < 1e-9);
    assert_eq!(bucket(&buckets, 0.01), 1);
    assert_eq!(bucket(&buckets, 10.0), 1);
    assert_eq!(bucket(&buckets, f64::INFINITY), 1);
    assert!(histogram(&registry, "tomcat_jdbc_query_seconds", &["error"]).is_none());

    let family = registry.get("tomcat_jdbc_query_seconds").unwrap();
    let output = PrometheusFormatter::new().format(&[family.snapshot()]);
    assert!(output.contains("tomcat_jdbc_query_seconds_bucket{status=\"success\",le=\"0.01\"} 1"));
    assert!(output.contains("tomcat_jdbc_query_seconds_count{status=\"success\"} 1"));
}

#[test]
fn test_failure_counts_once_and_is_never_slow() {
    let registry = Registry::new();
    let interceptor = QueryInterceptor::new(
        &registry,
        &config(&[("logFailed", "true"), ("logSlow", "true"), ("threshold", "1000")]),
    );

    interceptor.on_failure(QUERY, Duration::from_millis(1500), &"deadlock detected");

    let failed = registry.get("tomcat_jdbc_failedquery_total").unwrap().snapshot();
    assert_eq!(failed.value(&[QUERY]), Some(1.0));

    let (_, _, count) = histogram(&registry, "tomcat_jdbc_query_seconds", &["error"]).unwrap();
    assert_eq!(count, 1);

    assert!(registry
        .get("tomcat_jdbc_slowquery_seconds")
        .unwrap()
        .is_empty());
}

#[test]
fn test_failure_without_log_failed_only_times() {
    let registry = Registry::new();
    let interceptor = QueryInterceptor::new(&registry, &config(&[]));

    let result: Result<(), String> =
        interceptor.execute(QUERY, || Err("connection reset".to_string()));
    assert!(result.is_err());

    assert!(registry.get("tomcat_jdbc_failedquery_total").is_none());
    let (_, _, count) = histogram(&registry, "tomcat_jdbc_query_seconds", &["error"]).unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_slow_success_is_tracked_per_query() {
    let registry = Registry::new();
    let interceptor = QueryInterceptor::new(
        &registry,
        &config(&[("logSlow", "true"), ("threshold", "1000")]),
    );

    interceptor.on_success(QUERY, Duration::from_millis(1500));

    let (buckets, sum, count) =
        histogram(&registry, "tomcat_jdbc_slowquery_seconds", &[QUERY]).unwrap();
    assert_eq!(count, 1);
    assert!((sum - 1.5).abs() < 1e-9);
    assert_eq!(bucket(&buckets, 1.0), 0);
    assert_eq!(bucket(&buckets, 2.5), 1);

    let (_, _, count) = histogram(&registry, "tomcat_jdbc_query_seconds", &["success"]).unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_threshold_boundary() {
    let registry = Registry::new();
    let interceptor = QueryInterceptor::new(
        &registry,
        &config(&[("logSlow", "true"), ("threshold", "1000")]),
    );

    interceptor.on_success("SELECT fast", Duration::from_millis(999));
    interceptor.on_success("SELECT edge", Duration::from_millis(1000));

    assert!(histogram(&registry, "tomcat_jdbc_slowquery_seconds", &["SELECT fast"]).is_none());
    assert!(histogram(&registry, "tomcat_jdbc_slowquery_seconds", &["SELECT edge"]).is_some());
}

#[test]
fn test_slow_callback_records_both_histograms() {
    let registry = Registry::new();
    let interceptor = QueryInterceptor::new(
        &registry,
        &config(&[("logSlow", "true"), ("threshold", "200")]),
    );

    interceptor.on_slow(QUERY, Duration::from_millis(300));

    assert!(histogram(&registry, "tomcat_jdbc_slowquery_seconds", &[QUERY]).is_some());
    assert!(histogram(&registry, "tomcat_jdbc_query_seconds", &["success"]).is_some());
}

#[test]
fn test_slow_tracking_disabled_by_default() {
    let registry = Registry::new();
    let interceptor = QueryInterceptor::new(&registry, &config(&[("logSlow", "yes")]));

    interceptor.on_success(QUERY, Duration::from_secs(5));

    assert!(registry.get("tomcat_jdbc_slowquery_seconds").is_none());
}

#[test]
fn test_custom_buckets() {
    let registry = Registry::new();
    let interceptor = QueryInterceptor::new(&registry, &config(&[("buckets", "0.5|1")]));

    interceptor.on_success(QUERY, Duration::from_millis(700));

    let (buckets, _, _) =
        histogram(&registry, "tomcat_jdbc_query_seconds", &["success"]).unwrap();
    let bounds: Vec<f64> = buckets.iter().map(|(b, _)| *b).collect();
    assert_eq!(bounds, vec![0.5, 1.0, f64::INFINITY]);
    assert_eq!(bucket(&buckets, 0.5), 0);
    assert_eq!(bucket(&buckets, 1.0), 1);
}

#[test]
fn test_descriptor_configuration() {
    let registry = Registry::new();
    let config = InterceptorConfig::from_descriptor(
        "QueryInterceptor(logFailed=true,threshold=500)",
    )
    .unwrap()
    .with_namespace("app");
    let interceptor = QueryInterceptor::new(&registry, &config);

    assert_eq!(interceptor.threshold(), Duration::from_millis(500));
    interceptor.on_failure(QUERY, Duration::from_millis(1), &"timeout");
    assert_eq!(
        registry
            .get("app_jdbc_failedquery_total")
            .unwrap()
            .snapshot()
            .value(&[QUERY]),
        Some(1.0)
    );
}

#[test]
fn test_concurrent_observations() {
    let registry = Arc::new(Registry::new());
    let interceptor = Arc::new(QueryInterceptor::new(
        &registry,
        &config(&[("logFailed", "true")]),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let interceptor = Arc::clone(&interceptor);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    interceptor.on_success(QUERY, Duration::from_millis(2));
                    interceptor.on_failure(QUERY, Duration::from_millis(2), &"error");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let (_, _, count) = histogram(&registry, "tomcat_jdbc_query_seconds", &["success"]).unwrap();
    assert_eq!(count, 8000);
    assert_eq!(
        registry
            .get("tomcat_jdbc_failedquery_total")
            .unwrap()
            .snapshot()
            .value(&[QUERY]),
        Some(8000.0)
    );
}
