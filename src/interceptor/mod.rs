//! JDBC query timing
//!
//! [`QueryInterceptor`] sits on the hot path of every query. It classifies
//! each execution as success or error, times it into a global histogram and,
//! when enabled, tracks slow queries and failures per query text.
//!
//! Per-query-text tracking creates one series per distinct query string, so
//! it is off unless `logSlow` / `logFailed` is set.

mod config;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::collector::table::metric_name;
use crate::registry::{MetricFamily, MetricKind, Registry};

pub use config::{
    InterceptorConfig, KEY_BUCKETS, KEY_LOG_FAILED, KEY_LOG_SLOW, KEY_SLOW_QUERY_BUCKETS,
    KEY_THRESHOLD,
};

/// Outcome label of the global histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Success,
    Error,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

/// Callbacks invoked around each query execution
///
/// Implementations must be cheap; they run synchronously on the calling
/// thread.
pub trait QueryObserver: Send + Sync {
    /// The query completed
    fn on_success(&self, query: &str, elapsed: Duration);

    /// The query failed
    fn on_failure(&self, query: &str, elapsed: Duration, error: &dyn fmt::Display);

    /// The query completed and the pool already classified it as slow
    fn on_slow(&self, query: &str, elapsed: Duration);
}

/// Registry-backed [`QueryObserver`]
pub struct QueryInterceptor {
    queries: Arc<MetricFamily>,
    slow_queries: Option<Arc<MetricFamily>>,
    failed_queries: Option<Arc<MetricFamily>>,
    threshold: Duration,
}

impl QueryInterceptor {
    /// Create (or reuse) the interceptor families in `registry`
    ///
    /// `<ns>_jdbc_query_seconds{status}` is always registered;
    /// `<ns>_jdbc_slowquery_seconds{query}` only with `log_slow` and
    /// `<ns>_jdbc_failedquery_total{query}` only with `log_failed`.
    pub fn new(registry: &Registry, config: &InterceptorConfig) -> Self {
        let ns = config.namespace.as_str();

        let queries = registry.histogram(
            &metric_name(ns, "jdbc_query_seconds"),
            "JDBC query duration",
            &["status"],
            config.buckets.clone(),
        );

        let slow_queries = config.log_slow.then(|| {
            registry.histogram(
                &metric_name(ns, "jdbc_slowquery_seconds"),
                "JDBC slow query duration in seconds",
                &["query"],
                config.slow_query_buckets.clone(),
            )
        });

        let failed_queries = config.log_failed.then(|| {
            registry.family(
                &metric_name(ns, "jdbc_failedquery_total"),
                "Number of errors for given JDBC query",
                MetricKind::Counter,
                &["query"],
            )
        });

        Self {
            queries,
            slow_queries,
            failed_queries,
            threshold: config.threshold,
        }
    }

    /// Slow query threshold
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Time `f` and report its outcome
    pub fn execute<T, E, F>(&self, query: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => self.on_success(query, elapsed),
            Err(e) => self.on_failure(query, elapsed, e),
        }
        result
    }

    fn observe_completed(&self, query: &str, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        if let Err(e) = self
            .queries
            .observe(&[QueryStatus::Success.as_str()], seconds)
        {
            e.report();
        }

        if let Some(slow) = &self.slow_queries {
            if elapsed >= self.threshold {
                if let Err(e) = slow.observe(&[query], seconds) {
                    e.report();
                }
            }
        }
    }
}

impl QueryObserver for QueryInterceptor {
    fn on_success(&self, query: &str, elapsed: Duration) {
        self.observe_completed(query, elapsed);
    }

    fn on_failure(&self, query: &str, elapsed: Duration, error: &dyn fmt::Display) {
        debug!(query = %query, error = %error, "Query failed");

        if let Err(e) = self
            .queries
            .observe(&[QueryStatus::Error.as_str()], elapsed.as_secs_f64())
        {
            e.report();
        }

        if let Some(failed) = &self.failed_queries {
            if let Err(e) = failed.inc(&[query], 1.0) {
                e.report();
            }
        }
    }

    fn on_slow(&self, query: &str, elapsed: Duration) {
        self.observe_completed(query, elapsed);
    }
}
