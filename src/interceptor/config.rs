//! Query interceptor configuration
//!
//! Built from the flat string properties a connection pool passes to its
//! interceptors, either as a map or in descriptor form
//! `Name(logFailed=true,threshold=500,buckets=.01|.1|1)`.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::InterceptorConfigError;
use crate::registry::HistogramBuckets;

/// Property keys
pub const KEY_BUCKETS: &str = "buckets";
pub const KEY_SLOW_QUERY_BUCKETS: &str = "slowQueryBuckets";
pub const KEY_LOG_SLOW: &str = "logSlow";
pub const KEY_LOG_FAILED: &str = "logFailed";
pub const KEY_THRESHOLD: &str = "threshold";

const DEFAULT_SLOW_QUERY_BUCKETS: &[f64] = &[1.0, 2.5, 10.0, 30.0];
const DEFAULT_THRESHOLD_MS: u64 = 1000;

/// Interceptor settings
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptorConfig {
    /// Metric name prefix
    pub namespace: String,
    /// Global latency histogram buckets (seconds)
    pub buckets: HistogramBuckets,
    /// Slow query histogram buckets (seconds)
    pub slow_query_buckets: HistogramBuckets,
    /// Track slow queries per query text
    pub log_slow: bool,
    /// Count failures per query text
    pub log_failed: bool,
    /// Slow query threshold
    pub threshold: Duration,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            namespace: "tomcat".to_string(),
            buckets: HistogramBuckets::default(),
            slow_query_buckets: HistogramBuckets::new(DEFAULT_SLOW_QUERY_BUCKETS.to_vec())
                .unwrap_or_default(),
            log_slow: false,
            log_failed: false,
            threshold: Duration::from_millis(DEFAULT_THRESHOLD_MS),
        }
    }
}

impl InterceptorConfig {
    /// Build from pool interceptor properties
    ///
    /// Missing keys keep their defaults. Flags are enabled only by the exact
    /// value `true`. Unknown keys are ignored.
    pub fn from_properties(
        properties: &HashMap<String, String>,
    ) -> Result<Self, InterceptorConfigError> {
        let mut config = Self::default();

        if let Some(value) = properties.get(KEY_BUCKETS) {
            config.buckets = parse_buckets(KEY_BUCKETS, value)?;
        }
        if let Some(value) = properties.get(KEY_SLOW_QUERY_BUCKETS) {
            config.slow_query_buckets = parse_buckets(KEY_SLOW_QUERY_BUCKETS, value)?;
        }
        if let Some(value) = properties.get(KEY_THRESHOLD) {
            let ms: u64 = value
                .trim()
                .parse()
                .map_err(|_| InterceptorConfigError::InvalidThreshold(value.clone()))?;
            config.threshold = Duration::from_millis(ms);
        }
        config.log_slow = properties.get(KEY_LOG_SLOW).is_some_and(|v| v == "true");
        config.log_failed = properties.get(KEY_LOG_FAILED).is_some_and(|v| v == "true");

        Ok(config)
    }

    /// Build from a descriptor such as `QueryInterceptor(logSlow=true,threshold=500)`
    ///
    /// The name before the parentheses is not checked. A bare name without
    /// parentheses yields the defaults.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, InterceptorConfigError> {
        let descriptor = descriptor.trim();
        let invalid = || InterceptorConfigError::InvalidDescriptor(descriptor.to_string());

        let Some(open) = descriptor.find('(') else {
            if descriptor.is_empty() || descriptor.contains(')') {
                return Err(invalid());
            }
            return Ok(Self::default());
        };
        if !descriptor.ends_with(')') || open == 0 {
            return Err(invalid());
        }

        let body = &descriptor[open + 1..descriptor.len() - 1];
        let mut properties = HashMap::new();
        for pair in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(invalid)?;
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }

        Self::from_properties(&properties)
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }
}

fn parse_buckets(key: &str, value: &str) -> Result<HistogramBuckets, InterceptorConfigError> {
    HistogramBuckets::parse(value).map_err(|e| InterceptorConfigError::InvalidBuckets {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
