//! Histogram bucket boundaries

use thiserror::Error;

/// Default latency buckets (seconds)
pub const DEFAULT_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0];

/// Bucket list errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BucketsError {
    #[error("bucket list is empty")]
    Empty,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("bucket bound {0} is not finite")]
    NotFinite(f64),

    #[error("bucket bounds must be strictly ascending ({prev} is followed by {next})")]
    NotAscending { prev: f64, next: f64 },
}

/// Strictly ascending finite upper bounds plus an implicit `+Inf`
///
/// Fixed at construction; histograms built from the same set always share
/// the same layout.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBuckets {
    bounds: Vec<f64>,
}

impl HistogramBuckets {
    /// Validate and wrap a list of upper bounds
    pub fn new(bounds: Vec<f64>) -> Result<Self, BucketsError> {
        if bounds.is_empty() {
            return Err(BucketsError::Empty);
        }
        if let Some(bad) = bounds.iter().find(|b| !b.is_finite()) {
            return Err(BucketsError::NotFinite(*bad));
        }
        if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
            return Err(BucketsError::NotAscending {
                prev: w[0],
                next: w[1],
            });
        }
        Ok(Self { bounds })
    }

    /// Parse a pipe-separated list such as `.01|.05|.1|1`
    pub fn parse(s: &str) -> Result<Self, BucketsError> {
        let bounds = s
            .split('|')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<f64>()
                    .map_err(|_| BucketsError::NotANumber(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(bounds)
    }

    /// Finite upper bounds in ascending order
    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }
}

impl Default for HistogramBuckets {
    fn default() -> Self {
        Self {
            bounds: DEFAULT_BUCKETS.to_vec(),
        }
    }
}
