//! Lock-free series cells
//!
//! A series is either a single value (gauge or counter) or a histogram.
//! Both are updated with relaxed atomics so observers only ever need the
//! family's read lock.

use std::sync::atomic::{AtomicU64, Ordering};

use super::buckets::HistogramBuckets;

/// Thread-safe f64 value cell
#[derive(Debug)]
pub struct Gauge {
    /// Stored as bits of f64 for atomic operations
    value: AtomicU64,
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

impl Gauge {
    /// Create a new cell initialized to 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Create a cell holding `v`
    pub fn with_value(v: f64) -> Self {
        Self {
            value: AtomicU64::new(v.to_bits()),
        }
    }

    /// Set the value
    pub fn set(&self, v: f64) {
        self.value.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Add `v` to the value
    pub fn inc(&self, v: f64) {
        add_f64(&self.value, v);
    }
}

/// Thread-safe histogram for measuring distributions
#[derive(Debug)]
pub struct Histogram {
    /// Finite upper bounds
    bounds: Vec<f64>,
    /// Per-bucket counts; the last slot holds values above every bound
    counts: Vec<AtomicU64>,
    /// Sum of all observed values
    sum: AtomicU64,
}

impl Histogram {
    /// Create an empty histogram over the given buckets
    pub fn new(buckets: &HistogramBuckets) -> Self {
        let bounds = buckets.bounds().to_vec();
        let counts = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds,
            counts,
            sum: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Observe a value
    pub fn observe(&self, v: f64) {
        let slot = self
            .bounds
            .iter()
            .position(|&bound| v <= bound)
            .unwrap_or(self.bounds.len());
        self.counts[slot].fetch_add(1, Ordering::Relaxed);
        add_f64(&self.sum, v);
    }

    /// Sum of all observations
    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Total count of observations
    pub fn count(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Bucket boundaries with their cumulative counts, ending with +Inf
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0;
        self.bounds
            .iter()
            .copied()
            .chain(std::iter::once(f64::INFINITY))
            .zip(self.counts.iter())
            .map(|(bound, count)| {
                cumulative += count.load(Ordering::Relaxed);
                (bound, cumulative)
            })
            .collect()
    }

    /// Cumulative buckets, sum and count read together
    ///
    /// The count is the +Inf bucket of the same read.
    pub fn snapshot(&self) -> (Vec<(f64, u64)>, f64, u64) {
        let buckets = self.buckets();
        let count = buckets.last().map_or(0, |&(_, c)| c);
        (buckets, self.sum(), count)
    }
}

fn add_f64(cell: &AtomicU64, v: f64) {
    loop {
        let current = cell.load(Ordering::Relaxed);
        let new = f64::from_bits(current) + v;
        if cell
            .compare_exchange_weak(current, new.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            break;
        }
    }
}
