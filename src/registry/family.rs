//! Metric families
//!
//! A family is a named, typed set of series keyed by label-value tuples.
//! Gauges and counters are usually replaced wholesale once per collection
//! pass through [`MetricFamily::publish`]; histograms and interceptor counters
//! are updated in place.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::atomic::{Gauge, Histogram};
use super::buckets::HistogramBuckets;
use crate::error::RegistryError;

/// Metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
    Histogram,
}

impl MetricKind {
    /// Exposition format type name
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

#[derive(Debug)]
enum Series {
    Value(Gauge),
    Histogram(Histogram),
}

/// Samples of one collection pass for one family
///
/// Setting the same label tuple twice keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: HashMap<Vec<String>, f64>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a value for a label tuple
    pub fn set(&mut self, labels: Vec<String>, value: f64) {
        self.samples.insert(labels, value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, labels: &[String]) -> Option<f64> {
        self.samples.get(labels).copied()
    }
}

impl IntoIterator for SampleSet {
    type Item = (Vec<String>, f64);
    type IntoIter = std::collections::hash_map::IntoIter<Vec<String>, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

/// Point-in-time value of one series
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValue {
    Value(f64),
    Histogram {
        /// Cumulative counts per upper bound, ending with +Inf
        buckets: Vec<(f64, u64)>,
        sum: f64,
        count: u64,
    },
}

/// Point-in-time copy of one series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub labels: Vec<String>,
    pub value: SeriesValue,
}

/// Point-in-time copy of a family, ready for formatting
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
    pub series: Vec<SeriesSnapshot>,
}

impl FamilySnapshot {
    /// Value of a gauge or counter series
    pub fn value(&self, labels: &[&str]) -> Option<f64> {
        self.series
            .iter()
            .find(|s| s.labels.iter().map(String::as_str).eq(labels.iter().copied()))
            .and_then(|s| match s.value {
                SeriesValue::Value(v) => Some(v),
                SeriesValue::Histogram { .. } => None,
            })
    }

    /// Series for a label tuple
    pub fn series(&self, labels: &[&str]) -> Option<&SeriesSnapshot> {
        self.series
            .iter()
            .find(|s| s.labels.iter().map(String::as_str).eq(labels.iter().copied()))
    }
}

/// A named, typed, labeled metric family
#[derive(Debug)]
pub struct MetricFamily {
    name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<String>,
    buckets: HistogramBuckets,
    series: RwLock<HashMap<Vec<String>, Series>>,
}

impl MetricFamily {
    pub(crate) fn new(
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
        buckets: HistogramBuckets,
    ) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
            buckets,
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Bucket layout (only meaningful for histograms)
    pub fn buckets(&self) -> &HistogramBuckets {
        &self.buckets
    }

    /// Whether the family currently holds no series
    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    /// Set a gauge or counter series
    pub fn set(&self, labels: &[&str], value: f64) -> Result<(), RegistryError> {
        self.check_value_kind("set")?;
        self.with_series(labels, |series| {
            if let Series::Value(gauge) = series {
                gauge.set(value);
            }
        })
    }

    /// Add to a gauge or counter series
    pub fn inc(&self, labels: &[&str], by: f64) -> Result<(), RegistryError> {
        self.check_value_kind("inc")?;
        self.with_series(labels, |series| {
            if let Series::Value(gauge) = series {
                gauge.inc(by);
            }
        })
    }

    /// Record an observation into a histogram series
    pub fn observe(&self, labels: &[&str], value: f64) -> Result<(), RegistryError> {
        if self.kind != MetricKind::Histogram {
            return Err(self.kind_mismatch("observe"));
        }
        self.with_series(labels, |series| {
            if let Series::Histogram(histogram) = series {
                histogram.observe(value);
            }
        })
    }

    /// Replace the complete series set with the samples of one pass
    ///
    /// Label tuples missing from `samples` disappear. Nothing is changed if
    /// any tuple has the wrong arity.
    pub fn publish(&self, samples: SampleSet) -> Result<(), RegistryError> {
        self.check_value_kind("publish")?;
        if let Some(bad) = samples
            .samples
            .keys()
            .find(|labels| labels.len() != self.label_names.len())
        {
            return Err(self.arity_error(bad.len()));
        }

        let next: HashMap<Vec<String>, Series> = samples
            .samples
            .into_iter()
            .map(|(labels, value)| (labels, Series::Value(Gauge::with_value(value))))
            .collect();

        *self.series.write() = next;
        Ok(())
    }

    /// Drop every series
    pub fn clear(&self) {
        self.series.write().clear();
    }

    /// Copy the current state, series sorted by label values
    pub fn snapshot(&self) -> FamilySnapshot {
        let mut series: Vec<SeriesSnapshot> = self
            .series
            .read()
            .iter()
            .map(|(labels, series)| SeriesSnapshot {
                labels: labels.clone(),
                value: match series {
                    Series::Value(gauge) => SeriesValue::Value(gauge.get()),
                    Series::Histogram(histogram) => {
                        let (buckets, sum, count) = histogram.snapshot();
                        SeriesValue::Histogram {
                            buckets,
                            sum,
                            count,
                        }
                    }
                },
            })
            .collect();
        series.sort_by(|a, b| a.labels.cmp(&b.labels));

        FamilySnapshot {
            name: self.name.clone(),
            help: self.help.clone(),
            kind: self.kind,
            label_names: self.label_names.clone(),
            series,
        }
    }

    /// Whether this family was registered with the given schema
    pub(crate) fn has_schema(
        &self,
        kind: MetricKind,
        label_names: &[&str],
        buckets: Option<&HistogramBuckets>,
    ) -> bool {
        self.kind == kind
            && self.label_names.iter().map(String::as_str).eq(label_names.iter().copied())
            && buckets.map_or(true, |b| *b == self.buckets)
    }

    fn with_series(&self, labels: &[&str], f: impl Fn(&Series)) -> Result<(), RegistryError> {
        if labels.len() != self.label_names.len() {
            return Err(self.arity_error(labels.len()));
        }

        let key: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        {
            let series = self.series.read();
            if let Some(existing) = series.get(&key) {
                f(existing);
                return Ok(());
            }
        }

        let mut series = self.series.write();
        let entry = series.entry(key).or_insert_with(|| match self.kind {
            MetricKind::Histogram => Series::Histogram(Histogram::new(&self.buckets)),
            MetricKind::Gauge | MetricKind::Counter => Series::Value(Gauge::new()),
        });
        f(entry);
        Ok(())
    }

    fn check_value_kind(&self, operation: &'static str) -> Result<(), RegistryError> {
        match self.kind {
            MetricKind::Gauge | MetricKind::Counter => Ok(()),
            MetricKind::Histogram => Err(self.kind_mismatch(operation)),
        }
    }

    fn kind_mismatch(&self, operation: &'static str) -> RegistryError {
        RegistryError::KindMismatch {
            family: self.name.clone(),
            kind: self.kind.as_str(),
            operation,
        }
    }

    fn arity_error(&self, actual: usize) -> RegistryError {
        RegistryError::LabelArity {
            family: self.name.clone(),
            expected: self.label_names.len(),
            actual,
        }
    }
}
