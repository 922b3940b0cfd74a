//! Process-wide metric registry
//!
//! Families are created on first use and live for the process lifetime.
//! Collectors registered here are run on every [`Registry::gather`].

mod atomic;
mod buckets;
mod family;
pub mod formatter;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::collector::Collector;

pub use atomic::{Gauge, Histogram};
pub use buckets::{BucketsError, HistogramBuckets, DEFAULT_BUCKETS};
pub use family::{FamilySnapshot, MetricFamily, MetricKind, SampleSet, SeriesSnapshot, SeriesValue};
pub use formatter::PrometheusFormatter;

/// Metric family registry
#[derive(Default)]
pub struct Registry {
    families: RwLock<BTreeMap<String, Arc<MetricFamily>>>,
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a gauge or counter family
    ///
    /// A histogram requested through this method uses the default buckets.
    /// If a family with the same name exists under a different schema, the
    /// existing family is returned and a warning is logged.
    pub fn family(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
    ) -> Arc<MetricFamily> {
        self.get_or_create(name, help, kind, label_names, None)
    }

    /// Get or create a histogram family
    pub fn histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: HistogramBuckets,
    ) -> Arc<MetricFamily> {
        self.get_or_create(name, help, MetricKind::Histogram, label_names, Some(buckets))
    }

    fn get_or_create(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
        buckets: Option<HistogramBuckets>,
    ) -> Arc<MetricFamily> {
        if let Some(existing) = self.families.read().get(name) {
            return Self::checked(existing, kind, label_names, buckets.as_ref());
        }

        let mut families = self.families.write();
        if let Some(existing) = families.get(name) {
            return Self::checked(existing, kind, label_names, buckets.as_ref());
        }

        let family = Arc::new(MetricFamily::new(
            name,
            help,
            kind,
            label_names,
            buckets.unwrap_or_default(),
        ));
        families.insert(name.to_string(), Arc::clone(&family));
        family
    }

    fn checked(
        existing: &Arc<MetricFamily>,
        kind: MetricKind,
        label_names: &[&str],
        buckets: Option<&HistogramBuckets>,
    ) -> Arc<MetricFamily> {
        if !existing.has_schema(kind, label_names, buckets) {
            warn!(
                family = %existing.name(),
                registered_kind = existing.kind().as_str(),
                requested_kind = kind.as_str(),
                registered_labels = ?existing.label_names(),
                requested_labels = ?label_names,
                "Metric family already registered with a different schema"
            );
        }
        Arc::clone(existing)
    }

    /// Look up a family by name
    pub fn get(&self, name: &str) -> Option<Arc<MetricFamily>> {
        self.families.read().get(name).cloned()
    }

    /// Register a collector run on every gather
    pub fn register(&self, collector: Arc<dyn Collector>) {
        self.collectors.write().push(collector);
    }

    /// Number of registered collectors
    pub fn collector_count(&self) -> usize {
        self.collectors.read().len()
    }

    /// Run all collectors and snapshot every non-empty family
    ///
    /// Collector output comes first, in registration order. Families not
    /// returned by any collector (interceptor histograms, for instance)
    /// follow in name order.
    pub async fn gather(&self) -> Vec<FamilySnapshot> {
        let collectors: Vec<Arc<dyn Collector>> = self.collectors.read().clone();

        let mut output = Vec::new();
        let mut seen = HashSet::new();
        for collector in collectors {
            for snapshot in collector.collect(self).await {
                if seen.insert(snapshot.name.clone()) {
                    output.push(snapshot);
                }
            }
        }

        let families: Vec<Arc<MetricFamily>> = self.families.read().values().cloned().collect();
        for family in families {
            if !seen.contains(family.name()) && !family.is_empty() {
                output.push(family.snapshot());
            }
        }

        output
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("families", &self.families.read().keys().collect::<Vec<_>>())
            .field("collectors", &self.collector_count())
            .finish()
    }
}
