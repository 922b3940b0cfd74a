//! Table-driven attribute-to-metric mapping
//!
//! A [`SourceSpec`] names where a group of managed objects lives, which key
//! properties become labels and which attributes become which metrics. Pool
//! implementations and runtime groups are all plain table entries.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::discovery::Discovery;
use super::resolver::AttributeResolver;
use crate::error::DiscoveryError;
use crate::jmx::{AttributeValue, ObjectName};
use crate::registry::{FamilySnapshot, MetricKind, Registry, SampleSet};

/// How an attribute value becomes a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extract {
    /// Numeric value as is
    Number,
    /// Milliseconds converted to seconds
    MillisToSeconds,
    /// 1.0 when the value equals the token, 0.0 otherwise
    Equals(&'static str),
}

impl Extract {
    /// Convert a present value, `None` if it is not usable
    pub fn apply(&self, value: &AttributeValue) -> Option<f64> {
        match self {
            Extract::Number => value.as_f64(),
            Extract::MillisToSeconds => value.as_f64().map(|ms| ms / 1000.0),
            Extract::Equals(token) => {
                let matched = matches!(value, AttributeValue::String(s) if s.as_str() == *token);
                Some(if matched { 1.0 } else { 0.0 })
            }
        }
    }
}

/// Metric name suffix, help text and type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDef {
    pub suffix: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
}

impl MetricDef {
    pub const fn gauge(suffix: &'static str, help: &'static str) -> Self {
        Self {
            suffix,
            help,
            kind: MetricKind::Gauge,
        }
    }

    pub const fn counter(suffix: &'static str, help: &'static str) -> Self {
        Self {
            suffix,
            help,
            kind: MetricKind::Counter,
        }
    }

    /// Full name with the namespace prefix; an empty namespace yields the suffix
    pub fn full_name(&self, namespace: &str) -> String {
        metric_name(namespace, self.suffix)
    }
}

/// Join namespace and suffix with `_`
pub fn metric_name(namespace: &str, suffix: &str) -> String {
    if namespace.is_empty() {
        suffix.to_string()
    } else {
        format!("{}_{}", namespace, suffix)
    }
}

/// One source attribute mapped to one metric
#[derive(Debug, Clone, Copy)]
pub struct AttributeSpec {
    pub attribute: &'static str,
    pub metric: MetricDef,
    pub extract: Extract,
}

impl AttributeSpec {
    pub const fn number(attribute: &'static str, metric: MetricDef) -> Self {
        Self {
            attribute,
            metric,
            extract: Extract::Number,
        }
    }

    pub const fn millis(attribute: &'static str, metric: MetricDef) -> Self {
        Self {
            attribute,
            metric,
            extract: Extract::MillisToSeconds,
        }
    }

    pub const fn equals(attribute: &'static str, metric: MetricDef, token: &'static str) -> Self {
        Self {
            attribute,
            metric,
            extract: Extract::Equals(token),
        }
    }
}

/// Object-name domain of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDomain {
    Fixed(&'static str),
    /// The server's own domain (`Catalina` or `Tomcat`)
    Runtime,
}

impl SourceDomain {
    pub fn resolve<'a>(&self, runtime: &'a str) -> &'a str {
        match self {
            SourceDomain::Fixed(domain) => *domain,
            SourceDomain::Runtime => runtime,
        }
    }
}

/// A label taken from an object-name key property
#[derive(Debug, Clone, Copy)]
pub struct LabelSource {
    pub label: &'static str,
    pub key: &'static str,
}

/// A group of managed objects and its metric mapping
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    /// Short identifier used in logs
    pub tag: &'static str,
    pub domain: SourceDomain,
    pub type_name: &'static str,
    pub key_filter: &'static str,
    /// Objects carrying this key property are skipped
    pub exclude_key: Option<&'static str>,
    pub labels: &'static [LabelSource],
    pub attributes: &'static [AttributeSpec],
}

impl SourceSpec {
    pub fn label_names(&self) -> Vec<&'static str> {
        self.labels.iter().map(|l| l.label).collect()
    }

    /// Label values for an object, sanitized; missing keys become ""
    pub fn label_values(&self, name: &ObjectName) -> Vec<String> {
        self.labels
            .iter()
            .map(|l| name.key_property(l.key).map(sanitize).unwrap_or_default())
            .collect()
    }

    /// Distinct metrics of this source in table order
    pub fn metrics(&self) -> Vec<MetricDef> {
        let mut metrics: Vec<MetricDef> = Vec::with_capacity(self.attributes.len());
        for spec in self.attributes {
            if !metrics.iter().any(|m| m.suffix == spec.metric.suffix) {
                metrics.push(spec.metric);
            }
        }
        metrics
    }
}

/// Strip `"` and `\` from a key property value
pub fn sanitize(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '"' | '\\')).collect()
}

/// Samples of one pass, keyed by metric suffix
#[derive(Debug, Default)]
pub struct PassSamples {
    pub by_metric: BTreeMap<&'static str, SampleSet>,
    /// Objects that contributed to this pass
    pub objects: usize,
}

impl PassSamples {
    pub fn merge(&mut self, other: PassSamples) {
        for (suffix, samples) in other.by_metric {
            let target = self.by_metric.entry(suffix).or_default();
            for (labels, value) in samples {
                target.set(labels, value);
            }
        }
        self.objects += other.objects;
    }
}

/// Discover and read every object of one source
///
/// Objects that vanish or fail to answer are skipped; absent or unusable
/// attributes drop only their own sample.
pub async fn collect_source(
    discovery: &Discovery,
    resolver: &AttributeResolver,
    source: &SourceSpec,
    runtime_domain: &str,
) -> Result<PassSamples, DiscoveryError> {
    let domain = source.domain.resolve(runtime_domain);
    let names = discovery
        .find(domain, source.type_name, source.key_filter)
        .await?;

    let attributes: Vec<&str> = source.attributes.iter().map(|a| a.attribute).collect();
    let mut pass = PassSamples::default();

    for name in names {
        if source.exclude_key.is_some_and(|key| name.has_key(key)) {
            debug!(source = source.tag, mbean = %name, "Skipping sub-resource");
            continue;
        }

        let resolved = match resolver.resolve(&name, &attributes).await {
            Ok(resolved) => resolved,
            Err(e) if e.is_instance_not_found() => {
                debug!(source = source.tag, mbean = %name, "Object vanished during collection");
                continue;
            }
            Err(e) => {
                warn!(source = source.tag, mbean = %name, error = %e, "Failed to read object, skipping");
                continue;
            }
        };

        let labels = source.label_values(&name);
        for spec in source.attributes {
            let Some(raw) = resolved.get(spec.attribute) else {
                continue;
            };
            match spec.extract.apply(raw) {
                Some(value) => pass
                    .by_metric
                    .entry(spec.metric.suffix)
                    .or_default()
                    .set(labels.clone(), value),
                None => resolver.note_unusable(&name, spec.attribute, raw),
            }
        }
        pass.objects += 1;
    }

    Ok(pass)
}

/// Publish one pass into the registry and snapshot the non-empty families
///
/// Every listed metric is published, so families that received no samples
/// are cleared. A family is only created once it has samples.
pub fn publish_pass(
    registry: &Registry,
    namespace: &str,
    metrics: &[MetricDef],
    label_names: &[&str],
    mut pass: PassSamples,
) -> Vec<FamilySnapshot> {
    let mut snapshots = Vec::new();

    for def in metrics {
        let name = def.full_name(namespace);
        let samples = pass.by_metric.remove(def.suffix).unwrap_or_default();

        let family = if samples.is_empty() {
            match registry.get(&name) {
                Some(family) => family,
                None => continue,
            }
        } else {
            registry.family(&name, def.help, def.kind, label_names)
        };

        if let Err(e) = family.publish(samples) {
            e.report();
            continue;
        }
        if !family.is_empty() {
            snapshots.push(family.snapshot());
        }
    }

    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREADS: MetricDef = MetricDef::gauge("threads_total", "Threads");
    const LABELS: &[LabelSource] = &[
        LabelSource {
            label: "pool",
            key: "name",
        },
        LabelSource {
            label: "context",
            key: "context",
        },
    ];
    const ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec::number("currentThreadCount", THREADS)];

    fn spec() -> SourceSpec {
        SourceSpec {
            tag: "test",
            domain: SourceDomain::Runtime,
            type_name: "ThreadPool",
            key_filter: "name=*",
            exclude_key: None,
            labels: LABELS,
            attributes: ATTRIBUTES,
        }
    }

    #[test]
    fn test_extract() {
        assert_eq!(Extract::Number.apply(&AttributeValue::Integer(5)), Some(5.0));
        assert_eq!(Extract::Number.apply(&AttributeValue::Boolean(true)), None);
        assert_eq!(
            Extract::MillisToSeconds.apply(&AttributeValue::Integer(1500)),
            Some(1.5)
        );
        assert_eq!(
            Extract::Equals("STARTED").apply(&AttributeValue::from("STARTED")),
            Some(1.0)
        );
        assert_eq!(
            Extract::Equals("STARTED").apply(&AttributeValue::from("STOPPED")),
            Some(0.0)
        );
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("\"jdbc/app\""), "jdbc/app");
        assert_eq!(sanitize("a\\\"b"), "ab");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn test_label_values() {
        let name = ObjectName::parse("tomcat.jdbc:type=ConnectionPool,name=\"jdbc/app\"").unwrap();
        assert_eq!(spec().label_values(&name), vec!["jdbc/app".to_string(), String::new()]);

        let name = ObjectName::parse(
            "tomcat.jdbc:type=ConnectionPool,name=\"jdbc/app\",context=/shop",
        )
        .unwrap();
        assert_eq!(
            spec().label_values(&name),
            vec!["jdbc/app".to_string(), "/shop".to_string()]
        );
    }

    #[test]
    fn test_metric_name() {
        assert_eq!(metric_name("tomcat", "threads_total"), "tomcat_threads_total");
        assert_eq!(metric_name("", "threads_total"), "threads_total");
    }

    #[test]
    fn test_publish_pass_clears_and_skips_unknown() {
        let registry = Registry::new();
        let mut pass = PassSamples::default();
        let mut samples = SampleSet::new();
        samples.set(vec!["a".into(), "".into()], 3.0);
        pass.by_metric.insert("threads_total", samples);

        let out = publish_pass(&registry, "tomcat", &[THREADS], &["pool", "context"], pass);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value(&["a", ""]), Some(3.0));

        let out = publish_pass(
            &registry,
            "tomcat",
            &[THREADS],
            &["pool", "context"],
            PassSamples::default(),
        );
        assert!(out.is_empty());
        assert!(registry.get("tomcat_threads_total").unwrap().is_empty());

        let other = MetricDef::gauge("never_seen", "Never");
        publish_pass(&registry, "tomcat", &[other], &[], PassSamples::default());
        assert!(registry.get("tomcat_never_seen").is_none());
    }
}
