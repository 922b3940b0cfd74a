//! Prometheus Exposition Format output
//!
//! This module handles formatting of family snapshots into the text
//! exposition format (version 0.0.4).
//!
//! # Format Specification
//!
//! ```text
//! # HELP <metric_name> <help_text>
//! # TYPE <metric_name> <type>
//! <metric_name>{<label1>="<value1>",<label2>="<value2>"} <value>
//! ```

use std::fmt::Write;

use super::family::{FamilySnapshot, MetricKind, SeriesValue};

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus exposition format formatter
///
/// # Example
///
/// ```ignore
/// use rtomcat_exporter::registry::{PrometheusFormatter, Registry};
///
/// let registry = Registry::new();
/// let output = PrometheusFormatter::new().format(&registry.gather().await);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrometheusFormatter;

impl PrometheusFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self
    }

    /// Format families into Prometheus exposition format
    ///
    /// - HELP and TYPE lines are emitted once per family
    /// - Labels keep the family's label order
    /// - Families without series produce no output
    pub fn format(&self, families: &[FamilySnapshot]) -> String {
        let mut output = String::with_capacity(families.len() * 256);

        for family in families.iter().filter(|f| !f.series.is_empty()) {
            let _ = writeln!(
                output,
                "# HELP {} {}",
                family.name,
                Self::escape_help(&family.help)
            );
            let _ = writeln!(output, "# TYPE {} {}", family.name, family.kind.as_str());

            for series in &family.series {
                match &series.value {
                    SeriesValue::Value(v) => {
                        Self::write_line(
                            &mut output,
                            &family.name,
                            &family.label_names,
                            &series.labels,
                            None,
                            *v,
                        );
                    }
                    SeriesValue::Histogram {
                        buckets,
                        sum,
                        count,
                    } => {
                        debug_assert_eq!(family.kind, MetricKind::Histogram);
                        let bucket_name = format!("{}_bucket", family.name);
                        for (bound, cumulative) in buckets {
                            Self::write_line(
                                &mut output,
                                &bucket_name,
                                &family.label_names,
                                &series.labels,
                                Some(*bound),
                                *cumulative as f64,
                            );
                        }
                        Self::write_line(
                            &mut output,
                            &format!("{}_sum", family.name),
                            &family.label_names,
                            &series.labels,
                            None,
                            *sum,
                        );
                        Self::write_line(
                            &mut output,
                            &format!("{}_count", family.name),
                            &family.label_names,
                            &series.labels,
                            None,
                            *count as f64,
                        );
                    }
                }
            }
        }

        output
    }

    fn write_line(
        output: &mut String,
        name: &str,
        label_names: &[String],
        label_values: &[String],
        le: Option<f64>,
        value: f64,
    ) {
        output.push_str(name);

        if !label_names.is_empty() || le.is_some() {
            output.push('{');
            let mut first = true;
            for (k, v) in label_names.iter().zip(label_values) {
                if !first {
                    output.push(',');
                }
                first = false;
                let _ = write!(output, "{}=\"{}\"", k, Self::escape_label_value(v));
            }
            if let Some(bound) = le {
                if !first {
                    output.push(',');
                }
                let _ = write!(output, "le=\"{}\"", Self::format_value(bound));
            }
            output.push('}');
        }

        output.push(' ');
        output.push_str(&Self::format_value(value));
        output.push('\n');
    }

    /// Format a numeric value for Prometheus
    ///
    /// - NaN → "NaN"
    /// - +Inf → "+Inf"
    /// - -Inf → "-Inf"
    /// - Integers are formatted without decimal point
    /// - Large/small floats use scientific notation
    pub(crate) fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else if value.abs() >= 1e6 || (value.abs() < 1e-3 && value != 0.0) {
            format!("{:e}", value)
        } else {
            format!("{}", value)
        }
    }

    /// Escape help text
    ///
    /// Escapes backslash and newline characters.
    fn escape_help(help: &str) -> String {
        help.replace('\\', "\\\\").replace('\n', "\\n")
    }

    /// Escape label value
    ///
    /// Escapes backslash, double-quote, and newline characters.
    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
