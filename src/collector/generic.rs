//! Server runtime metrics
//!
//! Request processors, session managers and connector thread pools, plus a
//! static version info series. Each group is collected on its own; a failing
//! group leaves its families out of the pass without affecting the others.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tracing::{debug, instrument, warn};

use super::discovery::build_pattern;
use super::discovery::Discovery;
use super::resolver::AttributeResolver;
use super::table::{
    collect_source, metric_name, publish_pass, AttributeSpec, LabelSource, MetricDef,
    PassSamples, SourceDomain, SourceSpec,
};
use super::Collector;
use crate::config::ServerInfoConfig;
use crate::jmx::MBeanServer;
use crate::registry::{FamilySnapshot, MetricKind, Registry, SampleSet};

const NAME_LABEL: &[LabelSource] = &[LabelSource {
    label: "name",
    key: "name",
}];

const MANAGER_LABELS: &[LabelSource] = &[
    LabelSource {
        label: "host",
        key: "host",
    },
    LabelSource {
        label: "context",
        key: "context",
    },
];

/// Runtime groups, in collection order
pub const RUNTIME_SOURCES: &[SourceSpec] = &[
    SourceSpec {
        tag: "session",
        domain: SourceDomain::Runtime,
        type_name: "Manager",
        key_filter: "context=*,host=*",
        exclude_key: None,
        labels: MANAGER_LABELS,
        attributes: &[
            AttributeSpec::number(
                "activeSessions",
                MetricDef::gauge("session_active_total", "Number of active sessions"),
            ),
            AttributeSpec::number(
                "maxActive",
                MetricDef::gauge(
                    "session_active_max",
                    "Maximum number of active sessions so far",
                ),
            ),
            AttributeSpec::number(
                "rejectedSessions",
                MetricDef::gauge(
                    "session_rejected_total",
                    "Number of sessions rejected due to maxActive being reached",
                ),
            ),
            AttributeSpec::number(
                "sessionCounter",
                MetricDef::gauge("session_created_total", "Number of sessions created"),
            ),
            AttributeSpec::number(
                "expiredSessions",
                MetricDef::gauge("session_expired_total", "Number of sessions that expired"),
            ),
            AttributeSpec::number(
                "sessionAverageAliveTime",
                MetricDef::gauge(
                    "session_alivetime_seconds_avg",
                    "Average time an expired session had been alive",
                ),
            ),
            AttributeSpec::number(
                "sessionMaxAliveTime",
                MetricDef::gauge(
                    "session_alivetime_seconds_max",
                    "Maximum time an expired session had been alive",
                ),
            ),
            AttributeSpec::equals(
                "stateName",
                MetricDef::gauge(
                    "context_state_started",
                    "Indication if the lifecycle state of this context is STARTED",
                ),
                "STARTED",
            ),
        ],
    },
    SourceSpec {
        tag: "threadpool",
        domain: SourceDomain::Runtime,
        type_name: "ThreadPool",
        key_filter: "name=*",
        exclude_key: None,
        labels: NAME_LABEL,
        attributes: &[
            AttributeSpec::number(
                "currentThreadCount",
                MetricDef::gauge("threads_total", "Number threads in this pool"),
            ),
            AttributeSpec::number(
                "currentThreadsBusy",
                MetricDef::gauge("threads_active_total", "Number of active threads in this pool"),
            ),
            AttributeSpec::number(
                "maxThreads",
                MetricDef::gauge("threads_max", "Maximum number of threads allowed in this pool"),
            ),
            AttributeSpec::number(
                "connectionCount",
                MetricDef::gauge(
                    "connections_active_total",
                    "Number of connections served by this pool",
                ),
            ),
            AttributeSpec::number(
                "maxConnections",
                MetricDef::gauge(
                    "connections_active_max",
                    "Maximum number of concurrent connections served by this pool",
                ),
            ),
        ],
    },
    SourceSpec {
        tag: "requestprocessor",
        domain: SourceDomain::Runtime,
        type_name: "GlobalRequestProcessor",
        key_filter: "name=*",
        exclude_key: None,
        labels: NAME_LABEL,
        attributes: &[
            AttributeSpec::number(
                "bytesReceived",
                MetricDef::gauge(
                    "requestprocessor_received_bytes",
                    "Number of bytes received by this request processor",
                ),
            ),
            AttributeSpec::number(
                "bytesSent",
                MetricDef::gauge(
                    "requestprocessor_sent_bytes",
                    "Number of bytes sent by this request processor",
                ),
            ),
            AttributeSpec::millis(
                "processingTime",
                MetricDef::gauge(
                    "requestprocessor_time_seconds",
                    "The total time spend by this request processor",
                ),
            ),
            AttributeSpec::millis(
                "maxTime",
                MetricDef::gauge(
                    "requestprocessor_time_max_seconds",
                    "The longest request processed by this request processor",
                ),
            ),
            AttributeSpec::number(
                "errorCount",
                MetricDef::counter(
                    "requestprocessor_error_count_total",
                    "The number of error request served by this request processor",
                ),
            ),
            AttributeSpec::number(
                "requestCount",
                MetricDef::counter(
                    "requestprocessor_request_count_total",
                    "The number of request served by this request processor",
                ),
            ),
        ],
    },
];

const INFO: MetricDef = MetricDef::gauge("info", "tomcat version info");
const INFO_LABELS: &[&str] = &["version", "build"];

/// Server version and build date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub version: String,
    pub build: String,
}

impl From<&ServerInfoConfig> for ServerInfo {
    fn from(config: &ServerInfoConfig) -> Self {
        Self {
            version: config.version.clone(),
            build: config.build.clone(),
        }
    }
}

/// Runtime domain for a standalone or embedded server
pub fn runtime_domain(embedded: bool) -> &'static str {
    if embedded {
        "Tomcat"
    } else {
        "Catalina"
    }
}

/// Request processor, session, thread pool and version info collector
pub struct GenericCollector {
    discovery: Discovery,
    resolver: AttributeResolver,
    namespace: String,
    runtime_domain: String,
    info: OnceCell<ServerInfo>,
}

impl GenericCollector {
    pub fn new(server: Arc<dyn MBeanServer>, namespace: &str, runtime_domain: &str) -> Self {
        Self {
            discovery: Discovery::new(Arc::clone(&server)),
            resolver: AttributeResolver::new(server),
            namespace: namespace.to_string(),
            runtime_domain: runtime_domain.to_string(),
            info: OnceCell::new(),
        }
    }

    /// Use fixed version info instead of reading it from the server
    pub fn with_server_info(self, info: ServerInfo) -> Self {
        let _ = self.info.set(info);
        self
    }

    /// Version info, read once from `<domain>:type=Server`
    async fn server_info(&self) -> Option<&ServerInfo> {
        if let Some(info) = self.info.get() {
            return Some(info);
        }

        let pattern = match build_pattern(&self.runtime_domain, "Server", "") {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(error = %e, "Invalid server info pattern");
                return None;
            }
        };
        let name = match self.discovery.find_pattern(&pattern).await {
            Ok(names) => names.into_iter().next()?,
            Err(e) => {
                warn!(error = %e, "Failed to look up server info");
                return None;
            }
        };

        let resolved = match self
            .resolver
            .resolve(&name, &["serverNumber", "serverBuilt"])
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(mbean = %name, error = %e, "Failed to read server info");
                return None;
            }
        };

        let version = resolved.get("serverNumber").and_then(|v| v.as_string())?;
        let build = resolved
            .get("serverBuilt")
            .and_then(|v| v.as_string())
            .unwrap_or_default();

        debug!(version = %version, build = %build, "Resolved server info");
        Some(self.info.get_or_init(|| ServerInfo { version, build }))
    }

    async fn collect_info(&self, registry: &Registry) -> Option<FamilySnapshot> {
        let info = self.server_info().await?;

        let family = registry.family(
            &metric_name(&self.namespace, INFO.suffix),
            INFO.help,
            MetricKind::Gauge,
            INFO_LABELS,
        );
        let mut samples = SampleSet::new();
        samples.set(vec![info.version.clone(), info.build.clone()], 1.0);
        if let Err(e) = family.publish(samples) {
            e.report();
            return None;
        }
        Some(family.snapshot())
    }
}

#[async_trait]
impl Collector for GenericCollector {
    fn name(&self) -> &str {
        "generic"
    }

    #[instrument(skip_all, name = "generic_collect")]
    async fn collect(&self, registry: &Registry) -> Vec<FamilySnapshot> {
        let mut families = Vec::new();

        for source in RUNTIME_SOURCES {
            let pass =
                match collect_source(&self.discovery, &self.resolver, source, &self.runtime_domain)
                    .await
                {
                    Ok(pass) => pass,
                    Err(e) => {
                        warn!(source = source.tag, error = %e, "Runtime group skipped for this pass");
                        PassSamples::default()
                    }
                };
            debug!(source = source.tag, objects = pass.objects, "Collected runtime group");
            families.extend(publish_pass(
                registry,
                &self.namespace,
                &source.metrics(),
                &source.label_names(),
                pass,
            ));
        }

        families.extend(self.collect_info(registry).await);
        families
    }
}
