//! Connection pool metrics
//!
//! Every supported pool implementation is one [`SourceSpec`] in
//! [`POOL_SOURCES`]; all of them feed the same canonical families so a
//! dashboard does not need to know which pool a context uses.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::discovery::Discovery;
use super::resolver::AttributeResolver;
use super::table::{
    collect_source, publish_pass, AttributeSpec, LabelSource, MetricDef, PassSamples,
    SourceDomain, SourceSpec,
};
use super::Collector;
use crate::jmx::MBeanServer;
use crate::registry::{FamilySnapshot, Registry};

const CONNECTIONS_MAX: MetricDef = MetricDef::gauge(
    "pool_connections_max",
    "Maximum number of active connections that can be allocated from this pool at the same time",
);
const CONNECTIONS_ACTIVE: MetricDef = MetricDef::gauge(
    "pool_connections_active_total",
    "Number of active connections allocated from this pool",
);
const CONNECTIONS_IDLE: MetricDef = MetricDef::gauge(
    "pool_connections_idle_total",
    "Number of idle connections in this pool",
);
const CONNECTIONS_IDLE_MAX: MetricDef = MetricDef::gauge(
    "pool_connections_idle_max",
    "Maximum number of connections that can remain idle in this pool",
);
const CONNECTIONS_IDLE_MIN: MetricDef = MetricDef::gauge(
    "pool_connections_idle_min",
    "Minimum number of connections kept idle in this pool",
);
const CONNECTIONS_TOTAL: MetricDef = MetricDef::gauge(
    "pool_connections_total",
    "Number of connections in this pool (idle + active)",
);
const WAITING_THREADS: MetricDef = MetricDef::gauge(
    "pool_waitingthreads_total",
    "Number of threads waiting for connections from this pool",
);
const BORROWED: MetricDef = MetricDef::counter(
    "pool_connections_borrowed_total",
    "Number of connections borrowed from this pool",
);
const RETURNED: MetricDef = MetricDef::counter(
    "pool_connections_returned_total",
    "Number of connections returned to this pool",
);
const CREATED: MetricDef = MetricDef::counter(
    "pool_connections_created_total",
    "Number of connections created by this pool",
);
const RELEASED: MetricDef = MetricDef::counter(
    "pool_connections_released_total",
    "Number of connections released by this pool",
);
const RECONNECTED: MetricDef = MetricDef::counter(
    "pool_connections_reconnected_total",
    "Number of reconnects by this pool",
);
const REMOVE_ABANDONED: MetricDef = MetricDef::counter(
    "pool_connections_removeabandoned_total",
    "Number of abandoned connections removed from this pool",
);
const RELEASED_IDLE: MetricDef = MetricDef::counter(
    "pool_connections_releasedidle_total",
    "Number of idle connections released by this pool",
);

/// Labels of every pool family
pub const POOL_LABELS: &[LabelSource] = &[
    LabelSource {
        label: "pool",
        key: "name",
    },
    LabelSource {
        label: "context",
        key: "context",
    },
];

/// Supported pool implementations
pub const POOL_SOURCES: &[SourceSpec] = &[
    SourceSpec {
        tag: "tomcat-jdbc",
        domain: SourceDomain::Fixed("tomcat.jdbc"),
        type_name: "ConnectionPool",
        key_filter: "class=org.apache.tomcat.jdbc.pool.DataSource,*",
        // pooled connections register themselves under the pool's name
        exclude_key: Some("connections"),
        labels: POOL_LABELS,
        attributes: &[
            AttributeSpec::number("MaxActive", CONNECTIONS_MAX),
            AttributeSpec::number("Active", CONNECTIONS_ACTIVE),
            AttributeSpec::number("Idle", CONNECTIONS_IDLE),
            AttributeSpec::number("MaxIdle", CONNECTIONS_IDLE_MAX),
            AttributeSpec::number("MinIdle", CONNECTIONS_IDLE_MIN),
            AttributeSpec::number("Size", CONNECTIONS_TOTAL),
            AttributeSpec::number("WaitCount", WAITING_THREADS),
            AttributeSpec::number("BorrowedCount", BORROWED),
            AttributeSpec::number("ReturnedCount", RETURNED),
            AttributeSpec::number("CreatedCount", CREATED),
            AttributeSpec::number("ReleasedCount", RELEASED),
            AttributeSpec::number("ReconnectedCount", RECONNECTED),
            AttributeSpec::number("RemoveAbandonedCount", REMOVE_ABANDONED),
            AttributeSpec::number("ReleasedIdleCount", RELEASED_IDLE),
        ],
    },
    SourceSpec {
        tag: "dbcp2",
        domain: SourceDomain::Runtime,
        type_name: "DataSource",
        key_filter: "class=javax.sql.DataSource,*",
        exclude_key: Some("connectionpool"),
        labels: POOL_LABELS,
        attributes: &[
            AttributeSpec::number("maxTotal", CONNECTIONS_MAX),
            AttributeSpec::number("numActive", CONNECTIONS_ACTIVE),
            AttributeSpec::number("numIdle", CONNECTIONS_IDLE),
            AttributeSpec::number("maxIdle", CONNECTIONS_IDLE_MAX),
            AttributeSpec::number("minIdle", CONNECTIONS_IDLE_MIN),
        ],
    },
];

/// Connection pool collector
pub struct PoolCollector {
    discovery: Discovery,
    resolver: AttributeResolver,
    namespace: String,
    runtime_domain: String,
    sources: &'static [SourceSpec],
}

impl PoolCollector {
    /// Collector over [`POOL_SOURCES`]
    pub fn new(server: Arc<dyn MBeanServer>, namespace: &str, runtime_domain: &str) -> Self {
        Self::with_sources(server, namespace, runtime_domain, POOL_SOURCES)
    }

    /// Collector over a custom source table
    pub fn with_sources(
        server: Arc<dyn MBeanServer>,
        namespace: &str,
        runtime_domain: &str,
        sources: &'static [SourceSpec],
    ) -> Self {
        Self {
            discovery: Discovery::new(Arc::clone(&server)),
            resolver: AttributeResolver::new(server),
            namespace: namespace.to_string(),
            runtime_domain: runtime_domain.to_string(),
            sources,
        }
    }

    fn metrics(&self) -> Vec<MetricDef> {
        let mut metrics: Vec<MetricDef> = Vec::new();
        for source in self.sources {
            for def in source.metrics() {
                if !metrics.iter().any(|m| m.suffix == def.suffix) {
                    metrics.push(def);
                }
            }
        }
        metrics
    }
}

#[async_trait]
impl Collector for PoolCollector {
    fn name(&self) -> &str {
        "pool"
    }

    #[instrument(skip_all, name = "pool_collect")]
    async fn collect(&self, registry: &Registry) -> Vec<FamilySnapshot> {
        let mut pass = PassSamples::default();

        for source in self.sources {
            match collect_source(&self.discovery, &self.resolver, source, &self.runtime_domain)
                .await
            {
                Ok(samples) => {
                    debug!(source = source.tag, objects = samples.objects, "Collected pool source");
                    pass.merge(samples);
                }
                Err(e) => {
                    warn!(source = source.tag, error = %e, "Pool source skipped for this pass");
                }
            }
        }

        let label_names: Vec<&str> = POOL_LABELS.iter().map(|l| l.label).collect();
        publish_pass(registry, &self.namespace, &self.metrics(), &label_names, pass)
    }
}
