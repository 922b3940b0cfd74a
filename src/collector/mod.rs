//! Tomcat 메트릭 수집 모듈
//!
//! MBean을 패턴으로 찾고, 속성을 읽어 메트릭 패밀리로 변환합니다.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rtomcat_exporter::collector::{GenericCollector, PoolCollector};
//! use rtomcat_exporter::jolokia::JolokiaClient;
//! use rtomcat_exporter::registry::Registry;
//!
//! let server = Arc::new(JolokiaClient::new("http://localhost:8778/jolokia", 5000)?);
//! let registry = Registry::new();
//! registry.register(Arc::new(PoolCollector::new(server.clone(), "tomcat", "Catalina")));
//! registry.register(Arc::new(GenericCollector::new(server, "tomcat", "Catalina")));
//! let families = registry.gather().await;
//! ```

pub mod discovery;
pub mod generic;
pub mod pool;
pub mod resolver;
pub mod table;

use async_trait::async_trait;

use crate::registry::{FamilySnapshot, Registry};

pub use discovery::Discovery;
pub use generic::{runtime_domain, GenericCollector, ServerInfo};
pub use pool::{PoolCollector, POOL_SOURCES};
pub use resolver::{AttributeResolver, ResolvedAttributes};

/// 수집 패스 하나를 수행하는 컬렉터
///
/// 각 패스는 완결된 스냅샷을 반환합니다. 샘플이 없는 패밀리는 결과에
/// 포함되지 않습니다.
#[async_trait]
pub trait Collector: Send + Sync {
    /// 로그용 이름
    fn name(&self) -> &str;

    /// 한 번의 수집 패스
    async fn collect(&self, registry: &Registry) -> Vec<FamilySnapshot>;
}
