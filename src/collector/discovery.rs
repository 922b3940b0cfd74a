//! Managed object discovery
//!
//! Turns a `(domain, type, key filter)` triple into the set of currently
//! registered object names.

use std::sync::Arc;

use tracing::debug;

use crate::error::{DiscoveryError, JmxError};
use crate::jmx::{MBeanServer, ObjectName, ObjectNamePattern};

/// Build the pattern `domain:type=<type_name>,<key_filter>`
pub fn build_pattern(
    domain: &str,
    type_name: &str,
    key_filter: &str,
) -> Result<ObjectNamePattern, JmxError> {
    let mut pattern = format!("{}:type={}", domain, type_name);
    if !key_filter.is_empty() {
        pattern.push(',');
        pattern.push_str(key_filter);
    }
    ObjectNamePattern::parse(&pattern)
}

/// Pattern queries against an [`MBeanServer`]
#[derive(Clone)]
pub struct Discovery {
    server: Arc<dyn MBeanServer>,
}

impl Discovery {
    pub fn new(server: Arc<dyn MBeanServer>) -> Self {
        Self { server }
    }

    /// Find every object matching `domain:type=<type_name>,<key_filter>`
    ///
    /// The pattern is assembled and parsed on every call. An empty result is
    /// not an error.
    pub async fn find(
        &self,
        domain: &str,
        type_name: &str,
        key_filter: &str,
    ) -> Result<Vec<ObjectName>, DiscoveryError> {
        let pattern =
            build_pattern(domain, type_name, key_filter).map_err(DiscoveryError::Configuration)?;
        self.find_pattern(&pattern).await
    }

    /// Find every object matching a pre-parsed pattern
    pub async fn find_pattern(
        &self,
        pattern: &ObjectNamePattern,
    ) -> Result<Vec<ObjectName>, DiscoveryError> {
        let names = self
            .server
            .query_names(pattern)
            .await
            .map_err(DiscoveryError::Jmx)?;
        debug!(pattern = %pattern, found = names.len(), "Discovered managed objects");
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jmx::LocalMBeanServer;

    fn server() -> Arc<LocalMBeanServer> {
        let server = Arc::new(LocalMBeanServer::new());
        for name in [
            "Catalina:type=ThreadPool,name=\"http-nio-8080\"",
            "Catalina:type=ThreadPool,name=\"ajp-nio-8009\"",
            "Catalina:type=ThreadPool,name=\"http-nio-8080\",subType=SocketProperties",
            "Catalina:type=Manager,context=/app,host=localhost",
        ] {
            server.register(ObjectName::parse(name).unwrap(), [("x", 1)]);
        }
        server
    }

    #[test]
    fn test_build_pattern() {
        let pattern = build_pattern("Catalina", "ThreadPool", "name=*").unwrap();
        assert_eq!(pattern.as_str(), "Catalina:type=ThreadPool,name=*");

        let pattern = build_pattern("Catalina", "Server", "").unwrap();
        assert_eq!(pattern.as_str(), "Catalina:type=Server");
    }

    #[tokio::test]
    async fn test_find_exact_key_set() {
        let discovery = Discovery::new(server());
        let names = discovery.find("Catalina", "ThreadPool", "name=*").await.unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.has_key("subType")));
    }

    #[tokio::test]
    async fn test_find_property_list_pattern() {
        let discovery = Discovery::new(server());
        let names = discovery.find("Catalina", "ThreadPool", "*").await.unwrap();
        assert_eq!(names.len(), 3);
    }

    #[tokio::test]
    async fn test_find_empty_is_ok() {
        let discovery = Discovery::new(server());
        let names = discovery
            .find("Catalina", "GlobalRequestProcessor", "name=*")
            .await
            .unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_pattern_is_configuration_error() {
        let discovery = Discovery::new(server());
        let err = discovery
            .find("Catalina", "ThreadPool", "name")
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Configuration(_)));
    }
}
