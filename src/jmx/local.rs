//! In-process MBean registry
//!
//! `LocalMBeanServer` keeps MBeans in memory. It backs the test suites and
//! benchmarks, and lets an embedding application publish its own managed
//! objects without running a Jolokia agent.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::object_name::{ObjectName, ObjectNamePattern};
use super::server::{AttributeList, MBeanServer};
use super::value::AttributeValue;
use crate::error::JmxError;

/// In-memory [`MBeanServer`]
#[derive(Debug, Default)]
pub struct LocalMBeanServer {
    mbeans: RwLock<Vec<(ObjectName, HashMap<String, AttributeValue>)>>,
}

impl LocalMBeanServer {
    /// Create an empty server
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an MBean, replacing any MBean with an equal name
    pub fn register<I, K, V>(&self, name: ObjectName, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let attributes: HashMap<String, AttributeValue> = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut mbeans = self.mbeans.write();
        match mbeans.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = attributes,
            None => mbeans.push((name, attributes)),
        }
    }

    /// Remove an MBean; returns whether it was registered
    pub fn unregister(&self, name: &ObjectName) -> bool {
        let mut mbeans = self.mbeans.write();
        let before = mbeans.len();
        mbeans.retain(|(n, _)| n != name);
        mbeans.len() != before
    }

    /// Set (or add) one attribute of a registered MBean
    pub fn set_attribute(
        &self,
        name: &ObjectName,
        attribute: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<(), JmxError> {
        let mut mbeans = self.mbeans.write();
        let (_, attributes) = mbeans
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| JmxError::InstanceNotFound(name.to_string()))?;
        attributes.insert(attribute.to_string(), value.into());
        Ok(())
    }

    /// Remove one attribute of a registered MBean
    pub fn remove_attribute(&self, name: &ObjectName, attribute: &str) -> Result<(), JmxError> {
        let mut mbeans = self.mbeans.write();
        let (_, attributes) = mbeans
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| JmxError::InstanceNotFound(name.to_string()))?;
        attributes.remove(attribute);
        Ok(())
    }

    /// Number of registered MBeans
    pub fn len(&self) -> usize {
        self.mbeans.read().len()
    }

    /// Whether no MBean is registered
    pub fn is_empty(&self) -> bool {
        self.mbeans.read().is_empty()
    }
}

#[async_trait]
impl MBeanServer for LocalMBeanServer {
    async fn query_names(&self, pattern: &ObjectNamePattern) -> Result<Vec<ObjectName>, JmxError> {
        Ok(self
            .mbeans
            .read()
            .iter()
            .filter(|(name, _)| pattern.matches(name))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn get_attribute(
        &self,
        name: &ObjectName,
        attribute: &str,
    ) -> Result<AttributeValue, JmxError> {
        let mbeans = self.mbeans.read();
        let (_, attributes) = mbeans
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| JmxError::InstanceNotFound(name.to_string()))?;
        attributes
            .get(attribute)
            .cloned()
            .ok_or_else(|| JmxError::AttributeNotFound {
                object: name.to_string(),
                attribute: attribute.to_string(),
            })
    }

    async fn get_attributes(
        &self,
        name: &ObjectName,
        attributes: &[&str],
    ) -> Result<AttributeList, JmxError> {
        let mbeans = self.mbeans.read();
        let (_, values) = mbeans
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| JmxError::InstanceNotFound(name.to_string()))?;
        Ok(attributes
            .iter()
            .filter_map(|a| values.get(*a).map(|v| (a.to_string(), v.clone())))
            .collect())
    }
}
