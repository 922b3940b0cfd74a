//! The managed-object query interface consumed by the collectors

use std::collections::HashMap;

use async_trait::async_trait;

use super::object_name::{ObjectName, ObjectNamePattern};
use super::value::AttributeValue;
use crate::error::JmxError;

/// Attribute name to value map returned by bulk reads
///
/// Attributes that could not be read are simply missing from the map.
pub type AttributeList = HashMap<String, AttributeValue>;

/// Read access to a server's registered MBeans
///
/// Implementations report failures as typed [`JmxError`]s so callers can tell
/// a vanished object (`InstanceNotFound`) and a missing attribute
/// (`AttributeNotFound`) apart from communication failures.
#[async_trait]
pub trait MBeanServer: Send + Sync {
    /// Names of all registered MBeans matching the pattern
    async fn query_names(&self, pattern: &ObjectNamePattern) -> Result<Vec<ObjectName>, JmxError>;

    /// Read a single attribute
    async fn get_attribute(
        &self,
        name: &ObjectName,
        attribute: &str,
    ) -> Result<AttributeValue, JmxError>;

    /// Read several attributes in one call
    ///
    /// The default implementation issues one `get_attribute` per name and
    /// leaves out attributes the MBean does not have.
    async fn get_attributes(
        &self,
        name: &ObjectName,
        attributes: &[&str],
    ) -> Result<AttributeList, JmxError> {
        let mut values = AttributeList::with_capacity(attributes.len());
        for attribute in attributes {
            match self.get_attribute(name, attribute).await {
                Ok(value) => {
                    values.insert(attribute.to_string(), value);
                }
                Err(e) if e.is_attribute_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }
}
