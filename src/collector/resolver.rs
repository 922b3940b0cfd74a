//! Version-tolerant attribute resolution
//!
//! Attribute sets differ between server and pool versions. Missing or null
//! attributes are reported as absent instead of failing the whole object, and
//! each absence is logged only once per resolver.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::JmxError;
use crate::jmx::{AttributeValue, MBeanServer, ObjectName};

/// Values of the attributes that were present and non-null
#[derive(Debug, Clone, Default)]
pub struct ResolvedAttributes {
    values: HashMap<String, AttributeValue>,
}

impl ResolvedAttributes {
    /// Value of an attribute, `None` when absent
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reads attribute sets of managed objects
pub struct AttributeResolver {
    server: Arc<dyn MBeanServer>,
    absent: Mutex<HashSet<(String, String)>>,
    unusable: Mutex<HashSet<(String, String)>>,
}

impl AttributeResolver {
    pub fn new(server: Arc<dyn MBeanServer>) -> Self {
        Self {
            server,
            absent: Mutex::new(HashSet::new()),
            unusable: Mutex::new(HashSet::new()),
        }
    }

    /// Read `names` from `id`
    ///
    /// # Errors
    /// `InstanceNotFound` when the object vanished, or a communication error.
    /// The caller skips the object for this pass in both cases.
    pub async fn resolve(
        &self,
        id: &ObjectName,
        names: &[&str],
    ) -> Result<ResolvedAttributes, JmxError> {
        let mut values = self.server.get_attributes(id, names).await?;
        values.retain(|_, v| !v.is_null());

        for name in names.iter().filter(|n| !values.contains_key(**n)) {
            if Self::first_time(&self.absent, id, name) {
                warn!(mbean = %id, attribute = %name, "Attribute not available, skipping");
            }
        }

        Ok(ResolvedAttributes { values })
    }

    /// Log once that a present value could not be converted
    pub fn note_unusable(&self, id: &ObjectName, name: &str, value: &AttributeValue) {
        if Self::first_time(&self.unusable, id, name) {
            warn!(mbean = %id, attribute = %name, value = ?value, "Attribute value is not usable, skipping");
        } else {
            debug!(mbean = %id, attribute = %name, "Attribute value is not usable");
        }
    }

    fn first_time(seen: &Mutex<HashSet<(String, String)>>, id: &ObjectName, name: &str) -> bool {
        seen.lock().insert((id.canonical_name(), name.to_string()))
    }

    /// Number of distinct (object, attribute) absences logged so far
    pub fn absent_count(&self) -> usize {
        self.absent.lock().len()
    }
}
