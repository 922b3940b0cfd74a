//! Managed-object model
//!
//! Object names, name patterns, attribute values and the [`MBeanServer`]
//! trait through which collectors reach a running server's MBeans.

mod local;
mod object_name;
mod server;
mod value;

pub use local::LocalMBeanServer;
pub use object_name::{ObjectName, ObjectNamePattern};
pub use server::{AttributeList, MBeanServer};
pub use value::AttributeValue;
