//! Jolokia 기반 MBean 접근 모듈
//!
//! Jolokia REST API를 통해 원격 JVM의 MBean을 조회합니다.

pub mod client;
pub mod parser;

pub use client::JolokiaClient;
pub use parser::{JolokiaResponse, JolokiaResult};
