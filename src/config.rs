//! Configuration management for rTomcat-Exporter
//!
//! Handles loading and validating configuration from YAML files.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::collector::discovery::build_pattern;
use crate::collector::runtime_domain;

static NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("namespace regex is valid")
});

/// Paths the server reserves for itself
const RESERVED_PATHS: &[&str] = &["/", "/health"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Jolokia endpoint configuration
    #[serde(default)]
    pub jolokia: JolokiaConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// What to export and under which names
    #[serde(default)]
    pub exporter: ExporterConfig,
}

/// Jolokia endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JolokiaConfig {
    /// Jolokia endpoint URL
    #[serde(default = "default_jolokia_url")]
    pub url: String,

    /// Optional username for basic auth
    pub username: Option<String>,

    /// Optional password for basic auth
    pub password: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Exported metric selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Metric name prefix; empty for bare names
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Embedded server (runtime domain `Tomcat` instead of `Catalina`)
    #[serde(default)]
    pub embedded: bool,

    /// Explicit runtime domain, overrides `embedded`
    #[serde(default)]
    pub domain: Option<String>,

    /// Export request processor, session, thread pool and version metrics
    #[serde(default = "default_true")]
    pub generic: bool,

    /// Export connection pool metrics
    #[serde(default = "default_true")]
    pub pools: bool,

    /// Fixed version info instead of reading it from the server
    #[serde(default)]
    pub server_info: Option<ServerInfoConfig>,
}

/// Version info labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfoConfig {
    pub version: String,
    #[serde(default)]
    pub build: String,
}

// Default value functions
fn default_jolokia_url() -> String {
    "http://localhost:8778/jolokia".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_namespace() -> String {
    "tomcat".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for JolokiaConfig {
    fn default() -> Self {
        Self {
            url: default_jolokia_url(),
            username: None,
            password: None,
            timeout_ms: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_metrics_path(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            embedded: false,
            domain: None,
            generic: true,
            pools: true,
            server_info: None,
        }
    }
}

impl ExporterConfig {
    /// Domain of the server's own MBeans
    pub fn runtime_domain(&self) -> &str {
        self.domain
            .as_deref()
            .unwrap_or_else(|| runtime_domain(self.embedded))
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    /// - Does not validate; call `validate()` once CLI overrides are applied
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    ///
    /// Use this for optional configuration files (e.g., when running without explicit config)
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Metrics path must start with '/'".to_string(),
            ));
        }

        if RESERVED_PATHS.contains(&self.server.path.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Metrics path '{}' is reserved",
                self.server.path
            )));
        }

        let url = url::Url::parse(&self.jolokia.url).map_err(|e| {
            ConfigError::ValidationError(format!("Invalid Jolokia URL '{}': {}", self.jolokia.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "Jolokia URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.jolokia.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Jolokia timeout must be greater than 0".to_string(),
            ));
        }

        let namespace = &self.exporter.namespace;
        if !namespace.is_empty() && !NAMESPACE_RE.is_match(namespace) {
            return Err(ConfigError::ValidationError(format!(
                "Namespace '{}' is not a valid metric name prefix",
                namespace
            )));
        }

        build_pattern(self.exporter.runtime_domain(), "Server", "").map_err(|e| {
            ConfigError::ValidationError(format!("Invalid runtime domain: {}", e))
        })?;

        Ok(())
    }
}
