//! CLI argument parsing for rTomcat-Exporter
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: TOMCAT_EXPORTER_CONFIG)
//! - `--port` / `-p`: Server port (overrides config file, env: TOMCAT_EXPORTER_PORT)
//! - `--bind-address`: Server bind address (env: TOMCAT_EXPORTER_BIND_ADDRESS)
//! - `--metrics-path`: Metrics endpoint path (env: TOMCAT_EXPORTER_METRICS_PATH)
//! - `--jolokia-url`: Jolokia agent URL (env: TOMCAT_EXPORTER_JOLOKIA_URL)
//! - `--jolokia-timeout`: HTTP timeout in milliseconds (env: TOMCAT_EXPORTER_JOLOKIA_TIMEOUT)
//! - `--username`: Jolokia auth username (env: TOMCAT_EXPORTER_USERNAME)
//! - `--password`: Jolokia auth password (env: TOMCAT_EXPORTER_PASSWORD)
//! - `--validate`: Validate configuration without starting server
//! - `--dry-run`: Run one collection pass and print the exposition text
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: TOMCAT_EXPORTER_LOG_LEVEL)
//!
//! # Precedence
//!
//! Configuration values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// rTomcat-Exporter - Tomcat metrics exporter written in Rust
///
/// Collects connection pool, request processor, session and thread pool
/// metrics from Tomcat via Jolokia and exports them in Prometheus format.
#[derive(Parser, Debug)]
#[command(name = "rtomcat-exporter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "TOMCAT_EXPORTER_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "TOMCAT_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "TOMCAT_EXPORTER_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Metrics endpoint path (overrides config file)
    /// Must start with '/' and not conflict with '/' or '/health'
    #[arg(long, value_name = "PATH", env = "TOMCAT_EXPORTER_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Jolokia agent URL (overrides config file)
    #[arg(long, value_name = "URL", env = "TOMCAT_EXPORTER_JOLOKIA_URL")]
    pub jolokia_url: Option<String>,

    /// Jolokia HTTP timeout in milliseconds (overrides config file)
    #[arg(long, value_name = "MS", env = "TOMCAT_EXPORTER_JOLOKIA_TIMEOUT")]
    pub jolokia_timeout: Option<u64>,

    /// Jolokia authentication username (overrides config file)
    #[arg(long, value_name = "USERNAME", env = "TOMCAT_EXPORTER_USERNAME")]
    pub username: Option<String>,

    /// Jolokia authentication password (overrides config file)
    #[arg(long, value_name = "PASSWORD", env = "TOMCAT_EXPORTER_PASSWORD")]
    pub password: Option<String>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Run one collection pass, print the metrics and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "TOMCAT_EXPORTER_LOG_LEVEL"
    )]
    pub log_level: LogLevel,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref bind_address) = self.bind_address {
            config.server.bind_address = bind_address.clone();
        }
        if let Some(ref path) = self.metrics_path {
            config.server.path = path.clone();
        }
        if let Some(ref url) = self.jolokia_url {
            config.jolokia.url = url.clone();
        }
        if let Some(timeout) = self.jolokia_timeout {
            config.jolokia.timeout_ms = timeout;
        }
        if let Some(ref username) = self.username {
            config.jolokia.username = Some(username.clone());
        }
        if let Some(ref password) = self.password {
            config.jolokia.password = Some(password.clone());
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
