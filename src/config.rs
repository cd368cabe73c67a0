use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Event buffer with retention pruning", long_about = None)]
pub struct AppConfig {
    /// Primary API bind address
    #[arg(long, env = "ADDR", default_value = ":5566")]
    pub addr: String,

    /// Prometheus metrics bind address
    #[arg(long, env = "METRICS_ADDR", default_value = ":3000")]
    pub metrics_addr: String,

    /// Internal API bind address (`/dump`)
    #[arg(long, env = "INTERNAL_ADDR", default_value = ":5000")]
    pub internal_addr: String,

    /// Path of the persisted store state
    #[arg(long, env = "STATE_FILE", default_value = "state")]
    pub state_file: PathBuf,

    /// Events older than this are pruned (e.g. `2h`, `90m`)
    #[arg(long, env = "RETENTION_PERIOD", default_value = "2h", value_parser = humantime::parse_duration)]
    pub retention_period: Duration,

    /// Interval between prune runs
    #[arg(long, env = "PRUNE_FREQUENCY", default_value = "5m", value_parser = humantime::parse_duration)]
    pub prune_frequency: Duration,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("prune frequency must be greater than zero")]
    ZeroPruneFrequency,

    #[error("state file path is empty")]
    EmptyStateFile,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prune_frequency.is_zero() {
            return Err(ConfigError::ZeroPruneFrequency);
        }
        if self.state_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStateFile);
        }
        Ok(())
    }

    pub fn api_addr(&self) -> String {
        listen_addr(&self.addr)
    }

    pub fn metrics_listen_addr(&self) -> String {
        listen_addr(&self.metrics_addr)
    }

    pub fn internal_listen_addr(&self) -> String {
        listen_addr(&self.internal_addr)
    }
}

/// `:port` means every interface.
pub fn listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}
