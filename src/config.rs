//! Configuration loading
//!
//! Reads the TOML configuration file. Every section and key is optional and
//! falls back to the defaults in `drone_shared::limits`.

use anyhow::{ensure, Context, Result};
use drone_shared::limits;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub discovery: DiscoveryConfig,
    pub proxy: ProxyConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

/// Background scheduler settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    pub grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: limits::SCHEDULER_POLL_INTERVAL_SECS,
            grace_secs: limits::SCHEDULER_GRACE_SECS,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

/// LAN discovery settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub port: u16,
    pub probe_timeout_ms: u64,
    pub max_concurrent: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: limits::STATUS_PORT,
            probe_timeout_ms: limits::PROBE_TIMEOUT_MS,
            max_concurrent: limits::PROBE_MAX_CONCURRENT,
        }
    }
}

/// Remote status proxy settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub status_port: u16,
    pub timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            status_port: limits::STATUS_PORT,
            timeout_ms: limits::REMOTE_STATUS_TIMEOUT_MS,
        }
    }
}

/// Local persistence settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_file: PathBuf,
    pub capture_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("drone.json"),
            capture_dir: PathBuf::from("static/uploads"),
        }
    }
}

/// Status endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: String,
    /// Deadline for a client to deliver a complete request
    pub read_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{}", limits::STATUS_PORT),
            read_timeout_ms: limits::REQUEST_READ_TIMEOUT_MS,
        }
    }
}

impl ApiConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents).context("parse config toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.scheduler.poll_interval_secs > 0,
            "scheduler.poll_interval_secs must be greater than 0"
        );

        ensure!(
            self.discovery.probe_timeout_ms > 0 && self.discovery.probe_timeout_ms <= 10_000,
            "discovery.probe_timeout_ms must be between 1 and 10000"
        );
        ensure!(
            (1..=254).contains(&self.discovery.max_concurrent),
            "discovery.max_concurrent must be between 1 and 254"
        );
        ensure!(self.discovery.port > 0, "discovery.port cannot be 0");

        ensure!(
            self.proxy.timeout_ms > 0 && self.proxy.timeout_ms <= 60_000,
            "proxy.timeout_ms must be between 1 and 60000"
        );
        ensure!(self.proxy.status_port > 0, "proxy.status_port cannot be 0");

        ensure!(
            !self.storage.data_file.as_os_str().is_empty(),
            "storage.data_file cannot be empty"
        );
        ensure!(
            !self.storage.capture_dir.as_os_str().is_empty(),
            "storage.capture_dir cannot be empty"
        );
        ensure!(!self.api.bind.is_empty(), "api.bind cannot be empty");
        ensure!(
            self.api.read_timeout_ms > 0 && self.api.read_timeout_ms <= 60_000,
            "api.read_timeout_ms must be between 1 and 60000"
        );

        Ok(())
    }
}
