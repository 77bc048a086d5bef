//! Driver configuration
//!
//! Everything a `SwiftDriver` reads at runtime lives here and is handed to it
//! at construction time. Values can be loaded from YAML and overridden by CLI
//! flags.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_STORAGE_IMAGE: &str = "thiagodasilva/swift-storage:dev-v1";
pub const DEFAULT_PROXY_IMAGE: &str = "thiagodasilva/swift-proxy:dev-v1";
pub const DEFAULT_RING_MASTER_IMAGE: &str = "thiagodasilva/swift_ring_master:dev-v1";
pub const DEFAULT_RING_MINION_IMAGE: &str = "thiagodasilva/swift_ring_minion:dev-v5";

/// Stable address storage nodes use to reach the ring master
pub const DEFAULT_RING_MASTER_CLUSTER_IP: &str = "10.96.0.248";

/// Configuration for the Swift driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Image for storage nodes that do not request one
    pub storage_image: String,
    /// Swift proxy image
    pub proxy_image: String,
    /// Ring master image
    pub ring_master_image: String,
    /// Ring minion sidecar image
    pub ring_minion_image: String,
    /// Fixed cluster IP of the ring master Service (`None` lets the API pick)
    pub ring_master_cluster_ip: Option<String>,
    /// How long to wait for a dependency workload to become available
    pub readiness_timeout_ms: u64,
    /// First readiness poll interval
    pub poll_interval_ms: u64,
    /// Upper bound for the backed-off poll interval
    pub max_poll_interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            storage_image: DEFAULT_STORAGE_IMAGE.to_string(),
            proxy_image: DEFAULT_PROXY_IMAGE.to_string(),
            ring_master_image: DEFAULT_RING_MASTER_IMAGE.to_string(),
            ring_minion_image: DEFAULT_RING_MINION_IMAGE.to_string(),
            ring_master_cluster_ip: Some(DEFAULT_RING_MASTER_CLUSTER_IP.to_string()),
            readiness_timeout_ms: 10 * 60 * 1000, // 10 minutes
            poll_interval_ms: 3_000,
            max_poll_interval_ms: 15_000,
        }
    }
}

impl DriverConfig {
    /// Load configuration from a YAML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the driver cannot work with
    pub fn validate(&self) -> Result<()> {
        let images = [
            ("storage_image", &self.storage_image),
            ("proxy_image", &self.proxy_image),
            ("ring_master_image", &self.ring_master_image),
            ("ring_minion_image", &self.ring_minion_image),
        ];
        for (field, image) in images {
            if image.trim().is_empty() {
                return Err(Error::Configuration(format!("{} must not be empty", field)));
            }
        }

        if self.readiness_timeout_ms == 0 {
            return Err(Error::Configuration(
                "readiness_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Configuration(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(Error::Configuration(format!(
                "max_poll_interval_ms ({}) is below poll_interval_ms ({})",
                self.max_poll_interval_ms, self.poll_interval_ms
            )));
        }

        Ok(())
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    /// Override the readiness timeout
    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Override both poll intervals
    pub fn with_poll_interval(mut self, initial: Duration, max: Duration) -> Self {
        self.poll_interval_ms = initial.as_millis() as u64;
        self.max_poll_interval_ms = max.as_millis() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = DriverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.readiness_timeout(), Duration::from_secs(600));
        assert_eq!(config.storage_image, DEFAULT_STORAGE_IMAGE);
    }

    #[test]
    fn test_from_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "storage_image: registry.local/swift-storage:2.30").unwrap();
        writeln!(file, "readiness_timeout_ms: 120000").unwrap();
        writeln!(file, "ring_master_cluster_ip: null").unwrap();

        let config = DriverConfig::from_file(file.path()).unwrap();

        assert_eq!(config.storage_image, "registry.local/swift-storage:2.30");
        assert_eq!(config.readiness_timeout(), Duration::from_secs(120));
        assert_eq!(config.ring_master_cluster_ip, None);
        assert_eq!(config.proxy_image, DEFAULT_PROXY_IMAGE);
    }

    #[test]
    fn test_from_file_rejects_zero_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "readiness_timeout_ms: 0").unwrap();

        let err = DriverConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_inverted_intervals() {
        let config = DriverConfig::default()
            .with_poll_interval(Duration::from_secs(5), Duration::from_secs(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_image() {
        let config = DriverConfig {
            proxy_image: String::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("proxy_image"));
    }
}
