//! Mock service configuration.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MockServiceConfig {
    /// Address to bind; loopback by default.
    #[serde(default = "default_host")]
    pub host: String,
    /// 0 lets the OS pick an ephemeral port.
    #[serde(default)]
    pub port: u16,
    /// Budget for reaching the listening state.
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    /// How long in-flight handlers may run after stop is requested.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Upper bound for the body of a scoped consumer test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_timeout_ms: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_startup_timeout_ms() -> u64 {
    5000
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

impl Default for MockServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            startup_timeout_ms: default_startup_timeout_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            test_timeout_ms: None,
        }
    }
}

impl MockServiceConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, anyhow::Error> {
        let config: MockServiceConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.host != "localhost" && self.host.parse::<IpAddr>().is_err() {
            anyhow::bail!(
                "Invalid host '{}'. Expected an IP address or 'localhost'",
                self.host
            );
        }
        if self.startup_timeout_ms == 0 {
            anyhow::bail!("startup_timeout_ms must be greater than zero");
        }
        if self.shutdown_grace_ms == 0 {
            anyhow::bail!("shutdown_grace_ms must be greater than zero");
        }
        if self.test_timeout_ms == Some(0) {
            anyhow::bail!("test_timeout_ms must be greater than zero when set");
        }
        Ok(())
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Durations beyond `u64::MAX` milliseconds saturate.
    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn test_timeout(&self) -> Option<Duration> {
        self.test_timeout_ms.map(Duration::from_millis)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MockServiceConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:0");
        assert_eq!(config.startup_timeout(), Duration::from_secs(5));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(2));
        assert_eq!(config.test_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = MockServiceConfig::from_yaml("port: 8089\ntest_timeout_ms: 30000\n").unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8089);
        assert_eq!(config.test_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_validation_errors() {
        let err = MockServiceConfig::from_yaml("host: not a host\n").unwrap_err();
        assert!(err.to_string().contains("Invalid host"));

        let err = MockServiceConfig::from_yaml("startup_timeout_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("startup_timeout_ms"));

        let config = MockServiceConfig {
            test_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_test_timeout_saturates() {
        let config = MockServiceConfig::default().with_test_timeout(Duration::from_millis(1500));
        assert_eq!(config.test_timeout_ms, Some(1500));

        let config = MockServiceConfig::default().with_test_timeout(Duration::MAX);
        assert_eq!(config.test_timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: 0.0.0.0\nshutdown_grace_ms: 100").unwrap();
        let config = MockServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.shutdown_grace(), Duration::from_millis(100));
    }
}
