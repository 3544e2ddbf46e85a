//! Gateway configuration: defaults, optional TOML file, command-line overrides.
//!
//! Precedence, lowest first: built-in defaults, the file named by
//! `--config`, then individual flags. The result is immutable once the
//! gateway starts.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Settings consumed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serial port name (e.g. `COM3`, `/dev/ttyUSB0`).
    pub port: String,
    pub baud_rate: u32,
    /// HTTP listen address.
    pub listen_addr: String,
    /// Maximum admitted jobs not yet finished.
    pub queue_size: usize,
    /// Use the in-process simulator instead of a modem.
    pub simulator: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            port: "COM3".into(),
            baud_rate: 115_200,
            listen_addr: "0.0.0.0:8080".into(),
            queue_size: 100,
            simulator: false,
        }
    }
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub listen_addr: Option<String>,
    pub queue_size: Option<usize>,
    pub simulator: bool,
}

impl GatewayConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid gateway configuration")
    }

    /// Load from `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides and check the result.
    pub fn apply(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(baud) = overrides.baud_rate {
            self.baud_rate = baud;
        }
        if let Some(addr) = overrides.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(size) = overrides.queue_size {
            self.queue_size = size;
        }
        self.simulator |= overrides.simulator;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            bail!("queue_size must be at least 1");
        }
        if !self.simulator && self.port.is_empty() {
            bail!("a serial port is required unless the simulator is enabled");
        }
        if self.baud_rate == 0 {
            bail!("baud_rate must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.queue_size, 100);
        assert!(!config.simulator);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GatewayConfig::from_toml("port = \"/dev/ttyUSB0\"\nqueue_size = 5\n").unwrap();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.queue_size, 5);
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(GatewayConfig::from_toml("prot = \"COM4\"").is_err());
    }

    #[test]
    fn overrides_win() {
        let config = GatewayConfig::from_toml("port = \"COM4\"\nbaud_rate = 9600")
            .unwrap()
            .apply(Overrides {
                port: Some("/dev/ttyACM0".into()),
                listen_addr: Some("127.0.0.1:9000".into()),
                simulator: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert!(config.simulator);
    }

    #[test]
    fn zero_queue_size_rejected() {
        let err = GatewayConfig::default()
            .apply(Overrides {
                queue_size: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("queue_size"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = GatewayConfig::load(Some(Path::new("/nonexistent/smsgate.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn no_file_means_defaults() {
        assert_eq!(GatewayConfig::load(None).unwrap(), GatewayConfig::default());
    }
}
