//! Server configuration

use crate::cli::Cli;
use crate::transport::DEFAULT_OUTBOUND_CAPACITY;
use chatrelay_core::{Error, MAX_HISTORY};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Runtime configuration for one chatrelay instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Listen address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared Redis server; runs single-instance in memory when absent
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Bus channel every instance publishes to and subscribes on
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Prefix for every key written to the coordination store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// History entries kept per room
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Events buffered per connection before further ones are dropped
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl RelayConfig {
    /// Load configuration from file and CLI/environment overrides
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match cli.config.as_deref() {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path)?;
                serde_yaml::from_str(&content)?
            }
            Some(path) => anyhow::bail!("configuration file {} not found", path),
            None => Self::default(),
        };

        if let Some(host) = &cli.host {
            config.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(redis_url) = &cli.redis_url {
            config.redis_url = Some(redis_url.clone());
        }
        if let Some(channel) = &cli.channel {
            config.channel = channel.clone();
        }
        if let Some(key_prefix) = &cli.key_prefix {
            config.key_prefix = key_prefix.clone();
        }
        if let Some(max_history) = cli.max_history {
            config.max_history = max_history;
        }
        if let Some(outbound_buffer) = cli.outbound_buffer {
            config.outbound_buffer = outbound_buffer;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot start with
    pub fn validate(&self) -> chatrelay_core::Result<()> {
        if self.channel.trim().is_empty() {
            return Err(Error::config("bus channel must not be empty"));
        }
        if self.key_prefix.trim().is_empty() {
            return Err(Error::config("key prefix must not be empty"));
        }
        if self.max_history == 0 {
            return Err(Error::config("max_history must be at least 1"));
        }
        if self.outbound_buffer == 0 {
            return Err(Error::config("outbound_buffer must be at least 1"));
        }
        if let Some(url) = &self.redis_url {
            if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                return Err(Error::config(
                    "redis url must start with redis:// or rediss://",
                ));
            }
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> chatrelay_core::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::config(format!("invalid listen address: {e}")))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            redis_url: None,
            channel: default_channel(),
            key_prefix: default_key_prefix(),
            max_history: default_max_history(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_channel() -> String {
    "chat-events".to_string()
}

fn default_key_prefix() -> String {
    "chat".to_string()
}

fn default_max_history() -> usize {
    MAX_HISTORY
}

fn default_outbound_buffer() -> usize {
    DEFAULT_OUTBOUND_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = RelayConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_history, 50);
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = RelayConfig::default();
        config.channel = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.max_history = 0;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.redis_url = Some("http://localhost:6379".to_string());
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.outbound_buffer = 0;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.host = "not an address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_then_cli_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port: 4000\nchannel: from-file\nmax_history: 20\noutbound_buffer: 64"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from(["chatrelay", "--config", &path, "--channel", "from-cli"]);
        let config = RelayConfig::load(&cli).unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.channel, "from-cli");
        assert_eq!(config.max_history, 20);
        assert_eq!(config.outbound_buffer, 64);
        assert_eq!(config.key_prefix, "chat");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["chatrelay", "--config", "/nonexistent/chatrelay.yaml"]);
        assert!(RelayConfig::load(&cli).is_err());
    }
}
