//! Configuration types for chains and their metrics endpoint.
//!
//! Configs are YAML. Environment variables referenced in the text are
//! substituted before parsing (see [`interpolate`]).

mod env;

pub use env::{Interpolated, interpolate};

use std::net::SocketAddr;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::debug;

use crate::error::{
    ConfigError, InterpolationSnafu, MetricsAddressSnafu, ReadFileSnafu, YamlParseSnafu,
    ZeroSlackSnafu,
};
use crate::metrics::DEFAULT_METRICS_ADDR;
use crate::operator::CHAN_SLACK;

/// Settings shared by every chain kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Name used in logs and metric labels (default: "chain").
    #[serde(default = "default_chain_name")]
    pub name: String,
    /// Capacity of every inter-operator channel (default: 100).
    #[serde(default = "default_chan_slack")]
    pub chan_slack: usize,
    /// Build an order-preserving chain.
    #[serde(default)]
    pub ordered: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: default_chain_name(),
            chan_slack: default_chan_slack(),
            ordered: false,
        }
    }
}

impl ChainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.chan_slack > 0,
            ZeroSlackSnafu {
                chain: self.name.as_str()
            }
        );
        Ok(())
    }
}

fn default_chain_name() -> String {
    "chain".to_string()
}

fn default_chan_slack() -> usize {
    CHAN_SLACK
}

/// Metrics configuration for the Prometheus endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: default_metrics_address(),
            enabled: false,
        }
    }
}

impl MetricsConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address.parse().context(MetricsAddressSnafu {
            address: self.address.as_str(),
        })
    }
}

fn default_metrics_address() -> String {
    DEFAULT_METRICS_ADDR.to_string()
}

/// Interpolate environment variables in `text` and deserialize the result.
pub fn parse_yaml<C: DeserializeOwned>(text: &str) -> Result<C, ConfigError> {
    let interpolated = interpolate(text);
    ensure!(
        interpolated.is_ok(),
        InterpolationSnafu {
            errors: interpolated.errors
        }
    );
    serde_yaml::from_str(&interpolated.text).context(YamlParseSnafu)
}

/// Read a YAML config file.
pub fn load_yaml<C: DeserializeOwned>(path: &Path) -> Result<C, ConfigError> {
    debug!(path = %path.display(), "Loading config");
    let text = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    parse_yaml(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_chain_config_defaults() {
        let config: ChainConfig = parse_yaml("{}").unwrap();
        assert_eq!(config, ChainConfig::default());
        assert_eq!(config.chan_slack, 100);
        assert!(!config.ordered);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chain_config_zero_slack_is_invalid() {
        let config: ChainConfig = parse_yaml("name: ingest\nchan_slack: 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSlack { ref chain } if chain == "ingest"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<ChainConfig, _> = parse_yaml("slack: 10\n");
        assert!(matches!(result, Err(ConfigError::YamlParse { .. })));
    }

    #[test]
    fn test_metrics_address() {
        let config = MetricsConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 9090);

        let bad = MetricsConfig {
            address: "not-an-address".to_string(),
            enabled: true,
        };
        assert!(matches!(
            bad.socket_addr(),
            Err(ConfigError::MetricsAddress { .. })
        ));
    }

    #[test]
    fn test_load_yaml_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: from-file\nordered: true").unwrap();

        let config: ChainConfig = load_yaml(file.path()).unwrap();
        assert_eq!(config.name, "from-file");
        assert!(config.ordered);
    }

    #[test]
    fn test_load_yaml_missing_file() {
        let result: Result<ChainConfig, _> = load_yaml(Path::new("/nonexistent/sluice.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_missing_env_var_fails_before_parsing() {
        let result: Result<ChainConfig, _> =
            parse_yaml("name: ${SLUICE_CONFIG_TEST_DEFINITELY_UNSET}\n");
        assert!(matches!(result, Err(ConfigError::Interpolation { ref errors }) if errors.len() == 1));
    }
}
