use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::probe::ProbeConfig;
use super::server::ServerConfig;
use crate::dns_record::ResourceRecord;
use crate::settings::Settings;
use crate::tsig::TsigKeyConfig;

const LOCAL_CONFIG_PATH: &str = "fakedns.toml";

/// File configuration of the `fakedns` binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FakeDnsConfig {
    /// Listening address, zones and transports
    #[serde(default)]
    pub server: ServerConfig,

    /// Readiness probe retry budget
    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tsig_keys: Vec<TsigKeyConfig>,

    /// Canned answers, served in file order
    #[serde(default)]
    pub records: Vec<ResourceRecord>,
}

impl FakeDnsConfig {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. fakedns.toml in current directory
    /// 3. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new(LOCAL_CONFIG_PATH).exists() {
            Self::from_file(LOCAL_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.edge_zone.trim().is_empty() {
            return Err(ConfigError::Validation("edge_zone cannot be empty".to_string()));
        }

        if self.server.answer_zone.trim().is_empty() {
            return Err(ConfigError::Validation(
                "answer_zone cannot be empty".to_string(),
            ));
        }

        if self.server.transports.is_empty() {
            return Err(ConfigError::Validation(
                "At least one transport must be configured".to_string(),
            ));
        }

        self.bind_address()?;

        for key in &self.tsig_keys {
            if key.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "TSIG key name cannot be empty".to_string(),
                ));
            }
            if key.decode_secret().is_err() {
                return Err(ConfigError::Validation(format!(
                    "TSIG key '{}' secret is not valid base64",
                    key.name
                )));
            }
        }

        Ok(())
    }

    fn bind_address(&self) -> Result<IpAddr, ConfigError> {
        self.server.bind_address.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "Invalid bind address: {}",
                self.server.bind_address
            ))
        })
    }

    /// Server settings described by this file.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let settings = Settings::new(
            self.server.port,
            self.server.edge_zone.clone(),
            self.server.answer_zone.clone(),
        )
        .with_bind_address(self.bind_address()?)
        .with_transports(self.server.transports.iter().copied())
        .with_answer_mode(self.server.answer_mode)
        .with_probe(self.probe.policy());

        Ok(self
            .tsig_keys
            .iter()
            .cloned()
            .fold(settings, Settings::with_tsig_key))
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}
