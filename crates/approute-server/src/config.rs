use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use approute_core::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Certificate/key pairs to watch for rotation.
    #[serde(default)]
    pub certificates: Vec<CertificateConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// Name used in readiness reporting and lookups.
    pub name: String,
    /// Path to the PEM certificate file.
    pub cert_file: PathBuf,
    /// Path to the PEM private key file.
    pub key_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logging: LoggingConfig::default(),
            certificates: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl OperatorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid YAML: {}", e)))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("APPROUTE_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("APPROUTE_PORT") {
            if let Ok(port) = val.parse::<u16>() {
                self.port = port;
            }
        }

        if let Ok(val) = std::env::var("APPROUTE_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Reject configurations that cannot be wired into the store.
    pub fn validate(&self) -> Result<()> {
        let mut names = std::collections::HashSet::new();
        for cert in &self.certificates {
            if cert.name.is_empty() {
                return Err(Error::Config("certificate name must not be empty".to_string()));
            }
            if !names.insert(cert.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate certificate name '{}'",
                    cert.name
                )));
            }
            if cert.cert_file == cert.key_file {
                return Err(Error::Config(format!(
                    "certificate '{}' uses the same path for cert and key",
                    cert.name
                )));
            }
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}
