//! Configuration file handling

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::credentials::{Credentials, Secret};
use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Container engine connection
    #[serde(default)]
    pub engine: EngineConfig,

    /// Desired container
    #[serde(default)]
    pub container: ContainerConfig,

    /// Database endpoint and login
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Health polling budget
    #[serde(default)]
    pub health: HealthConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Container engine settings
#[derive(Debug, Deserialize, Default)]
pub struct EngineConfig {
    /// Override for the Podman API socket path
    #[serde(default)]
    pub socket: Option<PathBuf>,
}

/// Desired container settings
#[derive(Debug, Deserialize)]
pub struct ContainerConfig {
    /// Image reference to run
    #[serde(default = "default_image")]
    pub image: String,

    /// Reserved container name, also used as hostname
    #[serde(default = "default_container_name")]
    pub name: String,

    /// Path inside the container where the database keeps its files
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Listener port, mapped 1:1 onto the host
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host address the port is bound to
    #[serde(default = "default_host_ip")]
    pub host_ip: String,

    /// Environment variable the image reads its admin password from
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Parent for the per-run data directory (OS temp dir when unset)
    #[serde(default)]
    pub data_parent: Option<PathBuf>,

    /// Extra environment variables for the container
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            name: default_container_name(),
            data_path: default_data_path(),
            port: default_port(),
            host_ip: default_host_ip(),
            password_env: default_password_env(),
            data_parent: None,
            env: BTreeMap::new(),
        }
    }
}

fn default_image() -> String {
    "container-registry.oracle.com/database/free:latest".to_string()
}
fn default_container_name() -> String {
    "oracle-container".to_string()
}
fn default_data_path() -> String {
    "/opt/oracle/oradata".to_string()
}
fn default_port() -> u16 {
    1521
}
fn default_host_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_password_env() -> String {
    "ORACLE_PWD".to_string()
}

/// Database connection settings
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Host the listener is reachable on
    #[serde(default = "default_db_host")]
    pub host: String,

    /// Pluggable database service name
    #[serde(default = "default_service")]
    pub service: String,

    /// Administrative user
    #[serde(default = "default_username")]
    pub username: String,

    /// Password, injected into the container and used to connect
    #[serde(default = "default_password")]
    pub password: Secret,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            service: default_service(),
            username: default_username(),
            password: default_password(),
        }
    }
}

fn default_db_host() -> String {
    "localhost".to_string()
}
fn default_service() -> String {
    "FREEPDB1".to_string()
}
fn default_username() -> String {
    "SYSTEM".to_string()
}
fn default_password() -> Secret {
    Secret::new("oracle123")
}

/// Health polling settings
#[derive(Debug, Deserialize)]
pub struct HealthConfig {
    /// Seconds between health checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up after this many checks
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Give up after this many seconds. 0 waits forever.
    #[serde(default = "default_health_timeout")]
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_attempts: None,
            timeout_secs: default_health_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    10
}
fn default_health_timeout() -> u64 {
    1800
}

/// Logging settings
#[derive(Debug, Deserialize, Default)]
pub struct LoggingConfig {
    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.container.name.trim().is_empty() {
            return Err(super::Error::Config("container.name must not be empty".into()));
        }
        if self.container.image.trim().is_empty() {
            return Err(super::Error::Config("container.image must not be empty".into()));
        }
        if self.health.poll_interval_secs == 0 {
            return Err(super::Error::Config(
                "health.poll_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The login shared by container bootstrap and database client
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.database.username.clone(), self.database.password.clone())
    }
}
