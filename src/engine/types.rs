//! Engine-neutral container types
//!
//! These describe what we want from the engine. The Podman client converts
//! them into API payloads; the fakes in `testing` record them as-is.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Reference to a container image, e.g. `registry/repo:tag`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host directory bound into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: String,
}

/// Container tcp port published on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub host_ip: String,
}

impl PortMapping {
    /// Publish `port` on the same host port
    pub fn same_port(port: u16, host_ip: impl Into<String>) -> Self {
        Self {
            container_port: port,
            host_port: port,
            host_ip: host_ip.into(),
        }
    }

    /// Key used by the engine API, e.g. `1521/tcp`
    pub fn port_key(&self) -> String {
        format!("{}/tcp", self.container_port)
    }
}

/// Everything needed to create a container
///
/// Built fresh for each creation. A running container is never updated in
/// place; it is removed and replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: ImageRef,
    pub hostname: String,
    pub mounts: Vec<BindMount>,
    pub ports: Vec<PortMapping>,
    pub env: BTreeMap<String, String>,
}

impl ContainerSpec {
    /// Environment rendered as `KEY=VALUE` pairs in key order
    pub fn env_pairs(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }
}

/// Engine-reported health of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No status reported (no healthcheck, or not evaluated yet)
    #[default]
    Unknown,
    Starting,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Parse the engine's status string. Anything unrecognised is `Unknown`.
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "starting" => HealthStatus::Starting,
            "healthy" => HealthStatus::Healthy,
            "unhealthy" => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Starting => "starting",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// The parts of an inspect result we look at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerInspection {
    pub id: String,
    pub name: String,
    /// Run state as the engine words it (`running`, `exited`, ...)
    pub state: String,
    pub health: HealthStatus,
}
