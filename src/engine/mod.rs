//! Container engine client
//!
//! The reconciler talks to the engine only through [`ContainerEngine`].
//! [`PodmanEngine`] implements it over Podman's Docker-compatible API.

mod podman;
pub mod types;

use async_trait::async_trait;

use crate::common::Result;

pub use podman::PodmanEngine;
pub use types::{
    BindMount, ContainerInspection, ContainerSpec, HealthStatus, ImageRef, PortMapping,
};

/// Operations the reconciler needs from a container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Whether the image is present locally
    async fn image_exists(&self, image: &ImageRef) -> Result<bool>;

    /// Pull the image, blocking until the pull finishes
    async fn pull_image(&self, image: &ImageRef) -> Result<()>;

    /// Whether a container with this name exists, in any state
    async fn container_exists(&self, name: &str) -> Result<bool>;

    /// Inspect a container by name or id
    async fn inspect_container(&self, name_or_id: &str) -> Result<ContainerInspection>;

    /// Force-remove a container. Removing an absent container is not an error.
    async fn remove_container(&self, name: &str) -> Result<()>;

    /// Create a container and return its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Start a created container
    async fn start_container(&self, id: &str) -> Result<()>;
}
