//! Environment reconciler
//!
//! Drives the engine toward "image present, named container running and
//! healthy":
//!
//! 1. Pull the image unless it is already local
//! 2. Reuse the named container if it reports healthy
//! 3. Otherwise force-remove it, create a fresh one on a new data
//!    directory, start it, and poll until healthy
//!
//! A container that is not healthy is always replaced, even if it is only
//! still starting. Removal failures before replacement are logged and
//! ignored; a stale container then surfaces as a create conflict.

pub mod clock;
pub mod poll;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::config::ContainerConfig;
use crate::common::{Credentials, Error, Result};
use crate::engine::{
    BindMount, ContainerEngine, ContainerInspection, ContainerSpec, ImageRef, PortMapping,
};

use clock::Clock;
use poll::{wait_until_healthy, PollOutcome, PollPolicy};

/// Prefix of per-run data directories
const DATA_DIR_PREFIX: &str = "oradata";

/// The container we want to end up with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredEnvironment {
    pub image: ImageRef,
    pub container_name: String,
    /// Where the bind mount lands inside the container
    pub data_path: String,
    pub port: u16,
    pub host_ip: String,
    /// Variable the image reads its admin password from
    pub password_env: String,
    /// Parent for new data directories, OS temp dir when `None`
    pub data_parent: Option<PathBuf>,
    pub extra_env: BTreeMap<String, String>,
}

impl DesiredEnvironment {
    pub fn from_config(config: &ContainerConfig) -> Self {
        Self {
            image: ImageRef::new(config.image.clone()),
            container_name: config.name.clone(),
            data_path: config.data_path.clone(),
            port: config.port,
            host_ip: config.host_ip.clone(),
            password_env: config.password_env.clone(),
            data_parent: config.data_parent.clone(),
            extra_env: config.env.clone(),
        }
    }

    /// Build the create payload for a container bound to `data_dir`
    pub fn container_spec(&self, data_dir: &Path, credentials: &Credentials) -> ContainerSpec {
        let mut env = self.extra_env.clone();
        env.insert(
            self.password_env.clone(),
            credentials.password.expose().to_string(),
        );

        ContainerSpec {
            name: self.container_name.clone(),
            image: self.image.clone(),
            hostname: self.container_name.clone(),
            mounts: vec![BindMount {
                source: data_dir.to_path_buf(),
                target: self.data_path.clone(),
            }],
            ports: vec![PortMapping::same_port(self.port, self.host_ip.clone())],
            env,
        }
    }
}

/// Whether the reconciler kept or replaced the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Reused,
    Created,
}

/// A container that is running and healthy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub container_id: String,
    pub container_name: String,
    pub action: ReconcileAction,
    /// Host side of the data bind mount, for newly created containers
    pub data_dir: Option<PathBuf>,
    /// Health observations made by the poll loop
    pub health_checks: u32,
}

/// Reconciles one desired environment against an engine
pub struct Reconciler<'a, E: ?Sized, C: ?Sized> {
    engine: &'a E,
    clock: &'a C,
    desired: &'a DesiredEnvironment,
    credentials: &'a Credentials,
    policy: PollPolicy,
}

impl<'a, E, C> Reconciler<'a, E, C>
where
    E: ContainerEngine + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(
        engine: &'a E,
        clock: &'a C,
        desired: &'a DesiredEnvironment,
        credentials: &'a Credentials,
    ) -> Self {
        Self {
            engine,
            clock,
            desired,
            credentials,
            policy: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Make sure the container is running and healthy
    pub async fn reconcile(&self) -> Result<Provisioned> {
        self.ensure_image().await?;

        if let Some(existing) = self.reusable_container().await? {
            tracing::info!(container = %existing.name, "Using existing database...");
            return Ok(Provisioned {
                container_id: existing.id,
                container_name: self.desired.container_name.clone(),
                action: ReconcileAction::Reused,
                data_dir: None,
                health_checks: 0,
            });
        }

        let (container_id, data_dir) = self.create_and_start().await?;

        match wait_until_healthy(self.engine, self.clock, &container_id, self.policy).await? {
            PollOutcome::Healthy { attempts, elapsed } => {
                tracing::info!(
                    container = %self.desired.container_name,
                    checks = attempts,
                    waited_secs = elapsed.as_secs(),
                    "Database is healthy"
                );
                Ok(Provisioned {
                    container_id,
                    container_name: self.desired.container_name.clone(),
                    action: ReconcileAction::Created,
                    data_dir: Some(data_dir),
                    health_checks: attempts,
                })
            }
            PollOutcome::TimedOut {
                attempts,
                elapsed,
                last,
            } => {
                tracing::error!(
                    container = %self.desired.container_name,
                    health = %last,
                    "Gave up waiting for container to become healthy"
                );
                Err(Error::HealthTimeout {
                    container: self.desired.container_name.clone(),
                    attempts,
                    waited_secs: elapsed.as_secs(),
                })
            }
        }
    }

    async fn ensure_image(&self) -> Result<()> {
        let image = &self.desired.image;
        if self.engine.image_exists(image).await? {
            tracing::info!(image = %image, "Using existing image...");
            return Ok(());
        }

        tracing::info!(image = %image, "Pulling image...");
        self.engine.pull_image(image).await?;
        tracing::info!(image = %image, "Image pulled");
        Ok(())
    }

    /// The existing container if it can be reused. A present but
    /// non-healthy container is removed on the way.
    async fn reusable_container(&self) -> Result<Option<ContainerInspection>> {
        let name = &self.desired.container_name;
        if !self.engine.container_exists(name).await? {
            tracing::debug!(container = %name, "No existing container");
            return Ok(None);
        }

        let inspection = self.engine.inspect_container(name).await?;
        if inspection.health.is_healthy() {
            return Ok(Some(inspection));
        }

        tracing::info!(
            container = %name,
            state = %inspection.state,
            health = %inspection.health,
            "Existing container is not healthy, replacing it"
        );
        if let Err(e) = self.engine.remove_container(name).await {
            tracing::warn!(container = %name, error = %e, "Ignoring failed removal");
        }
        Ok(None)
    }

    async fn create_and_start(&self) -> Result<(String, PathBuf)> {
        let data_dir = allocate_data_dir(self.desired.data_parent.as_deref())?;
        let spec = self.desired.container_spec(&data_dir, self.credentials);

        tracing::info!(
            container = %spec.name,
            image = %spec.image,
            data_dir = %data_dir.display(),
            "Creating container..."
        );
        let id = self.engine.create_container(&spec).await?;
        tracing::info!(container = %spec.name, id = %id, "Container created.");

        self.engine.start_container(&id).await?;
        tracing::info!(container = %spec.name, "Container started.");

        Ok((id, data_dir))
    }
}

/// Create a fresh, world-writable data directory
///
/// The database inside the container runs as its own uid, so the bind
/// mount must be writable by anyone. The directory is left behind on exit.
pub fn allocate_data_dir(parent: Option<&Path>) -> Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(DATA_DIR_PREFIX);

    let created = match parent {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    };
    let dir = created.map_err(|error| Error::DataDir {
        path: parent
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir),
        error,
    })?;
    let path = dir.keep();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o777)).map_err(
            |error| Error::DataDir {
                path: path.clone(),
                error,
            },
        )?;
        tracing::warn!(
            path = %path.display(),
            "Data directory is world-writable (mode 0777) for the container user"
        );
    }

    Ok(path)
}
