//! Podman client over the Docker-compatible REST API
//!
//! Podman serves the Docker API on its per-user socket, so bollard works
//! unchanged once pointed at `$XDG_RUNTIME_DIR/podman/podman.sock`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{CreateImageInfo, HostConfig, Mount, MountTypeEnum, PortBinding};
use bollard::Docker;
use futures_util::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use crate::common::paths::socket_uri;
use crate::common::{Error, Result};

use super::types::{ContainerInspection, ContainerSpec, HealthStatus, ImageRef};
use super::ContainerEngine;

/// Per-request limit handed to bollard. Large enough that pulls of
/// multi-gigabyte database images are never cut short.
const REQUEST_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Container engine backed by a Podman API socket
pub struct PodmanEngine {
    docker: Docker,
}

impl PodmanEngine {
    /// Connect to the socket and make sure the service answers
    pub async fn connect(socket: &Path) -> Result<Self> {
        let uri = socket_uri(socket);
        let path = socket
            .to_str()
            .ok_or_else(|| Error::engine_connection_failed(&uri, "socket path is not UTF-8"))?;

        tracing::debug!(socket = %uri, "Connecting to container engine");

        let docker =
            Docker::connect_with_unix(path, REQUEST_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
                .map_err(|e| Error::engine_connection_failed(&uri, e))?;

        // The connection is lazy; ping so an absent socket fails here
        docker
            .ping()
            .await
            .map_err(|e| Error::engine_connection_failed(&uri, e))?;

        tracing::debug!(socket = %uri, "Container engine is reachable");
        Ok(Self { docker })
    }
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// Translate our spec into the API's create payload
fn build_config(spec: &ContainerSpec) -> Config<String> {
    let mounts = spec
        .mounts
        .iter()
        .map(|m| Mount {
            target: Some(m.target.clone()),
            source: Some(m.source.to_string_lossy().to_string()),
            typ: Some(MountTypeEnum::BIND),
            ..Default::default()
        })
        .collect();

    let mut exposed_ports = HashMap::new();
    let mut port_bindings = HashMap::new();
    for port in &spec.ports {
        exposed_ports.insert(port.port_key(), HashMap::new());
        port_bindings.insert(
            port.port_key(),
            Some(vec![PortBinding {
                host_ip: Some(port.host_ip.clone()),
                host_port: Some(port.host_port.to_string()),
            }]),
        );
    }

    Config {
        image: Some(spec.image.as_str().to_string()),
        hostname: Some(spec.hostname.clone()),
        env: Some(spec.env_pairs()),
        exposed_ports: Some(exposed_ports),
        host_config: Some(HostConfig {
            mounts: Some(mounts),
            port_bindings: Some(port_bindings),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pull_spinner(image: &ImageRef) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Pulling {}", image));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Consume pull progress until the stream ends or reports an error
///
/// Stops at the first error, either from the transport or as an `error`
/// field in a progress item; the rest of the stream is left unread.
async fn follow_pull<S>(image: &ImageRef, stream: &mut S, pb: &ProgressBar) -> Result<()>
where
    S: Stream<Item = std::result::Result<CreateImageInfo, bollard::errors::Error>> + Unpin,
{
    while let Some(item) = stream.next().await {
        let info = item.map_err(|e| Error::image_pull(image.as_str(), e))?;

        if let Some(message) = info.error {
            return Err(Error::image_pull(image.as_str(), message));
        }

        if let Some(status) = info.status {
            tracing::trace!(image = %image, status = %status, "Pull progress");
            let line = match info.progress {
                Some(progress) => format!("{} {}", status, progress),
                None => status,
            };
            pb.set_message(line);
        }
    }
    Ok(())
}

#[async_trait]
impl ContainerEngine for PodmanEngine {
    async fn image_exists(&self, image: &ImageRef) -> Result<bool> {
        match self.docker.inspect_image(image.as_str()).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(Error::engine("image exists", e)),
        }
    }

    async fn pull_image(&self, image: &ImageRef) -> Result<()> {
        let options = CreateImageOptions {
            from_image: image.as_str().to_string(),
            ..Default::default()
        };

        let pb = pull_spinner(image);
        let stream = self.docker.create_image(Some(options), None, None);
        futures_util::pin_mut!(stream);

        let result = follow_pull(image, &mut stream, &pb).await;
        pb.finish_and_clear();
        result
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(Error::engine("container exists", e)),
        }
    }

    async fn inspect_container(&self, name_or_id: &str) -> Result<ContainerInspection> {
        let info = self
            .docker
            .inspect_container(name_or_id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| Error::engine("inspect container", e))?;

        let state = info.state.as_ref();
        let run_state = state
            .and_then(|s| s.status.as_ref())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let health = state
            .and_then(|s| s.health.as_ref())
            .and_then(|h| h.status.as_ref())
            .map(|s| HealthStatus::parse(&s.to_string()))
            .unwrap_or_default();

        Ok(ContainerInspection {
            id: info.id.unwrap_or_else(|| name_or_id.to_string()),
            name: info
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| name_or_id.to_string()),
            state: run_state,
            health,
        })
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.docker.remove_container(name, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(Error::engine("remove container", e)),
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        };
        let response = self
            .docker
            .create_container(Some(options), build_config(spec))
            .await
            .map_err(|e| Error::engine("create container", e))?;

        for warning in &response.warnings {
            tracing::warn!(container = %spec.name, "Engine warning: {}", warning);
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::engine("start container", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{BindMount, PortMapping};
    use futures_util::stream;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn progress(status: &str) -> std::result::Result<CreateImageInfo, bollard::errors::Error> {
        Ok(CreateImageInfo {
            status: Some(status.to_string()),
            ..Default::default()
        })
    }

    fn failed(message: &str) -> std::result::Result<CreateImageInfo, bollard::errors::Error> {
        Ok(CreateImageInfo {
            error: Some(message.to_string()),
            ..Default::default()
        })
    }

    fn oracle_spec() -> ContainerSpec {
        let mut env = BTreeMap::new();
        env.insert("ORACLE_PWD".to_string(), "oracle123".to_string());
        ContainerSpec {
            name: "oracle-container".to_string(),
            image: ImageRef::new("container-registry.oracle.com/database/free:latest"),
            hostname: "oracle-container".to_string(),
            mounts: vec![BindMount {
                source: PathBuf::from("/tmp/oradata123"),
                target: "/opt/oracle/oradata".to_string(),
            }],
            ports: vec![PortMapping::same_port(1521, "0.0.0.0")],
            env,
        }
    }

    #[test]
    fn test_build_config_maps_ports_mounts_env() {
        let config = build_config(&oracle_spec());

        assert_eq!(
            config.image.as_deref(),
            Some("container-registry.oracle.com/database/free:latest")
        );
        assert_eq!(config.hostname.as_deref(), Some("oracle-container"));
        assert_eq!(config.env, Some(vec!["ORACLE_PWD=oracle123".to_string()]));
        assert!(config.exposed_ports.unwrap().contains_key("1521/tcp"));

        let host = config.host_config.unwrap();
        let mounts = host.mounts.unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].source.as_deref(), Some("/tmp/oradata123"));
        assert_eq!(mounts[0].target.as_deref(), Some("/opt/oracle/oradata"));
        assert_eq!(mounts[0].typ, Some(MountTypeEnum::BIND));

        let bindings = host.port_bindings.unwrap();
        let binding = bindings["1521/tcp"].as_ref().unwrap();
        assert_eq!(binding[0].host_ip.as_deref(), Some("0.0.0.0"));
        assert_eq!(binding[0].host_port.as_deref(), Some("1521"));
    }

    #[test]
    fn test_not_found_detection() {
        let missing = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "no such container".to_string(),
        };
        let conflict = bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message: "conflict".to_string(),
        };
        assert!(is_not_found(&missing));
        assert!(!is_not_found(&conflict));
    }

    #[tokio::test]
    async fn test_connect_to_missing_socket_fails() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("podman").join("podman.sock");

        let err = match PodmanEngine::connect(&socket).await {
            Ok(_) => panic!("connecting to a missing socket should fail"),
            Err(e) => e,
        };

        assert!(matches!(err, Error::EngineConnectionFailed { .. }));
        assert!(err.to_string().contains(&socket_uri(&socket)));
        assert!(err.to_string().contains("unix://"));
    }

    #[tokio::test]
    async fn test_follow_pull_completes_on_clean_stream() {
        let image = ImageRef::new("img");
        let mut items = stream::iter(vec![
            progress("Pulling fs layer"),
            progress("Download complete"),
            progress("Status: Downloaded newer image"),
        ]);

        follow_pull(&image, &mut items, &ProgressBar::hidden())
            .await
            .unwrap();
        assert!(items.next().await.is_none());
    }

    #[tokio::test]
    async fn test_follow_pull_stops_at_error_item() {
        let image = ImageRef::new("img");
        let mut items = stream::iter(vec![
            progress("Pulling fs layer"),
            failed("manifest unknown"),
            progress("never read"),
        ]);

        let err = follow_pull(&image, &mut items, &ProgressBar::hidden())
            .await
            .unwrap_err();

        match err {
            Error::ImagePull { image, message } => {
                assert_eq!(image, "img");
                assert_eq!(message, "manifest unknown");
            }
            other => panic!("Expected ImagePull, got {:?}", other),
        }

        // The item after the error is still in the stream
        let rest = items.next().await.unwrap().unwrap();
        assert_eq!(rest.status.as_deref(), Some("never read"));
        assert!(items.next().await.is_none());
    }

    #[tokio::test]
    async fn test_follow_pull_transport_error_is_fatal() {
        let image = ImageRef::new("img");
        let mut items = stream::iter(vec![
            progress("Pulling fs layer"),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 500,
                message: "registry unreachable".to_string(),
            }),
        ]);

        let err = follow_pull(&image, &mut items, &ProgressBar::hidden())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ImagePull { .. }));
        assert!(err.to_string().contains("registry unreachable"));
    }
}
