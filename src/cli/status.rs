//! `devdb status`

use colored::Colorize;
use serde::Serialize;

use crate::common::Result;
use crate::engine::{ContainerEngine, ContainerInspection, ImageRef};

/// Snapshot of the environment as the engine sees it
#[derive(Debug, Serialize)]
pub struct EnvironmentStatus {
    pub image: ImageRef,
    pub image_present: bool,
    pub container_name: String,
    /// `None` when no container has the reserved name
    pub container: Option<ContainerInspection>,
}

impl EnvironmentStatus {
    /// Whether `devdb run` would reuse the container as-is
    pub fn is_ready(&self) -> bool {
        self.image_present
            && self
                .container
                .as_ref()
                .is_some_and(|c| c.health.is_healthy())
    }
}

/// Query image and container state without changing anything
pub async fn collect<E>(engine: &E, image: &ImageRef, container_name: &str) -> Result<EnvironmentStatus>
where
    E: ContainerEngine + ?Sized,
{
    let image_present = engine.image_exists(image).await?;
    let container = if engine.container_exists(container_name).await? {
        Some(engine.inspect_container(container_name).await?)
    } else {
        None
    };

    Ok(EnvironmentStatus {
        image: image.clone(),
        image_present,
        container_name: container_name.to_string(),
        container,
    })
}

pub fn print(status: &EnvironmentStatus) {
    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };

    println!(
        "  {} Image {} {}",
        mark(status.image_present),
        status.image.to_string().bold(),
        if status.image_present { "present" } else { "not pulled" }
    );

    match &status.container {
        Some(c) => println!(
            "  {} Container {} {} (health: {}, id: {})",
            mark(c.health.is_healthy()),
            status.container_name.bold(),
            c.state,
            c.health,
            short_id(&c.id)
        ),
        None => println!(
            "  {} Container {} does not exist",
            mark(false),
            status.container_name.bold()
        ),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HealthStatus;
    use crate::testing::{EngineOp, FakeEngine};

    #[tokio::test]
    async fn test_collect_reports_healthy_container() {
        let engine = FakeEngine::new()
            .with_image()
            .with_container("oracle-container", HealthStatus::Healthy);
        let image = ImageRef::new("img");

        let status = collect(&engine, &image, "oracle-container").await.unwrap();
        assert!(status.is_ready());
        assert_eq!(status.container.unwrap().health, HealthStatus::Healthy);
        assert_eq!(engine.count(EngineOp::Remove), 0);
        assert_eq!(engine.count(EngineOp::Pull), 0);
    }

    #[tokio::test]
    async fn test_collect_without_container() {
        let engine = FakeEngine::new();
        let image = ImageRef::new("img");

        let status = collect(&engine, &image, "oracle-container").await.unwrap();
        assert!(!status.is_ready());
        assert!(!status.image_present);
        assert!(status.container.is_none());
        assert_eq!(engine.count(EngineOp::Inspect), 0);
    }

    #[tokio::test]
    async fn test_status_json_shape() {
        let engine = FakeEngine::new()
            .with_image()
            .with_container("oracle-container", HealthStatus::Starting);
        let status = collect(&engine, &ImageRef::new("img"), "oracle-container")
            .await
            .unwrap();

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["image"], "img");
        assert_eq!(json["image_present"], true);
        assert_eq!(json["container"]["health"], "starting");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }
}
