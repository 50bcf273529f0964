//! Scripted in-memory container engine

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::engine::{ContainerEngine, ContainerInspection, ContainerSpec, HealthStatus, ImageRef};

/// Kind of engine call, for counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    ImageExists,
    Pull,
    ContainerExists,
    Inspect,
    Remove,
    Create,
    Start,
}

/// A recorded engine call with its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    ImageExists,
    Pull,
    ContainerExists(String),
    Inspect(String),
    Remove(String),
    Create(String),
    Start(String),
}

impl EngineCall {
    pub fn op(&self) -> EngineOp {
        match self {
            EngineCall::ImageExists => EngineOp::ImageExists,
            EngineCall::Pull => EngineOp::Pull,
            EngineCall::ContainerExists(_) => EngineOp::ContainerExists,
            EngineCall::Inspect(_) => EngineOp::Inspect,
            EngineCall::Remove(_) => EngineOp::Remove,
            EngineCall::Create(_) => EngineOp::Create,
            EngineCall::Start(_) => EngineOp::Start,
        }
    }
}

#[derive(Debug)]
struct FakeContainer {
    id: String,
    name: String,
    health: HealthStatus,
    started: bool,
}

#[derive(Debug, Default)]
struct State {
    image_present: bool,
    container: Option<FakeContainer>,
    /// Health reported by successive inspects of a created container;
    /// the last entry repeats
    health_sequence: VecDeque<HealthStatus>,
    failing: HashSet<EngineOp>,
    calls: Vec<EngineCall>,
    created: Vec<ContainerSpec>,
    next_id: u32,
}

/// Engine fake with scripted image/container state
///
/// Calls are recorded before failure injection is applied, so a failing
/// call still shows up in [`FakeEngine::calls`].
#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Mutex<State>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The image is already present locally
    pub fn with_image(self) -> Self {
        self.state().image_present = true;
        self
    }

    /// A container with this name already exists and reports `health`
    pub fn with_container(self, name: &str, health: HealthStatus) -> Self {
        self.state().container = Some(FakeContainer {
            id: format!("existing-{}", name),
            name: name.to_string(),
            health,
            started: true,
        });
        self
    }

    /// Health values reported after a container is created
    pub fn with_health_sequence(self, statuses: impl IntoIterator<Item = HealthStatus>) -> Self {
        self.state().health_sequence = statuses.into_iter().collect();
        self
    }

    /// Make every call of kind `op` fail
    pub fn failing_on(self, op: EngineOp) -> Self {
        self.state().failing.insert(op);
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state().calls.clone()
    }

    pub fn ops(&self) -> Vec<EngineOp> {
        self.state().calls.iter().map(EngineCall::op).collect()
    }

    pub fn count(&self, op: EngineOp) -> usize {
        self.state().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.state().created.clone()
    }

    /// Name of the container currently held by the fake, if any
    pub fn container_name(&self) -> Option<String> {
        self.state().container.as_ref().map(|c| c.name.clone())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: EngineCall) -> Result<MutexGuard<'_, State>> {
        let op = call.op();
        let mut state = self.state();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(simulated_failure(op));
        }
        Ok(state)
    }
}

fn simulated_failure(op: EngineOp) -> Error {
    match op {
        EngineOp::Pull => Error::image_pull("fake", "simulated failure"),
        EngineOp::ImageExists => Error::engine("image exists", "simulated failure"),
        EngineOp::ContainerExists => Error::engine("container exists", "simulated failure"),
        EngineOp::Inspect => Error::engine("inspect container", "simulated failure"),
        EngineOp::Remove => Error::engine("remove container", "simulated failure"),
        EngineOp::Create => Error::engine("create container", "simulated failure"),
        EngineOp::Start => Error::engine("start container", "simulated failure"),
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn image_exists(&self, _image: &ImageRef) -> Result<bool> {
        let state = self.record(EngineCall::ImageExists)?;
        Ok(state.image_present)
    }

    async fn pull_image(&self, _image: &ImageRef) -> Result<()> {
        let mut state = self.record(EngineCall::Pull)?;
        state.image_present = true;
        Ok(())
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        let state = self.record(EngineCall::ContainerExists(name.to_string()))?;
        Ok(state.container.as_ref().is_some_and(|c| c.name == name))
    }

    async fn inspect_container(&self, name_or_id: &str) -> Result<ContainerInspection> {
        let mut state = self.record(EngineCall::Inspect(name_or_id.to_string()))?;
        let State {
            container,
            health_sequence,
            ..
        } = &mut *state;

        let container = container
            .as_mut()
            .filter(|c| c.name == name_or_id || c.id == name_or_id)
            .ok_or_else(|| Error::engine("inspect container", "no such container"))?;

        if container.id.starts_with("created-") {
            let next = if health_sequence.len() > 1 {
                health_sequence.pop_front()
            } else {
                health_sequence.front().copied()
            };
            container.health = next.unwrap_or_default();
        }

        Ok(ContainerInspection {
            id: container.id.clone(),
            name: container.name.clone(),
            state: if container.started { "running" } else { "created" }.to_string(),
            health: container.health,
        })
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        let mut state = self.record(EngineCall::Remove(name.to_string()))?;
        if state.container.as_ref().is_some_and(|c| c.name == name) {
            state.container = None;
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let mut state = self.record(EngineCall::Create(spec.name.clone()))?;
        if !state.image_present {
            return Err(Error::engine("create container", "image not known"));
        }

        state.next_id += 1;
        let id = format!("created-{}", state.next_id);
        state.container = Some(FakeContainer {
            id: id.clone(),
            name: spec.name.clone(),
            health: HealthStatus::Unknown,
            started: false,
        });
        state.created.push(spec.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let mut state = self.record(EngineCall::Start(id.to_string()))?;
        match state.container.as_mut().filter(|c| c.id == id) {
            Some(container) => {
                container.started = true;
                Ok(())
            }
            None => Err(Error::engine("start container", "no such container")),
        }
    }
}
