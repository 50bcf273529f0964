//! End-to-end tests for the provisioning workflow
//!
//! These drive the public API the way `devdb run` does, with the in-process
//! engine, clock and store fakes standing in for Podman and Oracle:
//! 1. Reconcile the container (reuse or recreate, then poll)
//! 2. Run the data session against the store
//! 3. Check what was called, in which order, and what the store holds

use std::time::Duration;

use devdb::cli::provision_and_run;
use devdb::common::config::Config;
use devdb::engine::HealthStatus;
use devdb::testing::{
    EngineCall, EngineOp, FakeEngine, ManualClock, MemoryConnector, MemoryStore, StoreOp,
};
use devdb::{Error, ReconcileAction};

/// Test context with a scratch data parent directory
struct TestContext {
    /// Keeps the scratch directory alive for the test
    _scratch: tempfile::TempDir,
    config: Config,
}

impl TestContext {
    fn new() -> Self {
        let scratch = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = Config::default();
        config.container.data_parent = Some(scratch.path().to_path_buf());
        config.health.poll_interval_secs = 10;
        Self {
            _scratch: scratch,
            config,
        }
    }
}

#[tokio::test]
async fn test_fresh_environment_end_to_end() {
    let ctx = TestContext::new();
    let engine = FakeEngine::new().with_health_sequence([
        HealthStatus::Unknown,
        HealthStatus::Starting,
        HealthStatus::Healthy,
    ]);
    let clock = ManualClock::new();
    let connector = MemoryConnector::new();

    let (provisioned, report) = provision_and_run(&engine, &clock, &connector, &ctx.config)
        .await
        .expect("workflow should succeed");

    assert_eq!(provisioned.action, ReconcileAction::Created);
    assert_eq!(provisioned.health_checks, 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(10); 2]);

    assert_eq!(
        engine.ops(),
        vec![
            EngineOp::ImageExists,
            EngineOp::Pull,
            EngineOp::ContainerExists,
            EngineOp::Create,
            EngineOp::Start,
            EngineOp::Inspect,
            EngineOp::Inspect,
            EngineOp::Inspect,
        ]
    );

    // Data round trip
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].name, "apple");
    assert_eq!(report.records[1].name, "orange");
    assert_ne!(report.records[0].id, report.records[1].id);

    let rows = connector.store().snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, report.records[0].id);
    assert_eq!(rows[0].name, "banana");
    assert_eq!(rows[0].price, 5.99);
}

#[tokio::test]
async fn test_second_run_reuses_healthy_container() {
    let ctx = TestContext::new();
    let engine = FakeEngine::new()
        .with_image()
        .with_container("oracle-container", HealthStatus::Healthy);
    let clock = ManualClock::new();
    let connector = MemoryConnector::new();

    let (provisioned, _) = provision_and_run(&engine, &clock, &connector, &ctx.config)
        .await
        .unwrap();

    assert_eq!(provisioned.action, ReconcileAction::Reused);
    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::ImageExists,
            EngineCall::ContainerExists("oracle-container".into()),
            EngineCall::Inspect("oracle-container".into()),
        ]
    );
    assert_eq!(connector.connections().len(), 1);
}

#[tokio::test]
async fn test_unhealthy_container_replaced_then_session_runs() {
    let ctx = TestContext::new();
    let engine = FakeEngine::new()
        .with_image()
        .with_container("oracle-container", HealthStatus::Unhealthy)
        .with_health_sequence([HealthStatus::Starting, HealthStatus::Healthy]);
    let clock = ManualClock::new();
    let connector = MemoryConnector::new();

    let (provisioned, report) = provision_and_run(&engine, &clock, &connector, &ctx.config)
        .await
        .unwrap();

    assert_eq!(provisioned.action, ReconcileAction::Created);
    assert_eq!(engine.count(EngineOp::Remove), 1);
    assert_eq!(engine.count(EngineOp::Create), 1);
    assert_eq!(engine.count(EngineOp::Start), 1);
    assert_eq!(report.updated.name, "banana");
}

#[tokio::test]
async fn test_password_is_shared_between_container_and_connection() {
    let mut ctx = TestContext::new();
    ctx.config.database.password = devdb::Secret::new("not-the-default");
    let engine = FakeEngine::new()
        .with_image()
        .with_health_sequence([HealthStatus::Healthy]);
    let clock = ManualClock::new();
    let connector = MemoryConnector::new();

    provision_and_run(&engine, &clock, &connector, &ctx.config)
        .await
        .unwrap();

    let spec = engine.created_specs().pop().unwrap();
    let injected = spec.env.get("ORACLE_PWD").cloned().unwrap();
    let (endpoint, credentials) = connector.connections().pop().unwrap();

    assert_eq!(injected, "not-the-default");
    assert_eq!(credentials.password.expose(), injected);
    assert_eq!(endpoint.port, 1521);
    assert_eq!(endpoint.service, "FREEPDB1");
}

#[tokio::test]
async fn test_engine_failure_at_any_step_stops_everything() {
    fn with_image() -> FakeEngine {
        FakeEngine::new().with_image()
    }
    fn with_healthy_container() -> FakeEngine {
        with_image().with_container("oracle-container", HealthStatus::Healthy)
    }

    // (op, engine setup that reaches that op)
    let cases: [(EngineOp, fn() -> FakeEngine); 6] = [
        (EngineOp::ImageExists, FakeEngine::new),
        (EngineOp::Pull, FakeEngine::new),
        (EngineOp::ContainerExists, with_image),
        (EngineOp::Inspect, with_healthy_container),
        (EngineOp::Create, with_image),
        (EngineOp::Start, with_image),
    ];

    for (op, setup) in cases {
        let ctx = TestContext::new();
        let engine = setup().failing_on(op);
        let clock = ManualClock::new();
        let connector = MemoryConnector::new();

        let result = provision_and_run(&engine, &clock, &connector, &ctx.config).await;

        assert!(result.is_err(), "{:?} should fail the run", op);
        assert_eq!(engine.ops().last(), Some(&op), "{:?} must be the last call", op);
        assert!(
            connector.connections().is_empty(),
            "{:?} must not reach the database",
            op
        );
        assert!(clock.sleeps().is_empty());
    }
}

#[tokio::test]
async fn test_health_timeout_never_reaches_database() {
    let mut ctx = TestContext::new();
    ctx.config.health.max_attempts = Some(4);
    let engine = FakeEngine::new()
        .with_image()
        .with_health_sequence([HealthStatus::Unhealthy]);
    let clock = ManualClock::new();
    let connector = MemoryConnector::new();

    let err = provision_and_run(&engine, &clock, &connector, &ctx.config)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HealthTimeout { attempts: 4, .. }));
    assert_eq!(clock.slept(), Duration::from_secs(30));
    assert!(connector.connections().is_empty());
}

#[tokio::test]
async fn test_database_failure_leaves_container_running() {
    let ctx = TestContext::new();
    let engine = FakeEngine::new()
        .with_image()
        .with_health_sequence([HealthStatus::Healthy]);
    let clock = ManualClock::new();
    let store = MemoryStore::new().failing_on(StoreOp::Delete);
    let connector = MemoryConnector::with_store(store.clone());

    let err = provision_and_run(&engine, &clock, &connector, &ctx.config)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Database { .. }));
    assert_eq!(engine.count(EngineOp::Remove), 0);
    assert_eq!(engine.container_name().as_deref(), Some("oracle-container"));

    // Earlier steps stay committed
    let rows = store.snapshot();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "banana");
}

#[tokio::test]
async fn test_database_unreachable_is_fatal() {
    let ctx = TestContext::new();
    let engine = FakeEngine::new()
        .with_image()
        .with_container("oracle-container", HealthStatus::Healthy);
    let clock = ManualClock::new();
    let connector = MemoryConnector::new().refusing_connections();

    let err = provision_and_run(&engine, &clock, &connector, &ctx.config)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DatabaseConnectionFailed { .. }));
    assert!(connector.store().ops().is_empty());
}
