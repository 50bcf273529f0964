//! In-process fakes for the engine, the clock and the record store
//!
//! They let the reconciler and the data session run without Podman or
//! Oracle, record every call, and fail on demand at any single step.

mod clock;
mod engine;
mod store;

pub use clock::ManualClock;
pub use engine::{EngineCall, EngineOp, FakeEngine};
pub use store::{MemoryConnector, MemoryStore, StoreOp};
