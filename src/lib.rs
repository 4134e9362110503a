// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod browser;
pub mod config;
pub mod extract;
pub mod filter;
pub mod gate;
pub mod normalize;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod telemetry;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::config::HarvesterConfig;
pub use crate::gate::Gate;
pub use crate::orchestrator::{ExecutionMode, Orchestrator, OrchestratorConfig, RunError, RunReport};
pub use crate::pipeline::{CycleReport, Harvester};
pub use crate::sources::{SourceAdapter, SourceId};
pub use crate::store::{JobStore, StoreError};
pub use crate::types::{PersistedJob, Posting, SourceOutcome, SourceResult, StoreStats};
