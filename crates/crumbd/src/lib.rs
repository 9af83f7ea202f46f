//! crumbd - Flame & Crumb ordering service.
//!
//! Wraps the pure ordering core from `crumb_shared` with configuration, a
//! model client, the two-round orchestrator and the HTTP surface.

pub mod config;
pub mod error;
pub mod llm_client;
pub mod orchestrator;
pub mod prompts;
pub mod routes;
pub mod server;

pub use config::Config;
pub use error::TurnError;
pub use llm_client::{FakeLlmClient, HttpLlmClient, LlmClient, LlmError};
pub use orchestrator::{HistoryMessage, Orchestrator, Role, TurnOutcome};

/// Daemon version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
