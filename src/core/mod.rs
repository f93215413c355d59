// Public modules
pub mod build;
pub mod config;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod git;
pub mod guard;
pub mod hooks;
pub mod interrupt;
pub mod orchestrator;
pub mod platform;
pub mod promote;
pub mod prompt;
pub mod report;
pub mod request;
pub mod tag;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use orchestrator::{DeployOutcome, DeployReport, Orchestrator};
pub use request::{DeployFlags, DeployRequest, PromoteFlags, PromoteRequest};
