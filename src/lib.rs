pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod paths;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod sizing;
pub mod store;
pub mod summary;

pub use error::{ConfigError, ManifestError, RunError, TransferError};
pub use manifest::TransferTask;
pub use orchestrator::{Orchestrator, RunOptions, RunState};
pub use summary::{RunOutcome, RunSummary};
