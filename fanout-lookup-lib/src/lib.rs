//! # Fanout Lookup Library
//!
//! Runs a fixed set of independent remote lookups concurrently and reports
//! once every one of them has finished, together with the total elapsed
//! wall-clock time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fanout_lookup_lib::{parse_keys, FanOutCoordinator, LookupConfig, SourceKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator =
//!         FanOutCoordinator::for_source(SourceKind::GitHub, None, LookupConfig::default())?;
//!     let keys = parse_keys(&["PivotalSoftware", "CloudFoundry", "Spring-Projects"])?;
//!
//!     let outcome = coordinator.run_all(&keys).await?;
//!     println!("Elapsed time: {}ms", outcome.elapsed.as_millis());
//!     for result in &outcome.results {
//!         println!("{}: {}", result.key, result.payload);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **True fan-out**: every lookup is spawned before any is awaited
//! - **Event-driven join**: the caller wakes on completion, no sleep polling
//! - **Ordered, all-or-nothing results**: input order is kept, and any
//!   failure is reported as one aggregate naming every failed key
//! - **Pluggable sources**: GitHub users and Facebook pages out of the box,
//!   anything else through the [`LookupSource`] trait

// Custom sources implement `LookupSource` with this attribute
pub use async_trait::async_trait;
pub use config::{
    env_config_from, load_env_config, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
};
pub use coordinator::{CoordinatorState, FanOutCoordinator, FanOutRun};
pub use error::{AggregateError, FanOutError, TransportError};
pub use sources::{build_source, FacebookSource, GitHubSource, LookupSource};
pub use task::{LookupHandle, LookupTask};
pub use types::{
    AggregateOutcome, LookupConfig, LookupKey, LookupPayload, LookupResult, SourceKind, TaskState,
};
pub use utils::{parse_duration, parse_key_lines, parse_keys, read_keys_file};

// Public so custom sources can reuse the HTTP plumbing
pub mod sources;

mod config;
mod coordinator;
mod error;
mod task;
mod types;
mod utils;

pub type Result<T> = std::result::Result<T, FanOutError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
