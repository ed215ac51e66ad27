//! # Livy Execution
//!
//! Runs blocks of Scala, Python, R or SQL on Apache Livy sessions and turns
//! what comes back into typed, display-ready results.
//!
//! A block is split into statements by [`livy_segment`], each statement is
//! submitted to a session owned by the [`SessionManager`], polled to
//! completion by the [`StatementExecutor`] and classified by the
//! [`OutputClassifier`]. The [`ExecutionCoordinator`] drives the whole run
//! and stops at the first failing statement.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use livy_client::{LivyClient, LivyConfig};
//! use livy_exec::{ExecutionConfig, ExecutionCoordinator, SessionManager};
//! use livy_segment::SourceKind;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LivyClient::new(LivyConfig::new("http://localhost:8998"))?;
//!     let manager = SessionManager::start(Arc::new(client), ExecutionConfig::default()).await;
//!
//!     let scala = ExecutionCoordinator::standalone(SourceKind::Scala, manager.clone());
//!     let run = scala.run("val x = 1\nx + 1").await;
//!     for result in &run.results {
//!         println!("{:?}: {}", result.kind, result.data());
//!     }
//!
//!     scala.close().await?;
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod coordinator;
mod error;
mod output;
mod session;
mod statement;
mod types;
mod version;

#[cfg(test)]
mod tests;

pub use coordinator::{Binding, ExecutionCoordinator};
pub use error::{Error, ErrorKind};
pub use output::{truncate_field, OutputClassifier, HTML_MIME, JSON_MIME, LIVY_TABLE_MIME, TEXT_MIME};
pub use session::{Released, Session, SessionKey, SessionManager};
pub use statement::{error_trace, StatementExecutor};
pub use types::{
    session_kind_for, statement_kind_for, ExecutionConfig, Payload, RawOutput, ResultKind,
    RunResult, Termination, TypedResult,
};
pub use version::{CapabilitySet, Feature, LivyVersion, VersionGate};

/// Result type for execution operations
pub type Result<T> = std::result::Result<T, Error>;
