//! # Livy Notebook
//!
//! Runs notebook paragraphs written in Scala, Python, R or SQL on an Apache
//! Livy server. A [`Notebook`] groups one coordinator per language over a
//! single session manager, the way a notebook interpreter group does.
//!
//! ```rust,no_run
//! use livy_notebook::{Notebook, NotebookConfig, SourceKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let notebook = Notebook::connect(NotebookConfig::new("http://localhost:8998")).await?;
//!     let run = notebook.run(SourceKind::Sql, "select 1 as one").await;
//!     for result in &run.results {
//!         println!("{}", result.data());
//!     }
//!     notebook.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
mod notebook;

pub use config::{NotebookConfig, DEFAULT_LIVY_URL};
pub use error::Error;
pub use livy_exec::{ErrorKind, Payload, ResultKind, RunResult, TypedResult};
pub use livy_segment::SourceKind;
pub use notebook::Notebook;

pub type Result<T> = std::result::Result<T, Error>;
