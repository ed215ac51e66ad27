//! # Livy Client
//!
//! Async client for the [Apache Livy](https://livy.apache.org) REST API.
//! It creates interactive Spark sessions, submits statements, polls them
//! and cancels them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use livy_client::{CreateSessionRequest, LivyClient, LivyConfig, LivyTransport, SessionKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LivyConfig::new("http://localhost:8998");
//!     let client = LivyClient::new(config)?;
//!
//!     let session = client
//!         .create_session(&CreateSessionRequest::new(SessionKind::PySpark))
//!         .await?;
//!     println!("Session {} is {:?}", session.id, session.state);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every call returns [`Error`]. A 404 from the server is reported as
//! [`Error::NotFound`], any other non-2xx status as [`Error::Api`].

pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use client::LivyClient;
pub use config::LivyConfig;
pub use error::Error;
pub use transport::LivyTransport;
pub use types::*;

/// Result type for Livy client operations
pub type Result<T> = std::result::Result<T, Error>;
