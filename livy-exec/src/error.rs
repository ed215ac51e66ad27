use livy_client::SessionId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Session was not ready after {0:?}")]
    SessionCreateTimeout(Duration),

    #[error("Session creation failed: {message}")]
    SessionCreateFailed { message: String, log: Vec<String> },

    #[error("Session {0} already has a statement in flight")]
    SessionNotIdle(SessionId),

    #[error("Session {0} is dead")]
    SessionDead(SessionId),

    #[error("Statement did not finish within {0:?}")]
    ExecutionTimeout(Duration),

    #[error("Execution failed: {0}")]
    ExecutionError(String),

    #[error("Execution cancelled")]
    ExecutionCancelled,

    #[error("Version discovery unavailable: {0}")]
    VersionDiscoveryUnavailable(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Session manager stopped")]
    ManagerStopped,

    #[error("Transport error: {0}")]
    Transport(#[from] livy_client::Error),
}

/// Failure category of an [`Error`], cheap to copy into results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SessionCreateTimeout,
    SessionCreateFailed,
    SessionNotIdle,
    SessionDead,
    ExecutionTimeout,
    ExecutionError,
    ExecutionCancelled,
    VersionDiscoveryUnavailable,
    Unsupported,
    ManagerStopped,
    Transport,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SessionCreateTimeout(_) => ErrorKind::SessionCreateTimeout,
            Error::SessionCreateFailed { .. } => ErrorKind::SessionCreateFailed,
            Error::SessionNotIdle(_) => ErrorKind::SessionNotIdle,
            Error::SessionDead(_) => ErrorKind::SessionDead,
            Error::ExecutionTimeout(_) => ErrorKind::ExecutionTimeout,
            Error::ExecutionError(_) => ErrorKind::ExecutionError,
            Error::ExecutionCancelled => ErrorKind::ExecutionCancelled,
            Error::VersionDiscoveryUnavailable(_) => ErrorKind::VersionDiscoveryUnavailable,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::ManagerStopped => ErrorKind::ManagerStopped,
            Error::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Same failure for another waiter of a shared session creation
    pub(crate) fn for_waiter(&self) -> Error {
        match self {
            Error::SessionCreateTimeout(timeout) => Error::SessionCreateTimeout(*timeout),
            Error::SessionCreateFailed { message, log } => Error::SessionCreateFailed {
                message: message.clone(),
                log: log.clone(),
            },
            Error::ManagerStopped => Error::ManagerStopped,
            other => Error::SessionCreateFailed {
                message: other.to_string(),
                log: Vec::new(),
            },
        }
    }
}
