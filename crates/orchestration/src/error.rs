//! Error types for orchestration.
//!
//! Only one failure is ever tolerated by the engine (a delete during undo on a
//! command configured to catch it). Everything else propagates and aborts the
//! current phase, so the variants here carry enough context for an operator
//! to see what failed and what had already been applied.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The two phases an orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Create/update resources, ascending execute-rank.
    Deploy,
    /// Delete resources, descending undo-rank.
    Undo,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Undo => write!(f, "undo"),
        }
    }
}

/// Errors that can occur while orchestrating commands.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The management API rejected or failed a request.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// HTTP status code if one was received.
        status: Option<u16>,
    },

    /// IO error while reading resource files.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A resource file could not be interpreted by the resource manager.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The worker pool for async file processing could not be created.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// A unit of work submitted to the worker pool failed.
    #[error("task {label} failed: {source}")]
    TaskFailed {
        /// Label of the task (usually the file path).
        label: String,
        /// What went wrong.
        #[source]
        source: Box<Error>,
    },

    /// A configured restart deadline elapsed before the server came back.
    #[error("server did not finish restarting within {waited:?}")]
    RestartTimeout {
        /// How long we waited.
        waited: Duration,
    },

    /// A command failed and the rest of the phase was abandoned.
    #[error("{phase} aborted at command '{command}' after {} completed command(s): {source}", .completed.len())]
    PhaseAborted {
        /// Phase that was running.
        phase: Phase,
        /// Command whose failure aborted the phase.
        command: String,
        /// Commands that completed before the failure, in run order.
        completed: Vec<String>,
        /// The failure.
        #[source]
        source: Box<Error>,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }

    /// Whether the underlying failure came from the management API.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::TaskFailed { source, .. } | Self::PhaseAborted { source, .. } => {
                source.is_transport()
            }
            _ => false,
        }
    }

    /// The failure underneath any task or phase wrappers.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::TaskFailed { source, .. } | Self::PhaseAborted { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Names of the commands that completed before a phase was aborted.
    pub fn completed_commands(&self) -> &[String] {
        match self {
            Self::PhaseAborted { completed, .. } => completed,
            _ => &[],
        }
    }
}
