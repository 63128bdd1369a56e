//! Error types for pipeline stages and terminals.

use crate::core::stage::StageId;

/// The main error type for pipelines.
///
/// Failures never get retried: a stage that hits one of these stops, forwards
/// the error downstream and closes its output. The terminal at the end of the
/// chain is where the caller sees it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `reduce` was invoked on a flow that closed without yielding a value
    #[error("reduce on a flow that closed without yielding a value")]
    EmptyInput,

    /// A user supplied callback panicked inside a stage
    #[error("callback in stage {stage} panicked: {message}")]
    Callback { stage: StageId, message: String },

    /// The pipeline's cancellation token was triggered
    #[error("pipeline was cancelled")]
    Cancelled,

    /// The consumer of a flow went away before a send completed
    #[error("flow consumer disconnected")]
    Disconnected,
}

// Convenience constructors
impl Error {
    /// Create a callback error for the given stage
    pub fn callback<S: Into<String>>(stage: StageId, message: S) -> Self {
        Error::Callback {
            stage,
            message: message.into(),
        }
    }

    /// Whether this error was raised by a user callback rather than by the
    /// pipeline plumbing
    pub fn is_callback(&self) -> bool {
        matches!(self, Error::Callback { .. })
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::Disconnected
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::Disconnected
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;
