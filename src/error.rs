//! Error type shared by every fallible entry point.

use thiserror::Error;

use crate::index::TapeId;

/// Which side of the API contract was broken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The calling program violated a documented precondition.
    Usage,
    /// An engine invariant does not hold.
    Internal,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AdError {
    #[error("a recording ({active}) is already active on this thread")]
    AlreadyRecording { active: TapeId },

    #[error("no recording is active on this thread")]
    NotRecording,

    #[error("cannot freeze a recording with no independent variables")]
    EmptyDomain,

    #[error("{what} has length {actual}, expected {expected}")]
    DomainMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("order {requested} requested but only {available} Taylor orders have been computed")]
    StaleOrder { requested: usize, available: usize },

    #[error("variable from tape {tape} used on a thread that does not own that recording")]
    ForeignVariable { tape: TapeId },

    #[error("array index {index} out of range for VecAD of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("atomic function `{name}` failed in {stage}: {message}")]
    AtomicFailed {
        name: String,
        stage: &'static str,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AdError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdError::Internal(_) => ErrorKind::Internal,
            _ => ErrorKind::Usage,
        }
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        AdError::Internal(msg.into())
    }
}

/// Abort an operator overload that cannot return a `Result`.
#[cold]
#[track_caller]
pub(crate) fn fatal(err: AdError) -> ! {
    panic!("{err}")
}
