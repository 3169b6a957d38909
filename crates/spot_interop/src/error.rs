// crates/spot_interop/src/error.rs
//! Error types for host interop.

use std::fmt;

use thiserror::Error;

/// Error type for everything that talks to the host or guards a host call.
#[derive(Debug, Error)]
pub enum InteropError {
    /// The host returned `false` from an action request.
    #[error("host rejected {request} for '{target}'")]
    HostCommunication {
        request: &'static str,
        target: String,
    },

    /// A local precondition failed before the host was contacted.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A named entry the caller required does not exist.
    #[error("variable '{0}' not found")]
    NotFound(String),

    /// Text could not be parsed into the variable's numeric kind.
    #[error("cannot parse '{text}' for variable '{name}'")]
    Parse { name: String, text: String },

    /// A batch operation attempted every entry and some of them failed.
    #[error(
        "{} of {attempted} variables failed to {operation}; first: {}",
        .failures.len(),
        first_failure(.failures)
    )]
    Batch {
        operation: &'static str,
        attempted: usize,
        failures: Vec<BatchFailure>,
    },
}

impl InteropError {
    pub(crate) fn host(request: &'static str, target: impl Into<String>) -> Self {
        InteropError::HostCommunication {
            request,
            target: target.into(),
        }
    }

    pub(crate) fn read_only(name: &str) -> Self {
        InteropError::InvalidOperation(format!("the variable ({name}) is a read only variable"))
    }

    /// True for errors raised without contacting the host.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            InteropError::InvalidOperation(_)
                | InteropError::NotFound(_)
                | InteropError::Parse { .. }
        )
    }
}

/// One failed entry of a batch save or restore.
#[derive(Debug)]
pub struct BatchFailure {
    pub name: String,
    pub error: InteropError,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

fn first_failure(failures: &[BatchFailure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

/// Result type for host interop operations.
pub type Result<T> = std::result::Result<T, InteropError>;
