//! Error types for RECAST.

/// Core result type
pub type RecastResult<T> = Result<T, RecastError>;

/// Fault raised while resolving, invoking or decoding an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecastError {
    /// No operation or constructor matches the name and arguments
    #[error("No operation {operation} on {target} accepts ({arguments})")]
    ResolutionFailure {
        /// Target type name
        target: String,
        /// Operation name
        operation: String,
        /// Runtime argument types, comma separated
        arguments: String,
    },

    /// Two or more candidates share the minimal distance
    #[error("Ambiguous call to {operation} on {target}: {candidates} candidates tie")]
    AmbiguousResolution {
        /// Target type name
        target: String,
        /// Operation name
        operation: String,
        /// Number of tied candidates
        candidates: usize,
    },

    /// The resolved operation itself faulted
    #[error("{operation} failed: {cause}")]
    InvocationFailure {
        /// Operation name
        operation: String,
        /// Unwrapped cause reported by the invoker
        cause: String,
    },

    /// The wire tree violates the expected node or attribute shape
    #[error("Malformed input at {position}: {reason}")]
    MalformedInput {
        /// Byte offset or node description
        position: String,
        /// What was wrong
        reason: String,
    },

    /// The import cursor has no further completed root
    #[error("No more roots to read")]
    OutOfRoots,
}

impl RecastError {
    /// Build a resolution failure for `operation` on `target`
    #[must_use]
    pub fn resolution(target: impl Into<String>, operation: &str, arguments: String) -> Self {
        Self::ResolutionFailure {
            target: target.into(),
            operation: operation.to_string(),
            arguments,
        }
    }

    /// Build an invocation failure carrying `cause`
    #[must_use]
    pub fn invocation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::InvocationFailure {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Build a malformed-input fault
    #[must_use]
    pub fn malformed(position: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            position: position.to_string(),
            reason: reason.into(),
        }
    }
}

/// Fault raised inside a registered invoker.
///
/// The resolver unwraps it into [`RecastError::InvocationFailure`] for the
/// operation that was called.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CallError(pub String);

impl CallError {
    /// Create a call error from any message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<RecastError> for CallError {
    fn from(err: RecastError) -> Self {
        match err {
            RecastError::InvocationFailure { cause, .. } => Self(cause),
            other => Self(other.to_string()),
        }
    }
}
