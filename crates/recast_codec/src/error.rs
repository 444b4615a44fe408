//! Codec error type.

use recast_core::RecastError;

/// Codec result type
pub type CodecResult<T> = Result<T, CodecError>;

/// Fault surfaced to the caller of an export or import session.
///
/// Per-object faults go to the session's fault sink instead; only I/O on the
/// underlying sink or source and cursor exhaustion reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The byte sink or source failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A resolution, invocation or input fault
    #[error(transparent)]
    Fault(#[from] RecastError),

    /// The session was already closed
    #[error("Session closed")]
    Closed,
}

impl CodecError {
    /// Whether this is the end-of-roots signal from an import session
    #[must_use]
    pub fn is_out_of_roots(&self) -> bool {
        matches!(self, Self::Fault(RecastError::OutOfRoots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_roots_detection() {
        assert!(CodecError::from(RecastError::OutOfRoots).is_out_of_roots());
        assert!(!CodecError::Closed.is_out_of_roots());
    }

    #[test]
    fn test_io_error_display() {
        let err = CodecError::from(std::io::Error::other("disk gone"));
        assert!(err.to_string().contains("disk gone"));
    }
}
