//! Error types for buffer operations.

/// Result type alias for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;

/// Buffer operation error.
///
/// Every variant is surfaced directly to the caller of `produce` or
/// `consume`. A failed call leaves the buffer untouched, so any thread may
/// keep using it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// The call was rejected before any state was touched.
    #[error("buffer: invalid argument: {0}")]
    InvalidArgument(String),

    /// The calling handle's cancel token fired while the call was blocked.
    #[error("buffer: operation cancelled")]
    Cancelled,
}

impl BufferError {
    /// Returns true if this error came from cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BufferError::Cancelled)
    }
}
