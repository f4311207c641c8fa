use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// Failures surfaced by the coordination layer and its collaborators.
///
/// User input problems (empty names, insufficient photos, unknown delete
/// targets) are handled with re-prompts and never become a `SessionError`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Encoding store I/O failed; non-retryable for the current invocation.
    #[error("encoding store failure: {0}")]
    Store(String),

    /// The oracle could not extract faces from one photo. Scoped to that
    /// photo; callers skip it rather than abort the batch.
    #[error("face extraction failed: {0}")]
    Extraction(String),

    /// The messaging transport could not deliver an outgoing message.
    #[error("outbound delivery failed: {0}")]
    Outbound(String),

    /// A collaborator was handed an argument that violates its contract.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub(crate) fn io_error(err: std::io::Error) -> SessionError {
    SessionError::Store(err.to_string())
}

pub(crate) fn serde_error(err: serde_json::Error) -> SessionError {
    SessionError::Store(err.to_string())
}

pub(crate) fn invalid_input(msg: impl Into<String>) -> SessionError {
    SessionError::InvalidInput(msg.into())
}
