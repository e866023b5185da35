//! Endpoint error types.

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("failed to open UDP socket: {0}")]
    Socket(#[from] std::io::Error),

    #[error("an initiator requires a remote target address")]
    MissingTarget,
}
