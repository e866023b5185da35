//! Error types for the netump-core crate.

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("datagram too short: {actual} bytes (minimum {min})")]
    DatagramTooShort { min: usize, actual: usize },

    #[error("bad signature: 0x{0:08X}")]
    BadSignature(u32),

    #[error("truncated command payload: need {need} bytes, got {got}")]
    TruncatedPayload { need: usize, got: usize },

    #[error("invitation name field of {name_words} words exceeds payload of {payload_words} words")]
    NameExceedsPayload {
        name_words: usize,
        payload_words: usize,
    },

    #[error("invalid text in {field}")]
    InvalidText { field: &'static str },

    #[error("UMP data payload of {words} words exceeds the {max}-word command limit")]
    UmpDataTooLong { words: usize, max: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("endpoint name must not be empty")]
    EmptyName,

    #[error("endpoint name too long: {actual} bytes (maximum {max} including terminator)")]
    NameTooLong { max: usize, actual: usize },

    #[error("product instance ID must not be empty")]
    EmptyProductInstanceId,

    #[error("product instance ID too long: {actual} bytes (maximum {max} including terminator)")]
    ProductInstanceIdTooLong { max: usize, actual: usize },

    #[error("{field} must not contain NUL bytes")]
    EmbeddedNul { field: &'static str },
}
