use thiserror::Error;

/// Failures surfaced by the schema table and the codec.
///
/// Offsets are absolute positions in the buffer handed to the decoder,
/// including for fields of nested messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("malformed encoding at byte {offset}: {reason}")]
    MalformedEncoding { offset: usize, reason: String },

    #[error("truncated input at byte {offset}: {needed} more byte(s) needed")]
    TruncatedInput { offset: usize, needed: usize },
}

impl CodecError {
    pub(crate) fn schema(reason: impl Into<String>) -> Self {
        CodecError::SchemaViolation(reason.into())
    }

    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        CodecError::MalformedEncoding {
            offset,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
