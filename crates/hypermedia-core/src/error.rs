//! Error types for the hypermedia core.

use thiserror::Error;

use crate::types::ContentId;

/// Core errors raised while parsing, deriving, encoding or decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid resource id: {0}")]
    InvalidId(String),

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("invalid content id: {0}")]
    InvalidContentId(String),

    #[error("malformed blob: {0}")]
    MalformedBlob(String),

    #[error("content id mismatch: expected {expected}, got {actual}")]
    ContentIdMismatch {
        expected: ContentId,
        actual: ContentId,
    },
}

/// Validation errors for blob structure and signatures.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("signature verification failed")]
    SignatureFailed,

    #[error("genesis change must have timestamp 0, got {0}")]
    GenesisTimestamp(u64),

    #[error("change must declare at least one dependency")]
    MissingDependencies,

    #[error("change depth must be at least 1, got {0}")]
    InvalidDepth(u64),

    #[error("op count {declared} does not match {actual} operations")]
    OpCountMismatch { declared: u64, actual: usize },

    #[error("duplicate reference {0}")]
    DuplicateReference(ContentId),

    #[error("comment must target at least one version")]
    MissingVersion,

    #[error("capability cannot delegate to its own issuer")]
    SelfDelegation,

    #[error("structural error: {0}")]
    StructuralError(String),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureFailed
            }
            other => ValidationError::StructuralError(other.to_string()),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
