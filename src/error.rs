//! Error types for the transaction engine
//!
//! Every failure here is recoverable by the caller: fix the input and retry,
//! or call `NonceCoordinator::resync`.

use crate::tx::{Identity, TxKind};
use thiserror::Error;

/// Structured description of what is wrong with a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Value outside the inclusive range `[min, max]`
    OutOfRange { value: i128, min: i128, max: i128 },
    /// A non-zero / non-empty value is required
    Required,
    /// The field must be zero (nil) for this combination of flags
    MustBeZero,
    /// A boolean flag must be set for this order type
    MustBeSet,
    /// Byte field or collection has the wrong length
    InvalidLength { expected: String, actual: usize },
    /// Combination of enum values is not accepted by the protocol
    Unsupported(String),
    /// Field disagrees with a sibling field
    Mismatch(String),
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::OutOfRange { value, min, max } => {
                write!(f, "{} is outside [{}, {}]", value, min, max)
            }
            Violation::Required => write!(f, "value is required"),
            Violation::MustBeZero => write!(f, "must be zero"),
            Violation::MustBeSet => write!(f, "must be set"),
            Violation::InvalidLength { expected, actual } => {
                write!(f, "expected length {}, got {}", expected, actual)
            }
            Violation::Unsupported(what) => write!(f, "unsupported: {}", what),
            Violation::Mismatch(what) => write!(f, "mismatch: {}", what),
        }
    }
}

/// A transaction field failed a protocol invariant. Never submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} `{field}`: {violation}")]
pub struct ValidationError {
    pub kind: TxKind,
    pub field: &'static str,
    pub violation: Violation,
}

impl ValidationError {
    pub fn new(kind: TxKind, field: &'static str, violation: Violation) -> Self {
        Self {
            kind,
            field,
            violation,
        }
    }
}

/// Byte-level problems while projecting a transaction into field elements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("field `{field}` must be a multiple of {chunk} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        chunk: usize,
        actual: usize,
    },

    #[error("field `{field}` limb {limb} is not a canonical field element")]
    NonCanonical { field: &'static str, limb: usize },

    #[error("transaction digest changed after signing ({kind})")]
    DigestMismatch { kind: TxKind },
}

/// The signing backend rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("signing backend failed: {0}")]
    Backend(String),

    #[error("{0} requires an L1 signature but no L1 signer was supplied")]
    MissingExternalSigner(TxKind),

    #[error("{0} does not take an L1 signature")]
    ExternalNotApplicable(TxKind),

    #[error("signature recovery failed: {0}")]
    Recovery(String),
}

/// Failures owned by the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// The nonce baseline could not be fetched from the server.
#[derive(Debug, Error)]
#[error("nonce baseline unavailable for {identity}: {source}")]
pub struct NonceDesyncError {
    pub identity: Identity,
    #[source]
    pub source: TransportError,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    NonceDesync(#[from] NonceDesyncError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
