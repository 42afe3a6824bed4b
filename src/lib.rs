//! Lighter transaction engine
//!
//! Client-side core for submitting transactions to the Lighter L2 exchange:
//! - [`tx`]: transaction kinds, protocol bounds and the validator
//! - [`compose`]: field-element hashing plus local and L1 signatures
//! - [`nonce`]: optimistic per-identity nonce coordination
//! - [`client`]: orchestration over the [`transport`] collaborators
//!
//! # Security Model
//!
//! - Private keys live only inside signer implementations
//! - Keys and signatures are never logged
//! - The digest is recomputed before every submission

pub mod client;
pub mod compose;
pub mod config;
pub mod crypto;
pub mod nonce;
pub mod transport;
pub mod tx;

mod error;

// Re-export commonly used types
pub use client::SignerClient;
pub use compose::{Composer, SignedTransaction};
pub use config::{Credentials, EngineConfig, Network};
pub use error::{
    EncodingError, Error, NonceDesyncError, Result, SigningError, TransportError,
    ValidationError, Violation,
};
pub use nonce::{NonceCoordinator, NonceRecord};
pub use tx::{Identity, Transaction, TxKind, TxRequest};
