//! Transaction model and validator
//!
//! One body type per transaction kind, wrapped in [`TxBody`]. A
//! [`Transaction`] pairs a body with the common [`TxHeader`] and cannot be
//! changed once constructed; to alter a field, build a new one.
//!
//! Validation is pure. [`build_and_validate`] runs it on a [`TxDraft`] that
//! has no nonce yet, so a rejected request never consumes a sequence number.

mod account;
pub mod bounds;
mod order;
mod pool;
mod request;

pub use account::{
    ChangePubKey, CreateSubAccount, MarginDirection, MarginMode, Transfer, UpdateLeverage,
    UpdateMargin, Withdraw,
};
pub use bounds::{ProtocolBounds, Range};
pub use order::{
    slippage_price, CancelAllOrders, CancelAllTimeInForce, CancelOrder, CreateGroupedOrders,
    CreateOrder, GroupingType, ModifyOrder, OrderType, TimeInForce,
};
pub use pool::{BurnShares, CreatePublicPool, MintShares, PoolStatus, UpdatePublicPool};
pub use request::{build_and_validate, OrderIntent, OrderRequest, TxRequest};

use crate::error::{ValidationError, Violation};
use serde::{Deserialize, Serialize};

/// Declares a `#[repr(u8)]` enum that travels as its numeric value.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            pub const fn as_u8(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(value: u8) -> std::result::Result<Self, u8> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(other),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_u8(self.as_u8())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = <u8 as serde::Deserialize>::deserialize(deserializer)?;
                $name::try_from(raw).map_err(|v| {
                    serde::de::Error::custom(format!("invalid {} value {}", stringify!($name), v))
                })
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    /// Transaction kind discriminant, hashed right after the chain id
    pub enum TxKind {
        ChangePubKey = 8,
        CreateSubAccount = 9,
        CreatePublicPool = 10,
        UpdatePublicPool = 11,
        Transfer = 12,
        Withdraw = 13,
        CreateOrder = 14,
        CancelOrder = 15,
        CancelAllOrders = 16,
        ModifyOrder = 17,
        MintShares = 18,
        BurnShares = 19,
        UpdateLeverage = 20,
        CreateGroupedOrders = 28,
        UpdateMargin = 29,
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which signatures a kind must carry at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRequirement {
    /// L2 signature over the digest only
    Local,
    /// L2 signature plus an L1 signature over the rendered template
    LocalAndExternal,
}

impl SignatureRequirement {
    pub fn count(self) -> usize {
        match self {
            SignatureRequirement::Local => 1,
            SignatureRequirement::LocalAndExternal => 2,
        }
    }

    pub fn needs_external(self) -> bool {
        matches!(self, SignatureRequirement::LocalAndExternal)
    }
}

/// The unit of nonce sequencing: (account index, API key slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub account_index: i64,
    pub api_key_index: u8,
}

impl Identity {
    pub fn new(account_index: i64, api_key_index: u8) -> Self {
        Self {
            account_index,
            api_key_index,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "account {}/key {}", self.account_index, self.api_key_index)
    }
}

/// Fields shared by every transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHeader {
    pub account_index: i64,
    pub api_key_index: u8,
    /// Absolute expiry of the transaction, milliseconds since the epoch
    pub expired_at: i64,
    pub nonce: i64,
}

impl TxHeader {
    pub fn identity(&self) -> Identity {
        Identity::new(self.account_index, self.api_key_index)
    }

    fn validate(&self, kind: TxKind, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        bounds
            .account_index
            .check(kind, "account_index", self.account_index)?;
        bounds
            .api_key_index
            .check(kind, "api_key_index", self.api_key_index)?;
        bounds.nonce.check(kind, "nonce", self.nonce)?;
        bounds.timestamp.check(kind, "expired_at", self.expired_at)
    }
}

/// Per-kind contract: discriminant, signature needs and field invariants.
pub trait TxSpec {
    const KIND: TxKind;
    const SIGNATURES: SignatureRequirement = SignatureRequirement::Local;

    fn validate(&self, header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError>;
}

macro_rules! tx_bodies {
    ($($variant:ident),+ $(,)?) => {
        /// Kind-specific payload of a transaction
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        #[serde(untagged)]
        pub enum TxBody {
            $($variant($variant)),+
        }

        impl TxBody {
            pub fn kind(&self) -> TxKind {
                match self {
                    $(TxBody::$variant(_) => <$variant as TxSpec>::KIND),+
                }
            }

            pub fn signature_requirement(&self) -> SignatureRequirement {
                match self {
                    $(TxBody::$variant(_) => <$variant as TxSpec>::SIGNATURES),+
                }
            }

            fn validate(&self, header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
                match self {
                    $(TxBody::$variant(body) => body.validate(header, bounds)),+
                }
            }
        }

        $(
            impl From<$variant> for TxBody {
                fn from(body: $variant) -> Self {
                    TxBody::$variant(body)
                }
            }
        )+
    };
}

tx_bodies!(
    ChangePubKey,
    CreateSubAccount,
    CreatePublicPool,
    UpdatePublicPool,
    Transfer,
    Withdraw,
    CreateOrder,
    CancelOrder,
    CancelAllOrders,
    ModifyOrder,
    MintShares,
    BurnShares,
    UpdateLeverage,
    CreateGroupedOrders,
    UpdateMargin,
);

/// An immutable transaction: header plus kind-specific body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    header: TxHeader,
    body: TxBody,
}

impl Transaction {
    /// Assemble a transaction without validating it. See [`Transaction::validate`].
    pub fn new(header: TxHeader, body: impl Into<TxBody>) -> Self {
        Self {
            header,
            body: body.into(),
        }
    }

    pub fn kind(&self) -> TxKind {
        self.body.kind()
    }

    pub fn header(&self) -> &TxHeader {
        &self.header
    }

    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn identity(&self) -> Identity {
        self.header.identity()
    }

    pub fn nonce(&self) -> i64 {
        self.header.nonce
    }

    pub fn signature_requirement(&self) -> SignatureRequirement {
        self.body.signature_requirement()
    }

    /// Check every field invariant for this kind. Pure.
    pub fn validate(&self, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        let kind = self.kind();
        self.header.validate(kind, bounds)?;
        self.body.validate(&self.header, bounds)
    }
}

/// A validated transaction still waiting for its nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxDraft {
    identity: Identity,
    expired_at: i64,
    body: TxBody,
}

impl TxDraft {
    pub(crate) fn new(identity: Identity, expired_at: i64, body: TxBody) -> Self {
        Self {
            identity,
            expired_at,
            body,
        }
    }

    pub fn kind(&self) -> TxKind {
        self.body.kind()
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn body(&self) -> &TxBody {
        &self.body
    }

    fn header(&self, nonce: i64) -> TxHeader {
        TxHeader {
            account_index: self.identity.account_index,
            api_key_index: self.identity.api_key_index,
            expired_at: self.expired_at,
            nonce,
        }
    }

    /// Validate the draft as if it carried the lowest legal nonce.
    pub(crate) fn validate(&self, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        let header = self.header(bounds.nonce.min);
        header.validate(self.kind(), bounds)?;
        self.body.validate(&header, bounds)
    }

    /// Bind an allocated nonce, producing the final immutable transaction.
    pub fn with_nonce(
        self,
        nonce: i64,
        bounds: &ProtocolBounds,
    ) -> Result<Transaction, ValidationError> {
        bounds.nonce.check(self.kind(), "nonce", nonce)?;
        let header = self.header(nonce);
        Ok(Transaction {
            header,
            body: self.body,
        })
    }
}

pub(crate) fn require_zero(
    kind: TxKind,
    field: &'static str,
    value: impl Into<i128>,
) -> Result<(), ValidationError> {
    if value.into() == 0 {
        Ok(())
    } else {
        Err(ValidationError::new(kind, field, Violation::MustBeZero))
    }
}

/// Serde helpers for the exchange's wire conventions
pub(crate) mod wire {
    use alloy::hex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn bool_as_u8<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    /// Accepts `true`/`false` or `0`/`1`.
    pub fn bool_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Bool(bool),
            Int(u8),
        }

        match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => Ok(b),
            Flag::Int(0) => Ok(false),
            Flag::Int(1) => Ok(true),
            Flag::Int(other) => Err(serde::de::Error::custom(format!(
                "flag must be 0 or 1, got {}",
                other
            ))),
        }
    }

    pub fn hex_bytes<S: Serializer, T: AsRef<[u8]>>(
        value: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value.as_ref()))
    }

    pub fn hex_vec<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(trimmed).map_err(serde::de::Error::custom)
    }

    pub fn hex_array32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let bytes = hex_vec(deserializer)?;
        <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
            serde::de::Error::custom(format!("expected 32 bytes, got {}", bytes.len()))
        })
    }
}
