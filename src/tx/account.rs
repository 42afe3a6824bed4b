//! Account-level transactions: key rotation, sub-accounts, transfers,
//! withdrawals, leverage and margin updates.

use super::bounds::{ProtocolBounds, MEMO_LENGTH};
use super::{wire, wire_enum, SignatureRequirement, TxHeader, TxKind, TxSpec};
use crate::error::{ValidationError, Violation};
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum MarginMode {
        Cross = 0,
        Isolated = 1,
    }
}

wire_enum! {
    pub enum MarginDirection {
        Add = 0,
        Remove = 1,
    }
}

/// Rotate the public key registered for `header.api_key_index`.
///
/// Requires an L1 signature proving control of the account's Ethereum address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePubKey {
    #[serde(serialize_with = "wire::hex_bytes", deserialize_with = "wire::hex_vec")]
    pub pub_key: Vec<u8>,
}

impl TxSpec for ChangePubKey {
    const KIND: TxKind = TxKind::ChangePubKey;
    const SIGNATURES: SignatureRequirement = SignatureRequirement::LocalAndExternal;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        if self.pub_key.len() != bounds.pub_key_length {
            return Err(ValidationError::new(
                Self::KIND,
                "pub_key",
                Violation::InvalidLength {
                    expected: bounds.pub_key_length.to_string(),
                    actual: self.pub_key.len(),
                },
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubAccount {}

impl TxSpec for CreateSubAccount {
    const KIND: TxKind = TxKind::CreateSubAccount;

    fn validate(&self, _header: &TxHeader, _bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Move collateral between accounts. Requires an L1 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to_account_index: i64,
    pub asset_index: i16,
    pub from_route_type: u8,
    pub to_route_type: u8,
    pub amount: i64,
    pub usdc_fee: i64,
    #[serde(serialize_with = "wire::hex_bytes", deserialize_with = "wire::hex_array32")]
    pub memo: [u8; MEMO_LENGTH],
}

impl TxSpec for Transfer {
    const KIND: TxKind = TxKind::Transfer;
    const SIGNATURES: SignatureRequirement = SignatureRequirement::LocalAndExternal;

    fn validate(&self, header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        let kind = Self::KIND;
        bounds
            .account_index
            .check(kind, "to_account_index", self.to_account_index)?;
        if self.to_account_index == header.account_index
            && self.from_route_type == self.to_route_type
        {
            return Err(ValidationError::new(
                kind,
                "to_account_index",
                Violation::Mismatch("transfer to the sending account on the same route".into()),
            ));
        }
        bounds
            .asset_index
            .check(kind, "asset_index", self.asset_index)?;
        bounds
            .route_type
            .check(kind, "from_route_type", self.from_route_type)?;
        bounds
            .route_type
            .check(kind, "to_route_type", self.to_route_type)?;
        bounds.amount.check(kind, "amount", self.amount)?;
        if self.usdc_fee < 0 || self.usdc_fee > bounds.amount.max {
            return Err(ValidationError::new(
                kind,
                "usdc_fee",
                Violation::OutOfRange {
                    value: self.usdc_fee as i128,
                    min: 0,
                    max: bounds.amount.max as i128,
                },
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub asset_index: i16,
    pub route_type: u8,
    pub amount: i64,
}

impl TxSpec for Withdraw {
    const KIND: TxKind = TxKind::Withdraw;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        bounds
            .asset_index
            .check(Self::KIND, "asset_index", self.asset_index)?;
        bounds
            .route_type
            .check(Self::KIND, "route_type", self.route_type)?;
        bounds.amount.check(Self::KIND, "amount", self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLeverage {
    pub market_index: i16,
    /// Initial margin in 1/10_000 units: 500 means 5%, i.e. 20x
    pub initial_margin_fraction: u16,
    pub margin_mode: MarginMode,
}

impl TxSpec for UpdateLeverage {
    const KIND: TxKind = TxKind::UpdateLeverage;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        bounds
            .market_index
            .check(Self::KIND, "market_index", self.market_index)?;
        bounds.margin_fraction.check(
            Self::KIND,
            "initial_margin_fraction",
            self.initial_margin_fraction,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMargin {
    pub market_index: i16,
    pub usdc_amount: i64,
    pub direction: MarginDirection,
}

impl TxSpec for UpdateMargin {
    const KIND: TxKind = TxKind::UpdateMargin;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        bounds
            .market_index
            .check(Self::KIND, "market_index", self.market_index)?;
        bounds
            .amount
            .check(Self::KIND, "usdc_amount", self.usdc_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::bounds::PUB_KEY_LENGTH;

    fn header() -> TxHeader {
        TxHeader {
            account_index: 10,
            api_key_index: 2,
            expired_at: 1_700_000_000_000,
            nonce: 4,
        }
    }

    #[test]
    fn change_pub_key_rejects_short_key() {
        let bounds = ProtocolBounds::default();
        let short = ChangePubKey {
            pub_key: vec![0u8; PUB_KEY_LENGTH - 1],
        };
        let err = short.validate(&header(), &bounds).unwrap_err();
        assert_eq!(err.field, "pub_key");
        assert_eq!(
            err.violation,
            Violation::InvalidLength {
                expected: "40".into(),
                actual: 39
            }
        );

        let ok = ChangePubKey {
            pub_key: vec![0u8; PUB_KEY_LENGTH],
        };
        ok.validate(&header(), &bounds).unwrap();
    }

    #[test]
    fn transfer_to_self_on_same_route_is_rejected() {
        let bounds = ProtocolBounds::default();
        let transfer = Transfer {
            to_account_index: 10,
            asset_index: 0,
            from_route_type: 0,
            to_route_type: 0,
            amount: 100_000_000,
            usdc_fee: 0,
            memo: [0u8; MEMO_LENGTH],
        };
        let err = transfer.validate(&header(), &bounds).unwrap_err();
        assert_eq!(err.field, "to_account_index");

        let cross_route = Transfer {
            to_route_type: 1,
            ..transfer
        };
        cross_route.validate(&header(), &bounds).unwrap();
    }

    #[test]
    fn transfer_rejects_negative_fee() {
        let transfer = Transfer {
            to_account_index: 456,
            asset_index: 0,
            from_route_type: 0,
            to_route_type: 0,
            amount: 1,
            usdc_fee: -1,
            memo: [0u8; MEMO_LENGTH],
        };
        let err = transfer
            .validate(&header(), &ProtocolBounds::default())
            .unwrap_err();
        assert_eq!(err.field, "usdc_fee");
    }

    #[test]
    fn leverage_fraction_must_be_positive() {
        let update = UpdateLeverage {
            market_index: 0,
            initial_margin_fraction: 0,
            margin_mode: MarginMode::Cross,
        };
        let err = update
            .validate(&header(), &ProtocolBounds::default())
            .unwrap_err();
        assert_eq!(err.field, "initial_margin_fraction");
    }

    #[test]
    fn memo_travels_as_hex() {
        let mut memo = [0u8; MEMO_LENGTH];
        memo[..4].copy_from_slice(b"rent");
        let transfer = Transfer {
            to_account_index: 456,
            asset_index: 0,
            from_route_type: 0,
            to_route_type: 0,
            amount: 5,
            usdc_fee: 0,
            memo,
        };
        let value = serde_json::to_value(&transfer).unwrap();
        let hex = value["memo"].as_str().unwrap();
        assert!(hex.starts_with("72656e74"));
        assert_eq!(hex.len(), 64);
    }
}
