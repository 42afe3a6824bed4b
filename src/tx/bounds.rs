//! Protocol bounds table
//!
//! Every limit the validator enforces lives here so that callers can pass an
//! explicit table (for example a testnet with different limits) instead of
//! relying on process-wide constants.

use super::TxKind;
use crate::error::{ValidationError, Violation};
use serde::{Deserialize, Serialize};

pub const MIN_ACCOUNT_INDEX: i64 = 0;
pub const MAX_ACCOUNT_INDEX: i64 = (1 << 48) - 2;
pub const MIN_API_KEY_INDEX: i64 = 0;
pub const MAX_API_KEY_INDEX: i64 = 254;
pub const MIN_NONCE: i64 = 0;
pub const MAX_TIMESTAMP: i64 = (1 << 48) - 1;
pub const MAX_MARKET_INDEX: i64 = 254;
pub const MAX_CLIENT_ORDER_INDEX: i64 = (1 << 48) - 1;
pub const MIN_ORDER_BASE_AMOUNT: i64 = 1;
pub const MAX_ORDER_BASE_AMOUNT: i64 = (1 << 48) - 1;
pub const MIN_ORDER_PRICE: u32 = 1;
pub const MAX_ORDER_PRICE: u32 = u32::MAX;
pub const MAX_ORDER_INDEX: i64 = (1 << 56) - 1;
pub const MAX_AMOUNT: i64 = (1 << 60) - 1;
pub const MAX_ASSET_INDEX: i64 = 255;
pub const MAX_ROUTE_TYPE: i64 = 1;
/// Margin fractions, fees and share rates are expressed in 1/10_000 units.
pub const FRACTION_TICK: i64 = 10_000;
pub const MAX_POOL_SHARES: i64 = (1 << 60) - 1;
/// Public keys are one quintic-extension element: 5 limbs of 8 bytes.
pub const PUB_KEY_LENGTH: usize = 40;
pub const MEMO_LENGTH: usize = 32;
pub const MIN_GROUPED_ORDERS: usize = 2;
pub const MAX_GROUPED_ORDERS: usize = 3;

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

impl Range {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: impl Into<i128>) -> bool {
        let value = value.into();
        value >= self.min as i128 && value <= self.max as i128
    }

    /// Check `value` against the range, naming `field` in the error.
    pub fn check(
        &self,
        kind: TxKind,
        field: &'static str,
        value: impl Into<i128>,
    ) -> Result<(), ValidationError> {
        let value = value.into();
        if self.contains(value) {
            Ok(())
        } else {
            Err(ValidationError::new(
                kind,
                field,
                Violation::OutOfRange {
                    value,
                    min: self.min as i128,
                    max: self.max as i128,
                },
            ))
        }
    }
}

/// Limits applied by the validator and the order builders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolBounds {
    pub account_index: Range,
    pub api_key_index: Range,
    pub nonce: Range,
    pub timestamp: Range,
    pub market_index: Range,
    pub client_order_index: Range,
    pub base_amount: Range,
    pub order_price: Range,
    pub order_index: Range,
    pub amount: Range,
    pub asset_index: Range,
    pub route_type: Range,
    pub margin_fraction: Range,
    pub operator_fee: Range,
    pub operator_share_rate: Range,
    pub pool_shares: Range,
    pub pub_key_length: usize,
    pub min_grouped_orders: usize,
    pub max_grouped_orders: usize,
}

impl Default for ProtocolBounds {
    fn default() -> Self {
        Self {
            account_index: Range::new(MIN_ACCOUNT_INDEX, MAX_ACCOUNT_INDEX),
            api_key_index: Range::new(MIN_API_KEY_INDEX, MAX_API_KEY_INDEX),
            nonce: Range::new(MIN_NONCE, i64::MAX),
            timestamp: Range::new(0, MAX_TIMESTAMP),
            market_index: Range::new(0, MAX_MARKET_INDEX),
            client_order_index: Range::new(0, MAX_CLIENT_ORDER_INDEX),
            base_amount: Range::new(MIN_ORDER_BASE_AMOUNT, MAX_ORDER_BASE_AMOUNT),
            order_price: Range::new(MIN_ORDER_PRICE as i64, MAX_ORDER_PRICE as i64),
            order_index: Range::new(0, MAX_ORDER_INDEX),
            amount: Range::new(1, MAX_AMOUNT),
            asset_index: Range::new(0, MAX_ASSET_INDEX),
            route_type: Range::new(0, MAX_ROUTE_TYPE),
            margin_fraction: Range::new(1, FRACTION_TICK),
            operator_fee: Range::new(0, FRACTION_TICK),
            operator_share_rate: Range::new(0, FRACTION_TICK),
            pool_shares: Range::new(1, MAX_POOL_SHARES),
            pub_key_length: PUB_KEY_LENGTH,
            min_grouped_orders: MIN_GROUPED_ORDERS,
            max_grouped_orders: MAX_GROUPED_ORDERS,
        }
    }
}

impl ProtocolBounds {
    /// Lowest accepted order price, as stored on the wire
    pub fn min_order_price(&self) -> u32 {
        clamp_to_u32(self.order_price.min)
    }

    /// Highest accepted order price, as stored on the wire
    pub fn max_order_price(&self) -> u32 {
        clamp_to_u32(self.order_price.max)
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}
