//! Public pool transactions

use super::bounds::ProtocolBounds;
use super::{wire_enum, TxHeader, TxKind, TxSpec};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum PoolStatus {
        Active = 0,
        Paused = 1,
        Closed = 2,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePublicPool {
    /// Fee in 1/10_000 units
    pub operator_fee: i64,
    pub initial_total_shares: i64,
    pub min_operator_share_rate: i64,
}

impl TxSpec for CreatePublicPool {
    const KIND: TxKind = TxKind::CreatePublicPool;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        bounds
            .operator_fee
            .check(Self::KIND, "operator_fee", self.operator_fee)?;
        bounds.pool_shares.check(
            Self::KIND,
            "initial_total_shares",
            self.initial_total_shares,
        )?;
        bounds.operator_share_rate.check(
            Self::KIND,
            "min_operator_share_rate",
            self.min_operator_share_rate,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePublicPool {
    pub public_pool_index: i64,
    pub status: PoolStatus,
    pub operator_fee: i64,
    pub min_operator_share_rate: i64,
}

impl TxSpec for UpdatePublicPool {
    const KIND: TxKind = TxKind::UpdatePublicPool;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        bounds
            .account_index
            .check(Self::KIND, "public_pool_index", self.public_pool_index)?;
        bounds
            .operator_fee
            .check(Self::KIND, "operator_fee", self.operator_fee)?;
        bounds.operator_share_rate.check(
            Self::KIND,
            "min_operator_share_rate",
            self.min_operator_share_rate,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintShares {
    pub public_pool_index: i64,
    pub share_amount: i64,
}

impl TxSpec for MintShares {
    const KIND: TxKind = TxKind::MintShares;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        check_share_movement(Self::KIND, self.public_pool_index, self.share_amount, bounds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnShares {
    pub public_pool_index: i64,
    pub share_amount: i64,
}

impl TxSpec for BurnShares {
    const KIND: TxKind = TxKind::BurnShares;

    fn validate(&self, _header: &TxHeader, bounds: &ProtocolBounds) -> Result<(), ValidationError> {
        check_share_movement(Self::KIND, self.public_pool_index, self.share_amount, bounds)
    }
}

fn check_share_movement(
    kind: TxKind,
    pool_index: i64,
    share_amount: i64,
    bounds: &ProtocolBounds,
) -> Result<(), ValidationError> {
    bounds
        .account_index
        .check(kind, "public_pool_index", pool_index)?;
    bounds.pool_shares.check(kind, "share_amount", share_amount)
}
