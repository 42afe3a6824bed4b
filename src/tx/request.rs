//! Caller-facing requests and the build-and-validate entry point
//!
//! Requests describe intent ("market buy 1 ETH"); the builder turns them into
//! wire bodies, filling in the fields the protocol dictates (aggressive price
//! for market orders, reduce-only for stop-loss / take-profit) before the
//! validator runs.

use super::bounds::ProtocolBounds;
use super::order::slippage_price;
use super::{
    BurnShares, CancelAllOrders, CancelOrder, ChangePubKey, CreateGroupedOrders, CreateOrder,
    CreatePublicPool, CreateSubAccount, GroupingType, Identity, MintShares, ModifyOrder,
    OrderType, TimeInForce, Transfer, TxBody, TxDraft, UpdateLeverage, UpdateMargin,
    UpdatePublicPool, Withdraw,
};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// How an order should be priced and triggered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderIntent {
    Limit {
        price: u32,
        time_in_force: TimeInForce,
    },
    /// Priced at the extreme bound in the direction of aggression
    Market,
    /// Immediate-or-cancel limit at `reference_price` shifted by `slippage_bps`
    MarketWithSlippage {
        reference_price: String,
        slippage_bps: u32,
    },
    StopLoss {
        trigger_price: u32,
    },
    StopLossLimit {
        price: u32,
        trigger_price: u32,
    },
    TakeProfit {
        trigger_price: u32,
    },
    TakeProfitLimit {
        price: u32,
        trigger_price: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub market_index: i16,
    #[serde(default)]
    pub client_order_index: i64,
    pub base_amount: i64,
    pub is_buy: bool,
    #[serde(default)]
    pub reduce_only: bool,
    /// Resting expiry for GTT and conditional orders, ms since the epoch
    #[serde(default)]
    pub order_expiry: i64,
    pub intent: OrderIntent,
}

impl OrderRequest {
    pub fn into_order(self, bounds: &ProtocolBounds) -> Result<CreateOrder, ValidationError> {
        let aggressive = if self.is_buy {
            bounds.max_order_price()
        } else {
            bounds.min_order_price()
        };

        let (order_type, price, time_in_force, trigger_price) = match self.intent {
            OrderIntent::Limit {
                price,
                time_in_force,
            } => (OrderType::Limit, price, time_in_force, 0),
            OrderIntent::Market => (
                OrderType::Market,
                aggressive,
                TimeInForce::ImmediateOrCancel,
                0,
            ),
            OrderIntent::MarketWithSlippage {
                ref reference_price,
                slippage_bps,
            } => (
                OrderType::Limit,
                slippage_price(reference_price, slippage_bps, self.is_buy, bounds)?,
                TimeInForce::ImmediateOrCancel,
                0,
            ),
            OrderIntent::StopLoss { trigger_price } => (
                OrderType::StopLoss,
                aggressive,
                TimeInForce::ImmediateOrCancel,
                trigger_price,
            ),
            OrderIntent::StopLossLimit {
                price,
                trigger_price,
            } => (
                OrderType::StopLossLimit,
                price,
                TimeInForce::GoodTillTime,
                trigger_price,
            ),
            OrderIntent::TakeProfit { trigger_price } => (
                OrderType::TakeProfit,
                aggressive,
                TimeInForce::ImmediateOrCancel,
                trigger_price,
            ),
            OrderIntent::TakeProfitLimit {
                price,
                trigger_price,
            } => (
                OrderType::TakeProfitLimit,
                price,
                TimeInForce::GoodTillTime,
                trigger_price,
            ),
        };

        let immediate =
            time_in_force == TimeInForce::ImmediateOrCancel && !order_type.is_conditional();

        Ok(CreateOrder {
            market_index: self.market_index,
            client_order_index: self.client_order_index,
            base_amount: self.base_amount,
            price,
            is_ask: !self.is_buy,
            order_type,
            time_in_force,
            reduce_only: self.reduce_only || order_type.is_conditional(),
            trigger_price,
            order_expiry: if immediate { 0 } else { self.order_expiry },
        })
    }
}

/// Everything a caller can ask the engine to build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxRequest {
    CreateOrder(OrderRequest),
    ModifyOrder(ModifyOrder),
    CancelOrder(CancelOrder),
    CancelAllOrders(CancelAllOrders),
    CreateGroupedOrders {
        grouping_type: GroupingType,
        orders: Vec<OrderRequest>,
    },
    Transfer(Transfer),
    Withdraw(Withdraw),
    ChangePubKey(ChangePubKey),
    CreateSubAccount,
    UpdateLeverage(UpdateLeverage),
    UpdateMargin(UpdateMargin),
    CreatePublicPool(CreatePublicPool),
    UpdatePublicPool(UpdatePublicPool),
    MintShares(MintShares),
    BurnShares(BurnShares),
}

impl TxRequest {
    fn into_body(self, bounds: &ProtocolBounds) -> Result<TxBody, ValidationError> {
        Ok(match self {
            TxRequest::CreateOrder(order) => order.into_order(bounds)?.into(),
            TxRequest::ModifyOrder(body) => body.into(),
            TxRequest::CancelOrder(body) => body.into(),
            TxRequest::CancelAllOrders(body) => body.into(),
            TxRequest::CreateGroupedOrders {
                grouping_type,
                orders,
            } => CreateGroupedOrders {
                grouping_type,
                orders: orders
                    .into_iter()
                    .map(|order| order.into_order(bounds))
                    .collect::<Result<Vec<_>, _>>()?,
            }
            .into(),
            TxRequest::Transfer(body) => body.into(),
            TxRequest::Withdraw(body) => body.into(),
            TxRequest::ChangePubKey(body) => body.into(),
            TxRequest::CreateSubAccount => CreateSubAccount {}.into(),
            TxRequest::UpdateLeverage(body) => body.into(),
            TxRequest::UpdateMargin(body) => body.into(),
            TxRequest::CreatePublicPool(body) => body.into(),
            TxRequest::UpdatePublicPool(body) => body.into(),
            TxRequest::MintShares(body) => body.into(),
            TxRequest::BurnShares(body) => body.into(),
        })
    }
}

/// Turn a request into a validated draft. No nonce is consumed here; bind
/// one afterwards with [`TxDraft::with_nonce`].
pub fn build_and_validate(
    request: TxRequest,
    identity: Identity,
    expired_at: i64,
    bounds: &ProtocolBounds,
) -> Result<TxDraft, ValidationError> {
    let body = request.into_body(bounds)?;
    let draft = TxDraft::new(identity, expired_at, body);
    draft.validate(bounds)?;
    tracing::debug!(
        kind = %draft.kind(),
        account_index = identity.account_index,
        api_key_index = identity.api_key_index,
        "Transaction draft validated"
    );
    Ok(draft)
}
