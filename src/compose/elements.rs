//! Field-element projection of a transaction
//!
//! Layout: chain id, kind discriminant, nonce, expiry, account index,
//! API key index, then the body's fields in declaration order. Byte fields
//! expand into several elements: public keys as canonical 8-byte limbs,
//! memos as 4-byte limbs.

use crate::crypto::field::{canonical_le_limbs, packed_u32_limbs, Felt};
use crate::error::EncodingError;
use crate::tx::{CreateOrder, Transaction, TxBody};

pub fn project(tx: &Transaction, chain_id: u32) -> Result<Vec<Felt>, EncodingError> {
    let header = tx.header();
    let mut elems = Vec::with_capacity(16);

    elems.push(Felt::from_u32(chain_id));
    elems.push(Felt::from_u32(tx.kind().as_u8() as u32));
    elems.push(Felt::from_i64(header.nonce));
    elems.push(Felt::from_i64(header.expired_at));
    elems.push(Felt::from_i64(header.account_index));
    elems.push(Felt::from_u32(header.api_key_index as u32));

    match tx.body() {
        TxBody::ChangePubKey(body) => {
            elems.extend(canonical_le_limbs("pub_key", &body.pub_key)?);
        }
        TxBody::CreateSubAccount(_) => {}
        TxBody::CreatePublicPool(body) => {
            elems.push(Felt::from_i64(body.operator_fee));
            elems.push(Felt::from_i64(body.initial_total_shares));
            elems.push(Felt::from_i64(body.min_operator_share_rate));
        }
        TxBody::UpdatePublicPool(body) => {
            elems.push(Felt::from_i64(body.public_pool_index));
            elems.push(Felt::from_u32(body.status.as_u8() as u32));
            elems.push(Felt::from_i64(body.operator_fee));
            elems.push(Felt::from_i64(body.min_operator_share_rate));
        }
        TxBody::Transfer(body) => {
            elems.push(Felt::from_i64(body.to_account_index));
            elems.push(Felt::from_i64(body.asset_index as i64));
            elems.push(Felt::from_u32(body.from_route_type as u32));
            elems.push(Felt::from_u32(body.to_route_type as u32));
            elems.push(Felt::from_i64(body.amount));
            elems.push(Felt::from_i64(body.usdc_fee));
            elems.extend(packed_u32_limbs("memo", &body.memo)?);
        }
        TxBody::Withdraw(body) => {
            elems.push(Felt::from_i64(body.asset_index as i64));
            elems.push(Felt::from_u32(body.route_type as u32));
            elems.push(Felt::from_i64(body.amount));
        }
        TxBody::CreateOrder(order) => push_order(&mut elems, order),
        TxBody::CancelOrder(body) => {
            elems.push(Felt::from_i64(body.market_index as i64));
            elems.push(Felt::from_i64(body.index));
        }
        TxBody::CancelAllOrders(body) => {
            elems.push(Felt::from_u32(body.time_in_force.as_u8() as u32));
            elems.push(Felt::from_i64(body.time));
        }
        TxBody::ModifyOrder(body) => {
            elems.push(Felt::from_i64(body.market_index as i64));
            elems.push(Felt::from_i64(body.index));
            elems.push(Felt::from_i64(body.base_amount));
            elems.push(Felt::from_u32(body.price));
            elems.push(Felt::from_u32(body.trigger_price));
        }
        TxBody::MintShares(body) => {
            elems.push(Felt::from_i64(body.public_pool_index));
            elems.push(Felt::from_i64(body.share_amount));
        }
        TxBody::BurnShares(body) => {
            elems.push(Felt::from_i64(body.public_pool_index));
            elems.push(Felt::from_i64(body.share_amount));
        }
        TxBody::UpdateLeverage(body) => {
            elems.push(Felt::from_i64(body.market_index as i64));
            elems.push(Felt::from_u32(body.initial_margin_fraction as u32));
            elems.push(Felt::from_u32(body.margin_mode.as_u8() as u32));
        }
        TxBody::CreateGroupedOrders(body) => {
            elems.push(Felt::from_u32(body.grouping_type.as_u8() as u32));
            elems.push(Felt::from_u64(body.orders.len() as u64));
            for order in &body.orders {
                push_order(&mut elems, order);
            }
        }
        TxBody::UpdateMargin(body) => {
            elems.push(Felt::from_i64(body.market_index as i64));
            elems.push(Felt::from_i64(body.usdc_amount));
            elems.push(Felt::from_u32(body.direction.as_u8() as u32));
        }
    }

    Ok(elems)
}

fn push_order(elems: &mut Vec<Felt>, order: &CreateOrder) {
    elems.push(Felt::from_i64(order.market_index as i64));
    elems.push(Felt::from_i64(order.client_order_index));
    elems.push(Felt::from_i64(order.base_amount));
    elems.push(Felt::from_u32(order.price));
    elems.push(Felt::from_bool(order.is_ask));
    elems.push(Felt::from_u32(order.order_type.as_u8() as u32));
    elems.push(Felt::from_u32(order.time_in_force.as_u8() as u32));
    elems.push(Felt::from_bool(order.reduce_only));
    elems.push(Felt::from_u32(order.trigger_price));
    elems.push(Felt::from_i64(order.order_expiry));
}
