//! Human-readable messages signed by the L1 key
//!
//! Integers render as zero-padded 16-digit hex. The exchange re-renders the
//! same text and recovers the signer, so any byte of drift invalidates the
//! signature.

use crate::tx::{Transaction, TxBody};
use alloy::hex;

fn hex64(value: i64) -> String {
    format!("0x{:016x}", value as u64)
}

/// Render the message for kinds that carry an L1 signature, `None` otherwise.
pub fn render(tx: &Transaction, chain_id: u32) -> Option<String> {
    let header = tx.header();
    match tx.body() {
        TxBody::ChangePubKey(body) => Some(format!(
            "Register Lighter Account\n\n\
             pubkey: 0x{}\n\
             nonce: {}\n\
             account index: {}\n\
             api key index: {}\n\
             Only sign this message for a trusted client!",
            hex::encode(&body.pub_key),
            hex64(header.nonce),
            hex64(header.account_index),
            hex64(header.api_key_index as i64),
        )),
        TxBody::Transfer(body) => Some(format!(
            "Transfer\n\n\
             nonce: {}\n\
             from: {} (route {})\n\
             api key: {}\n\
             to: {} (route {})\n\
             asset: {}\n\
             amount: {}\n\
             fee: {}\n\
             chainId: {}\n\
             memo: {}\n\
             Only sign this message for a trusted client!",
            hex64(header.nonce),
            hex64(header.account_index),
            hex64(body.from_route_type as i64),
            hex64(header.api_key_index as i64),
            hex64(body.to_account_index),
            hex64(body.to_route_type as i64),
            hex64(body.asset_index as i64),
            hex64(body.amount),
            hex64(body.usdc_fee),
            hex64(chain_id as i64),
            hex::encode(body.memo),
        )),
        _ => None,
    }
}
