mod common;

use common::{client, composer, config, MockExchange};
use lighter_signer::tx::bounds::{MAX_ACCOUNT_INDEX, MAX_API_KEY_INDEX};
use lighter_signer::tx::{
    build_and_validate, BurnShares, CancelOrder, CreateOrder, MintShares, OrderIntent,
    OrderRequest, OrderType, ProtocolBounds, TimeInForce, TxBody, TxHeader,
};
use lighter_signer::{Identity, NonceCoordinator, Transaction, TxRequest};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn header(nonce: i64) -> TxHeader {
    TxHeader {
        account_index: 100,
        api_key_index: 5,
        expired_at: 1_760_000_000_000,
        nonce,
    }
}

fn order(price: u32) -> CreateOrder {
    CreateOrder {
        market_index: 3,
        client_order_index: 12,
        base_amount: 2_500,
        price,
        is_ask: false,
        order_type: OrderType::Limit,
        time_in_force: TimeInForce::GoodTillTime,
        reduce_only: false,
        trigger_price: 0,
        order_expiry: 1_762_000_000_000,
    }
}

#[test]
fn digest_is_deterministic() {
    let c = composer(&config(100, 5));
    let a = Transaction::new(header(9), order(1_234));
    let b = Transaction::new(header(9), order(1_234));

    assert_eq!(c.digest(&a, 304).unwrap(), c.digest(&a, 304).unwrap());
    assert_eq!(c.digest(&a, 304).unwrap(), c.digest(&b, 304).unwrap());
}

#[test]
fn nonce_changes_digest() {
    let c = composer(&config(100, 5));
    let digests: HashSet<_> = (0..16)
        .map(|nonce| {
            c.digest(&Transaction::new(header(nonce), order(1_234)), 304)
                .unwrap()
        })
        .collect();
    assert_eq!(digests.len(), 16);
}

#[test]
fn identical_fields_different_kinds_differ() {
    let c = composer(&config(100, 5));
    let mint = Transaction::new(
        header(1),
        MintShares {
            public_pool_index: 4,
            share_amount: 1_000,
        },
    );
    let burn = Transaction::new(
        header(1),
        BurnShares {
            public_pool_index: 4,
            share_amount: 1_000,
        },
    );
    assert_ne!(c.digest(&mint, 304).unwrap(), c.digest(&burn, 304).unwrap());
}

#[test]
fn single_field_change_changes_digest() {
    let c = composer(&config(100, 5));
    let base = c
        .digest(&Transaction::new(header(1), order(1_234)), 304)
        .unwrap();

    let mut flipped = order(1_234);
    flipped.is_ask = true;
    let other = c.digest(&Transaction::new(header(1), flipped), 304).unwrap();
    assert_ne!(base, other);
}

#[test]
fn bounds_rejections_name_the_field() {
    let bounds = ProtocolBounds::default();
    let cancel = CancelOrder {
        market_index: 0,
        index: 1,
    };

    let mut h = header(0);
    h.account_index = MAX_ACCOUNT_INDEX + 1;
    let err = Transaction::new(h, cancel.clone())
        .validate(&bounds)
        .unwrap_err();
    assert_eq!(err.field, "account_index");

    let mut h = header(0);
    h.api_key_index = (MAX_API_KEY_INDEX + 1) as u8;
    let err = Transaction::new(h, cancel).validate(&bounds).unwrap_err();
    assert_eq!(err.field, "api_key_index");

    let err = Transaction::new(header(0), order(0))
        .validate(&bounds)
        .unwrap_err();
    assert_eq!(err.field, "price");
}

#[test]
fn custom_bounds_tighten_price_range() {
    let mut bounds = ProtocolBounds::default();
    bounds.order_price.max = 1_000;
    let err = Transaction::new(header(0), order(1_001))
        .validate(&bounds)
        .unwrap_err();
    assert_eq!(err.field, "price");
}

fn market(is_buy: bool) -> TxRequest {
    TxRequest::CreateOrder(OrderRequest {
        market_index: 1,
        client_order_index: 0,
        base_amount: 10,
        is_buy,
        reduce_only: false,
        order_expiry: 0,
        intent: OrderIntent::Market,
    })
}

#[test]
fn market_orders_take_the_extreme_price() {
    let bounds = ProtocolBounds::default();
    let identity = Identity::new(1, 0);

    for (is_buy, expected) in [(true, u32::MAX), (false, 1)] {
        let draft = build_and_validate(market(is_buy), identity, 1_000, &bounds).unwrap();
        match draft.body() {
            TxBody::CreateOrder(order) => {
                assert_eq!(order.price, expected);
                assert_eq!(order.order_type, OrderType::Market);
                assert_eq!(order.is_ask, !is_buy);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }
}

#[tokio::test]
async fn concurrent_allocations_through_client_are_contiguous() {
    let exchange = MockExchange::at(1_000);
    let client = Arc::new(client(exchange.clone(), config(9, 9)));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.prepare(market(true)).await })
        })
        .collect();

    let mut nonces = Vec::new();
    for handle in handles {
        nonces.push(handle.await.unwrap().unwrap().transaction().nonce());
    }
    nonces.sort_unstable();

    assert_eq!(nonces, (1_000..1_032).collect::<Vec<_>>());
    assert_eq!(exchange.nonce_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rollback_returns_same_nonce() {
    let coordinator = NonceCoordinator::new(MockExchange::at(77));
    let identity = Identity::new(3, 1);

    let k = coordinator.allocate(identity).await.unwrap();
    coordinator.acknowledge_failure(identity, k).await;
    assert_eq!(coordinator.allocate(identity).await.unwrap(), k);
}

#[tokio::test]
async fn out_of_order_failure_keeps_skew_until_resync() {
    let exchange = MockExchange::at(0);
    let coordinator = NonceCoordinator::new(exchange.clone());
    let identity = Identity::new(3, 1);

    let older = coordinator.allocate(identity).await.unwrap();
    let newer = coordinator.allocate(identity).await.unwrap();
    coordinator.acknowledge_success(identity, newer).await;
    coordinator.acknowledge_failure(identity, older).await;

    assert_eq!(coordinator.allocate(identity).await.unwrap(), 2);

    exchange.baseline.store(1, Ordering::SeqCst);
    coordinator.resync(identity).await.unwrap();
    assert_eq!(coordinator.allocate(identity).await.unwrap(), 1);
}
