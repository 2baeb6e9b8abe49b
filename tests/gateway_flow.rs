//! End-to-end admission: JSON-lines intake, filter chain, accepted-order channel.

mod common;

use alloy::primitives::U256;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use order_relay::chain::{AccountStore, ChainAccessor};
use order_relay::config::{CutoffBoundary, GatewayConfig};
use order_relay::gateway::{forward_json_lines, CutoffCache, CutoffLookup, FilterChain, Gateway, GatewayStats, Order, OrderState};

use common::{relay_config, signed_order, start_mock_node, PROTOCOL};

/// Feed `lines` through intake and gateway, returning the gateway stats and every published state.
async fn admit(config: &GatewayConfig, cutoffs: Arc<CutoffCache>, lines: String) -> (GatewayStats, Vec<OrderState>) {
    let (inbound_tx, inbound_rx) = mpsc::channel::<Order>(config.inbound_capacity);
    let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let gateway = Gateway::new(FilterChain::from_config(config, cutoffs), accepted_tx);
    let gateway_task = tokio::spawn(gateway.run(inbound_rx, shutdown_rx));

    let intake = forward_json_lines(lines.as_bytes(), inbound_tx).await.unwrap();
    let stats = gateway_task.await.unwrap();
    assert_eq!(intake.forwarded, stats.received);

    let mut published = Vec::new();
    while let Some(state) = accepted_rx.recv().await {
        published.push(state);
    }
    (stats, published)
}

fn json_lines(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| serde_json::to_string(o).unwrap() + "\n")
        .collect()
}

#[tokio::test]
async fn test_valid_order_published_once_with_hash() {
    let config = relay_config("http://127.0.0.1:1").gateway;
    let order = signed_order(10, 1_700_000_000);

    let (stats, published) = admit(&config, Arc::new(CutoffCache::new()), json_lines(&[order.clone()])).await;

    assert_eq!(stats.accepted, 1);
    assert_eq!(published.len(), 1);
    let state = &published[0];
    assert_eq!(state.hash(), Some(order.generate_hash()));
    assert_eq!(state.raw_order.owner, order.owner);
    assert!(state.raw_order.price.is_some());
    assert!(state.dealt_amount_s.is_zero() && state.cancelled_amount_b.is_zero());
}

#[tokio::test]
async fn test_mixed_stream() {
    let config = relay_config("http://127.0.0.1:1").gateway;

    let good = signed_order(10, 1_700_000_000);
    let low_fee = signed_order(1, 1_700_000_000);
    let mut tampered = signed_order(10, 1_700_000_000);
    tampered.amount_b += U256::from(1);

    let mut lines = json_lines(&[good.clone(), low_fee, tampered, good]);
    lines.push_str("{ not an order }\n");

    let (stats, published) = admit(&config, Arc::new(CutoffCache::new()), lines).await;
    assert_eq!(
        stats,
        GatewayStats {
            received: 4,
            accepted: 2,
            rejected: 2
        }
    );
    assert_eq!(published.len(), 2);
}

#[tokio::test]
async fn test_cutoff_from_chain() {
    let node = start_mock_node(10).await;
    let mut relay = relay_config(&node.url);
    relay.gateway.cutoff.enabled = true;
    relay.gateway.cutoff.boundary = CutoffBoundary::Strict;
    let accessor = ChainAccessor::new(&relay, AccountStore::new()).unwrap();

    let old = signed_order(10, 1_600_000_000);
    let fresh = signed_order(10, 1_700_000_000);
    node.state.set_call_result("cutoffs(address)", common::uint_word(1_650_000_000));

    let cutoffs = Arc::new(CutoffCache::new());
    let count = cutoffs
        .refresh_from_chain(&accessor, PROTOCOL, [old.owner])
        .await
        .unwrap();
    assert_eq!(count, 1);

    let (stats, published) = admit(&relay.gateway, cutoffs, json_lines(&[old, fresh.clone()])).await;
    assert_eq!(stats.rejected, 1);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].raw_order.timestamp, fresh.timestamp);
}

#[tokio::test]
async fn test_watched_cutoffs_follow_the_chain() {
    let node = start_mock_node(10).await;
    let relay = relay_config(&node.url);
    let accessor = ChainAccessor::new(&relay, AccountStore::new()).unwrap();
    let owner = signed_order(10, 1_600_000_000).owner;

    node.state.set_call_result("cutoffs(address)", common::uint_word(1_650_000_000));
    let cutoffs = CutoffCache::new();
    cutoffs.refresh_from_chain(&accessor, PROTOCOL, [owner]).await.unwrap();
    assert_eq!(cutoffs.watched_len(), 1);
    assert_eq!(cutoffs.cutoff(&PROTOCOL, &owner), Some(U256::from(1_650_000_000u64)));

    // Owner moves the cutoff forward
    node.state.set_call_result("cutoffs(address)", common::uint_word(1_750_000_000));
    assert_eq!(cutoffs.refresh_watched(&accessor).await, 0);
    assert_eq!(cutoffs.cutoff(&PROTOCOL, &owner), Some(U256::from(1_750_000_000u64)));

    // A failed read keeps the last value
    node.state.set_revert("cutoffs(address)");
    assert_eq!(cutoffs.refresh_watched(&accessor).await, 1);
    assert_eq!(cutoffs.cutoff(&PROTOCOL, &owner), Some(U256::from(1_750_000_000u64)));
}
