//! Batched transaction and receipt lookups against the mock node.

mod common;

use alloy::network::TransactionResponse;
use std::time::Duration;

use order_relay::chain::{
    AccountStore, BatchTransactionRecipientReq, BatchTransactionReq, ChainAccessor, ChainError,
};

use common::{relay_config, start_mock_node, tx_hash};

fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

#[tokio::test]
async fn test_one_unknown_hash_only_fails_its_slot() {
    let node = start_mock_node(20).await;
    let accessor = ChainAccessor::new(&relay_config(&node.url), AccountStore::new()).unwrap();

    let mut hashes: Vec<_> = (0..10).map(|i| tx_hash(i, i % 2)).collect();
    let unknown = tx_hash(999, 0);
    hashes[4] = unknown;

    for batch_size in [1usize, 3, 4, 10, 16] {
        node.state.reset_round_trips();
        let mut reqs = BatchTransactionReq::from_hashes(hashes.clone());
        accessor.batch_transactions(batch_size, &mut reqs).await.unwrap();

        assert_eq!(node.state.round_trips(), ceil_div(hashes.len(), batch_size), "batch size {}", batch_size);
        for (i, req) in reqs.iter().enumerate() {
            assert!(req.is_done());
            if i == 4 {
                assert!(matches!(req.error(), Some(ChainError::NotFound { what: "transaction", .. })));
                assert!(req.payload().is_none());
            } else {
                let tx = req.payload().expect("transaction");
                assert_eq!(tx.tx_hash(), hashes[i]);
                assert_eq!(tx.block_number(), Some(i as u64));
                assert_eq!(tx.transaction_index(), Some((i % 2) as u64));
                assert!(req.error().is_none());
            }
        }
    }
}

#[tokio::test]
async fn test_zero_batch_size_is_one_round_trip() {
    let node = start_mock_node(20).await;
    let accessor = ChainAccessor::new(&relay_config(&node.url), AccountStore::new()).unwrap();

    let mut reqs = BatchTransactionRecipientReq::from_hashes((0..7).map(|i| tx_hash(i, 0)));
    accessor.batch_transaction_receipts(0, &mut reqs).await.unwrap();

    assert_eq!(node.state.round_trips(), 1);
    assert!(reqs.iter().all(|r| r.payload().is_some()));
}

#[tokio::test]
async fn test_receipts_keep_request_order() {
    let node = start_mock_node(20).await;
    let accessor = ChainAccessor::new(&relay_config(&node.url), AccountStore::new()).unwrap();

    let hashes = vec![tx_hash(5, 1), tx_hash(2, 0), tx_hash(500, 0), tx_hash(9, 1), tx_hash(1, 0)];
    let mut reqs = BatchTransactionRecipientReq::from_hashes(hashes.clone());
    accessor.batch_transaction_receipts(2, &mut reqs).await.unwrap();

    assert_eq!(node.state.round_trips(), 3);
    for (req, hash) in reqs.iter().zip(&hashes) {
        assert_eq!(req.tx_hash, *hash);
        if let Some(receipt) = req.payload() {
            assert_eq!(receipt.transaction_hash, *hash);
        }
    }
    assert!(reqs[2].error().is_some());
    // Odd transaction indexes fail in the mock chain
    assert!(reqs[1].payload().unwrap().status());
    assert!(!reqs[0].payload().unwrap().status());
    assert_eq!(reqs[3].payload().unwrap().block_number, Some(9));
}

#[tokio::test]
async fn test_empty_request_list() {
    let node = start_mock_node(5).await;
    let accessor = ChainAccessor::new(&relay_config(&node.url), AccountStore::new()).unwrap();

    let mut reqs: Vec<BatchTransactionReq> = Vec::new();
    accessor.batch_transactions(4, &mut reqs).await.unwrap();
    assert_eq!(node.state.round_trips(), 0);
}

#[tokio::test]
async fn test_slow_node_times_out_per_request() {
    let node = start_mock_node(5).await;
    let mut config = relay_config(&node.url);
    config.chain.rpc_timeout_secs = 1;
    let accessor = ChainAccessor::new(&config, AccountStore::new()).unwrap();

    node.state.set_delay(Some(Duration::from_millis(1500)));
    let mut reqs = BatchTransactionReq::from_hashes((0..3).map(|i| tx_hash(i, 0)));
    accessor.batch_transactions(0, &mut reqs).await.unwrap();

    assert!(reqs
        .iter()
        .all(|r| matches!(r.error(), Some(ChainError::Timeout { .. }))));
}

#[tokio::test]
async fn test_unreachable_node_fails_the_call() {
    let config = relay_config("http://127.0.0.1:1");
    let accessor = ChainAccessor::new(&config, AccountStore::new()).unwrap();

    let mut reqs = BatchTransactionReq::from_hashes((0..3).map(|i| tx_hash(i, 0)));
    let err = accessor.batch_transactions(2, &mut reqs).await.unwrap_err();
    assert!(err.is_transport());
}
