//! Racing transport scenarios

use alloy_primitives::TxHash;
use snipe_race::race::{
    BroadcastRacer, ConfirmationRacer, EndpointProbe, EndpointSet, RaceError, SubmissionOutcome,
};
use snipe_race::rpc::{ChainRpc, SignedTransaction};
use snipe_race::testkit::{receipt, MockRpc};
use std::sync::Arc;
use std::time::Duration;

fn set(mocks: Vec<Arc<MockRpc>>) -> EndpointSet {
    EndpointSet::new(mocks.into_iter().map(|m| m as Arc<dyn ChainRpc>).collect()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_probe_selects_fastest_reachable() {
    let endpoints = set(vec![
        Arc::new(MockRpc::new("http://a").height_after(Duration::from_millis(50), 100)),
        Arc::new(MockRpc::new("http://b").height_after(Duration::from_millis(10), 100)),
        Arc::new(MockRpc::new("http://c").unreachable()),
    ]);

    let primary = EndpointProbe::new(Duration::from_secs(1))
        .probe_and_select(&endpoints)
        .await;
    assert_eq!(primary.endpoint().url, "http://b");
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_then_confirm_across_endpoints() {
    let hash = TxHash::repeat_byte(0xab);
    let endpoints = set(vec![
        Arc::new(MockRpc::new("http://a").rejects("replacement transaction underpriced")),
        Arc::new(
            MockRpc::new("http://b")
                .accepts_after(Duration::from_millis(20), hash)
                .receipt_after_polls(5, receipt(hash, 200)),
        ),
        Arc::new(
            MockRpc::new("http://c")
                .accepts_after(Duration::from_millis(40), hash)
                .receipt_after_polls(2, receipt(hash, 200)),
        ),
    ]);

    let tx = SignedTransaction::with_hash(vec![0x02, 0xf8], hash);
    let outcome = BroadcastRacer::new(Duration::from_secs(2))
        .broadcast(&tx, &endpoints)
        .await;

    let (accepted, endpoint) = outcome.into_result().unwrap();
    assert_eq!(accepted, hash);
    assert_eq!(endpoint.url, "http://b");

    let found = ConfirmationRacer::new(Duration::from_millis(100), Duration::from_secs(1))
        .confirm(accepted, &endpoints, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(found.block_number, 200);
}

#[tokio::test(start_paused = true)]
async fn test_all_rejected_surfaces_every_failure() {
    let endpoints = set(vec![
        Arc::new(MockRpc::new("http://a").rejects("nonce too low")),
        Arc::new(MockRpc::new("http://b").rejects("nonce too low")),
    ]);

    let outcome = BroadcastRacer::new(Duration::from_secs(1))
        .broadcast(&SignedTransaction::new(vec![0x02]), &endpoints)
        .await;
    assert!(matches!(outcome, SubmissionOutcome::Failed { ref failures } if failures.len() == 2));

    match outcome.into_result() {
        Err(RaceError::AllEndpointsFailed(failures)) => {
            let urls: Vec<_> = failures.iter().map(|f| f.endpoint.url.as_str()).collect();
            assert!(urls.contains(&"http://a"));
            assert!(urls.contains(&"http://b"));
        }
        other => panic!("expected AllEndpointsFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_timeout_when_nobody_has_receipt() {
    let endpoints = set(vec![
        Arc::new(MockRpc::new("http://a")),
        Arc::new(MockRpc::new("http://b")),
    ]);

    let err = ConfirmationRacer::new(Duration::from_millis(100), Duration::from_secs(1))
        .confirm(TxHash::repeat_byte(0x01), &endpoints, Duration::from_secs(2))
        .await
        .unwrap_err();
    assert!(matches!(err, RaceError::ConfirmationTimeout { .. }));
}
