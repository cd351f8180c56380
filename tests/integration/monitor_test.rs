//! Exit monitor scenarios

use alloy_primitives::{Address, U256};
use rust_decimal_macros::dec;
use snipe_race::exit::{
    ExitError, ExitMonitor, ExitReason, ExitThresholds, MonitorOutcome, MonitorState, PaperExit,
};
use snipe_race::quote::{PriceQuoter, RouterQuoter};
use snipe_race::testkit::{MockPool, MockQuoter, MockRpc, RecordingExit};
use std::sync::Arc;
use std::time::Duration;

const TOKEN: Address = Address::repeat_byte(0x42);
const ROUTER: Address = Address::repeat_byte(0x10);
const WBNB: Address = Address::repeat_byte(0xbb);

fn e(exp: u64) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

#[test]
fn test_inverted_thresholds_rejected() {
    let err = ExitThresholds::new(dec!(0.8), dec!(2.0)).unwrap_err();
    assert!(matches!(err, ExitError::InvalidThresholds { .. }));

    let err = ExitThresholds::new(dec!(1.0), dec!(1.0)).unwrap_err();
    assert!(matches!(err, ExitError::InvalidThresholds { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_paper_exit_on_take_profit() {
    let quoter = Arc::new(MockQuoter::new(vec![
        Some(dec!(0.010)),
        Some(dec!(0.015)),
        Some(dec!(0.021)),
    ]));
    let exit = Arc::new(PaperExit::new(U256::from(5_000u64)));
    let thresholds = ExitThresholds::new(dec!(2.0), dec!(0.8)).unwrap();

    let handle = ExitMonitor::new(TOKEN, dec!(0.010), thresholds, quoter, exit.clone())
        .unwrap()
        .tick_every(Duration::from_millis(250), Duration::from_millis(250))
        .start();

    match handle.wait().await.unwrap() {
        MonitorOutcome::Exited { trigger, exit: result } => {
            assert_eq!(trigger.reason, ExitReason::TakeProfit);
            let report = result.unwrap();
            assert!(report.paper);
            assert_eq!(report.amount, U256::from(5_000u64));
        }
        other => panic!("expected exit, got {other:?}"),
    }
    assert_eq!(exit.fills().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_leaves_position_untouched() {
    let quoter = Arc::new(MockQuoter::new(vec![Some(dec!(1.5))]));
    let exit = Arc::new(RecordingExit::new());
    let thresholds = ExitThresholds::new(dec!(2.0), dec!(0.8)).unwrap();

    let handle = ExitMonitor::new(TOKEN, dec!(1.0), thresholds, quoter.clone(), exit.clone())
        .unwrap()
        .tick_every(Duration::from_millis(250), Duration::from_millis(250))
        .start();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(handle.state(), MonitorState::Armed);
    assert!(quoter.quotes_taken() >= 8);

    handle.cancel();
    assert!(matches!(handle.wait().await.unwrap(), MonitorOutcome::Cancelled));
    assert!(exit.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_loss_below_one_wei_per_token() {
    // 5 native against 1e20 whole tokens: 5e-20 native each, so selling
    // one whole token through the router yields 0 wei
    let pool = Arc::new(MockPool::new(WBNB, U256::from(5u64) * e(18), e(38)));
    let rpc = Arc::new(MockRpc::new("http://a").with_pool(pool.clone()));
    let quoter = Arc::new(RouterQuoter::new(rpc, ROUTER, WBNB, 18));

    assert_eq!(quoter.amounts_out(e(18), &[TOKEN, WBNB]).await.unwrap(), U256::ZERO);
    let reference = quoter.quote_price(TOKEN).await.unwrap().price;
    assert!(reference > dec!(0.00000000000000000004));
    assert!(reference < dec!(0.00000000000000000006));

    let exit = Arc::new(RecordingExit::new());
    let thresholds = ExitThresholds::new(dec!(2.0), dec!(0.8)).unwrap();
    let handle = ExitMonitor::new(TOKEN, reference, thresholds, quoter, exit.clone())
        .unwrap()
        .tick_every(Duration::from_millis(250), Duration::from_millis(250))
        .start();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(handle.state(), MonitorState::Armed);

    // Liquidity pulled and the token dumped
    pool.set_reserves(U256::from(125u64) * e(16), U256::from(4u64) * e(38));

    let outcome = tokio::time::timeout(Duration::from_secs(30), handle.wait())
        .await
        .expect("stop-loss within 30s")
        .unwrap();
    match outcome {
        MonitorOutcome::Exited { trigger, .. } => {
            assert_eq!(trigger.reason, ExitReason::StopLoss);
            assert!(trigger.price < reference * dec!(0.8));
        }
        other => panic!("expected exit, got {other:?}"),
    }
    assert_eq!(exit.calls(), vec![ExitReason::StopLoss]);
}
