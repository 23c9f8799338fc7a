//! End-to-end detection scenarios over small hand-built windows

use oracle::{CorrelationKind, CorrelationWindow, Oracle, Severity};
use trap_config::DetectionConfig;
use trap_types::{BlockBundle, FlashLoan, Swap};

fn loan(borrower: &str, amount: f64, tx: &str) -> FlashLoan {
    FlashLoan::new(borrower, "USDC", amount, tx).unwrap()
}

fn swap(trader: &str, price_impact: f64, tx: &str) -> Swap {
    Swap::new(trader, "USDC", "ETH", 500_000.0, 250.0, price_impact, tx).unwrap()
}

fn window_of(bundles: Vec<BlockBundle>) -> CorrelationWindow {
    let mut window = CorrelationWindow::new();
    for bundle in bundles {
        window.push(bundle).unwrap();
    }
    window
}

fn normal_block() -> BlockBundle {
    BlockBundle::new(
        1000,
        1000,
        vec![loan("0xUser1", 50_000.0, "0xTx1")],
        vec![swap("0xUser2", 1.0, "0xTx2")],
    )
}

#[test]
fn ordinary_activity_stays_quiet() {
    let window = window_of(vec![normal_block()]);
    assert!(!Oracle::default().should_respond(&window));
}

#[test]
fn loan_and_swap_in_one_transaction_alert() {
    let window = window_of(vec![
        normal_block(),
        BlockBundle::new(
            1001,
            1001,
            vec![loan("0xAttacker", 500_000.0, "0xTx3")],
            vec![swap("0xAttacker", 8.5, "0xTx3")],
        ),
    ]);

    let oracle = Oracle::default();
    assert!(oracle.should_respond(&window));
    assert_eq!(
        oracle.correlate(&window).unwrap().kind,
        CorrelationKind::SameTransaction
    );

    let alert = oracle.build_alert(&window);
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.blocks_analyzed, 2);
    assert_eq!(alert.qualifying_loans.len(), 1);
    assert_eq!(alert.qualifying_swaps.len(), 1);
    assert_eq!(alert.qualifying_loans[0].tx_hash, "0xTx3");
    assert_eq!(alert.qualifying_loans[0].amount, 500_000.0);
    assert_eq!(alert.qualifying_swaps[0].tx_hash, "0xTx3");
    assert_eq!(alert.qualifying_swaps[0].price_impact, 8.5);
}

#[test]
fn same_actor_in_next_block_correlates() {
    let window = window_of(vec![
        BlockBundle::new(500, 0, vec![loan("0xAttacker", 500_000.0, "0xLoanTx")], vec![]),
        BlockBundle::new(501, 0, vec![], vec![swap("0xAttacker", 9.0, "0xSwapTx")]),
    ]);

    let oracle = Oracle::new(DetectionConfig {
        max_blocks_between: 1,
        ..Default::default()
    });

    let hit = oracle.correlate(&window).unwrap();
    assert_eq!(hit.kind, CorrelationKind::SameActor);
    assert_eq!(hit.loan.tx_hash(), "0xLoanTx");
    assert_eq!(hit.swap.tx_hash(), "0xSwapTx");
}

#[test]
fn same_actor_beyond_lookback_is_ignored() {
    let window = window_of(vec![
        BlockBundle::new(500, 0, vec![loan("0xAttacker", 500_000.0, "0xLoanTx")], vec![]),
        BlockBundle::empty(501, 0),
        BlockBundle::new(502, 0, vec![], vec![swap("0xAttacker", 9.0, "0xSwapTx")]),
    ]);

    let oracle = Oracle::new(DetectionConfig {
        max_blocks_between: 1,
        ..Default::default()
    });

    assert!(!oracle.should_respond(&window));
}

#[test]
fn empty_window_never_fires() {
    let oracle = Oracle::new(DetectionConfig {
        min_price_impact: 0.0,
        min_flash_loan_size: 0.0,
        max_blocks_between: 10,
    });

    assert!(!oracle.should_respond(&CorrelationWindow::new()));
}

#[test]
fn same_transaction_ignores_addresses() {
    let window = window_of(vec![BlockBundle::new(
        1,
        1,
        vec![loan("0xBorrower", 100_000.0, "0xShared")],
        vec![swap("0xSomeoneElse", 5.0, "0xShared")],
    )]);

    assert!(Oracle::default().should_respond(&window));
}

#[test]
fn detection_then_alert_is_idempotent() {
    let window = window_of(vec![
        normal_block(),
        BlockBundle::new(
            1001,
            1001,
            vec![loan("0xAttacker", 500_000.0, "0xTx3"), loan("0xOther", 900_000.0, "0xTx4")],
            vec![swap("0xAttacker", 8.5, "0xTx3"), swap("0xThird", 15.0, "0xTx5")],
        ),
    ]);

    let oracle = Oracle::default();

    assert!(oracle.should_respond(&window));
    let first = oracle.build_alert(&window);
    assert!(oracle.should_respond(&window));
    let second = oracle.build_alert(&window);

    assert_eq!(first, second);
    assert_eq!(window.len(), 2);
}

#[test]
fn wider_lookback_reaches_older_loans() {
    let window = window_of(vec![
        BlockBundle::new(10, 0, vec![loan("0xStale", 800_000.0, "0xOldTx")], vec![]),
        BlockBundle::new(11, 0, vec![loan("0xAttacker", 500_000.0, "0xLoanTx")], vec![]),
        BlockBundle::empty(12, 0),
        BlockBundle::new(13, 0, vec![], vec![swap("0xAttacker", 9.0, "0xSwapTx")]),
    ]);

    let oracle = Oracle::new(DetectionConfig {
        max_blocks_between: 2,
        ..Default::default()
    });

    assert_eq!(oracle.correlate(&window).unwrap().kind, CorrelationKind::SameActor);

    let alert = oracle.build_alert(&window);
    assert_eq!(alert.blocks_analyzed, 3);
    assert_eq!(alert.qualifying_loans.len(), 1);
    assert_eq!(alert.qualifying_loans[0].borrower, "0xAttacker");
    assert_eq!(alert.qualifying_loans[0].tx_hash, "0xLoanTx");
    assert_eq!(alert.qualifying_swaps[0].tx_hash, "0xSwapTx");

    // The default look-back no longer reaches block 11
    assert!(!Oracle::default().should_respond(&window));
}
