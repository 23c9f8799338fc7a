//! Property tests for the detector

use oracle::{CorrelationWindow, Detector};
use proptest::prelude::*;
use trap_config::DetectionConfig;
use trap_types::{BlockBundle, FlashLoan, Swap};

const ACTORS: &[&str] = &["0xA", "0xB", "0xC"];
const HASHES: &[&str] = &["0x01", "0x02", "0x03", "0x04"];

fn loan_strategy() -> impl Strategy<Value = FlashLoan> {
    (0..ACTORS.len(), 0.0..1_000_000.0f64, 0..HASHES.len())
        .prop_map(|(a, amount, h)| FlashLoan::new(ACTORS[a], "USDC", amount, HASHES[h]).unwrap())
}

fn swap_strategy() -> impl Strategy<Value = Swap> {
    (0..ACTORS.len(), 0.0..20.0f64, 0..HASHES.len()).prop_map(|(a, impact, h)| {
        Swap::new(ACTORS[a], "USDC", "ETH", 1.0, 1.0, impact, HASHES[h]).unwrap()
    })
}

fn window_strategy() -> impl Strategy<Value = CorrelationWindow> {
    prop::collection::vec(
        (
            prop::collection::vec(loan_strategy(), 0..3),
            prop::collection::vec(swap_strategy(), 0..3),
        ),
        0..4,
    )
    .prop_map(|blocks| {
        let mut window = CorrelationWindow::new();
        for (i, (loans, swaps)) in blocks.into_iter().enumerate() {
            window
                .push(BlockBundle::new(100 + i as u64, 0, loans, swaps))
                .unwrap();
        }
        window
    })
}

proptest! {
    #[test]
    fn raising_thresholds_never_creates_detections(
        window in window_strategy(),
        loan_floor in 0.0..1_000_000.0f64,
        loan_raise in 0.0..500_000.0f64,
        impact_floor in 0.0..20.0f64,
        impact_raise in 0.0..10.0f64,
        max_blocks_between in 0u32..3,
    ) {
        let low = Detector::new(DetectionConfig {
            min_price_impact: impact_floor,
            min_flash_loan_size: loan_floor,
            max_blocks_between,
        });
        let high = Detector::new(DetectionConfig {
            min_price_impact: impact_floor + impact_raise,
            min_flash_loan_size: loan_floor + loan_raise,
            max_blocks_between,
        });

        prop_assert!(!high.should_respond(&window) || low.should_respond(&window));
    }

    #[test]
    fn shared_hash_is_sufficient(
        borrower in 0..ACTORS.len(),
        trader in 0..ACTORS.len(),
        amount in 100_000.0..1_000_000.0f64,
        impact in 5.0..50.0f64,
    ) {
        let bundle = BlockBundle::new(
            1,
            0,
            vec![FlashLoan::new(ACTORS[borrower], "USDC", amount, "0xShared").unwrap()],
            vec![Swap::new(ACTORS[trader], "USDC", "ETH", 1.0, 1.0, impact, "0xShared").unwrap()],
        );
        let window: CorrelationWindow = std::iter::once(bundle).collect();

        prop_assert!(Detector::default().should_respond(&window));
    }

    #[test]
    fn shared_actor_is_sufficient(
        actor in 0..ACTORS.len(),
        amount in 100_000.0..1_000_000.0f64,
        impact in 5.0..50.0f64,
        swap_in_next_block in any::<bool>(),
    ) {
        let loan = FlashLoan::new(ACTORS[actor], "USDC", amount, "0xLoan").unwrap();
        let swap = Swap::new(ACTORS[actor], "USDC", "ETH", 1.0, 1.0, impact, "0xSwap").unwrap();

        let bundles = if swap_in_next_block {
            vec![
                BlockBundle::new(1, 0, vec![loan], vec![]),
                BlockBundle::new(2, 0, vec![], vec![swap]),
            ]
        } else {
            vec![BlockBundle::new(1, 0, vec![loan], vec![swap])]
        };
        let window: CorrelationWindow = bundles.into_iter().collect();

        prop_assert!(Detector::default().should_respond(&window));
    }
}
