//! Built-in two-block demo: ordinary activity followed by a flash loan and a
//! high-impact swap sharing one transaction.

use morpheus::ReplaySource;
use trap_types::{BlockBundle, EventError, FlashLoan, Swap};

pub fn demo_bundles() -> Result<Vec<BlockBundle>, EventError> {
    let normal = BlockBundle::new(
        1000,
        1000,
        vec![FlashLoan::new("0xUser1", "USDC", 50_000.0, "0xTx1")?],
        vec![Swap::new("0xUser2", "ETH", "USDC", 10.0, 20_000.0, 0.5, "0xTx2")?],
    );

    let attack = BlockBundle::new(
        1001,
        1001,
        vec![FlashLoan::new("0xAttacker", "USDC", 500_000.0, "0xTx3")?],
        vec![Swap::new("0xAttacker", "USDC", "ETH", 500_000.0, 250.0, 8.5, "0xTx3")?],
    );

    Ok(vec![normal, attack])
}

pub fn demo_source() -> Result<ReplaySource, EventError> {
    Ok(ReplaySource::new("demo", demo_bundles()?))
}
