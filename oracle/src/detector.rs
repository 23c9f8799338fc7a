//! Sandwich detector
//!
//! A pass inspects the newest `max_blocks_between + 1` bundles, keeps the loans
//! and swaps that clear their thresholds, and looks for one loan/swap pair that
//! is related:
//! - same transaction: loan and swap executed atomically (checked first)
//! - same actor: the borrower is the trader, possibly one block later
//!
//! Adjacency comes from the look-back alone. An attack spread over more blocks
//! than the look-back is invisible, and the same-actor rule ignores ordering
//! inside the look-back, so unrelated activity by one address can still match.

use serde::{Deserialize, Serialize};
use trap_config::DetectionConfig;
use trap_types::{FlashLoan, Swap};

use crate::window::CorrelationWindow;

/// How a loan and a swap were tied together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    SameTransaction,
    SameActor,
}

impl CorrelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationKind::SameTransaction => "same_transaction",
            CorrelationKind::SameActor => "same_actor",
        }
    }
}

/// First related loan/swap pair found in a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation<'w> {
    pub kind: CorrelationKind,
    pub loan: &'w FlashLoan,
    pub swap: &'w Swap,
}

fn relate(loan: &FlashLoan, swap: &Swap) -> Option<CorrelationKind> {
    if loan.tx_hash() == swap.tx_hash() {
        Some(CorrelationKind::SameTransaction)
    } else if loan.borrower() == swap.trader() {
        Some(CorrelationKind::SameActor)
    } else {
        None
    }
}

/// Loans in the look-back that clear `min_flash_loan_size`
pub(crate) fn loans_meeting<'w>(
    config: &DetectionConfig,
    window: &'w CorrelationWindow,
) -> Vec<&'w FlashLoan> {
    window
        .recent(config.lookback())
        .flat_map(|bundle| bundle.flash_loans())
        .filter(|loan| loan.amount() >= config.min_flash_loan_size)
        .collect()
}

/// Swaps in the look-back that clear `min_price_impact`
pub(crate) fn swaps_meeting<'w>(
    config: &DetectionConfig,
    window: &'w CorrelationWindow,
) -> Vec<&'w Swap> {
    window
        .recent(config.lookback())
        .flat_map(|bundle| bundle.swaps())
        .filter(|swap| swap.price_impact() >= config.min_price_impact)
        .collect()
}

/// Flash loan sandwich detector
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectionConfig,
}

impl Detector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Bundles inspected per pass
    pub fn lookback(&self) -> usize {
        self.config.lookback()
    }

    pub fn qualifying_loans<'w>(&self, window: &'w CorrelationWindow) -> Vec<&'w FlashLoan> {
        loans_meeting(&self.config, window)
    }

    pub fn qualifying_swaps<'w>(&self, window: &'w CorrelationWindow) -> Vec<&'w Swap> {
        swaps_meeting(&self.config, window)
    }

    /// Find the first related pair, scanning loans in window order
    pub fn correlate<'w>(&self, window: &'w CorrelationWindow) -> Option<Correlation<'w>> {
        let loans = self.qualifying_loans(window);
        if loans.is_empty() {
            return None;
        }

        let swaps = self.qualifying_swaps(window);
        if swaps.is_empty() {
            return None;
        }

        for &loan in &loans {
            for &swap in &swaps {
                if let Some(kind) = relate(loan, swap) {
                    tracing::debug!(
                        kind = kind.as_str(),
                        loan_tx = loan.tx_hash(),
                        swap_tx = swap.tx_hash(),
                        "ORACLE: correlated flash loan and swap"
                    );
                    return Some(Correlation { kind, loan, swap });
                }
            }
        }

        tracing::debug!(
            loans = loans.len(),
            swaps = swaps.len(),
            "ORACLE: qualifying events found but none related"
        );
        None
    }

    /// Whether the newest blocks of `window` show a flash loan sandwich
    pub fn should_respond(&self, window: &CorrelationWindow) -> bool {
        self.correlate(window).is_some()
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}
