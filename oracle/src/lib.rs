//! ORACLE - Attack Detector
//!
//! Sees the sandwich coming from the blocks it is given. Correlates large
//! flash loans with high-impact swaps in the same or adjacent blocks and
//! builds the alert describing them.
//!
//! # Responsibilities
//! - Hold the sliding history of per-block bundles
//! - Filter loans and swaps against the detection thresholds
//! - Tie a loan to a swap by transaction or by actor
//! - Package the implicated events as an alert
//!
//! Everything here is synchronous and never mutates the window it reads.

pub mod alert;
pub mod detector;
pub mod window;

use trap_config::DetectionConfig;

pub use alert::{Alert, AlertBuilder, AttackType, LoanSummary, Severity, SwapSummary};
pub use detector::{Correlation, CorrelationKind, Detector};
pub use window::{CorrelationWindow, WindowError};

/// Detector and alert builder sharing one set of thresholds
#[derive(Debug, Clone)]
pub struct Oracle {
    detector: Detector,
    builder: AlertBuilder,
}

impl Oracle {
    pub fn new(config: DetectionConfig) -> Self {
        tracing::info!(
            min_price_impact = config.min_price_impact,
            min_flash_loan_size = config.min_flash_loan_size,
            max_blocks_between = config.max_blocks_between,
            "ORACLE: Watching for flash loan sandwiches"
        );
        Self {
            detector: Detector::new(config.clone()),
            builder: AlertBuilder::new(config),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        self.detector.config()
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn should_respond(&self, window: &CorrelationWindow) -> bool {
        self.detector.should_respond(window)
    }

    pub fn correlate<'w>(&self, window: &'w CorrelationWindow) -> Option<Correlation<'w>> {
        self.detector.correlate(window)
    }

    pub fn build_alert(&self, window: &CorrelationWindow) -> Alert {
        self.builder.build_alert(window)
    }

    /// Alert for `window` if the detector fires on it
    pub fn inspect(&self, window: &CorrelationWindow) -> Option<Alert> {
        self.should_respond(window).then(|| self.build_alert(window))
    }
}

impl Default for Oracle {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trap_types::{BlockBundle, FlashLoan, Swap};

    #[test]
    fn test_oracle_creation() {
        let oracle = Oracle::default();
        assert_eq!(oracle.detector().lookback(), 2);
        assert!(oracle.inspect(&CorrelationWindow::new()).is_none());
    }

    #[test]
    fn test_inspect_builds_alert_on_hit() {
        let mut window = CorrelationWindow::new();
        window
            .push(BlockBundle::new(
                1,
                1,
                vec![FlashLoan::new("0xA", "USDC", 150_000.0, "0xTx").unwrap()],
                vec![Swap::new("0xB", "USDC", "ETH", 1.0, 1.0, 6.0, "0xTx").unwrap()],
            ))
            .unwrap();

        let alert = Oracle::default().inspect(&window).unwrap();
        assert_eq!(alert.qualifying_loans[0].tx_hash, "0xTx");
        assert_eq!(alert.qualifying_swaps[0].tx_hash, "0xTx");
    }
}
