//! Alert builder
//!
//! Re-derives the qualifying loans and swaps from the window it is handed,
//! so an alert never depends on state left over from a detection pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use trap_config::DetectionConfig;
use trap_types::{FlashLoan, Swap};

use crate::detector::{loans_meeting, swaps_meeting};
use crate::window::CorrelationWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    #[serde(rename = "flash_loan_sandwich")]
    FlashLoanSandwich,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::FlashLoanSandwich => "flash_loan_sandwich",
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan listed in an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub borrower: String,
    pub amount: f64,
    pub tx_hash: String,
}

impl From<&FlashLoan> for LoanSummary {
    fn from(loan: &FlashLoan) -> Self {
        Self {
            borrower: loan.borrower().to_string(),
            amount: loan.amount(),
            tx_hash: loan.tx_hash().to_string(),
        }
    }
}

/// Swap listed in an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapSummary {
    pub trader: String,
    pub price_impact: f64,
    pub tx_hash: String,
}

impl From<&Swap> for SwapSummary {
    fn from(swap: &Swap) -> Self {
        Self {
            trader: swap.trader().to_string(),
            price_impact: swap.price_impact(),
            tx_hash: swap.tx_hash().to_string(),
        }
    }
}

/// Flash loan sandwich alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub attack_type: AttackType,
    pub severity: Severity,
    pub qualifying_loans: Vec<LoanSummary>,
    pub qualifying_swaps: Vec<SwapSummary>,
    /// Bundles in the look-back the alert was built from
    pub blocks_analyzed: usize,
}

/// Builds alerts from the same thresholds the detector uses
#[derive(Debug, Clone)]
pub struct AlertBuilder {
    config: DetectionConfig,
}

impl AlertBuilder {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Meant to be called once the detector has fired on `window`
    pub fn build_alert(&self, window: &CorrelationWindow) -> Alert {
        let qualifying_loans = loans_meeting(&self.config, window)
            .into_iter()
            .map(LoanSummary::from)
            .collect();

        let qualifying_swaps = swaps_meeting(&self.config, window)
            .into_iter()
            .map(SwapSummary::from)
            .collect();

        Alert {
            attack_type: AttackType::FlashLoanSandwich,
            // No gradation yet: every correlated pattern is treated as high
            severity: Severity::High,
            qualifying_loans,
            qualifying_swaps,
            blocks_analyzed: window.recent(self.config.lookback()).len(),
        }
    }
}

impl Default for AlertBuilder {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}
