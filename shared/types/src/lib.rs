//! Trap Types - Event model shared by the flash sandwich trap crates
//!
//! Flash loans and swaps arrive already decoded from the chain data source.
//! Every event is validated once, at construction, and is immutable afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid event errors, raised only while constructing events
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    #[error("Negative amount in '{field}': {value}")]
    NegativeAmount { field: &'static str, value: f64 },

    #[error("Non-finite amount in '{field}'")]
    NonFiniteAmount { field: &'static str },

    #[error("Invalid price impact: {0}")]
    InvalidPriceImpact(f64),

    #[error("Transaction hash must not be empty")]
    EmptyHash,
}

fn check_amount(field: &'static str, value: f64) -> Result<f64, EventError> {
    if !value.is_finite() {
        return Err(EventError::NonFiniteAmount { field });
    }
    if value < 0.0 {
        return Err(EventError::NegativeAmount { field, value });
    }
    Ok(value)
}

fn check_hash(tx_hash: String) -> Result<String, EventError> {
    if tx_hash.trim().is_empty() {
        return Err(EventError::EmptyHash);
    }
    Ok(tx_hash)
}

/// Percentage deviation between swap output and input, `|out/in - 1| * 100`.
///
/// Zero when nothing went in. Saturates at `f64::MAX` when the ratio
/// overflows, so any finite pair of amounts yields a valid impact.
pub fn price_impact(amount_in: f64, amount_out: f64) -> f64 {
    if amount_in > 0.0 {
        (((amount_out / amount_in) - 1.0).abs() * 100.0).min(f64::MAX)
    } else {
        0.0
    }
}

/// One observed flash loan borrow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FlashLoanRecord")]
pub struct FlashLoan {
    borrower: String,
    token: String,
    amount: f64,
    tx_hash: String,
}

impl FlashLoan {
    pub fn new(
        borrower: impl Into<String>,
        token: impl Into<String>,
        amount: f64,
        tx_hash: impl Into<String>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            borrower: borrower.into(),
            token: token.into(),
            amount: check_amount("amount", amount)?,
            tx_hash: check_hash(tx_hash.into())?,
        })
    }

    pub fn borrower(&self) -> &str {
        &self.borrower
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Borrowed amount, in the token's own denomination
    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }
}

/// Unvalidated wire shape of a flash loan
#[derive(Deserialize)]
struct FlashLoanRecord {
    borrower: String,
    token: String,
    amount: f64,
    tx_hash: String,
}

impl TryFrom<FlashLoanRecord> for FlashLoan {
    type Error = EventError;

    fn try_from(record: FlashLoanRecord) -> Result<Self, Self::Error> {
        FlashLoan::new(record.borrower, record.token, record.amount, record.tx_hash)
    }
}

/// One observed DEX trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SwapRecord")]
pub struct Swap {
    trader: String,
    token_in: String,
    token_out: String,
    amount_in: f64,
    amount_out: f64,
    price_impact: f64, // percent, never negative
    tx_hash: String,
}

impl Swap {
    /// Build a swap whose price impact was already measured by the feed
    pub fn new(
        trader: impl Into<String>,
        token_in: impl Into<String>,
        token_out: impl Into<String>,
        amount_in: f64,
        amount_out: f64,
        price_impact: f64,
        tx_hash: impl Into<String>,
    ) -> Result<Self, EventError> {
        if !price_impact.is_finite() || price_impact < 0.0 {
            return Err(EventError::InvalidPriceImpact(price_impact));
        }

        Ok(Self {
            trader: trader.into(),
            token_in: token_in.into(),
            token_out: token_out.into(),
            amount_in: check_amount("amount_in", amount_in)?,
            amount_out: check_amount("amount_out", amount_out)?,
            price_impact,
            tx_hash: check_hash(tx_hash.into())?,
        })
    }

    /// Build a swap and derive its price impact from the traded amounts
    pub fn from_amounts(
        trader: impl Into<String>,
        token_in: impl Into<String>,
        token_out: impl Into<String>,
        amount_in: f64,
        amount_out: f64,
        tx_hash: impl Into<String>,
    ) -> Result<Self, EventError> {
        let amount_in = check_amount("amount_in", amount_in)?;
        let amount_out = check_amount("amount_out", amount_out)?;
        let impact = price_impact(amount_in, amount_out);

        Self::new(trader, token_in, token_out, amount_in, amount_out, impact, tx_hash)
    }

    pub fn trader(&self) -> &str {
        &self.trader
    }

    pub fn token_in(&self) -> &str {
        &self.token_in
    }

    pub fn token_out(&self) -> &str {
        &self.token_out
    }

    pub fn amount_in(&self) -> f64 {
        self.amount_in
    }

    pub fn amount_out(&self) -> f64 {
        self.amount_out
    }

    /// Price movement caused by the trade, in percent
    pub fn price_impact(&self) -> f64 {
        self.price_impact
    }

    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }
}

/// Unvalidated wire shape of a swap; `price_impact` may be left to derivation
#[derive(Deserialize)]
struct SwapRecord {
    trader: String,
    token_in: String,
    token_out: String,
    amount_in: f64,
    amount_out: f64,
    #[serde(default)]
    price_impact: Option<f64>,
    tx_hash: String,
}

impl TryFrom<SwapRecord> for Swap {
    type Error = EventError;

    fn try_from(record: SwapRecord) -> Result<Self, Self::Error> {
        match record.price_impact {
            Some(impact) => Swap::new(
                record.trader,
                record.token_in,
                record.token_out,
                record.amount_in,
                record.amount_out,
                impact,
                record.tx_hash,
            ),
            None => Swap::from_amounts(
                record.trader,
                record.token_in,
                record.token_out,
                record.amount_in,
                record.amount_out,
                record.tx_hash,
            ),
        }
    }
}

/// Everything observed in one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBundle {
    block_number: u64,
    timestamp: u64,
    #[serde(default)]
    flash_loans: Vec<FlashLoan>,
    #[serde(default)]
    swaps: Vec<Swap>,
}

impl BlockBundle {
    pub fn new(
        block_number: u64,
        timestamp: u64,
        flash_loans: Vec<FlashLoan>,
        swaps: Vec<Swap>,
    ) -> Self {
        Self {
            block_number,
            timestamp,
            flash_loans,
            swaps,
        }
    }

    /// Bundle for a block where nothing was observed
    pub fn empty(block_number: u64, timestamp: u64) -> Self {
        Self::new(block_number, timestamp, Vec::new(), Vec::new())
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn flash_loans(&self) -> &[FlashLoan] {
        &self.flash_loans
    }

    pub fn swaps(&self) -> &[Swap] {
        &self.swaps
    }

    pub fn is_empty(&self) -> bool {
        self.flash_loans.is_empty() && self.swaps.is_empty()
    }
}
