//! MORPHEUS - Chain Data Coordinator
//!
//! Awakens the trap to what happened on chain. Defines the seam every chain
//! data source plugs into and turns per-block queries into bundles.
//!
//! # Responsibilities
//! - Define the chain data source contract
//! - Collect the flash loans and swaps of one block
//! - Report every failed query instead of hiding it
//! - Replay recorded blocks for demos and tests
//!
//! Log retrieval, topic matching and amount decoding belong to the concrete
//! source; MORPHEUS only ever sees decoded events.

pub mod replay;

use async_trait::async_trait;
use thiserror::Error;
use trap_types::{BlockBundle, FlashLoan, Swap};

pub use replay::ReplaySource;

/// Chain data source errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unknown block: {0}")]
    UnknownBlock(u64),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl SourceError {
    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Rpc(_) => "rpc",
            SourceError::Decode(_) => "decode",
            SourceError::UnknownBlock(_) => "unknown_block",
            SourceError::Fixture(_) => "fixture",
        }
    }
}

/// Chain data source trait - yields already decoded events per block
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Get source identifier
    fn id(&self) -> String;

    /// Newest block the source can serve
    async fn latest_block(&self) -> Result<u64, SourceError>;

    /// Oldest block the source can serve, if it has one
    fn first_block(&self) -> Option<u64> {
        None
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, SourceError>;

    async fn flash_loans(&self, block_number: u64) -> Result<Vec<FlashLoan>, SourceError>;

    async fn swaps(&self, block_number: u64) -> Result<Vec<Swap>, SourceError>;
}

/// One block's bundle plus every query that failed while building it
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub bundle: BlockBundle,
    pub errors: Vec<SourceError>,
}

impl Collection {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Collect the events of one block
///
/// A failed query contributes nothing to the bundle (no events, or timestamp
/// 0) and its error to [`Collection::errors`]; the caller decides what to do
/// with them.
pub async fn collect<S>(source: &S, block_number: u64) -> Collection
where
    S: ChainDataSource + ?Sized,
{
    let (loans, swaps, timestamp) = tokio::join!(
        source.flash_loans(block_number),
        source.swaps(block_number),
        source.block_timestamp(block_number),
    );

    let mut errors = Vec::new();

    let flash_loans = loans.unwrap_or_else(|e| {
        errors.push(e);
        Vec::new()
    });
    let swaps = swaps.unwrap_or_else(|e| {
        errors.push(e);
        Vec::new()
    });
    let timestamp = timestamp.unwrap_or_else(|e| {
        errors.push(e);
        0
    });

    tracing::trace!(
        block = block_number,
        flash_loans = flash_loans.len(),
        swaps = swaps.len(),
        failed_queries = errors.len(),
        "MORPHEUS: collected block"
    );

    Collection {
        bundle: BlockBundle::new(block_number, timestamp, flash_loans, swaps),
        errors,
    }
}
