//! Replay source
//!
//! Serves recorded block bundles as if they came from a live chain. Blocks
//! missing inside the recorded range read as empty; blocks outside it are
//! unknown. Failures can be scripted per block to exercise error handling.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use trap_types::{BlockBundle, FlashLoan, Swap};

use crate::{ChainDataSource, SourceError};

#[derive(Debug, Clone, Default)]
struct ScriptedFailures {
    flash_loans: Option<SourceError>,
    swaps: Option<SourceError>,
}

/// In-memory chain data source over recorded bundles
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    name: String,
    blocks: BTreeMap<u64, BlockBundle>,
    failures: HashMap<u64, ScriptedFailures>,
}

impl ReplaySource {
    pub fn new(name: impl Into<String>, bundles: impl IntoIterator<Item = BlockBundle>) -> Self {
        let name = name.into();
        let blocks = bundles
            .into_iter()
            .map(|bundle| (bundle.block_number(), bundle))
            .collect::<BTreeMap<_, _>>();

        tracing::info!(
            "MORPHEUS: Replay source '{}' holds {} blocks",
            name_or_default(&name),
            blocks.len()
        );

        Self {
            name,
            blocks,
            failures: HashMap::new(),
        }
    }

    /// Parse a JSON array of bundles
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self, SourceError> {
        let bundles: Vec<BlockBundle> =
            serde_json::from_str(json).map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(Self::new(name, bundles))
    }

    /// Load a JSON fixture file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Fixture(format!("{}: {}", path.display(), e)))?;

        Self::from_json(path.display().to_string(), &json)
    }

    /// Make both event queries for `block_number` fail
    pub fn fail_block(mut self, block_number: u64, error: SourceError) -> Self {
        let failures = self.failures.entry(block_number).or_default();
        failures.flash_loans = Some(error.clone());
        failures.swaps = Some(error);
        self
    }

    pub fn fail_flash_loans(mut self, block_number: u64, error: SourceError) -> Self {
        self.failures.entry(block_number).or_default().flash_loans = Some(error);
        self
    }

    pub fn fail_swaps(mut self, block_number: u64, error: SourceError) -> Self {
        self.failures.entry(block_number).or_default().swaps = Some(error);
        self
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn bundle(&self, block_number: u64) -> Result<Option<&BlockBundle>, SourceError> {
        match (self.blocks.keys().next(), self.blocks.keys().next_back()) {
            (Some(&first), Some(&last)) if (first..=last).contains(&block_number) => {
                Ok(self.blocks.get(&block_number))
            }
            _ => Err(SourceError::UnknownBlock(block_number)),
        }
    }

    fn scripted(&self, block_number: u64) -> Option<&ScriptedFailures> {
        self.failures.get(&block_number)
    }
}

fn name_or_default(name: &str) -> &str {
    if name.is_empty() {
        "replay"
    } else {
        name
    }
}

#[async_trait]
impl ChainDataSource for ReplaySource {
    fn id(&self) -> String {
        name_or_default(&self.name).to_string()
    }

    fn first_block(&self) -> Option<u64> {
        self.blocks.keys().next().copied()
    }

    async fn latest_block(&self) -> Result<u64, SourceError> {
        self.blocks
            .keys()
            .next_back()
            .copied()
            .ok_or_else(|| SourceError::Rpc("replay source holds no blocks".to_string()))
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, SourceError> {
        Ok(self.bundle(block_number)?.map_or(0, BlockBundle::timestamp))
    }

    async fn flash_loans(&self, block_number: u64) -> Result<Vec<FlashLoan>, SourceError> {
        if let Some(error) = self.scripted(block_number).and_then(|f| f.flash_loans.clone()) {
            return Err(error);
        }
        Ok(self
            .bundle(block_number)?
            .map(|bundle| bundle.flash_loans().to_vec())
            .unwrap_or_default())
    }

    async fn swaps(&self, block_number: u64) -> Result<Vec<Swap>, SourceError> {
        if let Some(error) = self.scripted(block_number).and_then(|f| f.swaps.clone()) {
            return Err(error);
        }
        Ok(self
            .bundle(block_number)?
            .map(|bundle| bundle.swaps().to_vec())
            .unwrap_or_default())
    }
}
