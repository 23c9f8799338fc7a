//! Monitoring loop
//!
//! Blocks are processed strictly one after another, so the window only ever
//! sees ascending block numbers and never needs a lock.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use morpheus::ChainDataSource;
use oracle::{Alert, CorrelationWindow, Oracle};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use trap_config::{ConfigError, MonitorConfig, TrapConfig};
use trap_metrics::TrapMetrics;

use crate::{MonitorStatus, NeoError};

/// Outcome of a scan or a follow session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub blocks_processed: u64,
    pub last_block: Option<u64>,
    pub alerts: Vec<Alert>,
}

impl ScanReport {
    fn record(&mut self, block_number: u64, alert: Option<Alert>) {
        self.blocks_processed += 1;
        self.last_block = Some(block_number);
        self.alerts.extend(alert);
    }
}

/// Block-by-block driver around a chain data source
pub struct Monitor<S> {
    source: S,
    oracle: Oracle,
    window: CorrelationWindow,
    config: MonitorConfig,
    metrics: Option<Arc<TrapMetrics>>,
    alert_tx: Option<mpsc::Sender<Alert>>,
    status: MonitorStatus,
}

impl<S: ChainDataSource> Monitor<S> {
    /// Validates `config` and sizes the window from it
    pub fn new(source: S, config: &TrapConfig) -> Result<Self, NeoError> {
        config.validate()?;

        let capacity = NonZeroUsize::new(config.monitor.window_capacity).ok_or_else(|| {
            ConfigError::InvalidValue("window_capacity must be positive".to_string())
        })?;

        info!(
            "NEO: Monitoring '{}' with a window of {} blocks",
            source.id(),
            capacity
        );

        Ok(Self {
            source,
            oracle: Oracle::new(config.parameters.clone()),
            window: CorrelationWindow::with_capacity(capacity),
            config: config.monitor.clone(),
            metrics: None,
            alert_tx: None,
            status: MonitorStatus::Starting,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<TrapMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Send every alert to `tx` as well as returning it
    pub fn with_alert_sink(mut self, tx: mpsc::Sender<Alert>) -> Self {
        self.alert_tx = Some(tx);
        self
    }

    pub fn window(&self) -> &CorrelationWindow {
        &self.window
    }

    pub fn status(&self) -> &MonitorStatus {
        &self.status
    }

    /// Collect one block, append it and run a detection pass
    pub async fn process_block(&mut self, block_number: u64) -> Result<Option<Alert>, NeoError> {
        let collection = morpheus::collect(&self.source, block_number).await;

        for e in &collection.errors {
            warn!(
                block = block_number,
                kind = e.kind(),
                "Source query failed, treating as no events: {}",
                e
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_source_error(e.kind());
            }
        }

        let (loans, swaps) = (
            collection.bundle.flash_loans().len(),
            collection.bundle.swaps().len(),
        );
        self.window.push(collection.bundle)?;

        let started = Instant::now();
        let kind = self.oracle.correlate(&self.window).map(|hit| hit.kind);
        let alert = kind.map(|_| self.oracle.build_alert(&self.window));
        let elapsed = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.blocks_processed.inc();
            metrics.record_events(loans, swaps);
            metrics.window_depth.set(self.window.len() as i64);
            metrics.detection_seconds.observe(elapsed.as_secs_f64());
        }

        let (Some(kind), Some(alert)) = (kind, alert) else {
            debug!(block = block_number, loans, swaps, "No incident");
            return Ok(None);
        };

        warn!(
            block = block_number,
            attack = alert.attack_type.as_str(),
            severity = %alert.severity,
            correlation = kind.as_str(),
            flash_loans = alert.qualifying_loans.len(),
            swaps = alert.qualifying_swaps.len(),
            "NEO: Flash loan sandwich detected"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_alert(
                alert.severity.as_str(),
                kind.as_str(),
                alert.qualifying_loans.len(),
                alert.qualifying_swaps.len(),
            );
        }

        if let Some(tx) = &self.alert_tx {
            tx.send(alert.clone())
                .await
                .map_err(|e| NeoError::AlertSink(e.to_string()))?;
        }

        Ok(Some(alert))
    }

    /// Process `from..=to` in order
    ///
    /// Stops at the first alert when `stop_on_first_alert` is set.
    pub async fn scan(&mut self, from: u64, to: u64) -> Result<ScanReport, NeoError> {
        self.status = MonitorStatus::Running;
        info!("NEO: Scanning blocks {}..={}", from, to);

        let mut report = ScanReport::default();
        for block_number in from..=to {
            let alert = match self.process_block(block_number).await {
                Ok(alert) => alert,
                Err(e) => {
                    error!(block = block_number, "Scan aborted: {}", e);
                    self.status = MonitorStatus::Failed(e.to_string());
                    return Err(e);
                }
            };

            let hit = alert.is_some();
            report.record(block_number, alert);
            if hit && self.config.stop_on_first_alert {
                info!("NEO: Stopping scan at first alert (block {})", block_number);
                break;
            }
        }

        self.status = MonitorStatus::Stopped;
        info!(
            "NEO: Scan complete, {} blocks processed, {} alerts",
            report.blocks_processed,
            report.alerts.len()
        );
        Ok(report)
    }

    /// Scan the newest `start_offset` blocks up to the chain head
    pub async fn scan_recent(&mut self) -> Result<ScanReport, NeoError> {
        let head = self.source.latest_block().await?;
        let from = self.catch_up_start(head);
        self.scan(from, head).await
    }

    /// Never earlier than the oldest block the source can serve
    fn catch_up_start(&self, head: u64) -> u64 {
        let start = head.saturating_sub(self.config.start_offset.saturating_sub(1));
        self.source.first_block().map_or(start, |first| start.max(first))
    }

    /// Follow the chain head until `shutdown` fires or its sender is dropped
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) -> Result<ScanReport, NeoError> {
        self.status = MonitorStatus::Running;
        info!(
            "NEO: Following '{}' every {}ms",
            self.source.id(),
            self.config.poll_interval_ms
        );

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        let mut report = ScanReport::default();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("NEO: Shutdown signal received");
                    break;
                }

                _ = ticker.tick() => {
                    let head = match self.source.latest_block().await {
                        Ok(head) => head,
                        Err(e) => {
                            warn!(kind = e.kind(), "Failed to read chain head: {}", e);
                            if let Some(metrics) = &self.metrics {
                                metrics.record_source_error(e.kind());
                            }
                            continue;
                        }
                    };

                    let next = match self.window.latest_block() {
                        Some(last) => last + 1,
                        None => self.catch_up_start(head),
                    };

                    for block_number in next..=head {
                        match self.process_block(block_number).await {
                            Ok(alert) => report.record(block_number, alert),
                            Err(e) => {
                                error!(block = block_number, "Monitor failed: {}", e);
                                self.status = MonitorStatus::Failed(e.to_string());
                                return Err(e);
                            }
                        }
                    }
                }
            }
        }

        self.status = MonitorStatus::Stopped;
        Ok(report)
    }
}
