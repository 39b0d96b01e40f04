use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{ChannelTarget, TradeRecord, TradesByChannel};
use crate::error::JournalError;
use crate::export::TabularExporter;
use crate::extract::{is_trade_candidate, TradeExtractor};
use crate::ports::ChatHistoryProvider;

pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// What to scan during a run
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub targets: Vec<ChannelTarget>,
    pub history_limit: usize,
}

impl SyncSettings {
    pub fn new(targets: Vec<ChannelTarget>) -> Self {
        Self {
            targets,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Per-channel outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelReport {
    pub key: String,
    pub fetched: usize,
    pub candidates: usize,
    pub trades: usize,
    pub skipped: usize,
    pub exported: bool,
    pub error: Option<String>,
}

impl ChannelReport {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub channels: Vec<ChannelReport>,
}

impl RunSummary {
    pub fn total_trades(&self) -> usize {
        self.channels.iter().map(|c| c.trades).sum()
    }

    pub fn exported_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.exported).count()
    }
}

/// Application service that scans channels for trades and exports them
pub struct SyncServiceImpl {
    history: Box<dyn ChatHistoryProvider>,
    exporter: TabularExporter,
    extractor: TradeExtractor,
    settings: SyncSettings,
    stop: Arc<AtomicBool>,
}

impl SyncServiceImpl {
    /// Creates a new SyncServiceImpl with the given dependencies
    pub fn new(
        history: Box<dyn ChatHistoryProvider>,
        exporter: TabularExporter,
        extractor: TradeExtractor,
        settings: SyncSettings,
    ) -> Self {
        Self {
            history,
            exporter,
            extractor,
            settings,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares a flag that, once set, stops the run before the next channel
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Executes the sync: collects trades per channel, exports them, closes the session
    pub async fn execute_sync(&self) -> RunSummary {
        let (trades, mut reports) = self.collect_trades().await;
        self.export_trades(&trades, &mut reports).await;

        if let Err(e) = self.history.close().await {
            tracing::warn!("Failed to close chat session: {}", e);
        }

        tracing::info!("All channels processed");
        RunSummary { channels: reports }
    }

    /// Scans every configured channel, keeping only channels that yielded trades
    pub async fn collect_trades(&self) -> (TradesByChannel, Vec<ChannelReport>) {
        let mut trades = TradesByChannel::new();
        let mut reports = Vec::with_capacity(self.settings.targets.len());

        for target in &self.settings.targets {
            if self.stop_requested() {
                tracing::warn!("Stop requested, skipping remaining channels");
                break;
            }

            let mut report = ChannelReport::new(&target.key);
            match self.collect_channel(target, &mut report).await {
                Ok(channel_trades) if channel_trades.is_empty() => {
                    let e = JournalError::NoValidTrades {
                        key: target.key.clone(),
                    };
                    tracing::warn!("{}", e);
                }
                Ok(channel_trades) => {
                    trades.insert(target.key.clone(), channel_trades);
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    report.error = Some(e.to_string());
                }
            }
            reports.push(report);
        }

        (trades, reports)
    }

    async fn collect_channel(
        &self,
        target: &ChannelTarget,
        report: &mut ChannelReport,
    ) -> crate::ports::Result<Vec<TradeRecord>> {
        tracing::info!(
            "Fetching messages for '{}' from channel {}",
            target.key,
            target.channel_id
        );
        let messages = self
            .history
            .fetch_history(&target.channel_id, self.settings.history_limit)
            .await?;
        report.fetched = messages.len();
        tracing::info!("Fetched {} messages for '{}'", messages.len(), target.key);

        let mut channel_trades = Vec::new();
        for message in messages.iter().filter(|m| is_trade_candidate(&m.content)) {
            report.candidates += 1;
            match self.extractor.extract_message(message) {
                Ok(Some(record)) => channel_trades.push(record),
                Ok(None) => {
                    report.skipped += 1;
                    tracing::warn!("Message {} does not contain a valid trade", message.id);
                }
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!("{}", e);
                }
            }
        }

        report.trades = channel_trades.len();
        tracing::info!("Parsed {} trades for '{}'", channel_trades.len(), target.key);
        Ok(channel_trades)
    }

    /// Exports each channel's trades to its destination range
    pub async fn export_trades(&self, trades: &TradesByChannel, reports: &mut [ChannelReport]) {
        for (key, records) in trades {
            if self.stop_requested() {
                tracing::warn!("Stop requested, skipping remaining exports");
                break;
            }
            let Some(target) = self.settings.targets.iter().find(|t| &t.key == key) else {
                tracing::warn!("No destination configured for '{}'", key);
                continue;
            };

            let result = self.exporter.export(records, &target.destination_range).await;
            let report = reports.iter_mut().find(|r| &r.key == key);
            match (result, report) {
                (Ok(()), Some(report)) => report.exported = true,
                (Ok(()), None) => {}
                (Err(e), report) => {
                    tracing::error!("{}", e);
                    if let Some(report) = report {
                        report.error = Some(e.to_string());
                    }
                }
            }
        }
    }
}
