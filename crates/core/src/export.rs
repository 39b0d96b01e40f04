use crate::domain::{TradeRecord, TRADE_COLUMNS};
use crate::error::JournalError;
use crate::ports::{Result, TabularStore};

/// Lays records out as a header row followed by one row per record
pub fn build_table(records: &[TradeRecord]) -> Vec<Vec<String>> {
    let header = TRADE_COLUMNS.iter().map(|c| c.to_string()).collect();

    std::iter::once(header)
        .chain(records.iter().map(|record| {
            TRADE_COLUMNS
                .iter()
                .map(|column| record.field(column).unwrap_or_default().to_string())
                .collect()
        }))
        .collect()
}

/// Writes trade tables to a tabular store, one destination region per call
pub struct TabularExporter {
    store: Box<dyn TabularStore>,
}

impl TabularExporter {
    pub fn new(store: Box<dyn TabularStore>) -> Self {
        Self { store }
    }

    /// Overwrites `destination_range` with the table for `records`
    pub async fn export(&self, records: &[TradeRecord], destination_range: &str) -> Result<()> {
        let values = build_table(records);
        let rows = values.len() - 1;

        self.store
            .write_range(destination_range, values)
            .await
            .map_err(|e| match e {
                JournalError::ExportFailure { .. } => e,
                other => JournalError::export(destination_range, other),
            })?;

        tracing::info!("Exported {} trades to range {}", rows, destination_range);
        Ok(())
    }
}
