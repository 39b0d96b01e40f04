use async_trait::async_trait;
use journal_core::ports::{Result, TabularStore};
use journal_core::utils::sanitize_filename;
use journal_core::JournalError;
use std::fs;
use std::path::{Path, PathBuf};

/// Tabular store that keeps each destination region in its own CSV file
pub struct CsvTableStore {
    output_folder: String,
}

impl CsvTableStore {
    pub fn new(output_folder: String) -> Self {
        Self { output_folder }
    }

    /// File backing a destination region, e.g. `Sheet1!A1` -> `Sheet1-A1.csv`
    pub fn file_for_range(&self, range: &str) -> PathBuf {
        let stem = match sanitize_filename(range) {
            s if s.is_empty() => "table".to_string(),
            s => s,
        };
        Path::new(&self.output_folder).join(format!("{}.csv", stem))
    }

    fn write_file(
        &self,
        path: &Path,
        values: &[Vec<String>],
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        fs::create_dir_all(&self.output_folder)?;

        // Rows may differ in length, the store does not enforce a rectangle
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
        for row in values {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[async_trait]
impl TabularStore for CsvTableStore {
    async fn write_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<()> {
        let path = self.file_for_range(range);
        self.write_file(&path, &values)
            .map_err(|e| JournalError::export(range, e))?;

        tracing::info!("Wrote {} rows to {}", values.len(), path.display());
        Ok(())
    }
}
