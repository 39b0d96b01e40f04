use crate::domain::ChatMessage;
use crate::error::JournalError;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, JournalError>;

/// Source of channel message history
#[async_trait]
pub trait ChatHistoryProvider: Send + Sync {
    /// Fetches up to `limit` messages from a channel, in the provider's own order
    async fn fetch_history(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>>;

    /// Ends the chat session once every channel has been processed
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Trait for writing a block of cells into a tabular store
/// This is a port (interface) that defines how the core communicates with output adapters
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Overwrites the region anchored at `range` with `values`, row by row
    async fn write_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<()>;
}
