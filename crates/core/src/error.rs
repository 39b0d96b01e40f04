/// Everything that can go wrong during a sync run.
///
/// None of these abort a run on their own: the driver handles each one at the
/// narrowest scope (message or channel) and moves on.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("Channel '{channel}' unavailable: {reason}")]
    ChannelUnavailable { channel: String, reason: String },

    #[error("Failed to retrieve messages from channel '{channel}': {reason}")]
    RetrievalFailure { channel: String, reason: String },

    #[error("Failed to parse message {message_id}: {reason}")]
    ExtractionFailure { message_id: String, reason: String },

    #[error("No valid trades found for '{key}'")]
    NoValidTrades { key: String },

    #[error("Export to '{destination}' failed: {reason}")]
    ExportFailure { destination: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl JournalError {
    pub fn export(destination: impl Into<String>, reason: impl ToString) -> Self {
        JournalError::ExportFailure {
            destination: destination.into(),
            reason: reason.to_string(),
        }
    }

    pub fn retrieval(channel: impl Into<String>, reason: impl ToString) -> Self {
        JournalError::RetrievalFailure {
            channel: channel.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unavailable(channel: impl Into<String>, reason: impl ToString) -> Self {
        JournalError::ChannelUnavailable {
            channel: channel.into(),
            reason: reason.to_string(),
        }
    }
}
