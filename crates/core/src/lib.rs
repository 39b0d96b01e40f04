pub mod application;
pub mod domain;
pub mod error;
pub mod export;
pub mod extract;
pub mod ports;
pub mod utils;

pub use application::{ChannelReport, RunSummary, SyncServiceImpl, SyncSettings};
pub use domain::{ChannelTarget, ChatMessage, TradeRecord, TradesByChannel, TRADE_COLUMNS};
pub use error::JournalError;
pub use export::TabularExporter;
pub use extract::TradeExtractor;
