use indexmap::IndexMap;

/// Fixed column order of an exported trade table
pub const TRADE_COLUMNS: [&str; 17] = [
    "date", "time", "image", "outcome", "session", "direction", "profit", "risk", "potential",
    "comments", "mtf", "ltf", "l1", "l2", "l3", "l4", "l5",
];

/// A single chat message as handed out by a history provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub timestamp: String, // Raw UTC creation time, parsed by the extractor
}

/// One trade parsed out of a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeRecord {
    pub date: String,
    pub time: String,
    pub image: String,
    pub outcome: String,
    pub session: String,
    pub direction: String,
    pub profit: String,
    pub risk: String,
    pub potential: String,
    pub comments: String,
    pub mtf: String,
    pub ltf: String,
    pub l1: String,
    pub l2: String,
    pub l3: String,
    pub l4: String,
    pub l5: String,
}

impl TradeRecord {
    /// Looks up a value by its column name
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "date" => &self.date,
            "time" => &self.time,
            "image" => &self.image,
            "outcome" => &self.outcome,
            "session" => &self.session,
            "direction" => &self.direction,
            "profit" => &self.profit,
            "risk" => &self.risk,
            "potential" => &self.potential,
            "comments" => &self.comments,
            "mtf" => &self.mtf,
            "ltf" => &self.ltf,
            "l1" => &self.l1,
            "l2" => &self.l2,
            "l3" => &self.l3,
            "l4" => &self.l4,
            "l5" => &self.l5,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// A configured data source: which channel to scan and where its table goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub key: String,
    pub channel_id: String,
    pub destination_range: String,
}

/// Trades collected during one run, keyed by logical channel key in configuration order
pub type TradesByChannel = IndexMap<String, Vec<TradeRecord>>;
