//! Turns free-text chat messages into [`TradeRecord`]s.
//!
//! A message is scanned three ways: the whole text for links and for an
//! explicit `HH:MM` time, then line by line against an ordered table of
//! labels (`outcome:`, `Direction:`, ...). A line is assigned to the first
//! label that matches it. Only messages carrying both an outcome and a
//! direction become records.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::domain::{ChatMessage, TradeRecord};
use crate::error::JournalError;
use crate::ports::Result;
use crate::utils::{local_date, local_time, parse_utc_timestamp};

/// Labeled fields, in the order lines are tested against them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeField {
    Outcome,
    Session,
    Direction,
    Profit,
    Risk,
    Potential,
    Comments,
    Mtf,
    Ltf,
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl TradeField {
    pub const ALL: [TradeField; 14] = [
        TradeField::Outcome,
        TradeField::Session,
        TradeField::Direction,
        TradeField::Profit,
        TradeField::Risk,
        TradeField::Potential,
        TradeField::Comments,
        TradeField::Mtf,
        TradeField::Ltf,
        TradeField::L1,
        TradeField::L2,
        TradeField::L3,
        TradeField::L4,
        TradeField::L5,
    ];

    /// Column name of the field in an exported table
    pub fn name(self) -> &'static str {
        match self {
            TradeField::Outcome => "outcome",
            TradeField::Session => "session",
            TradeField::Direction => "direction",
            TradeField::Profit => "profit",
            TradeField::Risk => "risk",
            TradeField::Potential => "potential",
            TradeField::Comments => "comments",
            TradeField::Mtf => "mtf",
            TradeField::Ltf => "ltf",
            TradeField::L1 => "l1",
            TradeField::L2 => "l2",
            TradeField::L3 => "l3",
            TradeField::L4 => "l4",
            TradeField::L5 => "l5",
        }
    }

    /// Label pattern, matched case-insensitively against a trimmed line
    fn pattern(self) -> &'static str {
        match self {
            TradeField::Outcome => r"^outcome\s*:\s*(.*)$",
            TradeField::Session => r"^session\s*:\s*(.*)$",
            TradeField::Direction => r"^direction\s*:\s*(.*)$",
            TradeField::Profit => r"^profit in ticks\s*:\s*(.*)$",
            TradeField::Risk => r"^risk in ticks\s*:\s*(.*)$",
            TradeField::Potential => r"^potential in tick\s*:\s*(.*)$",
            // comment/comments (and the common "coment" typo), ASCII or full-width colon
            TradeField::Comments => r"^comm?ents?\s*[:：]\s*(.*)$",
            TradeField::Mtf => r"^mtf\s*:\s*(.*)$",
            TradeField::Ltf => r"^ltf\s*:\s*(.*)$",
            TradeField::L1 => r"^l1\s*:\s*(.*)$",
            TradeField::L2 => r"^l2\s*:\s*(.*)$",
            TradeField::L3 => r"^l3\s*:\s*(.*)$",
            TradeField::L4 => r"^l4\s*:\s*(.*)$",
            TradeField::L5 => r"^l5\s*:\s*(.*)$",
        }
    }

    fn slot(self, record: &mut TradeRecord) -> &mut String {
        match self {
            TradeField::Outcome => &mut record.outcome,
            TradeField::Session => &mut record.session,
            TradeField::Direction => &mut record.direction,
            TradeField::Profit => &mut record.profit,
            TradeField::Risk => &mut record.risk,
            TradeField::Potential => &mut record.potential,
            TradeField::Comments => &mut record.comments,
            TradeField::Mtf => &mut record.mtf,
            TradeField::Ltf => &mut record.ltf,
            TradeField::L1 => &mut record.l1,
            TradeField::L2 => &mut record.l2,
            TradeField::L3 => &mut record.l3,
            TradeField::L4 => &mut record.l4,
            TradeField::L5 => &mut record.l5,
        }
    }
}

struct LabelPattern {
    field: TradeField,
    matcher: Regex,
}

impl LabelPattern {
    /// Returns the trimmed value after the label if the line carries it
    fn capture<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.matcher
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }
}

static LABEL_PATTERNS: LazyLock<Vec<LabelPattern>> = LazyLock::new(|| {
    TradeField::ALL
        .iter()
        .map(|&field| LabelPattern {
            field,
            matcher: Regex::new(&format!("(?i){}", field.pattern()))
                .expect("label patterns are valid regexes"),
        })
        .collect()
});

static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("link pattern is a valid regex"));

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}:\d{2}").expect("time pattern is a valid regex"));

static COMMENT_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)comm?ents?").expect("comment pattern is a valid regex"));

/// Splits text at every line boundary: `\n`, `\r\n` (as one break), lone `\r`,
/// vertical tab, form feed, the file/group/record separators, NEL, and the
/// Unicode line and paragraph separators.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(
            c,
            '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}'
                | '\u{2028}' | '\u{2029}'
        ) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Cheap pre-filter applied before extraction: only messages mentioning an
/// outcome label are worth parsing.
pub fn is_trade_candidate(text: &str) -> bool {
    text.to_lowercase().contains("outcome:")
}

/// Parses trade messages, rendering dates and times in a reference zone
#[derive(Debug, Clone, Copy)]
pub struct TradeExtractor {
    reference_tz: Tz,
}

impl TradeExtractor {
    pub fn new(reference_tz: Tz) -> Self {
        Self { reference_tz }
    }

    /// Parses a provider message, resolving its raw creation timestamp first.
    ///
    /// `Ok(None)` means the message is not a trade; an error means the message
    /// itself could not be interpreted.
    pub fn extract_message(&self, message: &ChatMessage) -> Result<Option<TradeRecord>> {
        let created_at = parse_utc_timestamp(&message.timestamp).ok_or_else(|| {
            JournalError::ExtractionFailure {
                message_id: message.id.clone(),
                reason: format!("unrecognised timestamp '{}'", message.timestamp),
            }
        })?;
        Ok(self.extract(&message.content, created_at))
    }

    /// Builds a record from message text, or `None` when outcome or direction is missing
    pub fn extract(&self, text: &str, created_at: DateTime<Utc>) -> Option<TradeRecord> {
        let image = LINK_PATTERN
            .find_iter(text)
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let time = match TIME_PATTERN.find(text) {
            Some(m) => m.as_str().to_string(),
            None => local_time(&created_at, &self.reference_tz),
        };

        let mut record = TradeRecord {
            date: local_date(&created_at, &self.reference_tz),
            time,
            image,
            ..Default::default()
        };

        for raw_line in split_lines(text) {
            let line = raw_line.trim();
            let matched = LABEL_PATTERNS
                .iter()
                .find_map(|pattern| pattern.capture(line).map(|value| (pattern.field, value)));

            match matched {
                Some((field, value)) => *field.slot(&mut record) = value.to_string(),
                None if COMMENT_LIKE.is_match(line) => {
                    tracing::debug!("Unmatched possible comments line: '{}'", raw_line);
                }
                None => {}
            }
        }

        if record.outcome.is_empty() || record.direction.is_empty() {
            return None;
        }
        Some(record)
    }
}
