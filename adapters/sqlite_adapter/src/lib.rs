use async_trait::async_trait;
use journal_core::domain::ChatMessage;
use journal_core::ports::{ChatHistoryProvider, Result};
use journal_core::JournalError;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Reads channel history from a local Discord export database
pub struct SqliteHistoryProvider {
    db_path: String,
}

impl SqliteHistoryProvider {
    /// Creates a new SqliteHistoryProvider with the given database path
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    fn open(&self, channel_id: &str) -> Result<Connection> {
        Connection::open(&self.db_path).map_err(|e| JournalError::retrieval(channel_id, e))
    }

    fn channel_name(conn: &Connection, channel_id: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT COALESCE(name, 'Unknown') FROM channels WHERE CAST(id AS TEXT) = ?1",
            params![channel_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| JournalError::retrieval(channel_id, e))
    }

    fn read_messages(
        conn: &Connection,
        channel_id: &str,
        limit: usize,
    ) -> rusqlite::Result<Vec<ChatMessage>> {
        // Newest first, like the live chat history
        let mut stmt = conn.prepare(
            r#"
            SELECT
                CAST(m.id AS TEXT) AS id,
                COALESCE(m.content, '') AS content,
                COALESCE(m.timestamp, '') AS timestamp
            FROM messages m
            WHERE CAST(m.channel_id AS TEXT) = ?1
            ORDER BY m.timestamp DESC
            LIMIT ?2
            "#,
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let messages = stmt
            .query_map(params![channel_id, limit], |row: &Row| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }
}

#[async_trait]
impl ChatHistoryProvider for SqliteHistoryProvider {
    async fn fetch_history(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.open(channel_id)?;

        let Some(name) = Self::channel_name(&conn, channel_id)? else {
            return Err(JournalError::unavailable(
                channel_id,
                "not found in export database",
            ));
        };
        tracing::info!("Reading messages from channel '{}' ({})", name, channel_id);

        Self::read_messages(&conn, channel_id, limit)
            .map_err(|e| JournalError::retrieval(channel_id, e))
    }
}
