//! Discord REST implementation of the chat history port.
//!
//! History is read page by page, newest first, the same order the Discord
//! client shows when scrolling up a channel.

use async_trait::async_trait;
use journal_core::domain::ChatMessage;
use journal_core::ports::{ChatHistoryProvider, Result};
use journal_core::JournalError;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";
/// Largest page the messages endpoint hands out
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
    #[serde(default)]
    content: String,
    timestamp: String,
}

impl From<MessageResponse> for ChatMessage {
    fn from(m: MessageResponse) -> Self {
        ChatMessage {
            id: m.id,
            content: m.content,
            timestamp: m.timestamp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscordHistoryProvider {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl DiscordHistoryProvider {
    /// Create a provider talking to the public Discord API
    pub fn new(token: String) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL.to_string(), 30)
    }

    /// Create a provider against a custom API root (proxies, tests)
    pub fn with_base_url(token: String, base_url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("DiscordBot (trade-sync, ", env!("CARGO_PKG_VERSION"), ")"))
            .build()
            .map_err(|e| JournalError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn channel_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}", self.base_url, channel_id)
    }

    fn messages_url(&self, channel_id: &str, page_size: usize, before: Option<&str>) -> String {
        let mut url = format!(
            "{}/channels/{}/messages?limit={}",
            self.base_url, channel_id, page_size
        );
        if let Some(before) = before {
            url.push_str("&before=");
            url.push_str(before);
        }
        url
    }

    async fn get(&self, url: &str) -> std::result::Result<reqwest::Response, reqwest::Error> {
        self.client
            .get(url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
    }

    /// Confirms the bot can see the channel and returns its name
    async fn lookup_channel(&self, channel_id: &str) -> Result<String> {
        let response = self
            .get(&self.channel_url(channel_id))
            .await
            .map_err(|e| JournalError::retrieval(channel_id, e))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                Err(JournalError::unavailable(
                    channel_id,
                    format!("not found or missing permissions ({})", response.status()),
                ))
            }
            status if !status.is_success() => Err(JournalError::retrieval(
                channel_id,
                format!("channel lookup returned {}", status),
            )),
            _ => {
                let channel: ChannelResponse = response
                    .json()
                    .await
                    .map_err(|e| JournalError::retrieval(channel_id, e))?;
                Ok(channel.name.unwrap_or(channel.id))
            }
        }
    }

    async fn fetch_page(
        &self,
        channel_id: &str,
        page_size: usize,
        before: Option<&str>,
    ) -> Result<Vec<MessageResponse>> {
        let response = self
            .get(&self.messages_url(channel_id, page_size, before))
            .await
            .map_err(|e| JournalError::retrieval(channel_id, e))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(JournalError::unavailable(
                channel_id,
                "missing permission to read message history",
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JournalError::retrieval(
                channel_id,
                format!("{}: {}", status, body),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| JournalError::retrieval(channel_id, e))?;
        parse_page(&body).map_err(|e| JournalError::retrieval(channel_id, e))
    }
}

fn parse_page(body: &str) -> serde_json::Result<Vec<MessageResponse>> {
    serde_json::from_str(body)
}

#[async_trait]
impl ChatHistoryProvider for DiscordHistoryProvider {
    async fn fetch_history(&self, channel_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let name = self.lookup_channel(channel_id).await?;
        tracing::info!("Fetching messages from channel '{}' ({})", name, channel_id);

        let mut messages: Vec<ChatMessage> = Vec::new();
        let mut before: Option<String> = None;

        while messages.len() < limit {
            let page_size = PAGE_SIZE.min(limit - messages.len());
            let page = self.fetch_page(channel_id, page_size, before.as_deref()).await?;
            let exhausted = page.len() < page_size;

            before = page.last().map(|m| m.id.clone());
            messages.extend(page.into_iter().map(ChatMessage::from));

            if exhausted || before.is_none() {
                break;
            }
        }

        tracing::debug!("Fetched {} messages from {}", messages.len(), channel_id);
        Ok(messages)
    }

    /// The REST client keeps no gateway session, so there is nothing to release
    async fn close(&self) -> Result<()> {
        tracing::info!("Discord history provider done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn provider() -> DiscordHistoryProvider {
        DiscordHistoryProvider::with_base_url(
            "token".to_string(),
            "http://localhost:9/api/".to_string(),
            5,
        )
        .unwrap()
    }

    /// In-process stand-in for the channel and messages endpoints.
    /// Serves `total` messages with ids `1..=total`, newest first.
    #[derive(Clone, Default)]
    struct FakeDiscord {
        total: u64,
        lookup_status: Option<u16>,
        page_status: Option<u16>,
        pages: Arc<Mutex<Vec<(usize, Option<String>)>>>,
    }

    #[derive(Deserialize)]
    struct PageQuery {
        limit: usize,
        before: Option<String>,
    }

    fn status_only(code: u16) -> Response {
        axum::http::StatusCode::from_u16(code).unwrap().into_response()
    }

    async fn channel(State(fake): State<FakeDiscord>, Path(id): Path<String>) -> Response {
        match fake.lookup_status {
            Some(code) => status_only(code),
            None => Json(json!({"id": id, "name": "trades"})).into_response(),
        }
    }

    async fn messages(
        State(fake): State<FakeDiscord>,
        Path(_id): Path<String>,
        Query(query): Query<PageQuery>,
    ) -> Response {
        fake.pages
            .lock()
            .unwrap()
            .push((query.limit, query.before.clone()));
        if let Some(code) = fake.page_status {
            return status_only(code);
        }

        let below = match query.before {
            Some(before) => before.parse::<u64>().unwrap(),
            None => fake.total + 1,
        };
        let page: Vec<_> = (1..below)
            .rev()
            .take(query.limit)
            .map(|id| {
                json!({
                    "id": id.to_string(),
                    "content": format!("message {}", id),
                    "timestamp": "2024-03-05T20:00:00.000000+00:00",
                })
            })
            .collect();
        Json(page).into_response()
    }

    async fn serve(fake: FakeDiscord) -> DiscordHistoryProvider {
        let app = Router::new()
            .route("/api/channels/:id", get(channel))
            .route("/api/channels/:id/messages", get(messages))
            .with_state(fake);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}/api", addr);
        DiscordHistoryProvider::with_base_url("token".to_string(), base_url, 5).unwrap()
    }

    fn history(total: u64) -> FakeDiscord {
        FakeDiscord {
            total,
            ..Default::default()
        }
    }

    fn cursor(limit: usize, before: Option<&str>) -> (usize, Option<String>) {
        (limit, before.map(str::to_string))
    }

    #[test]
    fn test_channel_url() {
        assert_eq!(
            provider().channel_url("1088837681183727687"),
            "http://localhost:9/api/channels/1088837681183727687"
        );
    }

    #[test]
    fn test_messages_url_first_page() {
        assert_eq!(
            provider().messages_url("42", 100, None),
            "http://localhost:9/api/channels/42/messages?limit=100"
        );
    }

    #[test]
    fn test_messages_url_with_cursor() {
        assert_eq!(
            provider().messages_url("42", 50, Some("1200")),
            "http://localhost:9/api/channels/42/messages?limit=50&before=1200"
        );
    }

    #[test]
    fn test_parse_page() {
        let body = r#"[
            {"id": "1201", "type": 0, "content": "outcome: win\nDirection: long",
             "timestamp": "2024-03-05T21:07:44.512000+00:00",
             "author": {"id": "7", "username": "trader"}},
            {"id": "1200", "type": 0, "timestamp": "2024-03-05T20:00:00.000000+00:00"}
        ]"#;

        let page = parse_page(body).unwrap();
        assert_eq!(page.len(), 2);

        let messages: Vec<ChatMessage> = page.into_iter().map(ChatMessage::from).collect();
        assert_eq!(messages[0].id, "1201");
        assert_eq!(messages[0].content, "outcome: win\nDirection: long");
        assert_eq!(messages[0].timestamp, "2024-03-05T21:07:44.512000+00:00");
        assert_eq!(messages[1].content, "");
    }

    #[test]
    fn test_parse_page_rejects_error_object() {
        assert!(parse_page(r#"{"message": "Unknown Channel", "code": 10003}"#).is_err());
    }

    #[tokio::test]
    async fn test_fetch_history_reads_three_pages() {
        let fake = history(250);
        let provider = serve(fake.clone()).await;

        let messages = provider.fetch_history("42", 250).await.unwrap();

        assert_eq!(messages.len(), 250);
        assert_eq!(messages[0].id, "250");
        assert_eq!(messages[100].id, "150");
        assert_eq!(messages[249].id, "1");
        assert_eq!(
            *fake.pages.lock().unwrap(),
            vec![
                cursor(100, None),
                cursor(100, Some("151")),
                cursor(50, Some("51")),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_history_stops_at_limit() {
        let fake = history(250);
        let provider = serve(fake.clone()).await;

        let messages = provider.fetch_history("42", 120).await.unwrap();

        assert_eq!(messages.len(), 120);
        assert_eq!(messages[119].id, "131");
        assert_eq!(
            *fake.pages.lock().unwrap(),
            vec![cursor(100, None), cursor(20, Some("151"))]
        );
    }

    #[tokio::test]
    async fn test_fetch_history_stops_on_short_page() {
        let fake = history(250);
        let provider = serve(fake.clone()).await;

        let messages = provider.fetch_history("42", 1000).await.unwrap();

        assert_eq!(messages.len(), 250);
        assert_eq!(fake.pages.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_history_empty_channel() {
        let fake = history(0);
        let provider = serve(fake.clone()).await;

        let messages = provider.fetch_history("42", 1000).await.unwrap();

        assert!(messages.is_empty());
        assert_eq!(*fake.pages.lock().unwrap(), vec![cursor(100, None)]);
    }

    #[tokio::test]
    async fn test_forbidden_channel_is_unavailable() {
        let fake = FakeDiscord {
            lookup_status: Some(403),
            ..history(250)
        };
        let provider = serve(fake.clone()).await;

        let err = provider.fetch_history("42", 250).await.unwrap_err();

        assert!(matches!(
            err,
            JournalError::ChannelUnavailable { ref channel, .. } if channel == "42"
        ));
        assert!(fake.pages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_channel_is_unavailable() {
        let provider = serve(FakeDiscord {
            lookup_status: Some(404),
            ..history(0)
        })
        .await;

        let err = provider.fetch_history("42", 250).await.unwrap_err();
        assert!(matches!(err, JournalError::ChannelUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_server_error_on_page_is_retrieval_failure() {
        let provider = serve(FakeDiscord {
            page_status: Some(500),
            ..history(250)
        })
        .await;

        let err = provider.fetch_history("42", 250).await.unwrap_err();
        assert!(matches!(
            err,
            JournalError::RetrievalFailure { ref channel, .. } if channel == "42"
        ));
    }

    #[tokio::test]
    async fn test_server_error_on_lookup_is_retrieval_failure() {
        let provider = serve(FakeDiscord {
            lookup_status: Some(502),
            ..history(250)
        })
        .await;

        let err = provider.fetch_history("42", 250).await.unwrap_err();
        assert!(matches!(err, JournalError::RetrievalFailure { .. }));
    }

    #[tokio::test]
    async fn test_close_is_a_no_op() {
        assert!(provider().close().await.is_ok());
    }
}
