//! Google Sheets implementation of the tabular store port.
//!
//! Authenticates as a service account (signed JWT exchanged for an OAuth
//! access token) and overwrites a range through `spreadsheets.values.update`.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use journal_core::ports::{Result, TabularStore};
use journal_core::JournalError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account key file this adapter needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            JournalError::Config(format!(
                "Cannot read service account file {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            JournalError::Config(format!("Invalid service account file {}: {}", path.display(), e))
        })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct ValueRange<'a> {
    range: &'a str,
    #[serde(rename = "majorDimension")]
    major_dimension: &'a str,
    values: &'a [Vec<String>],
}

pub struct GoogleSheetsStore {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    spreadsheet_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleSheetsStore {
    pub fn from_service_account_file(
        path: impl AsRef<Path>,
        spreadsheet_id: String,
    ) -> Result<Self> {
        Self::new(ServiceAccountKey::from_file(path)?, spreadsheet_id)
    }

    pub fn new(key: ServiceAccountKey, spreadsheet_id: String) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            JournalError::Config(format!("Invalid service account private key: {}", e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| JournalError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            key,
            signing_key,
            spreadsheet_id,
            base_url: SHEETS_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the store at a different API root (proxies, tests)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Builds the `values.update` endpoint for a range, escaping the range as one path segment
    fn values_url(&self, range: &str) -> std::result::Result<Url, String> {
        build_values_url(&self.base_url, &self.spreadsheet_id, range)
    }

    fn signed_assertion(
        &self,
        now: i64,
    ) -> std::result::Result<String, jsonwebtoken::errors::Error> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&header, &claims, &self.signing_key)
    }

    /// Exchanges a freshly signed JWT for an access token
    async fn access_token(&self) -> std::result::Result<String, String> {
        let assertion = self
            .signed_assertion(chrono::Utc::now().timestamp())
            .map_err(|e| format!("Failed to sign token request: {}", e))?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("Token request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Authentication failed ({}): {}", status, body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("Malformed token response: {}", e))?;
        Ok(token.access_token)
    }

    async fn update_values(
        &self,
        range: &str,
        values: &[Vec<String>],
    ) -> std::result::Result<(), String> {
        let url = self.values_url(range)?;
        let token = self.access_token().await?;

        let body = ValueRange {
            range,
            major_dimension: "ROWS",
            values,
        };
        let response = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Update request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Sheets API returned {}: {}", status, body));
        }
        Ok(())
    }
}

fn build_values_url(
    base_url: &str,
    spreadsheet_id: &str,
    range: &str,
) -> std::result::Result<Url, String> {
    let mut url = Url::parse(base_url).map_err(|e| format!("Invalid Sheets API url: {}", e))?;
    url.path_segments_mut()
        .map_err(|_| "Sheets API url cannot be a base".to_string())?
        .pop_if_empty()
        .extend(["spreadsheets", spreadsheet_id, "values", range]);
    url.query_pairs_mut().append_pair("valueInputOption", "RAW");
    Ok(url)
}

#[async_trait]
impl TabularStore for GoogleSheetsStore {
    async fn write_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<()> {
        self.update_values(range, &values)
            .await
            .map_err(|reason| JournalError::export(range, reason))?;

        tracing::info!("Data exported to Google Sheet range: {}", range);
        Ok(())
    }
}
