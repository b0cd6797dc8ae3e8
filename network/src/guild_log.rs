//! Guild log API client

use std::time::Duration;

use lotto_core::{RawLogEntry, SourceError, TransactionSource};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://api.guildwars2.com";

/// Longest response body excerpt kept in an error
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct GuildLogConfig {
    pub base_url: String,
    pub guild_id: String,
    /// Bearer token with guild leader permissions
    pub api_key: String,
    pub request_timeout: Duration,
}

/// Pulls `GET /v2/guild/{id}/log?since={cursor}`
#[derive(Debug, Clone)]
pub struct GuildLogClient {
    config: GuildLogConfig,
    client: Client,
}

impl GuildLogClient {
    pub fn new(config: GuildLogConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn log_url(&self) -> String {
        format!(
            "{}/v2/guild/{}/log",
            self.config.base_url.trim_end_matches('/'),
            self.config.guild_id
        )
    }
}

fn map_request_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else if e.is_decode() {
        SourceError::InvalidResponse(e.to_string())
    } else {
        SourceError::Unavailable(e.to_string())
    }
}

#[async_trait::async_trait]
impl TransactionSource for GuildLogClient {
    async fn fetch_since(&self, cursor: Option<u64>) -> Result<Vec<RawLogEntry>, SourceError> {
        let url = self.log_url();
        debug!(%url, ?cursor, "fetching guild log");

        let mut request = self.client.get(&url).bearer_auth(&self.config.api_key);
        if let Some(since) = cursor {
            request = request.query(&[("since", since)]);
        }

        let response = request.send().await.map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(
                message
                    .char_indices()
                    .nth(ERROR_BODY_LIMIT)
                    .map(|(i, _)| i)
                    .unwrap_or(message.len()),
            );
            warn!(status = status.as_u16(), "guild log request rejected");
            return Err(SourceError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(map_request_error)?;
        let values: Vec<Value> = serde_json::from_str(&body)
            .map_err(|e| SourceError::InvalidResponse(format!("guild log body: {}", e)))?;
        let entries: Vec<RawLogEntry> = values.into_iter().map(decode_entry).collect();
        debug!(count = entries.len(), "guild log entries received");
        Ok(entries)
    }
}

/// One bad entry must not cost the rest of the page
fn decode_entry(value: Value) -> RawLogEntry {
    let id = value.get("id").and_then(Value::as_u64);
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(?id, error = %e, "undecodable guild log entry");
        RawLogEntry::undecodable(id, e.to_string())
    })
}
