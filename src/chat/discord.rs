use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChannelInfo, ChatGateway};
use crate::error::{RelayError, RelayResult};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Upper bound on a server-requested `Retry-After` wait.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Discord REST client authenticated as a bot.
#[derive(Clone)]
pub struct DiscordGateway {
    client: Client,
    api_base: String,
    token: String,
    max_retries: u8,
}

impl DiscordGateway {
    pub fn new(client: Client, token: String) -> Self {
        Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            max_retries: 3,
        }
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Retries transport errors, 429 and 5xx with exponential backoff.
    async fn send_with_retry<F>(&self, build: F) -> RelayResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = build()
                .header("Authorization", format!("Bot {}", self.token))
                .send()
                .await;

            let backoff = Duration::from_millis(500u64 << (attempt - 1));
            let wait = match &res {
                Ok(rsp) if rsp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    Some(retry_after(rsp).unwrap_or(backoff))
                }
                Ok(rsp) if rsp.status().is_server_error() => Some(backoff),
                Ok(_) => None,
                Err(_) => Some(backoff),
            };
            if let Some(wait) = wait.filter(|_| attempt < self.max_retries) {
                tracing::debug!(target: "chat", attempt, wait_ms = wait.as_millis() as u64, "retrying discord call");
                tokio::time::sleep(wait).await;
                continue;
            }
            return Ok(res?);
        }
    }

    async fn expect_success(rsp: Response) -> RelayResult<Response> {
        let status = rsp.status();
        if status.is_success() {
            return Ok(rsp);
        }
        let body = rsp.text().await.unwrap_or_default();
        Err(RelayError::status(status.as_u16(), &body))
    }
}

/// Discord sends `Retry-After` in (possibly fractional) seconds.
fn retry_after(rsp: &Response) -> Option<Duration> {
    let secs: f64 = rsp
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    (secs.is_finite() && secs >= 0.0)
        .then(|| Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64())))
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
    allowed_mentions: AllowedMentions,
}

#[derive(Serialize)]
struct AllowedMentions {
    parse: Vec<String>,
}

#[derive(Deserialize)]
struct ChannelResp {
    #[serde(rename = "type")]
    kind: u8,
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn send_message(&self, channel_id: &str, content: &str) -> RelayResult<()> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        // Relayed text never pings anyone.
        let payload = CreateMessage {
            content,
            allowed_mentions: AllowedMentions { parse: Vec::new() },
        };
        let rsp = self
            .send_with_retry(|| self.client.post(&url).json(&payload))
            .await?;
        Self::expect_success(rsp).await?;
        Ok(())
    }

    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) -> RelayResult<()> {
        let emoji: String = url::form_urlencoded::byte_serialize(emoji.as_bytes()).collect();
        let url = format!(
            "{}/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me",
            self.api_base
        );
        let rsp = self
            .send_with_retry(|| self.client.put(&url).body(""))
            .await?;
        Self::expect_success(rsp).await?;
        Ok(())
    }

    async fn fetch_channel(&self, channel_id: &str) -> RelayResult<Option<ChannelInfo>> {
        let url = format!("{}/channels/{channel_id}", self.api_base);
        let rsp = self.send_with_retry(|| self.client.get(&url)).await?;
        if matches!(rsp.status(), StatusCode::NOT_FOUND | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        let rsp = Self::expect_success(rsp).await?;
        let ch: ChannelResp = rsp
            .json()
            .await
            .map_err(|e| RelayError::Decode(format!("channel {channel_id}: {e}")))?;
        Ok(Some(ChannelInfo { kind: ch.kind }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(value: Option<&str>) -> Response {
        let mut b = http::Response::builder().status(429);
        if let Some(v) = value {
            b = b.header("retry-after", v);
        }
        Response::from(b.body("").unwrap())
    }

    #[test]
    fn retry_after_parses_fractional_seconds() {
        assert_eq!(
            retry_after(&with_header(Some("1.5"))),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(retry_after(&with_header(Some("0"))), Some(Duration::ZERO));
    }

    #[test]
    fn retry_after_is_capped_and_ignores_garbage() {
        assert_eq!(retry_after(&with_header(Some("1e12"))), Some(MAX_RETRY_AFTER));
        assert_eq!(retry_after(&with_header(Some("soon"))), None);
        assert_eq!(retry_after(&with_header(Some("-1"))), None);
        assert_eq!(retry_after(&with_header(None)), None);
    }
}
