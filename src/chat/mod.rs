// src/chat/mod.rs
pub mod discord;

pub use discord::DiscordGateway;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RelayResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// Inbound chat message as delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub author: Author,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Discord channel type code.
    pub kind: u8,
}

impl ChannelInfo {
    /// Guild text, DM, group DM, announcement and thread channels accept messages.
    pub fn is_text_capable(&self) -> bool {
        matches!(self.kind, 0 | 1 | 3 | 5 | 10 | 11 | 12)
    }
}

/// Outbound side of the chat platform.
#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, channel_id: &str, content: &str) -> RelayResult<()>;

    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) -> RelayResult<()>;

    /// `None` when the channel does not exist or is not visible to the bot.
    async fn fetch_channel(&self, channel_id: &str) -> RelayResult<Option<ChannelInfo>>;
}
