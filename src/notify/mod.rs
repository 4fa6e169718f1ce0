// src/notify/mod.rs
//! Best-effort status lines for the operational log channel.

use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::chat::ChatGateway;
use crate::error::{truncate_chars, RelayError};

/// Longest line posted to the ops channel.
pub const MAX_OPS_LINE_CHARS: usize = 1900;

/// Fire-and-forget status sink. Implementations never fail and never panic;
/// a line that cannot be delivered is dropped.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, line: &str);
}

/// Writes to tracing, then mirrors to the ops chat channel when one is
/// configured and accepts text.
pub struct OpsLog {
    chat: Arc<dyn ChatGateway>,
    channel_id: Option<String>,
    usable: OnceCell<bool>,
}

impl OpsLog {
    pub fn new(chat: Arc<dyn ChatGateway>, channel_id: Option<String>) -> Self {
        Self {
            chat,
            channel_id,
            usable: OnceCell::new(),
        }
    }

    /// Lookup errors are not cached; the next line retries.
    async fn channel_usable(&self, channel_id: &str) -> bool {
        let checked = self
            .usable
            .get_or_try_init(|| async {
                let usable = self
                    .chat
                    .fetch_channel(channel_id)
                    .await?
                    .is_some_and(|ch| ch.is_text_capable());
                if !usable {
                    tracing::warn!(target: "ops", channel_id, "ops channel missing or not text-capable");
                }
                Ok::<bool, RelayError>(usable)
            })
            .await;
        match checked {
            Ok(usable) => *usable,
            Err(e) => {
                tracing::debug!(target: "ops", error = %e, "ops channel lookup failed");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl Notifier for OpsLog {
    async fn notify(&self, line: &str) {
        tracing::info!(target: "ops", "{line}");

        let Some(channel_id) = self.channel_id.as_deref() else {
            return;
        };
        if !self.channel_usable(channel_id).await {
            return;
        }
        let text = truncate_chars(line, MAX_OPS_LINE_CHARS);
        if let Err(e) = self.chat.send_message(channel_id, &text).await {
            tracing::debug!(target: "ops", error = %e, "ops line dropped");
        }
    }
}

/// Discards everything.
pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _line: &str) {}
}
