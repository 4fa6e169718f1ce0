// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod feed;
pub mod guard;
pub mod intake;
pub mod links;
pub mod notify;
pub mod publish;
pub mod scheduler;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::error::{RelayError, RelayResult};
pub use crate::feed::FeedPoller;
pub use crate::intake::IntakeHandler;
pub use crate::notify::{Notifier, OpsLog};
pub use crate::publish::{PublishOutcome, Publisher};
