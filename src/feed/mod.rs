// src/feed/mod.rs
pub mod fetch;
pub mod keys;
pub mod parse;
pub mod poller;

pub use fetch::{FeedFetcher, FetchRequest, FetchResponse, HttpFeedFetcher};
pub use keys::{item_key, item_link, normalize_item, FeedItem};
pub use parse::{pick_items, FeedDocument};
pub use poller::{CycleSummary, FeedPoller, PollCounts};
