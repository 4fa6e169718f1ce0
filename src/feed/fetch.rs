// src/feed/fetch.rs
use async_trait::async_trait;
use reqwest::header::{HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use reqwest::Client;

use crate::backend::CacheValidators;
use crate::error::RelayResult;

pub const NOT_MODIFIED: u16 = 304;

#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub validators: &'a CacheValidators,
    pub user_agent: &'a str,
}

/// Raw outcome of a feed GET. Status is not interpreted here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub validators: CacheValidators,
    pub body: String,
}

impl FetchResponse {
    pub fn is_not_modified(&self) -> bool {
        self.status == NOT_MODIFIED
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, req: FetchRequest<'_>) -> RelayResult<FetchResponse>;
}

/// Conditional GET over reqwest.
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, req: FetchRequest<'_>) -> RelayResult<FetchResponse> {
        let mut request = self
            .client
            .get(req.url)
            .header(USER_AGENT, req.user_agent)
            .header(
                "Accept",
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8",
            );

        if let Some(etag) = req.validators.etag.as_deref() {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = req.validators.last_modified.as_deref() {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        let validators = CacheValidators {
            etag: header(ETAG),
            last_modified: header(LAST_MODIFIED),
        };

        let body = if status == NOT_MODIFIED {
            String::new()
        } else {
            response.text().await?
        };

        Ok(FetchResponse {
            status,
            validators,
            body,
        })
    }
}
