//! Event source paging through a remote timetable index.
//!
//! The index lists one entry per group, spread over pages chained by
//! `nextPageToken`. Each entry links to that group's timetable export, which
//! is decoded with [`parse_events`].

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use schedule_core::{EventSource, NormalizedEvent, SourceError, StoreFuture};
use serde::Deserialize;

use crate::source::parse_events;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One page of the group index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPage {
    #[serde(default)]
    pub data: Vec<IndexEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl IndexPage {
    /// Token of the following page; blank tokens end the listing.
    pub fn next_token(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// A group listed in the index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "iCalLink")]
    pub link: String,
}

/// Transport used by [`RemoteEventSource`].
pub trait FeedClient: Send + Sync + 'static {
    /// Fetch one index page; `None` asks for the first page.
    fn index_page<'a>(
        &'a self,
        page_token: Option<&'a str>,
    ) -> StoreFuture<'a, Result<IndexPage, SourceError>>;

    /// Fetch the raw timetable export behind an index entry.
    fn group_payload<'a>(&'a self, link: &'a str) -> StoreFuture<'a, Result<String, SourceError>>;
}

/// [`FeedClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: Client,
    index_url: String,
}

impl HttpFeedClient {
    pub fn new(index_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            index_url: index_url.into(),
        }
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    async fn get_text(&self, request: reqwest::RequestBuilder, what: &str) -> Result<String, SourceError> {
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Fetch(format!("{}: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Fetch(format!("{}: {}", what, status)));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Fetch(format!("{}: {}", what, e)))
    }
}

impl FeedClient for HttpFeedClient {
    fn index_page<'a>(
        &'a self,
        page_token: Option<&'a str>,
    ) -> StoreFuture<'a, Result<IndexPage, SourceError>> {
        Box::pin(async move {
            let mut request = self.client.get(self.index_url.as_str());
            if let Some(token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let body = self.get_text(request, &self.index_url).await?;
            serde_json::from_str(&body)
                .map_err(|e| SourceError::Parse(format!("{}: {}", self.index_url, e)))
        })
    }

    fn group_payload<'a>(&'a self, link: &'a str) -> StoreFuture<'a, Result<String, SourceError>> {
        Box::pin(async move {
            let request = self.client.get(link).query(&[("includeMeta", "true")]);
            self.get_text(request, link).await
        })
    }
}

/// Pages through the group index and collects every group's events.
pub struct RemoteEventSource<C = HttpFeedClient> {
    client: C,
}

impl RemoteEventSource<HttpFeedClient> {
    /// Source reading the index at `index_url` over HTTP.
    pub fn http(index_url: impl Into<String>) -> Self {
        Self::new(HttpFeedClient::new(index_url))
    }
}

impl<C: FeedClient> RemoteEventSource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Follow `nextPageToken` until it runs out.
    pub async fn list_groups(&self) -> Result<Vec<IndexEntry>, SourceError> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.client.index_page(token.as_deref()).await?;
            let next = page.next_token().map(str::to_string);
            entries.extend(page.data);

            let Some(next) = next else { break };
            if !seen.insert(next.clone()) {
                return Err(SourceError::Fetch(format!("index page token {} repeated", next)));
            }
            token = Some(next);
        }

        tracing::debug!("Index listed {} groups over {} pages", entries.len(), seen.len() + 1);
        Ok(entries)
    }
}

impl<C: FeedClient> EventSource for RemoteEventSource<C> {
    fn fetch(&self) -> StoreFuture<'_, Result<Vec<NormalizedEvent>, SourceError>> {
        Box::pin(async move {
            let mut events = Vec::new();
            for entry in self.list_groups().await? {
                let payload = self.client.group_payload(&entry.link).await?;
                events.extend(parse_events(&payload)?);
            }
            Ok(events)
        })
    }
}
