//! Core YouTube API client functionality.

use crate::credentials::Credential;
use crate::youtube_api::broadcasts::{LiveBroadcast, LiveBroadcastListResponse};
use crate::youtube_api::streams::{LiveStream, LiveStreamListResponse, StreamNotFound};
use crate::youtube_api::types::PagedStream;
use eyre::Context;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

/// Base URL of the YouTube Data API v3.
const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Client for the YouTube Data API v3.
///
/// Wraps an acquired [`Credential`] and provides typed access to the live
/// streaming list endpoints. The access token is used as-is for the lifetime
/// of the client; staleness is handled once, at acquisition time, by the
/// credential store.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    credential: Credential,
    client: reqwest::Client,
    api_base: String,
}

impl YouTubeClient {
    /// Creates a client that authenticates requests with `credential`.
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (tests, proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Resolves an ingestion stream name to the stream's id.
    ///
    /// Lists the authenticated user's live streams and returns the id of the
    /// first one whose `cdn.ingestionInfo.streamName` equals `name` exactly
    /// (case-sensitive, no normalization). The listing is walked page by page
    /// until a match is found or the collection is exhausted.
    ///
    /// Fails with [`StreamNotFound`] (downcastable from the returned report)
    /// when no stream carries the name. If the name is not unique, which
    /// YouTube permits, the first match in returned order wins.
    #[instrument(skip(self), ret)]
    pub async fn stream_id(&self, name: &str) -> eyre::Result<String> {
        let streams = self.list_my_live_streams();
        let mut streams = std::pin::pin!(streams);
        while let Some(stream) = streams.next().await {
            let stream = stream.context("fetch live stream")?;
            if stream.cdn.ingestion_info.stream_name == name {
                return Ok(stream.id);
            }
        }
        Err(StreamNotFound(name.to_string()).into())
    }

    /// Returns a paginated stream of the authenticated user's live streams.
    ///
    /// Uses the `liveStreams.list` API with `mine=true`; continuation pages
    /// are fetched as the stream is consumed.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.readonly`
    /// * `https://www.googleapis.com/auth/youtube`
    /// * `https://www.googleapis.com/auth/youtube.force-ssl`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveStreams/list>
    #[instrument(skip(self))]
    pub fn list_my_live_streams(&self) -> impl Stream<Item = eyre::Result<LiveStream>> + use<'_> {
        PagedStream::new(move |page_token| async move {
            let response = self.list_live_streams_page(page_token).await?;
            Ok((response.items, response.next_page_token))
        })
    }

    /// Returns a paginated stream of the authenticated user's broadcasts.
    ///
    /// Uses the `liveBroadcasts.list` API with `mine=true`. Broadcasts are
    /// the viewer-facing events; to find the technical stream resource behind
    /// an encoder configuration, use [`Self::list_my_live_streams`].
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube`
    /// * `https://www.googleapis.com/auth/youtube.force-ssl`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/live/docs/liveBroadcasts/list>
    #[instrument(skip(self))]
    pub fn list_my_live_broadcasts(
        &self,
    ) -> impl Stream<Item = eyre::Result<LiveBroadcast>> + use<'_> {
        PagedStream::new(move |page_token| async move {
            let response = self.list_live_broadcasts_page(page_token).await?;
            Ok((response.items, response.next_page_token))
        })
    }

    /// Makes an authenticated GET request with common error handling: bearer
    /// token header, query parameters, and non-2xx status mapping.
    async fn authenticated_get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> eyre::Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .header(
                "Authorization",
                format!("Bearer {}", self.credential.access_token),
            )
            .query(query)
            .send()
            .await
            .with_context(|| format!("send request to YouTube API: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(eyre::eyre!(
                "YouTube API request failed with status {status}: {error_text}"
            ));
        }

        Ok(response)
    }

    /// One page of the `liveStreams.list` API, scoped to the authenticated
    /// user and requesting the id, snippet, and cdn parts.
    async fn list_live_streams_page(
        &self,
        page_token: Option<String>,
    ) -> eyre::Result<LiveStreamListResponse> {
        let url = format!("{}/liveStreams", self.api_base);
        let mut query = vec![("part", "id,snippet,cdn"), ("mine", "true"), ("maxResults", "50")];
        if let Some(ref token) = page_token {
            query.push(("pageToken", token.as_str()));
        }

        let response = self.authenticated_get(&url, &query).await?;
        let streams: LiveStreamListResponse = response
            .json()
            .await
            .context("parse YouTube liveStreams API response as JSON")?;

        tracing::debug!(
            total_results = streams.page_info.total_results,
            returned_items = streams.items.len(),
            "fetched live streams"
        );

        Ok(streams)
    }

    /// One page of the `liveBroadcasts.list` API, scoped to the authenticated
    /// user.
    async fn list_live_broadcasts_page(
        &self,
        page_token: Option<String>,
    ) -> eyre::Result<LiveBroadcastListResponse> {
        let url = format!("{}/liveBroadcasts", self.api_base);
        let mut query = vec![("part", "id,snippet,status"), ("mine", "true"), ("maxResults", "50")];
        if let Some(ref token) = page_token {
            query.push(("pageToken", token.as_str()));
        }

        let response = self.authenticated_get(&url, &query).await?;
        let broadcasts: LiveBroadcastListResponse = response
            .json()
            .await
            .context("parse YouTube liveBroadcasts API response as JSON")?;

        tracing::debug!(
            total_results = broadcasts.page_info.total_results,
            returned_items = broadcasts.items.len(),
            "fetched live broadcasts"
        );

        Ok(broadcasts)
    }
}
