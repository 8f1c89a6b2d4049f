//! YouTube Live Streams API types.
//!
//! A `liveStream` resource is the technical video pipeline for transmitting
//! content to YouTube: encoder settings, ingestion URLs, CDN configuration.
//! The ingestion info is what ties an encoder configuration to a stream
//! resource, and its `streamName` is the human-assigned label this crate
//! resolves to stream ids.

use crate::youtube_api::types::PageInfo;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Error for a lookup of an ingestion name that no stream in the
/// authenticated user's listing carries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stream name not found: {0}")]
pub struct StreamNotFound(pub String);

/// Response structure for the `liveStreams.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct LiveStreamListResponse {
    /// Identifies the API resource's type.
    ///
    /// The value will be `youtube#liveStreamListResponse`.
    pub kind: String,
    /// A list of live streams that match the request criteria.
    pub items: VecDeque<LiveStream>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next page in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `liveStream` resource.
///
/// Streams exist independently of any broadcast and can be reused across
/// multiple broadcasts over time; the id is the stable handle the rest of the
/// live API wants, while encoders are configured with the ingestion details.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct LiveStream {
    /// The ID that YouTube assigns to uniquely identify the stream.
    pub id: String,
    /// Contains basic details about the stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<LiveStreamSnippet>,
    /// The stream's ingestion and CDN configuration.
    pub cdn: CdnSettings,
}

/// The snippet object contains basic details about the stream.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct LiveStreamSnippet {
    /// The stream's title.
    pub title: String,
    /// The stream's description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The cdn object defines how the stream's content is ingested.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#cdn>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnSettings {
    /// The method or protocol used to transmit the video stream
    /// (`rtmp`, `dash`, `hls`, or `webrtc`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingestion_type: Option<String>,
    /// Information YouTube provides for transmitting content to the stream.
    pub ingestion_info: IngestionInfo,
}

/// The ingestion details an encoder needs to send video to this stream.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveStreams#cdn.ingestionInfo>
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionInfo {
    /// The stream name that YouTube assigns to the video stream.
    ///
    /// This is the human-facing label encoders are configured with, distinct
    /// from the resource's opaque id. YouTube does not guarantee it unique.
    pub stream_name: String,
    /// The primary ingestion URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingestion_address: Option<String>,
    /// The backup ingestion URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_ingestion_address: Option<String>,
}
