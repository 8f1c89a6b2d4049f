//! YouTube Data API v3 client library.
//!
//! # Core Concepts: Broadcasts vs Streams
//!
//! The YouTube Live API has two resource types that work together but serve
//! different purposes:
//!
//! - [`broadcasts::LiveBroadcast`] is the viewer-facing event: title,
//!   scheduled time, lifecycle. Each broadcast is exactly one YouTube video.
//! - [`streams::LiveStream`] is the technical infrastructure: encoder
//!   settings, CDN configuration, ingestion URLs. One stream can power many
//!   broadcasts over time.
//!
//! Encoders are configured with a stream's ingestion *name*; the rest of the
//! API wants the stream's *id*. [`YouTubeClient::stream_id`] bridges the two.

pub mod broadcasts;
pub mod client;
pub mod streams;
pub mod types;

pub use client::YouTubeClient;
pub use types::{PageInfo, PagedStream};

pub use streams::{
    CdnSettings, IngestionInfo, LiveStream, LiveStreamListResponse, LiveStreamSnippet,
    StreamNotFound,
};

pub use broadcasts::{
    BroadcastLifeCycleStatus, LiveBroadcast, LiveBroadcastListResponse, LiveBroadcastSnippet,
    LiveBroadcastStatus,
};
