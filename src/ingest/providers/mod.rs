// src/ingest/providers/mod.rs
pub mod discussion_rss;
pub mod video_api;

pub use discussion_rss::DiscussionFeedSource;
pub use video_api::{VideoFeedSource, VideoQuery};
