//! Network fetcher contract
//!
//! Segment retrieval is fire-and-forget from the core's point of view:
//! fetched bytes flow into the media pipelines, which report progress back
//! through pipeline events. The core never awaits a fetch.

use crate::manifest::RequestDescriptor;

/// Retrieves media segments.
pub trait SegmentFetcher: Send + Sync {
    /// Issue the given segment requests, tagged with their segment index.
    ///
    /// Completion is reported indirectly: the pipeline fed by the fetch
    /// emits `SegmentProcessed` once the bytes have been appended.
    fn fetch_segments(&self, requests: &[RequestDescriptor], segment: u64);
}
