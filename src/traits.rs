use crate::error::Result;
use crate::models::{ChapterInfoData, Page, ProcessRequest, ProgressEvent};

/// Progress observer handed to a processing call.
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(&ProgressEvent) + Send);

/// Backend client that turns a chapter URL into locally available pages.
#[async_trait::async_trait]
pub trait ChapterProcessor: Send + Sync {
    /// Process a chapter and download every processed page, in reading order.
    async fn process_chapter(
        &self,
        request: &ProcessRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<Vec<Page>>;

    /// Chapter metadata without triggering processing.
    async fn fetch_chapter_info(&self, chapter_url: &str) -> Result<ChapterInfoData>;

    /// Backend liveness. Never fails.
    async fn health_check(&self) -> bool;
}
