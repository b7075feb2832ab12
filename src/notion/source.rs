use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Block;

use super::client::NotionClient;
use super::filter::QueryRequest;
use super::types::{Page, PaginatedList};

/// Block pagination stops once more than this many blocks have been collected.
pub const MAX_BLOCKS_PER_PAGE: usize = 1000;

/// Read access to the remote page collection.
///
/// Calls are side-effect free on the remote and are never retried here.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// One page of collection records matching `query`.
    async fn fetch_published_page(
        &self,
        collection_id: &str,
        query: &QueryRequest,
    ) -> Result<PaginatedList<Page>>;

    /// One page of a page's child blocks.
    async fn fetch_block_page(
        &self,
        page_id: &str,
        cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>>;

    /// Every child block of a page, truncated past [`MAX_BLOCKS_PER_PAGE`].
    async fn fetch_all_blocks(&self, page_id: &str) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let batch = self.fetch_block_page(page_id, cursor.as_deref()).await?;
            let next = batch.continuation().map(str::to_string);
            blocks.extend(batch.results);

            if blocks.len() > MAX_BLOCKS_PER_PAGE {
                tracing::warn!(
                    page_id,
                    blocks = blocks.len(),
                    "Article has over {} blocks, stopping pagination",
                    MAX_BLOCKS_PER_PAGE
                );
                break;
            }

            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        Ok(blocks)
    }
}

#[async_trait]
impl ContentSource for NotionClient {
    async fn fetch_published_page(
        &self,
        collection_id: &str,
        query: &QueryRequest,
    ) -> Result<PaginatedList<Page>> {
        let raw = self.query_database(collection_id, query).await?;

        let mut pages = Vec::with_capacity(raw.results.len());
        for value in raw.results {
            match Page::from_value(value) {
                Ok(page) => pages.push(page),
                Err(e) => tracing::warn!("Skipping unreadable page: {}", e),
            }
        }

        Ok(PaginatedList {
            results: pages,
            has_more: raw.has_more,
            next_cursor: raw.next_cursor,
        })
    }

    async fn fetch_block_page(
        &self,
        page_id: &str,
        cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>> {
        self.list_block_children(page_id, cursor).await
    }
}

#[async_trait]
impl<T: ContentSource + ?Sized> ContentSource for Arc<T> {
    async fn fetch_published_page(
        &self,
        collection_id: &str,
        query: &QueryRequest,
    ) -> Result<PaginatedList<Page>> {
        (**self).fetch_published_page(collection_id, query).await
    }

    async fn fetch_block_page(
        &self,
        page_id: &str,
        cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>> {
        (**self).fetch_block_page(page_id, cursor).await
    }

    async fn fetch_all_blocks(&self, page_id: &str) -> Result<Vec<Block>> {
        (**self).fetch_all_blocks(page_id).await
    }
}
