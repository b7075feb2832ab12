#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use article_mirror::db::Repository;
use article_mirror::error::{AppError, Result};
use article_mirror::models::Block;
use article_mirror::notion::{ContentSource, Page, PaginatedList, QueryRequest};

/// A Notion database page with the properties the projection reads.
pub fn page(id: &str, title: &str, status: &str, topics: &[&str]) -> Value {
    let topics: Vec<Value> = topics.iter().map(|t| json!({"name": t})).collect();
    json!({
        "object": "page",
        "id": id,
        "last_edited_time": "2026-05-01T08:00:00.000Z",
        "properties": {
            "Title": {"type": "title", "title": [{"plain_text": title}]},
            "Slug": {"type": "rich_text", "rich_text": [{"plain_text": format!("{}-slug", id)}]},
            "Excerpt": {"type": "rich_text", "rich_text": [{"plain_text": format!("About {}", title)}]},
            "Publish Date": {"type": "date", "date": {"start": format!("2026-04-{}", id.len() + 10)}},
            "Author": {"type": "people", "people": [{"name": "Thandi"}]},
            "Topic": {"type": "multi_select", "multi_select": topics},
            "Why It Matters": {"type": "rich_text", "rich_text": [{"plain_text": "Context"}]},
            "Status": {"type": "status", "status": {"name": status}}
        }
    })
}

pub fn published(id: &str, title: &str) -> Value {
    page(id, title, "Published", &["Politics"])
}

pub fn paragraph(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {"rich_text": [{"plain_text": text}]}
    })
}

/// In-memory stand-in for the Notion collection.
#[derive(Default)]
pub struct FakeSource {
    pages: Mutex<Vec<Value>>,
    blocks: Mutex<HashMap<String, Vec<Value>>>,
    failing_page: Mutex<Option<String>>,
    queries: Mutex<Vec<QueryRequest>>,
    block_delays: Mutex<HashMap<String, Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl FakeSource {
    pub fn new(pages: Vec<Value>) -> Self {
        Self {
            pages: Mutex::new(pages),
            ..Self::default()
        }
    }

    /// Hold every collection query until `gate` is notified.
    pub fn gated(pages: Vec<Value>, gate: Arc<Notify>) -> Self {
        Self {
            pages: Mutex::new(pages),
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn set_pages(&self, pages: Vec<Value>) {
        *self.pages.lock().unwrap() = pages;
    }

    pub fn set_blocks(&self, page_id: &str, blocks: Vec<Value>) {
        self.blocks
            .lock()
            .unwrap()
            .insert(page_id.to_string(), blocks);
    }

    pub fn fail_blocks_for(&self, page_id: Option<&str>) {
        *self.failing_page.lock().unwrap() = page_id.map(str::to_string);
    }

    /// Make block listings for `page_id` take `delay` instead of one yield.
    pub fn delay_blocks_for(&self, page_id: &str, delay: Duration) {
        self.block_delays
            .lock()
            .unwrap()
            .insert(page_id.to_string(), delay);
    }

    /// Most block listings that were ever pending at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn fetch_published_page(
        &self,
        _collection_id: &str,
        query: &QueryRequest,
    ) -> Result<PaginatedList<Page>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.queries.lock().unwrap().push(query.clone());

        let pages = self.pages.lock().unwrap().clone();
        let start: usize = query
            .start_cursor
            .as_deref()
            .map(|c| c.parse().unwrap())
            .unwrap_or(0);
        let end = (start + query.page_size as usize).min(pages.len());
        let has_more = end < pages.len();

        Ok(PaginatedList {
            results: pages[start..end]
                .iter()
                .map(|v| Page::from_value(v.clone()).unwrap())
                .collect(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    async fn fetch_block_page(
        &self,
        page_id: &str,
        _cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>> {
        if self.failing_page.lock().unwrap().as_deref() == Some(page_id) {
            return Err(AppError::RemoteUnavailable {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }

        let delay = self.block_delays.lock().unwrap().get(page_id).copied();
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let blocks = self
            .blocks
            .lock()
            .unwrap()
            .get(page_id)
            .cloned()
            .unwrap_or_else(|| vec![paragraph(&format!("Body of {}", page_id))]);

        Ok(PaginatedList {
            results: blocks.into_iter().map(Block::from_value).collect(),
            has_more: false,
            next_cursor: None,
        })
    }
}

pub async fn temp_repository() -> (tempfile::TempDir, Arc<Repository>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("articles.db");
    let repository = Repository::new(path.to_str().unwrap()).await.unwrap();
    (dir, Arc::new(repository))
}
