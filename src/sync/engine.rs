use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, TimeDelta, Timelike, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::{watch, Mutex};

use crate::db::{repository, Repository};
use crate::error::Result;
use crate::models::{Article, ReconcileStats, SyncMetadata, SyncReport, SyncStatus, SyncType};
use crate::notion::{project_article, ContentSource, Filter, Page, QueryRequest};

use super::reconcile::reconcile;

/// Maximum block listings in flight at once during a sync.
pub const BLOCK_FETCH_CONCURRENCY: usize = 5;

const QUERY_PAGE_SIZE: u32 = 100;

const WATERMARK_SKEW_MINUTES: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    DeterminingMode,
    Fetching,
    Reconciling,
    UpdatingWatermark,
    Done,
    Failed,
}

/// Drives one sync run at a time from the remote collection into the store.
pub struct SyncEngine<S> {
    source: S,
    repository: Arc<Repository>,
    collection_id: String,
    page_size: u32,
    running: Mutex<()>,
    phase: Arc<watch::Sender<SyncPhase>>,
}

/// What a run has learned so far, kept for the failure report.
#[derive(Default)]
struct RunContext {
    sync_type: Option<SyncType>,
    previous_watermark: Option<String>,
}

struct RunOutcome {
    fetched: usize,
    stats: ReconcileStats,
    new_watermark: String,
}

impl<S: ContentSource> SyncEngine<S> {
    pub fn new(source: S, repository: Arc<Repository>, collection_id: impl Into<String>) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            source,
            repository,
            collection_id: collection_id.into(),
            page_size: QUERY_PAGE_SIZE,
            running: Mutex::new(()),
            phase: Arc::new(phase),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub async fn status(&self) -> Result<SyncStatus> {
        self.repository.sync_status().await
    }

    pub async fn run_incremental(&self) -> SyncReport {
        self.run(false).await
    }

    pub async fn run_full(&self) -> SyncReport {
        self.run(true).await
    }

    /// Run one sync. Never returns an error: failures come back as a report
    /// with `success = false`, and the stored watermark is left untouched.
    pub async fn run(&self, force_full: bool) -> SyncReport {
        let started = Instant::now();

        let Ok(_running) = self.running.try_lock() else {
            tracing::warn!("Sync requested while another sync is running");
            return failure_report(
                &RunContext::default(),
                started,
                "sync already in progress".to_string(),
            );
        };

        let mut context = RunContext::default();
        match self.execute(force_full, &mut context).await {
            Ok(outcome) => {
                self.enter(SyncPhase::Done);
                let report = SyncReport {
                    success: true,
                    sync_type: context.sync_type,
                    duration_ms: started.elapsed().as_millis() as i64,
                    fetched: outcome.fetched,
                    stats: outcome.stats,
                    previous_watermark: context.previous_watermark,
                    new_watermark: Some(outcome.new_watermark),
                    timestamp: now_rfc3339(),
                    error: None,
                };
                tracing::info!("{}", report);
                report
            }
            Err(e) => {
                self.enter(SyncPhase::Failed);
                tracing::error!("Sync error: {}", e);
                failure_report(&context, started, e.to_string())
            }
        }
    }

    async fn execute(&self, force_full: bool, context: &mut RunContext) -> Result<RunOutcome> {
        self.enter(SyncPhase::DeterminingMode);
        let previous = self.repository.get_sync_metadata().await?;
        let (mode, watermark) = choose_mode(force_full, previous.as_ref());
        context.sync_type = Some(mode);
        context.previous_watermark = previous.map(|m| m.last_sync_timestamp);

        // Taken before fetching so edits made during this run are picked up next time.
        let sync_start = watermark_at(Utc::now());

        self.enter(SyncPhase::Fetching);
        tracing::info!(
            mode = %mode,
            since = watermark.as_deref().unwrap_or("-"),
            "Starting Notion sync"
        );
        let fetched = self.fetch_articles(watermark.as_deref()).await?;
        let fetched_count = fetched.len();
        tracing::info!("Fetched {} articles from Notion", fetched_count);

        let articles: Vec<Article> = fetched
            .into_iter()
            .filter(|article| {
                let published = article.status.is_published();
                if !published {
                    tracing::warn!(
                        id = %article.id,
                        status = %article.status,
                        "Dropping non-published page"
                    );
                }
                published
            })
            .collect();

        self.enter(SyncPhase::Reconciling);
        let metadata = SyncMetadata {
            last_sync_timestamp: sync_start.clone(),
            last_sync_completed_at: 0,
            total_articles_synced: articles.len() as i64,
            sync_type: mode,
        };
        let phase = Arc::clone(&self.phase);

        let stats = self
            .repository
            .transaction(move |tx| {
                let now = Utc::now().timestamp_millis();
                let stats = reconcile(tx, &articles, mode, now)?;

                phase.send_replace(SyncPhase::UpdatingWatermark);
                let metadata = SyncMetadata {
                    last_sync_completed_at: Utc::now().timestamp_millis(),
                    ..metadata
                };
                repository::put_sync_metadata(tx, &metadata)?;
                Ok(stats)
            })
            .await?;

        Ok(RunOutcome {
            fetched: fetched_count,
            stats,
            new_watermark: sync_start,
        })
    }

    /// Page through the collection, pulling block content for each page with
    /// at most [`BLOCK_FETCH_CONCURRENCY`] listings in flight.
    async fn fetch_articles(&self, watermark: Option<&str>) -> Result<Vec<Article>> {
        let filter = Filter::published_since(watermark);
        let mut articles = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let query = QueryRequest::new(filter.clone(), self.page_size).with_cursor(cursor.take());
            let batch = self
                .source
                .fetch_published_page(&self.collection_id, &query)
                .await?;
            let next = batch.continuation().map(str::to_string);

            let mut with_content: Vec<Article> = stream::iter(batch.results.iter())
                .map(|page| self.with_content(page))
                .buffered(BLOCK_FETCH_CONCURRENCY)
                .try_collect()
                .await?;
            articles.append(&mut with_content);

            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        Ok(articles)
    }

    async fn with_content(&self, page: &Page) -> Result<Article> {
        let blocks = self.source.fetch_all_blocks(&page.id).await?;
        let mut article = project_article(page);
        article.content = Some(blocks);
        Ok(article)
    }

    fn enter(&self, phase: SyncPhase) {
        tracing::debug!(?phase, "Sync phase");
        self.phase.send_replace(phase);
    }
}

/// A missing watermark or an explicit request means a full sync.
fn choose_mode(force_full: bool, previous: Option<&SyncMetadata>) -> (SyncType, Option<String>) {
    match previous {
        Some(metadata) if !force_full => (
            SyncType::Incremental,
            Some(metadata.last_sync_timestamp.clone()),
        ),
        _ => (SyncType::Full, None),
    }
}

fn failure_report(context: &RunContext, started: Instant, error: String) -> SyncReport {
    SyncReport {
        success: false,
        sync_type: context.sync_type,
        duration_ms: started.elapsed().as_millis() as i64,
        fetched: 0,
        stats: ReconcileStats::default(),
        previous_watermark: context.previous_watermark.clone(),
        new_watermark: context.previous_watermark.clone(),
        timestamp: now_rfc3339(),
        error: Some(error),
    }
}

/// Watermark for a run starting at `start`.
///
/// Notion truncates `last_edited_time` to the minute, so the watermark is
/// floored to the minute and then moved back one more for clock skew.
fn watermark_at(start: DateTime<Utc>) -> String {
    let floored = start
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(start);
    (floored - TimeDelta::minutes(WATERMARK_SKEW_MINUTES))
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
