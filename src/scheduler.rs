use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::models::SyncReport;
use crate::notion::ContentSource;
use crate::reader::ArticleReader;
use crate::sync::SyncEngine;

/// Run a sync and, when it succeeds, flush cached read responses so readers
/// see the new data.
pub async fn sync_and_invalidate<S: ContentSource>(
    engine: &SyncEngine<S>,
    reader: &ArticleReader,
    full: bool,
) -> SyncReport {
    let report = engine.run(full).await;
    if report.success {
        reader.invalidate().await;
    }
    report
}

/// Periodic trigger that always runs incremental syncs in-process.
pub struct Scheduler<S> {
    engine: Arc<SyncEngine<S>>,
    reader: Arc<ArticleReader>,
    interval: Duration,
}

impl<S: ContentSource> Scheduler<S> {
    pub fn new(engine: Arc<SyncEngine<S>>, reader: Arc<ArticleReader>, interval: Duration) -> Self {
        Self {
            engine,
            reader,
            interval,
        }
    }

    /// Tick until `shutdown` resolves. The first sync runs immediately; a tick
    /// that comes due while a sync is still running is delayed, not stacked.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    tracing::info!("Scheduled sync triggered");
                    let report = sync_and_invalidate(&self.engine, &self.reader, false).await;
                    if !report.success {
                        tracing::warn!(
                            "Scheduled sync failed, next tick retries from the same watermark"
                        );
                    }
                }
            }
        }
    }
}
