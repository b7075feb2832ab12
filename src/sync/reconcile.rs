use std::collections::HashSet;

use rusqlite::Transaction;

use crate::db::repository;
use crate::error::Result;
use crate::models::{Article, ReconcileStats, SyncType};

/// Diff `remote` against the stored articles and apply it row by row.
///
/// Existing ids are rewritten when their content hash changed and only
/// re-stamped otherwise; unknown ids are inserted. Stored ids missing from
/// `remote` are deleted on a full sync only, since an incremental fetch holds
/// just the pages edited after the watermark. Deletions run first so a slug
/// freed by a removed page can be taken by an incoming one.
///
/// The first failing write aborts with `StorageWriteFailed`; the caller's
/// transaction then discards everything written so far.
pub fn reconcile(
    tx: &Transaction<'_>,
    remote: &[Article],
    mode: SyncType,
    now: i64,
) -> Result<ReconcileStats> {
    let existing = repository::existing_hashes(tx)?;
    let remote_ids: HashSet<&str> = remote.iter().map(|a| a.id.as_str()).collect();
    let mut stats = ReconcileStats::default();

    if mode == SyncType::Full {
        for id in existing.keys().filter(|id| !remote_ids.contains(id.as_str())) {
            repository::delete_article(tx, id)?;
            tracing::debug!(id = %id, "Deleted article no longer published");
            stats.deleted += 1;
        }
    }

    for article in remote {
        let hash = article.content_hash()?;
        match existing.get(&article.id) {
            Some(stored) if *stored == hash => {
                repository::touch_article(tx, &article.id, now)?;
                stats.unchanged += 1;
            }
            Some(_) => {
                repository::update_article(tx, article, &hash, now)?;
                stats.updated += 1;
            }
            None => {
                repository::insert_article(tx, article, &hash, now)?;
                stats.inserted += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repository;
    use crate::error::AppError;
    use crate::models::ArticleStatus;

    fn article(id: &str, title: &str) -> Article {
        Article {
            id: id.to_string(),
            title: title.to_string(),
            slug: format!("slug-{}", id),
            status: ArticleStatus::Published,
            topics: vec!["Politics".to_string()],
            ..Article::default()
        }
    }

    async fn run(
        repo: &Repository,
        remote: Vec<Article>,
        mode: SyncType,
        now: i64,
    ) -> Result<ReconcileStats> {
        repo.transaction(move |tx| reconcile(tx, &remote, mode, now))
            .await
    }

    async fn seed(repo: &Repository, ids: &[&str]) {
        let remote = ids.iter().map(|id| article(id, "seed")).collect();
        run(repo, remote, SyncType::Full, 1).await.unwrap();
    }

    #[tokio::test]
    async fn full_sync_converges_on_remote_ids() {
        let repo = Repository::open_in_memory().await.unwrap();
        seed(&repo, &["A", "B", "C"]).await;

        let remote = vec![article("B", "edited"), article("C", "edited"), article("D", "new")];
        let stats = run(&repo, remote, SyncType::Full, 2).await.unwrap();

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.updated, 2);
        assert_eq!(stats.deleted, 1);
        assert_eq!(repo.article_ids().await.unwrap(), vec!["B", "C", "D"]);
    }

    #[tokio::test]
    async fn incremental_sync_never_deletes() {
        let repo = Repository::open_in_memory().await.unwrap();
        seed(&repo, &["A", "B", "C"]).await;

        let stats = run(&repo, vec![article("B", "edited")], SyncType::Incremental, 2)
            .await
            .unwrap();

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.deleted, 0);
        assert_eq!(repo.article_ids().await.unwrap(), vec!["A", "B", "C"]);
        let b = repo.get_article("B").await.unwrap().unwrap();
        assert_eq!(b.title, "edited");
        assert_eq!(b.created_at, 1);
        assert_eq!(b.updated_at, 2);
    }

    #[tokio::test]
    async fn same_snapshot_twice_is_a_content_no_op() {
        let repo = Repository::open_in_memory().await.unwrap();
        let snapshot = vec![article("A", "one"), article("B", "two")];
        run(&repo, snapshot.clone(), SyncType::Full, 1).await.unwrap();
        let before = repo.get_article("A").await.unwrap().unwrap();

        let stats = run(&repo, snapshot, SyncType::Full, 5).await.unwrap();

        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.deleted, 0);
        assert_eq!(stats.unchanged, 2);

        let after = repo.get_article("A").await.unwrap().unwrap();
        assert_eq!(after.synced_at, 5);
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(
            Article { synced_at: 0, ..after },
            Article { synced_at: 0, ..before }
        );
    }

    #[tokio::test]
    async fn write_failure_rolls_back_the_whole_batch() {
        let repo = Repository::open_in_memory().await.unwrap();
        seed(&repo, &["A"]).await;

        let mut clash = article("C", "clash");
        clash.slug = "slug-B".to_string();
        let remote = vec![article("A", "edited"), article("B", "new"), clash];

        let err = run(&repo, remote, SyncType::Full, 2).await.unwrap_err();

        assert!(matches!(err, AppError::StorageWriteFailed { ref id, .. } if id == "C"));
        assert_eq!(repo.article_ids().await.unwrap(), vec!["A"]);
        assert_eq!(repo.get_article("A").await.unwrap().unwrap().title, "seed");
    }

    #[tokio::test]
    async fn deleted_slug_can_be_reused_in_the_same_sync() {
        let repo = Repository::open_in_memory().await.unwrap();
        seed(&repo, &["A"]).await;

        let mut replacement = article("Z", "moved");
        replacement.slug = "slug-A".to_string();
        let stats = run(&repo, vec![replacement], SyncType::Full, 2).await.unwrap();

        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.inserted, 1);
        assert_eq!(repo.article_ids().await.unwrap(), vec!["Z"]);
    }
}
