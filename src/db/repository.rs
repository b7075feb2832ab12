use std::collections::HashMap;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, Transaction};
use serde::de::DeserializeOwned;
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{Article, ArticleStatus, SyncMetadata, SyncStatus, SyncType};

use super::schema::SCHEMA;

const LISTING_COLUMNS: &str = "a.id, a.title, a.slug, a.excerpt, NULL AS content, a.publish_date, \
     a.last_edited_time, a.author, a.topics, a.why_it_matters, a.status, a.cover_image, \
     a.created_at, a.updated_at, a.synced_at";

const FULL_COLUMNS: &str = "a.id, a.title, a.slug, a.excerpt, a.content, a.publish_date, \
     a.last_edited_time, a.author, a.topics, a.why_it_matters, a.status, a.cover_image, \
     a.created_at, a.updated_at, a.synced_at";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Run `f` inside one SQLite transaction. It commits only when `f` returns
    /// `Ok`; any error rolls every write in it back.
    pub async fn transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let result = f(&tx);
                if result.is_ok() {
                    tx.commit()?;
                }
                Ok(result)
            })
            .await?
    }

    // Sync metadata

    pub async fn get_sync_metadata(&self) -> Result<Option<SyncMetadata>> {
        let row = self
            .conn
            .call(|conn| {
                let row = conn
                    .query_row(
                        "SELECT last_sync_timestamp, last_sync_completed_at, total_articles_synced, sync_type
                         FROM sync_metadata WHERE id = 1",
                        [],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, i64>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, String>(3)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        let Some((last_sync_timestamp, last_sync_completed_at, total_articles_synced, kind)) = row
        else {
            return Ok(None);
        };

        let sync_type = SyncType::parse(&kind)
            .ok_or_else(|| AppError::MalformedRecord(format!("unknown sync type {:?}", kind)))?;

        Ok(Some(SyncMetadata {
            last_sync_timestamp,
            last_sync_completed_at,
            total_articles_synced,
            sync_type,
        }))
    }

    pub async fn sync_status(&self) -> Result<SyncStatus> {
        Ok(match self.get_sync_metadata().await? {
            Some(metadata) => SyncStatus::Synced(metadata),
            None => SyncStatus::NeverSynced,
        })
    }

    // Article reads

    pub async fn article_ids(&self) -> Result<Vec<String>> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM articles ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(ids)
            })
            .await?;
        Ok(ids)
    }

    pub async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let id = id.to_string();
        let article = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM articles a WHERE a.id = ?1", FULL_COLUMNS);
                let article = conn
                    .query_row(&sql, params![id], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Published articles newest first, without content. Fetches at most `limit` rows.
    pub async fn get_published_articles(
        &self,
        topic: Option<String>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(move |conn| {
                let mut sql = format!(
                    "SELECT {} FROM articles a WHERE a.status = 'Published'",
                    LISTING_COLUMNS
                );
                let mut values: Vec<SqlValue> = Vec::new();

                if let Some(topic) = topic {
                    sql.push_str(" AND a.topics LIKE ? ESCAPE '\\'");
                    values.push(SqlValue::Text(topic_pattern(&topic)));
                }

                sql.push_str(" ORDER BY a.publish_date DESC LIMIT ? OFFSET ?");
                values.push(SqlValue::Integer(limit as i64));
                values.push(SqlValue::Integer(offset as i64));

                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params_from_iter(values.iter()), article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let slug = slug.to_string();
        let article = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM articles a WHERE a.slug = ?1 AND a.status = 'Published' LIMIT 1",
                    FULL_COLUMNS
                );
                let article = conn
                    .query_row(&sql, params![slug], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Full-text search over title, excerpt and why-it-matters, best match first.
    /// Returns the page of matches and the total match count.
    pub async fn search_articles(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Article>, i64)> {
        let query = query.to_string();
        let result = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM articles_fts
                     JOIN articles a ON articles_fts.rowid = a.pk
                     WHERE articles_fts MATCH ?1 AND a.status = 'Published'
                     ORDER BY rank
                     LIMIT ?2 OFFSET ?3",
                    LISTING_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(
                        params![query, limit as i64, offset as i64],
                        article_from_row,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM articles_fts
                     JOIN articles a ON articles_fts.rowid = a.pk
                     WHERE articles_fts MATCH ?1 AND a.status = 'Published'",
                    params![query],
                    |row| row.get(0),
                )?;

                Ok((articles, total))
            })
            .await?;
        Ok(result)
    }

    /// Published articles sharing at least one topic with `slug`, excluding it.
    pub async fn get_related_articles(&self, slug: &str, limit: usize) -> Result<Vec<Article>> {
        let slug = slug.to_string();
        let articles = self
            .conn
            .call(move |conn| {
                let topics_json: Option<String> = conn
                    .query_row(
                        "SELECT topics FROM articles WHERE slug = ?1 AND status = 'Published'",
                        params![slug],
                        |row| row.get(0),
                    )
                    .optional()?;

                let topics: Vec<String> = parse_json_column(topics_json);
                if topics.is_empty() {
                    return Ok(Vec::new());
                }

                let conditions = vec!["a.topics LIKE ? ESCAPE '\\'"; topics.len()].join(" OR ");
                let sql = format!(
                    "SELECT {} FROM articles a
                     WHERE a.slug != ? AND a.status = 'Published' AND ({})
                     ORDER BY a.publish_date DESC
                     LIMIT ?",
                    LISTING_COLUMNS, conditions
                );

                let mut values = vec![SqlValue::Text(slug)];
                values.extend(topics.iter().map(|t| SqlValue::Text(topic_pattern(t))));
                values.push(SqlValue::Integer(limit as i64));

                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params_from_iter(values.iter()), article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// Topic lists of every published article.
    pub async fn get_published_topic_lists(&self) -> Result<Vec<Vec<String>>> {
        let lists = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT topics FROM articles WHERE status = 'Published'")?;
                let lists = stmt
                    .query_map([], |row| row.get::<_, Option<String>>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(lists)
            })
            .await?;
        Ok(lists.into_iter().map(parse_json_column).collect())
    }
}

// Row writes used by reconciliation. They run on a transaction handed out by
// `Repository::transaction` and report failures per article id.

/// `id -> content_hash` of every stored article.
pub fn existing_hashes(tx: &Transaction<'_>) -> Result<HashMap<String, String>> {
    let mut stmt = tx.prepare("SELECT id, content_hash FROM articles")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

pub fn insert_article(tx: &Transaction<'_>, article: &Article, hash: &str, now: i64) -> Result<()> {
    let columns = ArticleColumns::encode(article)?;
    tx.execute(
        r#"INSERT INTO articles (
               id, title, slug, excerpt, content, publish_date, last_edited_time, author,
               topics, why_it_matters, status, cover_image, content_hash,
               created_at, updated_at, synced_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14, ?14)"#,
        params![
            article.id,
            article.title,
            article.slug,
            article.excerpt,
            columns.content,
            article.publish_date,
            article.last_edited_time,
            columns.author,
            columns.topics,
            article.why_it_matters,
            article.status.as_str(),
            article.cover_image,
            hash,
            now,
        ],
    )
    .map_err(|e| AppError::storage_write(&article.id, e))?;
    Ok(())
}

pub fn update_article(tx: &Transaction<'_>, article: &Article, hash: &str, now: i64) -> Result<()> {
    let columns = ArticleColumns::encode(article)?;
    tx.execute(
        r#"UPDATE articles
           SET title = ?2,
               slug = ?3,
               excerpt = ?4,
               content = ?5,
               publish_date = ?6,
               last_edited_time = ?7,
               author = ?8,
               topics = ?9,
               why_it_matters = ?10,
               status = ?11,
               cover_image = ?12,
               content_hash = ?13,
               updated_at = ?14,
               synced_at = ?14
           WHERE id = ?1"#,
        params![
            article.id,
            article.title,
            article.slug,
            article.excerpt,
            columns.content,
            article.publish_date,
            article.last_edited_time,
            columns.author,
            columns.topics,
            article.why_it_matters,
            article.status.as_str(),
            article.cover_image,
            hash,
            now,
        ],
    )
    .map_err(|e| AppError::storage_write(&article.id, e))?;
    Ok(())
}

/// Mark an unchanged article as seen by this sync.
pub fn touch_article(tx: &Transaction<'_>, id: &str, now: i64) -> Result<()> {
    tx.execute(
        "UPDATE articles SET synced_at = ?2 WHERE id = ?1",
        params![id, now],
    )
    .map_err(|e| AppError::storage_write(id, e))?;
    Ok(())
}

pub fn delete_article(tx: &Transaction<'_>, id: &str) -> Result<()> {
    tx.execute("DELETE FROM articles WHERE id = ?1", params![id])
        .map_err(|e| AppError::storage_write(id, e))?;
    Ok(())
}

pub fn put_sync_metadata(tx: &Transaction<'_>, metadata: &SyncMetadata) -> Result<()> {
    tx.execute(
        r#"INSERT INTO sync_metadata
               (id, last_sync_timestamp, last_sync_completed_at, total_articles_synced, sync_type)
           VALUES (1, ?1, ?2, ?3, ?4)
           ON CONFLICT(id) DO UPDATE SET
               last_sync_timestamp = excluded.last_sync_timestamp,
               last_sync_completed_at = excluded.last_sync_completed_at,
               total_articles_synced = excluded.total_articles_synced,
               sync_type = excluded.sync_type"#,
        params![
            metadata.last_sync_timestamp,
            metadata.last_sync_completed_at,
            metadata.total_articles_synced,
            metadata.sync_type.as_str(),
        ],
    )?;
    Ok(())
}

struct ArticleColumns {
    content: Option<String>,
    author: String,
    topics: String,
}

impl ArticleColumns {
    fn encode(article: &Article) -> Result<Self> {
        Ok(Self {
            content: article
                .content
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            author: serde_json::to_string(&article.author)?,
            topics: serde_json::to_string(&article.topics)?,
        })
    }
}

/// LIKE pattern (escape character `\`) matching a topic inside a
/// JSON-encoded string array.
fn topic_pattern(topic: &str) -> String {
    let quoted = serde_json::to_string(topic).unwrap_or_else(|_| format!("\"{}\"", topic));
    let escaped = quoted
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn parse_json_column<T: DeserializeOwned + Default>(raw: Option<String>) -> T {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        content: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        publish_date: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        last_edited_time: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        author: parse_json_column(row.get(7)?),
        topics: parse_json_column(row.get(8)?),
        why_it_matters: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        status: ArticleStatus::from(row.get::<_, String>(10)?),
        cover_image: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        synced_at: row.get(14)?,
    })
}
