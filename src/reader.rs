//! Read API over the mirrored articles, fronted by the response cache.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{keys, ResponseCache};
use crate::db::Repository;
use crate::error::Result;
use crate::models::Article;

pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const DEFAULT_RELATED_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub articles: Vec<Article>,
    pub has_more: bool,
    pub total: i64,
}

pub struct ArticleReader {
    repository: Arc<Repository>,
    cache: Arc<ResponseCache>,
}

impl ArticleReader {
    pub fn new(repository: Arc<Repository>, cache: Arc<ResponseCache>) -> Self {
        Self { repository, cache }
    }

    /// Newest published articles, optionally restricted to one topic.
    ///
    /// `cursor` is the row offset returned as `next_cursor` by the previous
    /// page; anything unparsable restarts from the first page.
    pub async fn published_articles(
        &self,
        topic: Option<&str>,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ArticlePage> {
        let key = keys::articles(topic, page_size, cursor);
        if let Some(page) = self.cache.get::<ArticlePage>(&key).await {
            return Ok(page);
        }

        let offset = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        // One extra row tells us whether another page exists.
        let mut articles = self
            .repository
            .get_published_articles(topic.map(str::to_string), page_size + 1, offset)
            .await?;

        let has_more = articles.len() > page_size;
        articles.truncate(page_size);
        let page = ArticlePage {
            articles,
            has_more,
            next_cursor: has_more.then(|| (offset + page_size).to_string()),
        };

        self.cache.set(&key, &page).await;
        Ok(page)
    }

    pub async fn article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let key = keys::article(slug);
        if let Some(article) = self.cache.get::<Article>(&key).await {
            return Ok(Some(article));
        }

        let article = self.repository.get_article_by_slug(slug).await?;
        if let Some(article) = &article {
            self.cache.set(&key, article).await;
        }
        Ok(article)
    }

    pub async fn search(&self, query: &str, page_size: usize, offset: usize) -> Result<SearchResults> {
        let sanitized = sanitize_query(query);
        if sanitized.is_empty() {
            return Ok(SearchResults {
                articles: Vec::new(),
                has_more: false,
                total: 0,
            });
        }

        let key = keys::search(&sanitized, page_size, offset);
        if let Some(results) = self.cache.get::<SearchResults>(&key).await {
            return Ok(results);
        }

        let (mut articles, total) = self
            .repository
            .search_articles(&sanitized, page_size + 1, offset)
            .await?;
        let has_more = articles.len() > page_size;
        articles.truncate(page_size);

        let results = SearchResults {
            articles,
            has_more,
            total,
        };
        self.cache.set(&key, &results).await;
        Ok(results)
    }

    pub async fn related(&self, slug: &str, limit: usize) -> Result<Vec<Article>> {
        let key = keys::related(slug, limit);
        if let Some(articles) = self.cache.get::<Vec<Article>>(&key).await {
            return Ok(articles);
        }

        let articles = self.repository.get_related_articles(slug, limit).await?;
        self.cache.set(&key, &articles).await;
        Ok(articles)
    }

    /// Every topic used by a published article, sorted.
    pub async fn all_topics(&self) -> Result<Vec<String>> {
        let key = keys::topics();
        if let Some(topics) = self.cache.get::<Vec<String>>(&key).await {
            return Ok(topics);
        }

        let topics: BTreeSet<String> = self
            .repository
            .get_published_topic_lists()
            .await?
            .into_iter()
            .flatten()
            .collect();
        let topics: Vec<String> = topics.into_iter().collect();

        self.cache.set(&key, &topics).await;
        Ok(topics)
    }

    pub async fn topic_counts(&self) -> Result<BTreeMap<String, usize>> {
        let key = keys::topic_counts();
        if let Some(counts) = self.cache.get::<BTreeMap<String, usize>>(&key).await {
            return Ok(counts);
        }

        let mut counts = BTreeMap::new();
        for topic in self
            .repository
            .get_published_topic_lists()
            .await?
            .into_iter()
            .flatten()
        {
            *counts.entry(topic).or_insert(0) += 1;
        }

        self.cache.set(&key, &counts).await;
        Ok(counts)
    }

    /// Forget every cached response; called after a successful sync.
    pub async fn invalidate(&self) {
        self.cache.invalidate(None).await;
    }
}

/// Turn user input into an FTS5 query of quoted terms, all of which must match.
///
/// Each whitespace-separated word keeps only its word characters and is quoted,
/// so `OR`, `NOT` or `NEAR` are searched as plain words instead of operators.
fn sanitize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .map(|word| format!("\"{}\"", word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_quotes_every_term() {
        assert_eq!(
            sanitize_query("  \"grid\" AND (power*) "),
            "\"grid\" \"AND\" \"power\""
        );
        assert_eq!(sanitize_query("***"), "");
        assert_eq!(sanitize_query("OR"), "\"OR\"");
        assert_eq!(sanitize_query("tariffs NEAR"), "\"tariffs\" \"NEAR\"");
    }
}
