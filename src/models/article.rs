use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Block;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArticleStatus {
    Published,
    Other(String),
    #[default]
    Unset,
}

impl ArticleStatus {
    pub const PUBLISHED: &'static str = "Published";

    pub fn as_str(&self) -> &str {
        match self {
            ArticleStatus::Published => Self::PUBLISHED,
            ArticleStatus::Other(name) => name,
            ArticleStatus::Unset => "",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, ArticleStatus::Published)
    }
}

impl From<&str> for ArticleStatus {
    fn from(name: &str) -> Self {
        match name {
            "" => ArticleStatus::Unset,
            Self::PUBLISHED => ArticleStatus::Published,
            other => ArticleStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for ArticleStatus {
    fn from(name: String) -> Self {
        ArticleStatus::from(name.as_str())
    }
}

impl From<ArticleStatus> for String {
    fn from(status: ArticleStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An article as mirrored in the local store.
///
/// `created_at`, `updated_at` and `synced_at` are local epoch milliseconds and
/// are never taken from the remote page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub publish_date: String,
    pub last_edited_time: String,
    pub author: Vec<String>,
    pub topics: Vec<String>,
    pub why_it_matters: String,
    pub status: ArticleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub content: Option<Vec<Block>>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub synced_at: i64,
}

#[derive(Serialize)]
struct HashedFields<'a> {
    title: &'a str,
    slug: &'a str,
    excerpt: &'a str,
    publish_date: &'a str,
    last_edited_time: &'a str,
    author: &'a [String],
    topics: &'a [String],
    why_it_matters: &'a str,
    status: &'a str,
    cover_image: Option<&'a str>,
    content: Option<&'a [Block]>,
}

impl Article {
    /// SHA-256 over every column a sync may rewrite, hex encoded.
    pub fn content_hash(&self) -> Result<String> {
        let fields = HashedFields {
            title: &self.title,
            slug: &self.slug,
            excerpt: &self.excerpt,
            publish_date: &self.publish_date,
            last_edited_time: &self.last_edited_time,
            author: &self.author,
            topics: &self.topics,
            why_it_matters: &self.why_it_matters,
            status: self.status.as_str(),
            cover_image: self.cover_image.as_deref(),
            content: self.content.as_deref(),
        };
        let bytes = serde_json::to_vec(&fields)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(ArticleStatus::from("Published"), ArticleStatus::Published);
        assert_eq!(ArticleStatus::from(""), ArticleStatus::Unset);
        assert_eq!(
            ArticleStatus::from("Draft"),
            ArticleStatus::Other("Draft".to_string())
        );
        assert_eq!(String::from(ArticleStatus::Published), "Published");
    }

    #[test]
    fn content_hash_ignores_bookkeeping_timestamps() {
        let article = Article {
            id: "a".to_string(),
            title: "Load shedding returns".to_string(),
            status: ArticleStatus::Published,
            ..Article::default()
        };
        let mut resynced = article.clone();
        resynced.synced_at = 42;
        resynced.updated_at = 42;
        assert_eq!(article.content_hash().unwrap(), resynced.content_hash().unwrap());

        let mut edited = article.clone();
        edited.title.push('!');
        assert_ne!(article.content_hash().unwrap(), edited.content_hash().unwrap());
    }
}
