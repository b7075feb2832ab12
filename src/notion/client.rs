use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;
use url::Url;

use crate::config::{Config, NOTION_API_VERSION};
use crate::error::{AppError, Result};
use crate::models::Block;

use super::filter::QueryRequest;
use super::types::PaginatedList;

const BLOCK_PAGE_SIZE: &str = "100";

pub struct NotionClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl NotionClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("article-mirror/1.0")
            .build()?;

        // Url::join drops the last path segment unless the base ends in a slash.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_key()?.to_string(),
            &config.notion_api_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// One page of `POST /databases/{id}/query`.
    pub async fn query_database(
        &self,
        database_id: &str,
        request: &QueryRequest,
    ) -> Result<PaginatedList<Value>> {
        let url = self
            .base_url
            .join(&format!("databases/{}/query", database_id))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_API_VERSION)
            .json(request)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// One page of `GET /blocks/{id}/children`.
    pub async fn list_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<PaginatedList<Block>> {
        let mut url = self
            .base_url
            .join(&format!("blocks/{}/children", block_id))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", BLOCK_PAGE_SIZE);
            if let Some(cursor) = cursor {
                query.append_pair("start_cursor", cursor);
            }
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_API_VERSION)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::RemoteUnavailable {
        status: status.as_u16(),
        body,
    })
}
