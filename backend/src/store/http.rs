//! JSON-over-HTTP client for the remote member store.
//!
//! | Call | Request | Expected response |
//! |------|---------|-------------------|
//! | `submit_one` | `POST {base}/members` with a record | `{"id": "..."}` |
//! | `submit_batch` | `POST {base}/members/bulk` with an array of records | `{"count": n}` |
//! | `list_all` | `GET {base}/members` | array of records with `id` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::MemberStore;
use crate::config::STORE_TIMEOUT;
use crate::error::{StoreError, StoreResult};
use crate::models::{MemberId, MemberRecord, StoredMember};

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: MemberId,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    count: u64,
}

fn request_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Unavailable(format!("store did not answer in time: {e}"))
    } else {
        StoreError::Request(e.to_string())
    }
}

/// Remote store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    /// Create a client for the store at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, STORE_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }

    /// Create from an optional configured URL.
    pub fn from_url(url: Option<&str>) -> StoreResult<Self> {
        url.map(Self::new).ok_or(StoreError::NotConfigured)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check the status, then decode the body.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> StoreResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(request_error)?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl MemberStore for HttpStore {
    async fn submit_one(&self, record: &MemberRecord) -> StoreResult<MemberId> {
        let response = self
            .client
            .post(self.url("/members"))
            .json(record)
            .send()
            .await
            .map_err(request_error)?;
        let created: CreatedResponse = Self::read_json(response).await?;
        Ok(created.id)
    }

    async fn submit_batch(&self, records: &[MemberRecord]) -> StoreResult<u64> {
        let response = self
            .client
            .post(self.url("/members/bulk"))
            .json(records)
            .send()
            .await
            .map_err(request_error)?;
        let bulk: BulkResponse = Self::read_json(response).await?;
        Ok(bulk.count)
    }

    async fn list_all(&self) -> StoreResult<Vec<StoredMember>> {
        let response = self
            .client
            .get(self.url("/members"))
            .send()
            .await
            .map_err(request_error)?;
        Self::read_json(response).await
    }
}
