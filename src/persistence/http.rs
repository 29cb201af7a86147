//! Persistence adapter backed by the memory server REST API

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{MemoryQuery, MemoryRecord, NewMemory, PersistenceAdapter, PersistenceError};
use crate::config::MemoryConfig;

/// Protocol version header required by the memory server
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

const MEMORIES_PATH: &str = "v1/memories";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateMemoryRequest<'a> {
    content: &'a str,
    user_id: &'a str,
    metadata: Value,
}

/// Response envelope shared by every memory server endpoint
#[derive(Debug, Deserialize)]
struct OperationResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl<T> OperationResponse<T> {
    fn into_data(self, status: u16) -> Result<Option<T>, PersistenceError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(PersistenceError::Rejected {
                status,
                message: self
                    .error
                    .or(self.message)
                    .unwrap_or_else(|| "operation failed".to_string()),
            })
        }
    }
}

/// HTTP client for the memory server (`/v1/memories`)
///
/// Records are only ever appended; updates are new versions of the same
/// entity and readers pick the latest.
#[derive(Debug, Clone)]
pub struct MemoryServerClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    user_id: String,
}

impl MemoryServerClient {
    pub fn new(base_url: Url, user_id: impl Into<String>, timeout: Duration) -> Result<Self, PersistenceError> {
        let endpoint = base_url
            .join(MEMORIES_PATH)
            .map_err(|e| PersistenceError::Unavailable(format!("invalid memory server url: {}", e)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: None,
            user_id: user_id.into(),
        })
    }

    pub fn from_config(config: &MemoryConfig) -> Result<Self, PersistenceError> {
        let mut client = Self::new(
            config.base_url.clone(),
            &config.user_id,
            Duration::from_millis(config.timeout_ms),
        )?;
        client.api_key = config.api_key.clone();
        Ok(client)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("MCP-Protocol-Version", MCP_PROTOCOL_VERSION);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, PersistenceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let envelope: OperationResponse<T> = response.json().await?;
        envelope.into_data(status.as_u16())
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryServerClient {
    async fn store(&self, memory: NewMemory) -> Result<MemoryRecord, PersistenceError> {
        let body = CreateMemoryRequest {
            content: &memory.content,
            user_id: &self.user_id,
            metadata: memory.metadata(&self.user_id),
        };

        let request = self.authorize(self.client.post(self.endpoint.clone()).json(&body));
        let response = request.send().await?;

        let record: Option<MemoryRecord> = Self::read_envelope(response).await?;
        tracing::debug!(kind = memory.kind.as_str(), "Stored memory record");
        record.ok_or_else(|| PersistenceError::Rejected {
            status: 200,
            message: "memory server returned no record".to_string(),
        })
    }

    async fn search(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>, PersistenceError> {
        // An empty query lists arbitrary records; steer it towards the kind instead
        let text = match (query.query.trim().is_empty(), query.kind) {
            (true, Some(kind)) => kind.as_str().to_string(),
            _ => query.query.clone(),
        };

        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("userId", &self.user_id)
                .append_pair("limit", &query.limit.to_string());
            if !text.is_empty() {
                pairs.append_pair("query", &text);
            }
        }

        let request = self.authorize(self.client.get(url));
        let response = request.send().await?;

        let records: Vec<MemoryRecord> = Self::read_envelope(response).await?.unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|r| query.kind.map_or(true, |kind| r.kind() == Some(kind)))
            .collect())
    }
}
