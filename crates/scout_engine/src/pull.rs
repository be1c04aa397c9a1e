use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use scout_core::{Entity, SessionId};

use crate::wire::{decode_snapshot, SearchRequest};
use crate::{FailureKind, PullError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for PullSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Source of full result snapshots for a query.
#[async_trait::async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch the complete current result list. `session_id` ties the request
    /// to a live session; the one-shot path passes `None`.
    async fn fetch(
        &self,
        query: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Vec<Entity>, PullError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSnapshotFetcher {
    endpoint: String,
    settings: PullSettings,
    client: reqwest::Client,
}

impl ReqwestSnapshotFetcher {
    pub fn new(endpoint: impl Into<String>, settings: PullSettings) -> Result<Self, PullError> {
        let client = build_client(&settings)?;
        Ok(Self {
            endpoint: endpoint.into(),
            settings,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn build_client(settings: &PullSettings) -> Result<reqwest::Client, PullError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| PullError::new(FailureKind::Network, err.to_string()))
}

#[async_trait::async_trait]
impl SnapshotFetcher for ReqwestSnapshotFetcher {
    async fn fetch(
        &self,
        query: &str,
        session_id: Option<&SessionId>,
    ) -> Result<Vec<Entity>, PullError> {
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|err| PullError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let body = serde_json::to_vec(&SearchRequest {
            query,
            session_id: session_id.map(SessionId::as_str),
        })
        .map_err(|err| PullError::new(FailureKind::MalformedBody, err.to_string()))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PullError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        decode_snapshot(&bytes)
            .map_err(|err| PullError::new(FailureKind::MalformedBody, err.to_string()))
    }
}

fn too_large(max_bytes: u64, actual: u64) -> PullError {
    PullError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> PullError {
    if err.is_timeout() {
        return PullError::new(FailureKind::Timeout, err.to_string());
    }
    PullError::new(FailureKind::Network, err.to_string())
}
