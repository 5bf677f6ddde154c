//! Similarity service API client
//!
//! Two operations against the service base address:
//! - `POST /api/find-similar` (multipart upload, field `file`)
//!   → `{"similar_files": [[path, score], ...]}`
//! - `POST /api/audio` with `{"filename": path}` → raw audio bytes

use crate::models::{SelectedFile, SimilarityMatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soundmatch_common::config::{normalize_service_url, ClientConfig};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("SoundMatch/", env!("CARGO_PKG_VERSION"));
const FIND_SIMILAR_PATH: &str = "/api/find-similar";
const AUDIO_PATH: &str = "/api/audio";

/// Similarity service client errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Operations the session core needs from the similarity service
#[async_trait]
pub trait SimilarityService: Send + Sync {
    /// Upload a file and return the ranked matches (possibly empty)
    async fn find_similar(&self, file: &SelectedFile)
        -> Result<Vec<SimilarityMatch>, ServiceError>;

    /// Fetch the raw audio bytes for a match identifier
    async fn fetch_audio(&self, path: &str) -> Result<Vec<u8>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct FindSimilarResponse {
    /// Missing or null is an empty result
    #[serde(default)]
    similar_files: Option<Vec<SimilarityMatch>>,
}

#[derive(Debug, Serialize)]
struct AudioRequest<'a> {
    filename: &'a str,
}

/// HTTP implementation of [`SimilarityService`]
#[derive(Debug, Clone)]
pub struct HttpSimilarityClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSimilarityClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = normalize_service_url(base_url)
            .map_err(|e| ServiceError::InvalidConfig(e.to_string()))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ServiceError> {
        Self::new(&config.service_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await.unwrap_or_default();
        Err(ServiceError::ApiError(status.as_u16(), error_text))
    }
}

#[async_trait]
impl SimilarityService for HttpSimilarityClient {
    async fn find_similar(
        &self,
        file: &SelectedFile,
    ) -> Result<Vec<SimilarityMatch>, ServiceError> {
        let part = reqwest::multipart::Part::bytes(file.content.as_ref().clone())
            .file_name(file.name.clone())
            .mime_str(&file.media_type)
            .map_err(|e| ServiceError::InvalidConfig(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(
            file = %file.name,
            bytes = file.len(),
            "Submitting file to similarity service"
        );

        let response = self
            .http_client
            .post(self.endpoint(FIND_SIMILAR_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::NetworkError(e.without_url().to_string()))?;
        let response = Self::check_status(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;
        let parsed: FindSimilarResponse = serde_json::from_slice(&body)
            .map_err(|e| ServiceError::ParseError(e.to_string()))?;
        let matches = parsed.similar_files.unwrap_or_default();

        if let Some(top) = matches.first() {
            tracing::info!(
                matches = matches.len(),
                top_path = %top.path,
                top_score = top.score,
                "Similarity lookup successful"
            );
        } else {
            tracing::info!("Similarity lookup returned no matches");
        }

        Ok(matches)
    }

    async fn fetch_audio(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        tracing::debug!(path = %path, "Fetching match audio");

        let response = self
            .http_client
            .post(self.endpoint(AUDIO_PATH))
            .json(&AudioRequest { filename: path })
            .send()
            .await
            .map_err(|e| ServiceError::NetworkError(e.without_url().to_string()))?;
        let response = Self::check_status(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;

        tracing::debug!(path = %path, bytes = bytes.len(), "Match audio fetched");
        Ok(bytes.to_vec())
    }
}
