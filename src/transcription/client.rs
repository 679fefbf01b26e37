// transcription/client.rs
//
// Remote transcription client for the AssemblyAI v2 REST API: upload media,
// create a job, poll its status. Single attempt per call, no retries.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use log::debug;
use reqwest::{Body, StatusCode};
use serde::Deserialize;

use super::job::JobStatusResponse;
use crate::config::ApiConfig;
use crate::error::TranscribeError;
use crate::media::MediaFile;

const UPLOAD_PATH: &str = "/v2/upload";
const TRANSCRIPT_PATH: &str = "/v2/transcript";
const ERROR_PREVIEW_CHARS: usize = 240;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: String,
}

/// The three remote operations the job controller depends on.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// Stream the media payload to the service; returns the upload reference.
    async fn upload(&self, media: &MediaFile) -> Result<String, TranscribeError>;

    /// Create a transcription job for an uploaded reference; returns its id.
    async fn submit(&self, upload_url: &str) -> Result<String, TranscribeError>;

    /// Fetch current status (and result or error text) for a job.
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusResponse, TranscribeError>;
}

pub struct AssemblyAiClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl AssemblyAiClient {
    /// The credential inside `config` has already been validated; building
    /// a client from a missing or placeholder key is unrepresentable.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    /// Pull the service's `error` field out of a failure body, falling back
    /// to a truncated preview of the raw response.
    async fn service_message(response: reqwest::Response) -> String {
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ServiceErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => truncate_error_text(&text, ERROR_PREVIEW_CHARS),
        }
    }
}

#[async_trait]
impl TranscriptService for AssemblyAiClient {
    async fn upload(&self, media: &MediaFile) -> Result<String, TranscribeError> {
        debug!(
            "uploading {} ({} bytes) to {}",
            media.name(),
            media.size(),
            UPLOAD_PATH
        );

        // One-shot stream body so the transfer goes out chunked rather than
        // buffered behind a content-length.
        let payload = media.payload().clone();
        let body = Body::wrap_stream(stream::once(async move {
            Ok::<Bytes, std::convert::Infallible>(payload)
        }));

        let response = self
            .client
            .post(self.url(UPLOAD_PATH))
            .header("authorization", self.config.api_key())
            .header("content-type", "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| TranscribeError::Upload(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(TranscribeError::Auth);
        }
        if !response.status().is_success() {
            return Err(TranscribeError::Upload(
                Self::service_message(response).await,
            ));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Upload(e.to_string()))?;
        Ok(parsed.upload_url)
    }

    async fn submit(&self, upload_url: &str) -> Result<String, TranscribeError> {
        let response = self
            .client
            .post(self.url(TRANSCRIPT_PATH))
            .header("authorization", self.config.api_key())
            .json(&serde_json::json!({
                "audio_url": upload_url,
                "language_detection": true,
            }))
            .send()
            .await
            .map_err(|e| TranscribeError::Submit(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscribeError::Submit(
                Self::service_message(response).await,
            ));
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Submit(e.to_string()))?;
        Ok(parsed.id)
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusResponse, TranscribeError> {
        let response = self
            .client
            .get(format!("{}/{}", self.url(TRANSCRIPT_PATH), job_id))
            .header("authorization", self.config.api_key())
            .send()
            .await
            .map_err(|e| TranscribeError::Status(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscribeError::Status(
                Self::service_message(response).await,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| TranscribeError::Status(e.to_string()))
    }
}

fn truncate_error_text(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect::<String>()
}
