// config.rs
//
// Remote API credential and endpoint configuration. The credential is
// validated here, before any client exists, so a missing or placeholder
// key never costs an upload.

use crate::error::TranscribeError;

/// Environment variable holding the AssemblyAI API key.
pub const API_KEY_ENV: &str = "ASSEMBLYAI_API_KEY";

/// Scaffolding value shipped in sample .env files; treated as unset.
const PLACEHOLDER_API_KEY: &str = "your_assembly_ai_key_here";

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    api_key: String,
    base_url: String,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, TranscribeError> {
        let api_key = api_key.into();
        validate_api_key(&api_key)?;
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Read the credential from `ASSEMBLYAI_API_KEY`.
    pub fn from_env() -> Result<Self, TranscribeError> {
        let key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Self::new(key)
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn validate_api_key(key: &str) -> Result<(), TranscribeError> {
    if key.trim().is_empty() || key == PLACEHOLDER_API_KEY {
        return Err(TranscribeError::Config(format!(
            "Please set your AssemblyAI API key in the {API_KEY_ENV} environment variable"
        )));
    }
    Ok(())
}
