//! amner OpenAlex - DOI to OpenAlex work ID resolution
//!
//! Queries `GET {base_url}/works/doi:{doi}` and returns the work's `id`
//! exactly as OpenAlex reports it (e.g. `https://openalex.org/W2741809807`).
//! A contact address, when configured, is sent as `mailto` to use the
//! polite pool.
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use amner_core::{AmnerError, BibliographicResolver, OpenAlexConfig, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = concat!("amner/", env!("CARGO_PKG_VERSION"));

/// The part of an OpenAlex work we need
#[derive(Debug, Deserialize)]
struct WorkResponse {
    id: Option<String>,
}

/// OpenAlex API client
pub struct OpenAlexResolver {
    client: Client,
    base_url: String,
    mailto: Option<String>,
}

impl OpenAlexResolver {
    /// Create a client for the public API with default settings
    pub fn new() -> Result<Self> {
        Self::from_config(&OpenAlexConfig::default())
    }

    /// Create from config
    pub fn from_config(config: &OpenAlexConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AmnerError::Other(e.into()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone(),
        })
    }

    /// Set custom base URL (for mirrors or tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the polite-pool contact address
    pub fn with_mailto(mut self, mailto: impl Into<String>) -> Self {
        self.mailto = Some(mailto.into());
        self
    }

    fn work_url(&self, doi: &str) -> String {
        format!("{}/works/doi:{}", self.base_url, doi.trim())
    }

    fn failure(doi: &str, reason: impl Into<String>) -> AmnerError {
        AmnerError::Resolution {
            doi: doi.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Debug for OpenAlexResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAlexResolver")
            .field("base_url", &self.base_url)
            .field("mailto", &self.mailto)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BibliographicResolver for OpenAlexResolver {
    async fn resolve(&self, doi: &str) -> Result<String> {
        let url = self.work_url(doi);
        debug!(url = %url, "querying OpenAlex");

        let mut request = self.client.get(&url);
        if let Some(mailto) = &self.mailto {
            request = request.query(&[("mailto", mailto)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::failure(doi, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AmnerError::NotFound(format!("no OpenAlex work for DOI {doi}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::failure(
                doi,
                format!("OpenAlex returned {status}: {}", body.trim()),
            ));
        }

        let work: WorkResponse = response
            .json()
            .await
            .map_err(|e| Self::failure(doi, format!("unreadable OpenAlex response: {e}")))?;

        work.id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Self::failure(doi, "OpenAlex work has no id"))
    }

    fn name(&self) -> &str {
        "openalex"
    }
}
