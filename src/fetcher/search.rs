//! FIRDS file-register search client
//!
//! Issues a single Solr query for files published inside a date window and
//! stores the raw XML response for the link resolver.

use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{FetcherError, FetcherResult};
use crate::pipeline::config::SearchWindow;

/// Client for the FIRDS Solr search endpoint
pub struct SearchClient {
    client: Client,
    base_url: String,
}

impl SearchClient {
    /// Create a search client for `base_url`
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Endpoint this client queries
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query parameters requesting one row of XML for `window`
    pub fn query_params(window: &SearchWindow) -> Vec<(&'static str, String)> {
        vec![
            ("q", "*".to_string()),
            ("fq", window.filter_query()),
            ("wt", "xml".to_string()),
            ("indent", "true".to_string()),
            ("start", "0".to_string()),
            ("rows", "1".to_string()),
        ]
    }

    /// Run the search and write the response body to `dest`
    ///
    /// # Errors
    /// `NetworkError` on transport failure or non-success status,
    /// `IoError` if the response cannot be written.
    pub async fn search_to_file(&self, window: &SearchWindow, dest: &Path) -> FetcherResult<PathBuf> {
        let params = Self::query_params(window);
        debug!("Querying {} with {}", self.base_url, window.filter_query());

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        let url = response.url().clone();
        if !status.is_success() {
            return Err(FetcherError::NetworkError(format!(
                "search request failed: HTTP {status} for {url}"
            )));
        }
        info!("Search response {} from {}", status, url);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetcherError::IoError(format!("Failed to create directory: {e}")))?;
        }
        tokio::fs::write(dest, &body)
            .await
            .map_err(|e| FetcherError::IoError(format!("Failed to write search response: {e}")))?;

        debug!("Wrote {} byte search response to {:?}", body.len(), dest);
        Ok(dest.to_path_buf())
    }
}
