//! HTTP feed source backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info, instrument};
use url::Url;

use super::manifest::parse_manifest;
use super::FeedSource;
use crate::errors::PipelineError;
use catalog_shared::FeedDescriptor;

/// Basic credentials for the feed aggregator.
#[derive(Clone)]
pub struct FeedCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for FeedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Fetches the manifest and feed payloads over HTTP.
pub struct HttpFeedSource {
    client: Client,
    manifest_url: Url,
    credentials: Option<FeedCredentials>,
}

impl HttpFeedSource {
    /// Create a source for the manifest at `manifest_url`.
    ///
    /// Credentials embedded in the URL are moved into `credentials` when no
    /// explicit credentials are given, so they never show up in logs.
    pub fn new(
        manifest_url: &str,
        credentials: Option<FeedCredentials>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let mut manifest_url = Url::parse(manifest_url)
            .map_err(|e| PipelineError::manifest(format!("Invalid manifest URL: {}", e)))?;

        let embedded = if manifest_url.username().is_empty() {
            None
        } else {
            Some(FeedCredentials {
                username: manifest_url.username().to_string(),
                password: manifest_url.password().unwrap_or_default().to_string(),
            })
        };
        // Both setters only fail for URLs that cannot carry credentials at all.
        let _ = manifest_url.set_username("");
        let _ = manifest_url.set_password(None);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::manifest(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            manifest_url,
            credentials: credentials.or(embedded),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    #[instrument(skip(self), fields(url = %self.manifest_url))]
    async fn fetch_manifest(&self) -> Result<Vec<FeedDescriptor>, PipelineError> {
        let response = self
            .authorize(self.client.get(self.manifest_url.clone()))
            .send()
            .await
            .map_err(|e| PipelineError::manifest(format!("Manifest request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| PipelineError::manifest(format!("Manifest request failed: {}", e)))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::manifest(format!("Failed to read manifest: {}", e)))?;

        let feeds = parse_manifest(&body)?;
        info!(count = feeds.len(), "Feed manifest downloaded");
        Ok(feeds)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::download(format!("{}: {}", url, e)))?
            .error_for_status()
            .map_err(|e| PipelineError::download(format!("{}: {}", url, e)))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::download(format!("{}: {}", url, e)))?;

        debug!(url = %url, bytes = body.len(), "Downloaded feed payload");
        Ok(body.to_vec())
    }
}
