//! Publishing the generated document to a versioned remote store.
//!
//! The store hands out a version token with every read and refuses writes that
//! carry a stale one. Conflicts are reported to the caller, never merged.

use crate::config::PublishConfig;
use crate::error::{MapError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub content: String,
    pub version: String,
}

pub trait ArtifactStore {
    fn get_existing(&self, path: &str) -> impl Future<Output = Result<Option<StoredArtifact>>> + Send;

    /// Write `content`. `version` must be the token from the last read, or
    /// `None` when creating. A stale token fails with `PublishConflict`.
    fn put(
        &self,
        path: &str,
        content: &str,
        version: Option<&str>,
        message: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Created,
    Updated,
    Unchanged,
}

pub async fn publish_document<S: ArtifactStore>(
    store: &S,
    path: &str,
    content: &str,
    message: &str,
) -> Result<PublishOutcome> {
    let existing = store.get_existing(path).await?;

    let outcome = match existing {
        Some(artifact) if artifact.content == content => {
            info!("Remote {} is already up to date", path);
            return Ok(PublishOutcome::Unchanged);
        }
        Some(artifact) => {
            store.put(path, content, Some(&artifact.version), message).await?;
            PublishOutcome::Updated
        }
        None => {
            store.put(path, content, None, message).await?;
            PublishOutcome::Created
        }
    };

    info!("Published {} ({:?})", path, outcome);
    Ok(outcome)
}

/// GitHub repository contents API (`/repos/{owner}/{repo}/contents/{path}`).
pub struct GitHubStore {
    client: reqwest::Client,
    api_base: String,
    repository: String,
    branch: String,
    token: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    content: String,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubStore {
    pub fn new(
        api_base: impl Into<String>,
        repository: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let repository = repository.into();
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MapError::publish(&repository, e))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repository,
            branch: branch.into(),
            token: token.into(),
        })
    }

    /// Build a store from config, reading the token from the configured env var.
    pub fn from_config(config: &PublishConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            MapError::publish(
                &config.path,
                format!("environment variable {} is not set", config.token_env),
            )
        })?;
        Self::new(&config.api_base, &config.repository, &config.branch, token)
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repository,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.contents_url(path))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }
}

impl ArtifactStore for GitHubStore {
    async fn get_existing(&self, path: &str) -> Result<Option<StoredArtifact>> {
        let response = self
            .request(reqwest::Method::GET, path)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await
            .map_err(|e| MapError::publish(path, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| MapError::publish(path, e))?;
        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| MapError::publish(path, e))?;

        // The API wraps base64 at 60 columns
        let packed: String = body.content.split_whitespace().collect();
        let bytes = STANDARD
            .decode(packed)
            .map_err(|e| MapError::publish(path, format!("undecodable content: {}", e)))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| MapError::publish(path, format!("content is not UTF-8: {}", e)))?;

        Ok(Some(StoredArtifact {
            content,
            version: body.sha,
        }))
    }

    async fn put(&self, path: &str, content: &str, version: Option<&str>, message: &str) -> Result<()> {
        let body = PutRequest {
            message,
            content: STANDARD.encode(content),
            branch: &self.branch,
            sha: version,
        };
        let response = self
            .request(reqwest::Method::PUT, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| MapError::publish(path, e))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            warn!("Version conflict while writing {}", path);
            return Err(MapError::PublishConflict { path: path.to_string() });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MapError::publish(path, format!("remote answered {}: {}", status, detail)));
        }
        Ok(())
    }
}
