use reqwest::StatusCode;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;

// GitHub's API rejects requests that carry no User-Agent.
const RELEASE_LOOKUP_USER_AGENT: &str = concat!("parlor-gateway/", env!("CARGO_PKG_VERSION"));

/// Client for the one outbound call the gateway makes: asking the release
/// listing endpoint which version is newest.
#[derive(Clone)]
pub struct ReleaseClient {
    releases_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    tag_name: String,
}

#[derive(Debug, Error)]
pub enum ReleaseCheckError {
    #[error("release lookup request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("release lookup rejected with status {0}")]
    Rejected(StatusCode),
}

impl ReleaseClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            releases_url: config.releases_url.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Latest released version string. The call is scoped to the requesting
    /// handler; failures are returned, never retried.
    pub async fn latest_version(&self) -> Result<String, ReleaseCheckError> {
        let response = self
            .http
            .get(&self.releases_url)
            .header(USER_AGENT, RELEASE_LOOKUP_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReleaseCheckError::Rejected(response.status()));
        }

        let payload: ReleasePayload = response.json().await?;
        Ok(normalize_release_tag(payload.tag_name))
    }
}

/// Release tags conventionally carry a leading `v` (`v0.1.5`); strip it when
/// present and pass anything else through untouched.
fn normalize_release_tag(tag: String) -> String {
    match tag.strip_prefix('v') {
        Some(stripped) => stripped.to_string(),
        None => tag,
    }
}
