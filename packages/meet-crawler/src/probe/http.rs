//! HTTP prober using reqwest.
//!
//! Probes are plain GETs: the host answers HEAD inconsistently, and the
//! landing page body is needed anyway when a meet turns out to be ancient.
//!
//! Redirects are followed (at most [`MAX_REDIRECTS`] hops) and the final
//! response decides the outcome. A redirect loop surfaces as a transport
//! anomaly.

use async_trait::async_trait;
use tracing::debug;

use crate::config::CrawlerConfig;
use crate::error::{ConfigError, ProbeError, ProbeResult};

use super::{outcome_for_status, ProbeOutcome, Prober};

pub const MAX_REDIRECTS: usize = 5;

/// Prober backed by a single reusable `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(config: &CrawlerConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> ProbeResult<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::Transport {
                url: url.to_string(),
                source: Box::new(e),
            })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeResult<ProbeOutcome> {
        let response = self.get(url).await?;
        let status = response.status().as_u16();
        debug!(url = %url, status, "Probed");
        outcome_for_status(url, status)
    }

    async fn fetch(&self, url: &str) -> ProbeResult<Option<String>> {
        let response = self.get(url).await?;
        let status = response.status().as_u16();
        debug!(url = %url, status, "Fetched");

        match outcome_for_status(url, status)? {
            ProbeOutcome::Absent => Ok(None),
            ProbeOutcome::Exists => {
                let body = response.text().await.map_err(|e| ProbeError::Body {
                    url: url.to_string(),
                    source: Box::new(e),
                })?;
                Ok(Some(body))
            }
        }
    }
}
