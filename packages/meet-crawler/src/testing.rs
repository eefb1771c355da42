//! Testing utilities including a scripted results host.
//!
//! `MockSite` answers probes and fetches from a URL map so classification,
//! pagination and discovery can be exercised without network access.
//! Unlisted URLs are absent (404).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ProbeError, ProbeResult};
use crate::probe::{outcome_for_status, ProbeOutcome, Prober};

/// Scripted response for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// 200 with the given body
    Page(String),
    /// 404
    NotFound,
    /// Any other status
    Status(u16),
    /// Connection failure
    TransportFailure,
}

/// Record of a call made to the mock site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockSiteCall {
    Probe { url: String },
    Fetch { url: String },
}

impl MockSiteCall {
    pub fn url(&self) -> &str {
        match self {
            Self::Probe { url } | Self::Fetch { url } => url,
        }
    }
}

/// A mock results host.
///
/// Cloning shares the script and the call log, so a test can keep a handle
/// after moving the site into an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    calls: Arc<RwLock<Vec<MockSiteCall>>>,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a page body with 200.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.set_response(url, MockResponse::Page(body.into()));
        self
    }

    /// Serve an empty page with 200 (enough for a probe).
    pub fn with_existing(self, url: impl Into<String>) -> Self {
        self.with_page(url, "")
    }

    /// Answer with an arbitrary status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        let response = match status {
            404 => MockResponse::NotFound,
            other => MockResponse::Status(other),
        };
        self.set_response(url, response);
        self
    }

    /// Fail the connection for a URL.
    pub fn with_transport_failure(self, url: impl Into<String>) -> Self {
        self.set_response(url, MockResponse::TransportFailure);
        self
    }

    /// Delay every answer for a URL.
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(url.into(), delay);
        self
    }

    /// Replace the response for a URL, e.g. between two passes.
    pub fn set_response(&self, url: impl Into<String>, response: MockResponse) {
        self.responses.write().unwrap().insert(url.into(), response);
    }

    /// Make a URL absent again.
    pub fn remove(&self, url: &str) {
        self.responses.write().unwrap().remove(url);
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockSiteCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of calls (probe or fetch) that targeted a URL.
    pub fn hits(&self, url: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.url() == url)
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    async fn respond(&self, url: &str) -> ProbeResult<Option<String>> {
        let delay = self.delays.read().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(MockResponse::NotFound);

        match response {
            MockResponse::Page(body) => Ok(Some(body)),
            MockResponse::NotFound => Ok(None),
            MockResponse::Status(status) => match outcome_for_status(url, status)? {
                ProbeOutcome::Exists => Ok(Some(String::new())),
                ProbeOutcome::Absent => Ok(None),
            },
            MockResponse::TransportFailure => Err(ProbeError::Transport {
                url: url.to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "Mock connection refused",
                )),
            }),
        }
    }
}

#[async_trait]
impl Prober for MockSite {
    async fn probe(&self, url: &str) -> ProbeResult<ProbeOutcome> {
        self.calls
            .write()
            .unwrap()
            .push(MockSiteCall::Probe { url: url.to_string() });

        Ok(match self.respond(url).await? {
            Some(_) => ProbeOutcome::Exists,
            None => ProbeOutcome::Absent,
        })
    }

    async fn fetch(&self, url: &str) -> ProbeResult<Option<String>> {
        self.calls
            .write()
            .unwrap()
            .push(MockSiteCall::Fetch { url: url.to_string() });

        self.respond(url).await
    }
}

/// Minimal markup builders for the three page layouts.
pub mod markup {
    /// New-generation index: plain anchors.
    pub fn anchors(links: &[(&str, &str)]) -> String {
        let body: String = links
            .iter()
            .map(|(label, href)| format!("<li><a class=\"link-style\" href=\"{}\">{}</a></li>", href, label))
            .collect();
        format!("<html><body><ul>{}</ul></body></html>", body)
    }

    /// Old-generation index: one table row per link, link in `td#idx_colonna1`.
    pub fn old_index(links: &[(&str, &str)]) -> String {
        let rows: String = links
            .iter()
            .map(|(label, href)| {
                format!(
                    "<tr><td id=\"idx_colonna1\"><a href=\"{}\">{}</a></td><td>--</td></tr>",
                    href, label
                )
            })
            .collect();
        format!("<html><body><table>{}</table></body></html>", rows)
    }

    /// Ancient landing page: anchors with class `idx_link`.
    pub fn ancient_landing(links: &[(&str, &str)]) -> String {
        let body: String = links
            .iter()
            .map(|(label, href)| format!("<p><a class=\"idx_link\" href=\"{}\">{}</a></p>", href, label))
            .collect();
        format!("<html><body><a href=\"../\">Home</a>{}</body></html>", body)
    }
}
