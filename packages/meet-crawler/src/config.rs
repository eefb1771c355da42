use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::layout::DEFAULT_BASE_URL;
use crate::pagination::DEFAULT_PAGINATION_BOUND;
use crate::policy::StalenessPolicy;

/// Default discovery policy when `CRAWL_POLICY` is unset.
pub const DEFAULT_POLICY: &str = "scrape_60";

/// Default classification policy when `CRAWL_CLASSIFY_POLICY` is unset.
pub const DEFAULT_CLASSIFY_POLICY: &str = "around_7";

/// Tuning for a crawl pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub base_url: String,
    pub pagination_bound: u32,
    /// Meets processed at the same time
    pub concurrency: usize,
    pub requests_per_second: NonZeroU32,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Re-run the classifier on already classified meets
    pub reclassify: bool,
    /// Meets re-classified at the start of every pass
    pub classify_policy: Option<StalenessPolicy>,
    /// Upper bound on a whole pass
    pub run_timeout: Option<Duration>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            pagination_bound: DEFAULT_PAGINATION_BOUND,
            concurrency: 4,
            requests_per_second: NonZeroU32::new(5).expect("non-zero default"),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("meet-crawler/{}", env!("CARGO_PKG_VERSION")),
            reclassify: false,
            classify_policy: None,
            run_timeout: None,
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_pagination_bound(mut self, bound: u32) -> Self {
        self.pagination_bound = bound.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_requests_per_second(mut self, rps: NonZeroU32) -> Self {
        self.requests_per_second = rps;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_reclassify(mut self, reclassify: bool) -> Self {
        self.reclassify = reclassify;
        self
    }

    pub fn with_classify_policy(mut self, policy: StalenessPolicy) -> Self {
        self.classify_policy = Some(policy);
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }
}

/// Process configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub policy: StalenessPolicy,
    pub crawler: CrawlerConfig,
}

fn parse_var<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

/// `off` disables the classification refresh.
fn parse_classify_policy(value: String) -> Result<Option<StalenessPolicy>, ConfigError> {
    match value.trim() {
        "off" | "" => Ok(None),
        other => other.parse().map(Some),
    }
}

fn parse_flag(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let policy = lookup("CRAWL_POLICY")
            .unwrap_or_else(|| DEFAULT_POLICY.to_string())
            .parse()?;

        let mut crawler = CrawlerConfig::default();
        crawler.classify_policy = parse_classify_policy(
            lookup("CRAWL_CLASSIFY_POLICY").unwrap_or_else(|| DEFAULT_CLASSIFY_POLICY.to_string()),
        )?;

        if let Some(base_url) = lookup("CRAWL_BASE_URL") {
            crawler.base_url = base_url;
        }
        if let Some(value) = lookup("CRAWL_PAGINATION_BOUND") {
            crawler.pagination_bound = parse_var("CRAWL_PAGINATION_BOUND", value)?;
        }
        if let Some(value) = lookup("CRAWL_CONCURRENCY") {
            crawler.concurrency = parse_var("CRAWL_CONCURRENCY", value)?;
        }
        if let Some(value) = lookup("CRAWL_REQUESTS_PER_SECOND") {
            crawler.requests_per_second = parse_var("CRAWL_REQUESTS_PER_SECOND", value)?;
        }
        if let Some(value) = lookup("CRAWL_TIMEOUT_SECS") {
            crawler.request_timeout = Duration::from_secs(parse_var("CRAWL_TIMEOUT_SECS", value)?);
        }
        if let Some(value) = lookup("CRAWL_RUN_TIMEOUT_SECS") {
            crawler.run_timeout = Some(Duration::from_secs(parse_var("CRAWL_RUN_TIMEOUT_SECS", value)?));
        }
        if let Some(value) = lookup("CRAWL_RECLASSIFY") {
            crawler.reclassify = parse_flag("CRAWL_RECLASSIFY", value)?;
        }

        if crawler.pagination_bound == 0 {
            return Err(ConfigError::Invalid {
                key: "CRAWL_PAGINATION_BOUND",
                value: "0".to_string(),
            });
        }
        if crawler.concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "CRAWL_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            policy,
            crawler,
        })
    }
}
