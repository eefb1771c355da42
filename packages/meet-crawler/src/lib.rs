//! Generation detection and event-page discovery for athletics meets.
//!
//! Meets are published under three incompatible layouts of the results host.
//! Given a meet code and year, the crawler works out which layout hosts the
//! meet, walks its index pages and records every per-event page it links,
//! appending only pages it has not seen before.
//!
//! ```rust,ignore
//! use meet_crawler::{CrawlerConfig, HttpProber, MemoryStore, Orchestrator, ProberExt, StalenessPolicy};
//!
//! let config = CrawlerConfig::default();
//! let prober = HttpProber::new(&config)?.rate_limited(config.requests_per_second);
//! let orchestrator = Orchestrator::new(prober, MemoryStore::new(), config)?;
//! let report = orchestrator.run(&StalenessPolicy::All).await?;
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod layout;
pub mod orchestrator;
pub mod pagination;
pub mod persister;
pub mod policy;
pub mod probe;
pub mod store;
pub mod testing;
pub mod types;

pub use classifier::Classifier;
pub use config::{Config, CrawlerConfig};
pub use error::{ConfigError, CrawlError, ExtractError, ProbeError, StoreError};
pub use extract::{extract_links, extractor_for, Extraction, LinkExtractor};
pub use layout::{MeetUrls, OldScheme, SiteLayout};
pub use orchestrator::{Orchestrator, RunReport};
pub use pagination::{discover_page_count, discover_page_count_after_first, PageCount};
pub use persister::{DiscoveryBatch, MeetLocks, PersistOutcome, Persister};
pub use policy::StalenessPolicy;
pub use probe::{HttpProber, ProbeOutcome, Prober, ProberExt, RateLimitedProber};
pub use store::{MeetStore, MemoryStore, PostgresStore};
pub use types::{
    Classification, EnvironmentTag, EventPageRecord, Generation, GenerationFamily, LinkPair, Meet,
    PublicationStatus,
};
