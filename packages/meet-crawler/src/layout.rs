//! URL shapes of the results host.
//!
//! Every meet lives under `{base}{year}/{code}/`. The generations differ only
//! in which files they publish below that root.

use url::Url;

use crate::error::ConfigError;

/// Default results host root.
pub const DEFAULT_BASE_URL: &str = "https://www.fidal.it/risultati/";

/// Naming schemes of the old generation's numbered index pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OldScheme {
    /// `RESULTSBYEVENT{n}.htm`
    Results,
    /// `ENTRYLISTBYEVENT{n}.htm`
    Entries,
}

impl OldScheme {
    fn stem(&self) -> &'static str {
        match self {
            Self::Results => "RESULTSBYEVENT",
            Self::Entries => "ENTRYLISTBYEVENT",
        }
    }
}

/// Root of the results host, validated once.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    base: String,
}

impl SiteLayout {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url)?;
        let mut base = parsed.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// URLs for one meet.
    pub fn meet(&self, year: i32, code: &str) -> MeetUrls {
        MeetUrls {
            root: format!("{}{}/{}/", self.base, year, code.trim()),
        }
    }
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Candidate URLs for a single meet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetUrls {
    root: String,
}

impl MeetUrls {
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Landing page, common to every generation.
    pub fn landing(&self) -> String {
        self.page("Index.htm")
    }

    pub fn new_results_index(&self) -> String {
        self.page("Risultati/IndexRisultatiPerGara.html")
    }

    pub fn new_entries_index(&self) -> String {
        self.page("Iscrizioni/IndexPerGara.html")
    }

    /// Numbered old-generation index page, 1-based.
    pub fn old_page(&self, scheme: OldScheme, index: u32) -> String {
        self.page(&format!("{}{}.htm", scheme.stem(), index))
    }

    /// Resolve a page reference relative to the meet root.
    pub fn page(&self, reference: &str) -> String {
        format!("{}{}", self.root, reference)
    }
}
