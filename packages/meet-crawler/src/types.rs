use chrono::{DateTime, Datelike, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseValueError;

/// Storage bound for an event page's display label, in characters.
pub const MAX_LABEL_CHARS: usize = 500;

/// Storage bound for an event page's reference, in characters.
pub const MAX_REFERENCE_CHARS: usize = 50;

lazy_static! {
    /// Final-results pages are `GaraNNN.htm` or `Diffr*.htm`; entry lists
    /// (`GaraLNNN.htm`, `StaffNNN.htm`) never match.
    static ref FINAL_RESULTS_REFERENCE: Regex =
        Regex::new(r"^(Gara\d{3}\.htm|Diffr.*\.htm)").expect("valid results pattern");
}

/// Whether a page reference follows the final-results naming pattern.
pub fn is_final_results_reference(reference: &str) -> bool {
    FINAL_RESULTS_REFERENCE.is_match(reference)
}

/// Structural version of the hosting platform a meet is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Generation {
    New,
    /// Paged index; `pages` is the highest index page that exists.
    Old { pages: u32 },
    Ancient,
    Unknown,
}

impl Generation {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Generation without the page count, `None` for `Unknown`.
    pub fn family(&self) -> Option<GenerationFamily> {
        match self {
            Self::New => Some(GenerationFamily::New),
            Self::Old { .. } => Some(GenerationFamily::Old),
            Self::Ancient => Some(GenerationFamily::Ancient),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str("new"),
            Self::Old { pages } => write!(f, "old#{}", pages),
            Self::Ancient => f.write_str("ancient"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl FromStr for Generation {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "ancient" => Ok(Self::Ancient),
            "unknown" => Ok(Self::Unknown),
            other => other
                .strip_prefix("old#")
                .and_then(|n| n.parse().ok())
                .map(|pages| Self::Old { pages })
                .ok_or_else(|| ParseValueError::new("generation", other)),
        }
    }
}

/// Generation as recorded on an event page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationFamily {
    New,
    Old,
    Ancient,
}

impl GenerationFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Old => "old",
            Self::Ancient => "ancient",
        }
    }
}

impl fmt::Display for GenerationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationFamily {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "old" => Ok(Self::Old),
            "ancient" => Ok(Self::Ancient),
            other => Err(ParseValueError::new("generation family", other)),
        }
    }
}

/// What a meet currently publishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    /// Nothing published, or everything retracted
    #[default]
    None,
    Entries,
    Results,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Entries => "entries",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "entries" => Ok(Self::Entries),
            "results" => Ok(Self::Results),
            other => Err(ParseValueError::new("publication status", other)),
        }
    }
}

/// Indoor (`I`) or outdoor (`P`) tag stored with every event page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentTag {
    Indoor,
    Outdoor,
}

impl EnvironmentTag {
    /// Map a calendar event type to its tag. Unmapped types yield `None`.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type.trim().to_lowercase().as_str() {
            "indoor" => Some(Self::Indoor),
            "outdoor" | "pista" | "piazza e altri ambiti" => Some(Self::Outdoor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indoor => "I",
            Self::Outdoor => "P",
        }
    }
}

impl FromStr for EnvironmentTag {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "I" => Ok(Self::Indoor),
            "P" => Ok(Self::Outdoor),
            other => Err(ParseValueError::new("environment tag", other)),
        }
    }
}

/// Generation and publication status resolved for a meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub generation: Generation,
    pub status: PublicationStatus,
}

impl Classification {
    pub fn new(generation: Generation, status: PublicationStatus) -> Self {
        Self { generation, status }
    }

    /// No published presence at all.
    pub fn unknown() -> Self {
        Self::new(Generation::Unknown, PublicationStatus::None)
    }
}

/// A single athletics competition as fed by the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meet {
    pub code: String,
    pub name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Calendar type ("indoor", "outdoor", ...)
    pub event_type: String,
    pub generation: Generation,
    pub status: PublicationStatus,
    pub classified_at: Option<DateTime<Utc>>,
    pub links_checked_at: Option<DateTime<Utc>>,
}

impl Meet {
    /// A freshly fed meet: not yet classified, nothing checked.
    pub fn new(
        code: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: None,
            start_date,
            end_date,
            event_type: event_type.into(),
            generation: Generation::Unknown,
            status: PublicationStatus::None,
            classified_at: None,
            links_checked_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.generation = classification.generation;
        self.status = classification.status;
        self
    }

    /// Year the meet's pages are filed under.
    pub fn year(&self) -> i32 {
        self.start_date.year()
    }

    pub fn is_in_progress(&self, today: NaiveDate) -> bool {
        self.start_date <= today && today <= self.end_date
    }
}

/// A raw (label, reference) pair as read off an index page.
///
/// Both sides are always within their storage bounds; the only way in is
/// through [`LinkPair::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawLinkPair")]
pub struct LinkPair {
    label: String,
    reference: String,
}

#[derive(Deserialize)]
struct RawLinkPair {
    label: String,
    reference: String,
}

impl From<RawLinkPair> for LinkPair {
    fn from(raw: RawLinkPair) -> Self {
        Self::new(&raw.label, &raw.reference)
    }
}

impl LinkPair {
    /// Build a pair, truncating both sides to their storage bounds.
    pub fn new(label: &str, reference: &str) -> Self {
        Self {
            label: truncate_chars(label, MAX_LABEL_CHARS).to_string(),
            reference: truncate_chars(reference, MAX_REFERENCE_CHARS).to_string(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// A stored event page, read by the discipline classifier downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPageRecord {
    pub meet_code: String,
    pub generation: GenerationFamily,
    pub environment: EnvironmentTag,
    pub reference: String,
    pub label: String,
    pub year: i32,
    pub discovered_at: DateTime<Utc>,
}

/// Cut a string to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
