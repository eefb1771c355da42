//! Staleness policies: which meets are due for a crawl.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::types::{Generation, Meet, PublicationStatus};

/// Stand-in for "never classified" when comparing against meet dates.
pub fn never_classified_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1896, 3, 31).expect("valid sentinel date")
}

/// Rule selecting meets for a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StalenessPolicy {
    /// Every meet
    All,
    /// Meets with a known status that ended within the last `days` days
    FinishedWithin { days: u32 },
    /// Meets with a known status running today whose links are older than
    /// `minutes`, or were never checked
    InProgressStale { minutes: u32 },
    /// Exactly these meet codes
    Explicit { codes: Vec<String> },
    /// Meets never classified or classified as unknown
    Unclassified,
    /// Meets starting within `days` of today, or over but last classified
    /// less than `days` after their end
    AroundMeetDate { days: u32 },
}

impl StalenessPolicy {
    pub fn matches(&self, meet: &Meet, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();

        match self {
            Self::All => true,
            Self::FinishedWithin { days } => {
                let from = today - Duration::days(i64::from(*days));
                meet.status != PublicationStatus::None && from <= meet.end_date && meet.end_date <= today
            }
            Self::InProgressStale { minutes } => {
                let cutoff = now - Duration::minutes(i64::from(*minutes));
                meet.status != PublicationStatus::None
                    && meet.is_in_progress(today)
                    && meet.links_checked_at.map_or(true, |at| at < cutoff)
            }
            Self::Explicit { codes } => codes.iter().any(|c| c == &meet.code),
            Self::Unclassified => {
                meet.classified_at.is_none() || meet.generation == Generation::Unknown
            }
            Self::AroundMeetDate { days } => {
                let days = i64::from(*days);
                let classified = meet
                    .classified_at
                    .map(|at| at.date_naive())
                    .unwrap_or_else(never_classified_date);

                (today - meet.start_date).num_days().abs() < days
                    || ((classified - meet.end_date).num_days() < days
                        && (today - meet.end_date).num_days() > 0)
            }
        }
    }
}

fn parse_amount(policy: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidPolicy(policy.to_string()))
}

impl FromStr for StalenessPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(codes) = s.strip_prefix("codes:") {
            let codes: Vec<String> = codes
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            if codes.is_empty() {
                return Err(ConfigError::InvalidPolicy(s.to_string()));
            }
            return Ok(Self::Explicit { codes });
        }

        match s {
            "all" => return Ok(Self::All),
            "null" => return Ok(Self::Unclassified),
            _ => {}
        }

        if let Some(n) = s.strip_prefix("date_") {
            Ok(Self::FinishedWithin { days: parse_amount(s, n)? })
        } else if let Some(n) = s.strip_prefix("scrape_") {
            Ok(Self::InProgressStale { minutes: parse_amount(s, n)? })
        } else if let Some(n) = s.strip_prefix("around_") {
            Ok(Self::AroundMeetDate { days: parse_amount(s, n)? })
        } else {
            Err(ConfigError::InvalidPolicy(s.to_string()))
        }
    }
}

impl fmt::Display for StalenessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::FinishedWithin { days } => write!(f, "date_{}", days),
            Self::InProgressStale { minutes } => write!(f, "scrape_{}", minutes),
            Self::Explicit { codes } => write!(f, "codes:{}", codes.join(",")),
            Self::Unclassified => f.write_str("null"),
            Self::AroundMeetDate { days } => write!(f, "around_{}", days),
        }
    }
}
