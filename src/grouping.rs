//! Time-period keys for section headings and page splitting.
//!
//! Keys are derived from the capture timestamp alone, never stored.
//!
//! | Granularity | Example key |
//! |---|---|
//! | decade | `2020-2029` |
//! | year | `2020` |
//! | month | `March 2020` |
//! | day | `Sunday 1 March 2020` |
//!
//! In-page headings may use any granularity. Splitting into several output
//! files is limited to decade, year and month; one page per day is rejected.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    Decade,
    Year,
    Month,
    Day,
}

/// Granularity for multi-file output. A subset of [`Grouping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitBy {
    Decade,
    Year,
    Month,
}

impl From<SplitBy> for Grouping {
    fn from(split: SplitBy) -> Self {
        match split {
            SplitBy::Decade => Grouping::Decade,
            SplitBy::Year => Grouping::Year,
            SplitBy::Month => Grouping::Month,
        }
    }
}

/// Label of the period `taken` falls into.
pub fn group_key(grouping: Grouping, taken: NaiveDateTime) -> String {
    match grouping {
        Grouping::Decade => {
            let year = taken.year().to_string();
            let prefix = &year[..year.len().saturating_sub(1)];
            format!("{prefix}0-{prefix}9")
        }
        Grouping::Year => taken.format("%Y").to_string(),
        Grouping::Month => taken.format("%B %Y").to_string(),
        Grouping::Day => taken.format("%A %-d %B %Y").to_string(),
    }
}

pub fn split_key(split: SplitBy, taken: NaiveDateTime) -> String {
    group_key(split.into(), taken)
}
