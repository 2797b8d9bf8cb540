//! Day / week / month views over a bin's history.
//!
//! Policies:
//! - day: the anchor's calendar date
//! - week: seven calendar dates starting at the anchor (anchor ..= anchor + 6 days)
//! - month: the anchor's calendar month
//!
//! Dates are taken in the timezone handed to [`filter`], so the browser can pass
//! `Local` while the backend works in UTC.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};

use crate::{req::GraphEntry, ValidationError};

/// Anything that sits on the time axis.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for GraphEntry {
    fn timestamp(&self) -> DateTime<Utc> {
        self.time
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Day,
    Week,
    Month,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Day, ViewMode::Week, ViewMode::Month];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Day => "day",
            ViewMode::Week => "week",
            ViewMode::Month => "month",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(ViewMode::Day),
            "week" => Ok(ViewMode::Week),
            "month" => Ok(ViewMode::Month),
            other => Err(ValidationError::ViewMode(other.to_owned())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    pub mode: ViewMode,
    /// No anchor selects nothing.
    pub anchor: Option<NaiveDate>,
}

impl ViewWindow {
    pub fn new(mode: ViewMode, anchor: NaiveDate) -> Self {
        Self {
            mode,
            anchor: Some(anchor),
        }
    }

    /// First and last calendar date covered by the window, both inclusive.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let anchor = self.anchor?;
        match self.mode {
            ViewMode::Day => Some((anchor, anchor)),
            ViewMode::Week => Some((anchor, anchor.checked_add_days(Days::new(6))?)),
            ViewMode::Month => {
                let first = anchor.with_day(1)?;
                let next_month = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
                };
                Some((first, next_month.pred_opt()?))
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.bounds()
            .is_some_and(|(first, last)| first <= date && date <= last)
    }
}

/// Entries of `series` that fall into `window`, in their original order.
pub fn filter<T, Tz>(series: &[T], window: &ViewWindow, tz: &Tz) -> Vec<T>
where
    T: Timestamped + Clone,
    Tz: TimeZone,
{
    let Some((first, last)) = window.bounds() else {
        return vec![];
    };

    series
        .iter()
        .filter(|entry| {
            let date = entry.timestamp().with_timezone(tz).date_naive();
            first <= date && date <= last
        })
        .cloned()
        .collect()
}
