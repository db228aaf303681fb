//! Calendar days and destination folder placement.

use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root segment shared by every remote day folder.
pub const RECEIPTS_ROOT: &str = "Receipts";

/// Top-level country folder a receipt is filed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CountryFolder {
    Canada,
    #[serde(rename = "United_States")]
    UnitedStates,
}

impl CountryFolder {
    /// Map a receipt's free-form country to its folder.
    ///
    /// Only `"canada"` (any case, surrounding whitespace ignored) maps to
    /// [`CountryFolder::Canada`]; everything else files under United_States.
    pub fn from_country(country: &str) -> Self {
        if country.trim().eq_ignore_ascii_case("canada") {
            Self::Canada
        } else {
            Self::UnitedStates
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canada => "Canada",
            Self::UnitedStates => "United_States",
        }
    }
}

impl fmt::Display for CountryFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse the capture-local calendar day from an ISO-8601 timestamp.
///
/// Only the leading `YYYY-MM-DD` is read, so `"2025-06-14T23:59:00"` and
/// `"2025-06-14T23:59:00-07:00"` both land on June 14th. The timestamp is
/// never shifted into another zone.
pub fn calendar_day(timestamp: &str) -> Option<NaiveDate> {
    let day = timestamp.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Remote folder for a receipt captured on `day` in `country`.
///
/// Produces `Receipts/{CountryFolder}/{YYYY}/{YYYY-MM}/{YYYY-MM-DD}` with no
/// trailing slash.
pub fn destination_folder(day: NaiveDate, country: &str) -> String {
    let country = CountryFolder::from_country(country);
    format!(
        "{RECEIPTS_ROOT}/{country}/{year:04}/{year:04}-{month:02}/{day}",
        year = day.year(),
        month = day.month(),
        day = day.format("%Y-%m-%d"),
    )
}

/// Trailing `YYYY-MM-DD` segment of a day folder path, if it has one.
pub fn folder_day_segment(folder: &str) -> Option<&str> {
    let segment = folder
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()?;
    calendar_day(segment).filter(|_| segment.len() == 10)?;
    Some(segment)
}
