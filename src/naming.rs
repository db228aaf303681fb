//! Collision-free receipt filenames
//!
//! Files inside a day folder are named `YYYY-MM-DD_N.jpg` where `N` starts at
//! 1. [`FilenameAllocator::allocate`] picks the smallest unused `N` for a date
//! given the current folder listing. It never locks: callers re-list the
//! destination right before writing and allocate again if another writer got
//! there first (see [`FilenameAllocator::allocate_checked`]).

use crate::error::{Result, SyncError};
use regex::Regex;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::LazyLock;

/// Grammar every receipt image filename must follow.
pub const FILENAME_PATTERN: &str = r"^([0-9]{4}-[0-9]{2}-[0-9]{2})_([1-9][0-9]*)\.jpg$";

static FILENAME_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(FILENAME_PATTERN).ok());

/// Filename split into its date and sequence parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub date: String,
    pub sequence: u64,
}

/// Parse `YYYY-MM-DD_N.jpg`; `None` if the name does not follow the grammar.
///
/// `_0.jpg` and zero-padded sequences are rejected. A sequence too large for
/// `u64` is treated as malformed.
pub fn parse_filename(name: &str) -> Option<ParsedFilename> {
    let captures = FILENAME_RE.as_ref()?.captures(name)?;
    let date = captures.get(1)?.as_str().to_owned();
    let sequence = captures.get(2)?.as_str().parse().ok()?;
    Some(ParsedFilename { date, sequence })
}

/// Whether `name` follows the receipt filename grammar.
pub fn is_valid_filename(name: &str) -> bool {
    FILENAME_RE.as_ref().is_some_and(|re| re.is_match(name))
}

/// Allocates the next free `date_{n}.jpg` for a day folder.
#[derive(Debug, Clone, Copy)]
pub struct FilenameAllocator {
    max_attempts: u32,
}

impl Default for FilenameAllocator {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl FilenameAllocator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Smallest positive `n` such that `{date}_{n}.jpg` is not in `existing`.
    ///
    /// Names for other dates and names outside the grammar are ignored. The
    /// result depends only on the set of names, not on their order.
    pub fn allocate<S: AsRef<str>>(date: &str, existing: &[S]) -> Result<String> {
        let taken: BTreeSet<u64> = existing
            .iter()
            .filter_map(|name| parse_filename(name.as_ref()))
            .filter(|parsed| parsed.date == date)
            .map(|parsed| parsed.sequence)
            .collect();

        let mut candidate: u64 = 1;
        for sequence in &taken {
            if *sequence != candidate {
                break;
            }
            candidate = candidate.checked_add(1).ok_or_else(|| {
                SyncError::InvalidFilename(format!("sequence space exhausted for {date}"))
            })?;
        }

        let filename = format!("{date}_{candidate}.jpg");
        if !is_valid_filename(&filename) {
            return Err(SyncError::InvalidFilename(format!(
                "{date} is not a YYYY-MM-DD date"
            )));
        }
        Ok(filename)
    }

    /// Allocate against `listing`, then confirm the name is still free.
    ///
    /// `relist` fetches the destination listing immediately before the write.
    /// If the allocated name shows up there, another writer took it and we
    /// allocate again from the fresh listing, up to the configured attempts.
    pub async fn allocate_checked<F, Fut>(
        &self,
        date: &str,
        listing: Vec<String>,
        mut relist: F,
    ) -> Result<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        let mut known = listing;
        for attempt in 1..=self.max_attempts {
            let candidate = Self::allocate(date, &known)?;
            let current = relist().await?;
            if !current.iter().any(|name| *name == candidate) {
                return Ok(candidate);
            }

            tracing::debug!(
                "Filename {} taken concurrently (attempt {}/{})",
                candidate,
                attempt,
                self.max_attempts
            );
            known = current;
        }

        Err(SyncError::Remote(format!(
            "Could not allocate a free filename for {date} after {} attempts",
            self.max_attempts
        )))
    }
}
