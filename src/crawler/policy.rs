//! Incremental update policy
//!
//! Decides per item whether a record already in the catalog has to be
//! extracted again. Its `true` answers are the `Skip` outcomes the walker's
//! early stop looks at.

use crate::catalog::ItemRecord;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// Re-extract every item, known or not
    pub force_all: bool,

    /// Re-extract known items whose upload time is older than this, or unknown
    pub stale_before: Option<DateTime<Utc>>,
}

impl UpdatePolicy {
    /// Only extract items missing from the catalog
    pub fn new_only() -> Self {
        Self::default()
    }

    pub fn force_all() -> Self {
        Self {
            force_all: true,
            stale_before: None,
        }
    }

    pub fn stale_before(cutoff: DateTime<Utc>) -> Self {
        Self {
            force_all: false,
            stale_before: Some(cutoff),
        }
    }

    /// Returns true when `existing` is recent enough to keep as is
    pub fn should_skip(&self, existing: Option<&ItemRecord>) -> bool {
        let Some(existing) = existing else {
            return false;
        };

        if self.force_all {
            return false;
        }

        match self.stale_before {
            None => true,
            // A record without an upload time is treated as stale.
            Some(cutoff) => existing.uploaded.is_some_and(|uploaded| uploaded >= cutoff),
        }
    }
}
