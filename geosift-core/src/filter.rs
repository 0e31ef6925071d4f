//! Composable filter predicates over location records.
//!
//! Filters compose by logical AND and are pure: applying the same bounds to
//! the same record any number of times yields the same answer, and the order
//! of the individual checks does not affect the result set.

use chrono::NaiveDate;

use crate::record::PhotoLocation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Optional date-range and accuracy bounds applied before search or
/// clustering.
///
/// A record with no capture timestamp passes date filtering only when no
/// date bound is configured; likewise a record with no accuracy value passes
/// accuracy filtering only when no threshold is configured. When a bound is
/// set, absent metadata is excluded: the record cannot be shown to satisfy
/// the bound.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterBounds {
    /// Earliest capture date, inclusive.
    pub date_from: Option<NaiveDate>,
    /// Latest capture date, inclusive.
    pub date_to: Option<NaiveDate>,
    /// Maximum acceptable GPS accuracy error in meters.
    pub max_accuracy_m: Option<f64>,
}

impl FilterBounds {
    /// Bounds that pass every record.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the inclusive start of the date range.
    #[must_use]
    pub fn with_date_from(mut self, from: NaiveDate) -> Self {
        self.date_from = Some(from);
        self
    }

    /// Sets the inclusive end of the date range.
    #[must_use]
    pub fn with_date_to(mut self, to: NaiveDate) -> Self {
        self.date_to = Some(to);
        self
    }

    /// Sets the maximum accuracy error.
    #[must_use]
    pub fn with_max_accuracy(mut self, max_m: f64) -> Self {
        self.max_accuracy_m = Some(max_m);
        self
    }

    /// True when no bound is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.date_from.is_none() && self.date_to.is_none() && self.max_accuracy_m.is_none()
    }

    /// Whether the record's capture date satisfies the configured range.
    #[must_use]
    pub fn passes_date(&self, record: &PhotoLocation) -> bool {
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }
        let Some(taken) = record.taken else {
            return false;
        };
        let date = taken.date();
        if self.date_from.is_some_and(|from| date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| date > to) {
            return false;
        }
        true
    }

    /// Whether the record's accuracy value satisfies the configured threshold.
    #[must_use]
    pub fn passes_accuracy(&self, record: &PhotoLocation) -> bool {
        let Some(max) = self.max_accuracy_m else {
            return true;
        };
        match record.accuracy_m {
            Some(accuracy) => accuracy <= max,
            None => false,
        }
    }

    /// Conjunction of all configured filters.
    #[must_use]
    pub fn passes(&self, record: &PhotoLocation) -> bool {
        self.passes_date(record) && self.passes_accuracy(record)
    }
}
