//! Search and clustering parameters with checkpoint fingerprints.

use crate::error::{Error, Result};
use crate::filter::FilterBounds;
use crate::geo::GeoPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where a search is centered: an already-resolved coordinate or an address
/// string awaiting geocoding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Center {
    /// A resolved coordinate.
    Coordinate(GeoPoint),
    /// An address pending resolution through the geocoder.
    Address(String),
}

/// Parameters of a radius search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchCriteria {
    /// Search center.
    pub center: Center,
    /// Search radius in kilometers. Must be positive.
    pub radius_km: f64,
    /// Date and accuracy bounds applied before distance checks.
    pub filters: FilterBounds,
}

impl SearchCriteria {
    /// Criteria centered on a coordinate.
    #[must_use]
    pub fn at(point: GeoPoint, radius_km: f64) -> Self {
        Self {
            center: Center::Coordinate(point),
            radius_km,
            filters: FilterBounds::none(),
        }
    }

    /// Criteria centered on an address string.
    #[must_use]
    pub fn at_address(address: impl Into<String>, radius_km: f64) -> Self {
        Self {
            center: Center::Address(address.into()),
            radius_km,
            filters: FilterBounds::none(),
        }
    }

    /// Sets the filter bounds.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterBounds) -> Self {
        self.filters = filters;
        self
    }

    /// Validates the criteria before any file is touched.
    ///
    /// # Errors
    /// Returns a configuration error for a non-positive or non-finite radius,
    /// an empty address, or an inverted date range.
    pub fn validate(&self) -> Result<()> {
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(Error::InvalidRadius(self.radius_km));
        }
        if let Center::Address(address) = &self.center {
            if address.trim().is_empty() {
                return Err(Error::MissingCenter);
            }
        }
        validate_date_range(&self.filters)
    }

    /// Canonical fingerprint of every parameter that affects the result set.
    ///
    /// Stored in checkpoints; a stored fingerprint that differs from the
    /// current one invalidates the checkpoint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let center = match &self.center {
            Center::Coordinate(p) => format!("coord:{:.6},{:.6}", p.latitude, p.longitude),
            Center::Address(a) => format!("addr:{}", a.trim().to_lowercase()),
        };
        format!(
            "search;{center};radius={:.6};{}",
            self.radius_km,
            filter_fingerprint(&self.filters)
        )
    }
}

/// Parameters of a clustering run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterParams {
    /// Maximum centroid-to-record distance for absorption, in kilometers.
    pub merge_radius_km: f64,
    /// Date and accuracy bounds applied before clustering.
    pub filters: FilterBounds,
}

impl ClusterParams {
    /// Parameters with the given merge radius and no filters.
    #[must_use]
    pub fn new(merge_radius_km: f64) -> Self {
        Self {
            merge_radius_km,
            filters: FilterBounds::none(),
        }
    }

    /// Sets the filter bounds.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterBounds) -> Self {
        self.filters = filters;
        self
    }

    /// Validates the parameters.
    ///
    /// # Errors
    /// Returns a configuration error for a non-positive or non-finite merge
    /// radius or an inverted date range.
    pub fn validate(&self) -> Result<()> {
        if !self.merge_radius_km.is_finite() || self.merge_radius_km <= 0.0 {
            return Err(Error::InvalidRadius(self.merge_radius_km));
        }
        validate_date_range(&self.filters)
    }

    /// Canonical fingerprint for checkpoint validation.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "cluster;merge={:.6};{}",
            self.merge_radius_km,
            filter_fingerprint(&self.filters)
        )
    }
}

fn validate_date_range(filters: &FilterBounds) -> Result<()> {
    if let (Some(from), Some(to)) = (filters.date_from, filters.date_to) {
        if from > to {
            return Err(Error::InvalidDateRange { from, to });
        }
    }
    Ok(())
}

fn filter_fingerprint(filters: &FilterBounds) -> String {
    let from = filters
        .date_from
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    let to = filters
        .date_to
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    let accuracy = filters
        .max_accuracy_m
        .map_or_else(|| "-".to_string(), |a| format!("{a:.3}"));
    format!("from={from};to={to};acc={accuracy}")
}
