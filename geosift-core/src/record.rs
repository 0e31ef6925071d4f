//! The canonical location record extracted from a photograph.

use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::geo::GeoPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// GPS metadata for a single photograph.
///
/// The path is the unique key within a run. Records are built once by a
/// [`crate::LocationExtractor`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhotoLocation {
    /// Path of the source image file.
    pub path: PathBuf,
    /// Extracted coordinate.
    pub point: GeoPoint,
    /// Altitude in meters, when present in the metadata.
    pub altitude_m: Option<f64>,
    /// Capture timestamp, when present in the metadata.
    pub taken: Option<NaiveDateTime>,
    /// GPS accuracy value in meters (horizontal error or DOP), when present.
    pub accuracy_m: Option<f64>,
}

impl PhotoLocation {
    /// Creates a record with only the required fields.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, point: GeoPoint) -> Self {
        Self {
            path: path.into(),
            point,
            altitude_m: None,
            taken: None,
            accuracy_m: None,
        }
    }

    /// Sets the altitude.
    #[must_use]
    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = Some(altitude_m);
        self
    }

    /// Sets the capture timestamp.
    #[must_use]
    pub fn with_taken(mut self, taken: NaiveDateTime) -> Self {
        self.taken = Some(taken);
        self
    }

    /// Sets the GPS accuracy value.
    #[must_use]
    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    /// Path as a lossy UTF-8 string, used for exports and checkpoints.
    #[must_use]
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_record_builder() {
        let point = GeoPoint::new(40.7128, -74.0060).unwrap();
        let taken = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let record = PhotoLocation::new("/photos/a.jpg", point)
            .with_altitude(10.5)
            .with_taken(taken)
            .with_accuracy(4.2);

        assert_eq!(record.path, PathBuf::from("/photos/a.jpg"));
        assert_eq!(record.altitude_m, Some(10.5));
        assert_eq!(record.taken, Some(taken));
        assert_eq!(record.accuracy_m, Some(4.2));
    }

    #[test]
    fn test_minimal_record() {
        let point = GeoPoint::new(0.0, 0.0).unwrap();
        let record = PhotoLocation::new("b.jpg", point);
        assert!(record.altitude_m.is_none());
        assert!(record.taken.is_none());
        assert!(record.accuracy_m.is_none());
    }
}
