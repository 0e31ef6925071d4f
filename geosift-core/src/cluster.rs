//! Cluster and search-result types.

use std::cmp::Ordering;

use crate::geo::GeoPoint;
use crate::record::PhotoLocation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A record paired with its computed distance from the search center.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchHit {
    /// The matching record.
    pub record: PhotoLocation,
    /// Great-circle distance from the search center in kilometers.
    pub distance_km: f64,
}

impl SearchHit {
    /// Ascending by distance, ties broken by lexical path order so result
    /// ordering is deterministic.
    #[must_use]
    pub fn order(&self, other: &Self) -> Ordering {
        self.distance_km
            .total_cmp(&other.distance_km)
            .then_with(|| self.record.path.cmp(&other.record.path))
    }
}

/// A group of records within mutual proximity of a running centroid.
///
/// The centroid is the arithmetic mean of all member coordinates and is
/// recomputed after each insertion. Members keep insertion order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    /// Sequential identifier assigned at creation.
    pub id: u32,
    /// Running mean of member coordinates.
    pub centroid: GeoPoint,
    /// Member records in insertion order.
    pub members: Vec<PhotoLocation>,
    /// Reverse-geocoded name, resolved after partitioning completes.
    pub name: Option<String>,
}

impl Cluster {
    /// Creates a cluster seeded with its first member.
    #[must_use]
    pub fn seeded(id: u32, record: PhotoLocation) -> Self {
        let centroid = record.point;
        Self {
            id,
            centroid,
            members: vec![record],
            name: None,
        }
    }

    /// Appends a member and recomputes the centroid as the mean of all
    /// member coordinates.
    pub fn push(&mut self, record: PhotoLocation) {
        self.members.push(record);
        let n = self.members.len() as f64;
        let (lat_sum, lon_sum) = self.members.iter().fold((0.0, 0.0), |(lat, lon), m| {
            (lat + m.point.latitude, lon + m.point.longitude)
        });
        // Mean of valid coordinates stays within the valid ranges.
        self.centroid = GeoPoint {
            latitude: lat_sum / n,
            longitude: lon_sum / n,
        };
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the cluster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Coordinate-based name used when reverse geocoding fails or is
    /// unavailable. Four decimal places (~11 m) keep distinct centroids
    /// distinct.
    #[must_use]
    pub fn fallback_name(&self) -> String {
        format!(
            "cluster_{:.4}_{:.4}",
            self.centroid.latitude, self.centroid.longitude
        )
    }

    /// Resolved name, or the coordinate fallback.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.fallback_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(path: &str, lat: f64, lon: f64) -> PhotoLocation {
        PhotoLocation::new(path, GeoPoint::new(lat, lon).unwrap())
    }

    #[test]
    fn test_centroid_is_running_mean() {
        let mut cluster = Cluster::seeded(0, record("a.jpg", 10.0, 20.0));
        assert_relative_eq!(cluster.centroid.latitude, 10.0);

        cluster.push(record("b.jpg", 12.0, 22.0));
        assert_relative_eq!(cluster.centroid.latitude, 11.0);
        assert_relative_eq!(cluster.centroid.longitude, 21.0);

        cluster.push(record("c.jpg", 14.0, 24.0));
        assert_relative_eq!(cluster.centroid.latitude, 12.0);
        assert_relative_eq!(cluster.centroid.longitude, 22.0);
        assert_eq!(cluster.len(), 3);
    }

    #[test]
    fn test_members_keep_insertion_order() {
        let mut cluster = Cluster::seeded(3, record("b.jpg", 1.0, 1.0));
        cluster.push(record("a.jpg", 1.0, 1.0));
        let paths: Vec<_> = cluster.members.iter().map(PhotoLocation::path_str).collect();
        assert_eq!(paths, vec!["b.jpg", "a.jpg"]);
    }

    #[test]
    fn test_fallback_name_precision() {
        let cluster = Cluster::seeded(0, record("a.jpg", 40.71284, -74.00601));
        assert_eq!(cluster.fallback_name(), "cluster_40.7128_-74.0060");
        assert_eq!(cluster.display_name(), "cluster_40.7128_-74.0060");
    }

    #[test]
    fn test_display_name_prefers_resolved() {
        let mut cluster = Cluster::seeded(0, record("a.jpg", 40.0, -74.0));
        cluster.name = Some("Hoboken".to_string());
        assert_eq!(cluster.display_name(), "Hoboken");
    }

    #[test]
    fn test_hit_ordering_ties_break_on_path() {
        let a = SearchHit {
            record: record("b.jpg", 1.0, 1.0),
            distance_km: 0.5,
        };
        let b = SearchHit {
            record: record("a.jpg", 1.0, 1.0),
            distance_km: 0.5,
        };
        assert_eq!(a.order(&b), std::cmp::Ordering::Greater);
        assert_eq!(b.order(&a), std::cmp::Ordering::Less);
    }
}
