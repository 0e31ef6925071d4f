//! Radius search over location records.

use geosift_core::{
    Center, Error, GeoPoint, Geocoder, PhotoLocation, SearchCriteria, SearchHit,
};
use log::info;

/// Resolves the search center, geocoding the address form if needed.
///
/// # Errors
/// Returns [`Error::Geocoding`] when address resolution fails; the search
/// aborts rather than retrying here (backoff is the geocoder wrapper's
/// contract).
pub fn resolve_center<G: Geocoder + ?Sized>(
    criteria: &SearchCriteria,
    geocoder: &G,
) -> Result<GeoPoint, Error> {
    match &criteria.center {
        Center::Coordinate(point) => Ok(*point),
        Center::Address(address) => {
            let point = geocoder.resolve_address(address).map_err(Error::Geocoding)?;
            info!("resolved {address:?} to {point}");
            Ok(point)
        }
    }
}

/// Distance-based selection around a resolved center.
#[derive(Debug, Clone, Copy)]
pub struct RadiusSearch {
    /// Resolved search center.
    pub center: GeoPoint,
    /// Inclusive radius in kilometers.
    pub radius_km: f64,
}

impl RadiusSearch {
    /// Creates a search around a resolved center.
    #[must_use]
    pub fn new(center: GeoPoint, radius_km: f64) -> Self {
        Self { center, radius_km }
    }

    /// Distance from the center to a record, in kilometers.
    #[must_use]
    pub fn distance_to(&self, record: &PhotoLocation) -> f64 {
        self.center.distance_km(&record.point)
    }

    /// Whether a record falls within the radius. The boundary is inclusive:
    /// a record at exactly the radius matches.
    #[must_use]
    pub fn contains(&self, record: &PhotoLocation) -> bool {
        self.distance_to(record) <= self.radius_km
    }

    /// Selects all matching records from a filtered set, sorted ascending by
    /// distance with lexical path tie-break.
    #[must_use]
    pub fn select(&self, records: &[PhotoLocation]) -> Vec<SearchHit> {
        let mut accumulator = SearchAccumulator::new();
        for record in records {
            accumulator.consider(self, record.clone());
        }
        accumulator.into_sorted()
    }
}

/// In-progress search results.
///
/// Accumulates hits one record at a time so a checkpointed run can re-seed
/// partial results and continue; ordering is applied once at the end.
#[derive(Debug, Clone, Default)]
pub struct SearchAccumulator {
    hits: Vec<SearchHit>,
}

impl SearchAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-seeds the accumulator from a checkpointed partial result.
    #[must_use]
    pub fn from_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }

    /// Tests a record against the search and keeps it when it matches.
    /// Returns true when the record was kept.
    pub fn consider(&mut self, search: &RadiusSearch, record: PhotoLocation) -> bool {
        let distance_km = search.distance_to(&record);
        if distance_km <= search.radius_km {
            self.hits.push(SearchHit {
                record,
                distance_km,
            });
            true
        } else {
            false
        }
    }

    /// Number of hits accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// True when nothing has matched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Current hits in accumulation order, for checkpointing.
    #[must_use]
    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    /// Final ordered results: ascending by distance, ties broken by path.
    #[must_use]
    pub fn into_sorted(mut self) -> Vec<SearchHit> {
        self.hits.sort_by(SearchHit::order);
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geosift_core::GeocodingError;

    struct FixedGeocoder(GeoPoint);

    impl Geocoder for FixedGeocoder {
        fn resolve_address(&self, _query: &str) -> Result<GeoPoint, GeocodingError> {
            Ok(self.0)
        }
        fn reverse_geocode(&self, _point: GeoPoint) -> Result<String, GeocodingError> {
            Err(GeocodingError::Service("not supported".into()))
        }
    }

    struct FailingGeocoder;

    impl Geocoder for FailingGeocoder {
        fn resolve_address(&self, query: &str) -> Result<GeoPoint, GeocodingError> {
            Err(GeocodingError::NoMatch(query.to_string()))
        }
        fn reverse_geocode(&self, _point: GeoPoint) -> Result<String, GeocodingError> {
            Err(GeocodingError::Service("not supported".into()))
        }
    }

    fn record(path: &str, lat: f64, lon: f64) -> PhotoLocation {
        PhotoLocation::new(path, GeoPoint::new(lat, lon).unwrap())
    }

    #[test]
    fn test_select_sorted_by_distance() {
        let center = GeoPoint::new(40.7128, -74.0060).unwrap();
        let search = RadiusSearch::new(center, 1.0);
        let records = vec![
            record("far.jpg", 40.7138, -74.0070),
            record("center.jpg", 40.7128, -74.0060),
        ];

        let hits = search.select(&records);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.path_str(), "center.jpg");
        assert_relative_eq!(hits[0].distance_km, 0.0, epsilon = 1e-12);
        assert!(hits[1].distance_km > 0.0);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let probe = record("edge.jpg", 0.01, 0.0);
        let exact = center.distance_km(&probe.point);

        let at_radius = RadiusSearch::new(center, exact);
        assert!(at_radius.contains(&probe));

        let just_under = RadiusSearch::new(center, exact - 1e-9);
        assert!(!just_under.contains(&probe));
    }

    #[test]
    fn test_outside_radius_excluded() {
        let center = GeoPoint::new(40.7128, -74.0060).unwrap();
        let search = RadiusSearch::new(center, 0.05);
        let records = vec![record("far.jpg", 40.7238, -74.0160)];
        assert!(search.select(&records).is_empty());
    }

    #[test]
    fn test_equal_distance_sorts_by_path() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let search = RadiusSearch::new(center, 10.0);
        // Mirror points: identical distance from the center.
        let records = vec![
            record("b.jpg", 0.01, 0.0),
            record("a.jpg", -0.01, 0.0),
        ];
        let hits = search.select(&records);
        assert_eq!(hits[0].record.path_str(), "a.jpg");
        assert_eq!(hits[1].record.path_str(), "b.jpg");
    }

    #[test]
    fn test_resolve_center_coordinate_skips_geocoder() {
        let point = GeoPoint::new(40.0, -74.0).unwrap();
        let criteria = SearchCriteria::at(point, 1.0);
        let resolved = resolve_center(&criteria, &FailingGeocoder).unwrap();
        assert_eq!(resolved, point);
    }

    #[test]
    fn test_resolve_center_address() {
        let point = GeoPoint::new(59.9139, 10.7522).unwrap();
        let criteria = SearchCriteria::at_address("Oslo", 1.0);
        let resolved = resolve_center(&criteria, &FixedGeocoder(point)).unwrap();
        assert_eq!(resolved, point);
    }

    #[test]
    fn test_resolve_center_failure_aborts() {
        let criteria = SearchCriteria::at_address("Nowhere", 1.0);
        assert!(resolve_center(&criteria, &FailingGeocoder).is_err());
    }

    #[test]
    fn test_accumulator_reseed_matches_fresh_run() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let search = RadiusSearch::new(center, 100.0);
        let records: Vec<_> = (0..6)
            .map(|i| record(&format!("{i}.jpg"), 0.001 * f64::from(i), 0.0))
            .collect();

        let full = search.select(&records);

        let mut first = SearchAccumulator::new();
        for r in &records[..3] {
            first.consider(&search, r.clone());
        }
        let mut resumed = SearchAccumulator::from_hits(first.hits().to_vec());
        for r in &records[3..] {
            resumed.consider(&search, r.clone());
        }

        assert_eq!(resumed.into_sorted(), full);
    }
}
