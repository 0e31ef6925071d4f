//! Geocoding capability.

use crate::error::GeocodingError;
use crate::geo::GeoPoint;

/// Resolves addresses to coordinates and coordinates to place names.
///
/// Implementations wrap an external, rate-limited service; this crate never
/// speaks a network protocol itself. Callers must treat every method as
/// potentially slow (network round-trip plus an enforced minimum spacing
/// between requests).
pub trait Geocoder {
    /// Resolves a free-form address to a coordinate.
    ///
    /// # Errors
    /// Returns a [`GeocodingError`] when the service fails, times out, or
    /// finds no match.
    fn resolve_address(&self, query: &str) -> Result<GeoPoint, GeocodingError>;

    /// Resolves a coordinate to a human-readable place name.
    ///
    /// # Errors
    /// Returns a [`GeocodingError`] when the service fails, times out, or
    /// finds no match.
    fn reverse_geocode(&self, point: GeoPoint) -> Result<String, GeocodingError>;
}
