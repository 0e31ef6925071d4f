//! geosift-core: Core types for GPS photo search and clustering.
//!
//! This crate provides the foundational abstractions for location records,
//! search criteria, filter predicates, clusters, and the capability traits
//! (location extraction, geocoding) consumed by the engines.
//!

pub mod cluster;
pub mod criteria;
pub mod error;
pub mod extract;
pub mod filter;
pub mod geo;
pub mod geocode;
pub mod record;

pub use cluster::{Cluster, SearchHit};
pub use criteria::{Center, ClusterParams, SearchCriteria};
pub use error::{Error, GeocodingError, Result};
pub use extract::LocationExtractor;
pub use filter::FilterBounds;
pub use geo::{GeoPoint, MEAN_EARTH_RADIUS_KM};
pub use geocode::Geocoder;
pub use record::PhotoLocation;
