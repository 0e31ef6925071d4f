//! geosift-io: File I/O for geosift.
//!
//! Directory scanning, EXIF-based location extraction, durable checkpoints
//! with atomic replacement, paced geocoding, and CSV/KML export.
//!

mod checkpoint;
mod error;
mod exif_extractor;
mod kml;
mod organize;
mod paced;
mod scanner;
mod writer;

pub use checkpoint::{Accumulator, CheckpointManager, CheckpointState};
pub use error::{Error, Result};
pub use exif_extractor::ExifLocationExtractor;
pub use kml::KmlWriter;
pub use organize::{copy_clusters, copy_hits, sanitize_folder_name};
pub use paced::PacedGeocoder;
pub use scanner::ImageScanner;
pub use writer::CsvWriter;
