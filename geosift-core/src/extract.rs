//! Location extraction capability.

use std::path::Path;

use crate::error::Result;
use crate::record::PhotoLocation;

/// Extracts a location record from an image file.
///
/// Implementations parse file metadata (EXIF in practice); the engines only
/// see the resulting records. `Ok(None)` means the file carries no usable
/// GPS data and is skipped; `Err` means the file could not be read at all.
/// Either way the orchestrator marks the path as processed so a resumed run
/// does not retry it.
pub trait LocationExtractor {
    /// Extracts GPS metadata from the file at `path`.
    ///
    /// # Errors
    /// Returns an error when the file cannot be opened or parsed.
    fn extract(&self, path: &Path) -> Result<Option<PhotoLocation>>;
}
