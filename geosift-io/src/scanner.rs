//! Directory scanner for candidate image files.

use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// Extensions treated as JPEG images, lowercase.
const JPEG_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

/// Discovers image files under a root directory.
///
/// Paths are returned in lexical order so downstream processing (and the
/// checkpointed processing prefix) is deterministic across runs.
#[derive(Debug, Clone)]
pub struct ImageScanner {
    root: PathBuf,
    recursive: bool,
    exclude: Option<PathBuf>,
}

impl ImageScanner {
    /// Creates a recursive scanner over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: true,
            exclude: None,
        }
    }

    /// Limits the scan to the root directory itself.
    #[must_use]
    pub fn non_recursive(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// Excludes a directory subtree, typically the output directory.
    #[must_use]
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude = Some(dir.into());
        self
    }

    /// Whether a file name has a JPEG extension.
    #[must_use]
    pub fn is_image_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| JPEG_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Collects matching files in lexical path order.
    ///
    /// # Errors
    /// Returns an error when the root directory cannot be read. Unreadable
    /// entries below the root are logged and skipped.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("root directory not found: {}", self.root.display()),
            )
            .into());
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                self.exclude
                    .as_ref()
                    .is_none_or(|excluded| !entry.path().starts_with(excluded))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if entry.file_type().is_file() && Self::is_image_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        // walkdir sorts per directory; a final sort pins the global order.
        files.sort();
        Ok(files)
    }
}
