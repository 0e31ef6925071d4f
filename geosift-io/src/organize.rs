//! Copying matched images into an output directory.

use std::fs;
use std::path::Path;

use log::{info, warn};

use geosift_core::{Cluster, SearchHit};

use crate::error::Result;

/// Copies search hits flat into `dest`. Returns the number copied.
///
/// Per-file copy failures are logged and skipped; the export artifacts
/// already carry the full result set.
///
/// # Errors
/// Returns an error when the destination directory cannot be created.
pub fn copy_hits(hits: &[SearchHit], dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;
    for hit in hits {
        if copy_one(&hit.record.path, dest) {
            copied += 1;
        }
    }
    info!("copied {copied} images to {}", dest.display());
    Ok(copied)
}

/// Copies cluster members into one subdirectory per cluster, named after the
/// cluster. Returns the number copied.
///
/// # Errors
/// Returns an error when a cluster directory cannot be created.
pub fn copy_clusters(clusters: &[Cluster], dest: &Path) -> Result<usize> {
    let mut copied = 0;
    for cluster in clusters {
        let dir = dest.join(sanitize_folder_name(&cluster.display_name()));
        fs::create_dir_all(&dir)?;
        for record in &cluster.members {
            if copy_one(&record.path, &dir) {
                copied += 1;
            }
        }
    }
    info!("copied {copied} images into {} cluster directories", clusters.len());
    Ok(copied)
}

fn copy_one(source: &Path, dir: &Path) -> bool {
    let Some(file_name) = source.file_name() else {
        warn!("cannot copy {}: no file name", source.display());
        return false;
    };
    match fs::copy(source, dir.join(file_name)) {
        Ok(_) => true,
        Err(err) => {
            warn!("could not copy {}: {err}", source.display());
            false
        }
    }
}

/// Replaces characters that are invalid in directory names.
#[must_use]
pub fn sanitize_folder_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();
    let trimmed = sanitized.trim_matches(['.', ' ']);
    if trimmed.is_empty() {
        "images".to_string()
    } else {
        trimmed.to_string()
    }
}
