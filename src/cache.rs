//! Derived files on disk double as a cache between runs.
//!
//! The cache key is the derived path itself: if a file exists there, the work
//! that would produce it is skipped. There is no TTL and no content check, so
//! a source edited in place keeps serving its old thumbnail or conversion until
//! the derived file is deleted.

use crate::constants::{DERIVED_EXTENSION, THUMBNAIL_SUFFIX};
use crate::error::{GalleryError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Whether a derived file was found on disk or had to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Generated,
}

/// Looks up a derived file by path.
pub fn lookup(derived: &Path) -> Option<&Path> {
    if derived.is_file() {
        Some(derived)
    } else {
        None
    }
}

/// `<dir>/<stem>.jpg` for a source that needs converting.
pub fn converted_path(source: &Path) -> PathBuf {
    source.with_extension(DERIVED_EXTENSION)
}

/// `<dir>/<stem>_thumb.jpg` for a full-size image.
pub fn thumbnail_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{}{}.{}", stem, THUMBNAIL_SUFFIX, DERIVED_EXTENSION))
}

/// True for files this tool wrote as thumbnails on an earlier run.
pub fn is_thumbnail(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase().ends_with(THUMBNAIL_SUFFIX))
        .unwrap_or(false)
}

/// Writes `bytes` to `path` through a hidden sibling file and a rename, so an
/// interrupted run never leaves a truncated file at a cache key.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = path.with_file_name(format!(".{}.partial", file_name));

    fs::write(&partial, bytes).map_err(|e| GalleryError::io(&partial, e))?;
    if let Err(e) = fs::rename(&partial, path) {
        let _ = fs::remove_file(&partial);
        return Err(GalleryError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_derived_paths_share_directory() {
        let source = Path::new("photos/paris/IMG_0001.HEIC");
        assert_eq!(converted_path(source), Path::new("photos/paris/IMG_0001.jpg"));
        assert_eq!(
            thumbnail_path(Path::new("photos/paris/IMG_0001.jpg")),
            Path::new("photos/paris/IMG_0001_thumb.jpg")
        );
    }

    #[test]
    fn test_thumbnail_detection() {
        assert!(is_thumbnail(Path::new("paris/louvre_thumb.jpg")));
        assert!(is_thumbnail(Path::new("paris/LOUVRE_THUMB.JPG")));
        assert!(!is_thumbnail(Path::new("paris/thumbnail.jpg")));
        assert!(!is_thumbnail(Path::new("paris/louvre.jpg")));
    }

    #[test]
    fn test_write_atomically_leaves_no_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out.jpg");

        write_atomically(&target, b"jpeg bytes").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"jpeg bytes");
        assert_eq!(lookup(&target), Some(target.as_path()));
        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_lookup_misses_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(lookup(&temp_dir.path().join("nope_thumb.jpg")).is_none());
        assert!(lookup(temp_dir.path()).is_none());
    }
}
