use crate::cache::{self, write_atomically, CacheStatus};
use crate::constants::{THUMBNAIL_QUALITY, THUMBNAIL_SIZE};
use crate::error::Result;
use crate::image_processing::{encode_jpeg, load_for_size, scale_within};
use crate::orientation::{apply_orientation, exif_orientation};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bound and quality for grid thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSpec {
    /// Neither side of a thumbnail exceeds this many pixels
    pub max_dimension: u32,
    pub quality: u8,
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            max_dimension: THUMBNAIL_SIZE,
            quality: THUMBNAIL_QUALITY,
        }
    }
}

/// Returns the thumbnail for `source`, generating it only when missing.
pub fn ensure_thumbnail(source: &Path, spec: &ThumbnailSpec) -> Result<(PathBuf, CacheStatus)> {
    let thumbnail = cache::thumbnail_path(source);
    if cache::lookup(&thumbnail).is_some() {
        return Ok((thumbnail, CacheStatus::Hit));
    }

    let jpeg = render_thumbnail(source, spec)?;
    write_atomically(&thumbnail, &jpeg)?;
    debug!("Generated thumbnail {}", thumbnail.display());
    Ok((thumbnail, CacheStatus::Generated))
}

/// Decodes, orients, shrinks and re-encodes `source` as JPEG bytes.
pub fn render_thumbnail(source: &Path, spec: &ThumbnailSpec) -> Result<Vec<u8>> {
    let img = load_for_size(source, spec.max_dimension)?;
    let img = apply_orientation(img, exif_orientation(source));
    let scaled = scale_within(img, spec.max_dimension);
    encode_jpeg(&scaled.to_rgb8(), spec.quality, source)
}
