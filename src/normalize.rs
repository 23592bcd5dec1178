use crate::cache::{self, write_atomically};
use crate::error::{GalleryError, Result};
use crate::image_processing::encode_jpeg;
use crate::scanner::{SourceFile, SourceFormat};
use image::RgbImage;
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What normalization did for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeStatus {
    /// Already a web format, used in place
    PassThrough,
    /// A converted file from an earlier run (or a same-named JPEG) was reused
    Reused,
    /// Decoded and written during this run
    Converted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub path: PathBuf,
    pub status: NormalizeStatus,
}

/// Path the file will be displayed from once normalized. Pure; touches no file.
pub fn normalized_path(file: &SourceFile) -> PathBuf {
    match file.format() {
        SourceFormat::Standard => file.path().to_path_buf(),
        SourceFormat::Heif => cache::converted_path(file.path()),
    }
}

/// Makes `file` displayable in a browser.
///
/// HEIC/HEIF captures are converted to a sibling `.jpg` unless one already
/// exists, in which case it is reused without decoding. Everything else
/// passes through.
pub fn normalize(file: &SourceFile, quality: u8) -> Result<Normalized> {
    let target = normalized_path(file);
    if !file.format().needs_conversion() {
        return Ok(Normalized {
            path: target,
            status: NormalizeStatus::PassThrough,
        });
    }

    if cache::lookup(&target).is_some() {
        debug!("Reusing converted {}", target.display());
        return Ok(Normalized {
            path: target,
            status: NormalizeStatus::Reused,
        });
    }

    let rgb = decode_heif(file.path())?;
    let jpeg = encode_jpeg(&rgb, quality, &target)?;
    write_atomically(&target, &jpeg)?;
    info!(
        "Converted {} -> {} ({}x{})",
        file.path().display(),
        target.display(),
        rgb.width(),
        rgb.height()
    );

    Ok(Normalized {
        path: target,
        status: NormalizeStatus::Converted,
    })
}

/// Decodes the primary image of a HEIF container into 8-bit interleaved RGB.
///
/// libheif applies the container's rotation and mirroring, so the result is
/// already upright.
pub fn decode_heif(path: &Path) -> Result<RgbImage> {
    let path_str = path
        .to_str()
        .ok_or_else(|| GalleryError::decode(path, "path is not valid UTF-8"))?;

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(path_str)
        .map_err(|e| GalleryError::decode(path, format!("failed to read HEIF context: {}", e)))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| GalleryError::decode(path, format!("no primary image: {}", e)))?;
    let image = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| GalleryError::decode(path, e))?;

    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| GalleryError::decode(path, "decoder returned no interleaved plane"))?;

    let (width, height) = (plane.width, plane.height);
    let row_bytes = width as usize * 3;
    if plane.stride < row_bytes {
        return Err(GalleryError::decode(path, "unexpected pixel layout"));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        if row.len() < row_bytes {
            return Err(GalleryError::decode(path, "truncated pixel data"));
        }
        pixels.extend_from_slice(&row[..row_bytes]);
    }

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| GalleryError::decode(path, "pixel buffer size mismatch"))
}
