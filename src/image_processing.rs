use crate::error::{GalleryError, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageReader, RgbImage};
use std::path::Path;

/// Scales `img` down so neither side exceeds `bound`, keeping its aspect
/// ratio. Images already within the bound are returned untouched.
pub fn scale_within(img: DynamicImage, bound: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= bound && height <= bound {
        return img;
    }
    // Triangle is fast and good enough at thumbnail sizes
    img.resize(bound, bound, FilterType::Triangle)
}

/// Encodes an RGB buffer as JPEG with turbojpeg.
pub fn encode_jpeg(rgb: &RgbImage, quality: u8, path: &Path) -> Result<Vec<u8>> {
    let jpeg_data = turbojpeg::compress_image(rgb, i32::from(quality), turbojpeg::Subsamp::Sub2x2)
        .map_err(|e| GalleryError::encode(path, e))?;
    Ok(jpeg_data.to_vec())
}

/// Decodes `data` with turbojpeg if it is a JPEG, letting the decoder shrink
/// by a DCT scaling factor while the longer side stays at least `target_size`.
///
/// Returns `None` for anything that is not a JPEG or that turbojpeg refuses,
/// so the caller can fall back to the `image` crate.
fn try_load_jpeg(data: &[u8], target_size: u32) -> Option<DynamicImage> {
    // JPEG magic bytes (FF D8 FF)
    if data.len() < 3 || data[0] != 0xFF || data[1] != 0xD8 || data[2] != 0xFF {
        return None;
    }

    let mut decompressor = turbojpeg::Decompressor::new().ok()?;
    let header = decompressor.read_header(data).ok()?;

    let target = target_size as usize;
    let scaling_factor = turbojpeg::Decompressor::supported_scaling_factors()
        .iter()
        .filter(|f| {
            let scaled_w = (header.width * f.num()).div_ceil(f.denom());
            let scaled_h = (header.height * f.num()).div_ceil(f.denom());
            target > 0 && scaled_w.max(scaled_h) >= target && f.num() <= f.denom()
        })
        .min_by_key(|f| (f.num() * 1000) / f.denom())
        .cloned()
        .unwrap_or(turbojpeg::ScalingFactor::new(1, 1));

    decompressor.set_scaling_factor(scaling_factor).ok()?;

    let scaled_width = (header.width * scaling_factor.num()).div_ceil(scaling_factor.denom());
    let scaled_height = (header.height * scaling_factor.num()).div_ceil(scaling_factor.denom());

    let mut image = RgbImage::new(scaled_width as u32, scaled_height as u32);
    let turbo_image = turbojpeg::Image {
        pixels: image.as_mut(),
        width: scaled_width,
        height: scaled_height,
        format: turbojpeg::PixelFormat::RGB,
        pitch: scaled_width * 3,
    };

    decompressor.decompress(data, turbo_image).ok()?;
    Some(DynamicImage::ImageRgb8(image))
}

/// Loads a standard-format image for downscaling to `target_size`.
pub fn load_for_size(path: &Path, target_size: u32) -> Result<DynamicImage> {
    let data = std::fs::read(path).map_err(|e| GalleryError::io(path, e))?;

    if let Some(img) = try_load_jpeg(&data, target_size) {
        return Ok(img);
    }

    ImageReader::new(std::io::Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| GalleryError::io(path, e))?
        .decode()
        .map_err(|e| GalleryError::decode(path, e))
}
