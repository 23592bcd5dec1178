use exif::{In, Reader, Tag};
use image::metadata::Orientation;
use image::DynamicImage;
use std::fs;
use std::path::Path;

/// Reads the EXIF orientation tag of `source_path`, 1 when absent or unreadable.
pub fn exif_orientation(source_path: &Path) -> u32 {
    let Ok(file) = fs::File::open(source_path) else {
        return 1;
    };
    let mut bufreader = std::io::BufReader::new(&file);

    match Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Rotates or flips `img` so it displays upright for the given EXIF orientation.
/// Unknown values leave the image as is.
pub fn apply_orientation(mut img: DynamicImage, orientation: u32) -> DynamicImage {
    if let Some(orientation) = u8::try_from(orientation)
        .ok()
        .and_then(Orientation::from_exif)
    {
        img.apply_orientation(orientation);
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use tempfile::TempDir;

    const W: u32 = 3;
    const H: u32 = 2;

    /// Every pixel records its own source coordinates.
    fn coordinate_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(W, H, |x, y| Rgb([x as u8, y as u8, 0])))
    }

    /// Source coordinates shown at `(x, y)` of the upright image.
    fn upright_source(orientation: u32, x: u32, y: u32) -> (u32, u32) {
        match orientation {
            2 => (W - 1 - x, y),
            3 => (W - 1 - x, H - 1 - y),
            4 => (x, H - 1 - y),
            5 => (y, x),
            6 => (y, H - 1 - x),
            7 => (W - 1 - y, H - 1 - x),
            8 => (W - 1 - y, x),
            _ => (x, y),
        }
    }

    #[test]
    fn test_every_orientation_maps_pixels_upright() {
        for orientation in 1..=8 {
            let upright = apply_orientation(coordinate_image(), orientation).to_rgb8();
            let expected_dims = if orientation >= 5 { (H, W) } else { (W, H) };
            assert_eq!(upright.dimensions(), expected_dims, "orientation {}", orientation);

            for (x, y, pixel) in upright.enumerate_pixels() {
                let (sx, sy) = upright_source(orientation, x, y);
                assert_eq!(
                    (pixel[0] as u32, pixel[1] as u32),
                    (sx, sy),
                    "orientation {} at ({}, {})",
                    orientation,
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_unknown_orientation_is_ignored() {
        let upright = apply_orientation(coordinate_image(), 9).to_rgb8();
        assert_eq!(upright, coordinate_image().to_rgb8());
        let upright = apply_orientation(coordinate_image(), 300).to_rgb8();
        assert_eq!(upright, coordinate_image().to_rgb8());
    }

    #[test]
    fn test_quarter_turns_swap_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(40, 20));
        assert_eq!(apply_orientation(img.clone(), 6).dimensions(), (20, 40));
        assert_eq!(apply_orientation(img.clone(), 8).dimensions(), (20, 40));
        assert_eq!(apply_orientation(img.clone(), 3).dimensions(), (40, 20));
        assert_eq!(apply_orientation(img, 1).dimensions(), (40, 20));
    }

    #[test]
    fn test_missing_exif_defaults_to_upright() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.png");
        RgbImage::new(4, 4).save(&path).unwrap();

        assert_eq!(exif_orientation(&path), 1);
        assert_eq!(exif_orientation(&temp_dir.path().join("missing.jpg")), 1);
    }
}
