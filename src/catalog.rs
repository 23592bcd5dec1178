use crate::cache::{self, CacheStatus};
use crate::constants::CONVERSION_QUALITY;
use crate::dedup::{resolve, DedupPolicy};
use crate::error::{GalleryError, Result};
use crate::normalize::{normalize, normalized_path, NormalizeStatus};
use crate::scanner::{scan_places, PlaceFolder, SourceFile};
use crate::thumbnail::{ensure_thumbnail, ThumbnailSpec};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The representative of a group of duplicate files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalImage {
    /// Thumbnail when one exists, otherwise the full image
    pub display: PathBuf,
    pub full: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceEntry {
    pub label: String,
    pub images: Vec<CanonicalImage>,
}

/// Ordered place label -> images mapping handed to the page renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaceCatalog {
    places: Vec<PlaceEntry>,
}

impl PlaceCatalog {
    pub fn places(&self) -> &[PlaceEntry] {
        &self.places
    }

    pub fn get(&self, label: &str) -> Option<&[CanonicalImage]> {
        self.places
            .iter()
            .find(|p| p.label == label)
            .map(|p| p.images.as_slice())
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn total_images(&self) -> usize {
        self.places.iter().map(|p| p.images.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Knobs of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub dedup: DedupPolicy,
    pub convert_heif: bool,
    pub conversion_quality: u8,
    pub thumbnail: ThumbnailSpec,
    /// Upper bound on images decoded at the same time
    pub max_workers: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dedup: DedupPolicy::default(),
            convert_heif: true,
            conversion_quality: CONVERSION_QUALITY,
            thumbnail: ThumbnailSpec::default(),
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Counters reported after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub candidates: usize,
    pub duplicates: usize,
    pub unreadable: usize,
    pub skipped_heif: usize,
    pub converted: usize,
    pub conversions_reused: usize,
    pub thumbnails_generated: usize,
    pub thumbnails_reused: usize,
    pub failed: usize,
}

/// A survivor with its derived paths decided up front, so parallel workers
/// never write the same file.
struct PlannedImage<'a> {
    source: &'a SourceFile,
    full: PathBuf,
    thumbnail: Option<PathBuf>,
}

struct ProcessedImage {
    image: CanonicalImage,
    normalize: NormalizeStatus,
    thumbnail: Option<CacheStatus>,
}

/// Folders sharing a label (`new_york` and `new-york`) become one place.
fn group_by_label(folders: Vec<PlaceFolder>) -> Vec<(String, Vec<SourceFile>)> {
    let mut groups: Vec<(String, Vec<SourceFile>)> = Vec::new();
    for folder in folders {
        match groups.iter_mut().find(|(label, _)| *label == folder.label) {
            Some((_, files)) => files.extend(folder.files),
            None => groups.push((folder.label, folder.files)),
        }
    }
    groups
}

fn plan<'a>(
    survivors: &'a [SourceFile],
    claimed_thumbnails: &mut HashSet<PathBuf>,
) -> Vec<PlannedImage<'a>> {
    let mut seen_full: HashSet<PathBuf> = HashSet::new();
    let mut planned = Vec::with_capacity(survivors.len());

    for source in survivors {
        let full = normalized_path(source);
        if !seen_full.insert(full.clone()) {
            debug!(
                "{} resolves to {} which is already listed",
                source.path().display(),
                full.display()
            );
            continue;
        }

        let thumbnail = cache::thumbnail_path(&full);
        let thumbnail = if claimed_thumbnails.insert(thumbnail.clone()) {
            Some(thumbnail)
        } else {
            warn!(
                "Thumbnail name {} is taken, showing {} at full size",
                thumbnail.display(),
                full.display()
            );
            None
        };

        planned.push(PlannedImage {
            source,
            full,
            thumbnail,
        });
    }

    planned
}

fn process(planned: &PlannedImage<'_>, options: &PipelineOptions) -> Result<ProcessedImage> {
    let normalized = normalize(planned.source, options.conversion_quality)?;
    debug_assert_eq!(normalized.path, planned.full);

    if !normalized.path.is_file() {
        return Err(GalleryError::io(
            &normalized.path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "full image is missing"),
        ));
    }

    let thumbnail = match &planned.thumbnail {
        Some(_) => match ensure_thumbnail(&normalized.path, &options.thumbnail) {
            Ok(found) => Some(found),
            Err(e) => {
                warn!("No thumbnail for {}: {}", normalized.path.display(), e);
                None
            }
        },
        None => None,
    };

    let (display, thumbnail_status) = match thumbnail {
        Some((path, status)) => (path, Some(status)),
        None => (normalized.path.clone(), None),
    };

    Ok(ProcessedImage {
        image: CanonicalImage {
            display,
            full: normalized.path,
        },
        normalize: normalized.status,
        thumbnail: thumbnail_status,
    })
}

/// Folds place folders into the catalog.
///
/// Per place: resolve duplicates, then normalize and thumbnail the survivors
/// on a bounded worker pool, keeping resolver order. Failures stay with their
/// file. Places left without images are omitted.
pub fn build_catalog(
    folders: Vec<PlaceFolder>,
    options: &PipelineOptions,
) -> Result<(PlaceCatalog, RunStats)> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.max_workers.max(1))
        .build()
        .map_err(|e| GalleryError::Settings(format!("cannot start worker pool: {}", e)))?;

    let mut catalog = PlaceCatalog::default();
    let mut stats = RunStats::default();
    let mut claimed_thumbnails: HashSet<PathBuf> = HashSet::new();

    for (label, files) in group_by_label(folders) {
        stats.candidates += files.len();

        let files: Vec<SourceFile> = if options.convert_heif {
            files
        } else {
            let (heif, standard): (Vec<_>, Vec<_>) = files
                .into_iter()
                .partition(|f| f.format().needs_conversion());
            for skipped in &heif {
                debug!("Conversion disabled, skipping {}", skipped.path().display());
            }
            stats.skipped_heif += heif.len();
            standard
        };

        let resolution = resolve(files, options.dedup);
        stats.duplicates += resolution.duplicates;
        stats.unreadable += resolution.unreadable;

        let planned = plan(&resolution.survivors, &mut claimed_thumbnails);
        let results: Vec<Result<ProcessedImage>> =
            pool.install(|| planned.par_iter().map(|p| process(p, options)).collect());

        let mut images = Vec::with_capacity(results.len());
        for (item, result) in planned.iter().zip(results) {
            match result {
                Ok(processed) => {
                    match processed.normalize {
                        NormalizeStatus::Converted => stats.converted += 1,
                        NormalizeStatus::Reused => stats.conversions_reused += 1,
                        NormalizeStatus::PassThrough => {}
                    }
                    match processed.thumbnail {
                        Some(CacheStatus::Generated) => stats.thumbnails_generated += 1,
                        Some(CacheStatus::Hit) => stats.thumbnails_reused += 1,
                        None => {}
                    }
                    images.push(processed.image);
                }
                Err(e) => {
                    warn!("Dropping {}: {}", item.source.path().display(), e);
                    stats.failed += 1;
                }
            }
        }

        if images.is_empty() {
            debug!("No images left for {}, omitting it", label);
            continue;
        }
        info!("{}: {} photo(s)", label, images.len());
        catalog.places.push(PlaceEntry { label, images });
    }

    Ok((catalog, stats))
}

/// Scans `root` and builds its catalog. Fails when the root is missing or no
/// place ends up with a single image.
pub fn generate_catalog(
    root: &Path,
    options: &PipelineOptions,
) -> Result<(PlaceCatalog, RunStats)> {
    let folders = scan_places(root)?;
    info!("Found {} place folder(s) in {}", folders.len(), root.display());

    let (catalog, stats) = build_catalog(folders, options)?;
    if catalog.is_empty() {
        return Err(GalleryError::NoImages(root.to_path_buf()));
    }
    Ok((catalog, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn image_with_seed(seed: u8) -> RgbImage {
        ImageBuffer::from_fn(320, 240, move |x, y| {
            Rgb([seed, (x % 256) as u8, (y % 256) as u8])
        })
    }

    fn write_image(path: &Path, seed: u8) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image_with_seed(seed).save(path).unwrap();
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            thumbnail: ThumbnailSpec {
                max_dimension: 64,
                quality: 70,
            },
            max_workers: 2,
            ..PipelineOptions::default()
        }
    }

    fn file_names(images: &[CanonicalImage]) -> Vec<String> {
        images
            .iter()
            .map(|i| i.full.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn snapshot(dir: &Path) -> Vec<(PathBuf, SystemTime)> {
        let mut entries: Vec<(PathBuf, SystemTime)> = ignore::WalkBuilder::new(dir)
            .standard_filters(false)
            .build()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .map(|e| {
                let modified = fs::metadata(e.path()).unwrap().modified().unwrap();
                (e.into_path(), modified)
            })
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_existing_jpeg_wins_over_heic_sibling() {
        let temp_dir = TempDir::new().unwrap();
        let place = temp_dir.path().join("lisbon");
        // Not decodable: the catalog only succeeds if a.heic is never converted.
        fs::create_dir_all(&place).unwrap();
        fs::write(place.join("a.heic"), b"capture").unwrap();
        write_image(&place.join("a.jpg"), 1);
        write_image(&place.join("b.jpg"), 2);

        let (catalog, stats) = generate_catalog(temp_dir.path(), &options()).unwrap();
        let images = catalog.get("Lisbon").unwrap();
        assert_eq!(file_names(images), vec!["a.jpg", "b.jpg"]);
        assert_eq!(images[0].display, place.join("a_thumb.jpg"));
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.converted, 0);
    }

    #[test]
    fn test_converted_output_dedups_when_names_are_not_compared() {
        let temp_dir = TempDir::new().unwrap();
        let place = temp_dir.path().join("lisbon");
        fs::create_dir_all(&place).unwrap();
        fs::write(place.join("a.heic"), b"capture").unwrap();
        write_image(&place.join("a.jpg"), 1);

        let opts = PipelineOptions {
            dedup: DedupPolicy {
                filename_identity: false,
            },
            ..options()
        };
        let (catalog, stats) = generate_catalog(temp_dir.path(), &opts).unwrap();
        let images = catalog.get("Lisbon").unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].full, place.join("a.jpg"));
        assert_eq!(stats.conversions_reused, 1);
    }

    #[test]
    fn test_byte_identical_files_collapse_to_one() {
        let temp_dir = TempDir::new().unwrap();
        let place = temp_dir.path().join("kyoto");
        write_image(&place.join("temple.jpg"), 7);
        fs::copy(place.join("temple.jpg"), place.join("copy_1.jpg")).unwrap();
        fs::copy(place.join("temple.jpg"), place.join("IMG_2231.jpg")).unwrap();

        let (catalog, stats) = generate_catalog(temp_dir.path(), &options()).unwrap();
        assert_eq!(file_names(catalog.get("Kyoto").unwrap()), vec!["IMG_2231.jpg"]);
        assert_eq!(stats.duplicates, 2);
    }

    #[test]
    fn test_empty_place_is_omitted() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("empty_place")).unwrap();
        fs::create_dir_all(temp_dir.path().join("notes_only")).unwrap();
        fs::write(temp_dir.path().join("notes_only/readme.txt"), b"hi").unwrap();
        write_image(&temp_dir.path().join("paris/louvre.jpg"), 3);

        let (catalog, _) = generate_catalog(temp_dir.path(), &options()).unwrap();
        let labels: Vec<&str> = catalog.places().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Paris"]);
    }

    #[test]
    fn test_folders_sharing_a_label_are_merged_and_deduped() {
        let temp_dir = TempDir::new().unwrap();
        write_image(&temp_dir.path().join("new_york/bridge.jpg"), 4);
        write_image(&temp_dir.path().join("new-york/park.jpg"), 5);
        fs::copy(
            temp_dir.path().join("new_york/bridge.jpg"),
            temp_dir.path().join("new-york/bridge_again.jpg"),
        )
        .unwrap();

        let (catalog, _) = generate_catalog(temp_dir.path(), &options()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.total_images(), 2);
        assert_eq!(catalog.places()[0].label, "New York");
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        write_image(&temp_dir.path().join("rome/forum.jpg"), 1);
        write_image(&temp_dir.path().join("rome/colosseum.png"), 2);
        write_image(&temp_dir.path().join("oslo/fjord.jpg"), 3);

        let (first, first_stats) = generate_catalog(temp_dir.path(), &options()).unwrap();
        let files_after_first = snapshot(temp_dir.path());
        let (second, second_stats) = generate_catalog(temp_dir.path(), &options()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(snapshot(temp_dir.path()), files_after_first);
        assert_eq!(first_stats.thumbnails_generated, 3);
        assert_eq!(second_stats.thumbnails_generated, 0);
        assert_eq!(second_stats.thumbnails_reused, 3);
    }

    #[test]
    fn test_undecodable_image_shows_full_size() {
        let temp_dir = TempDir::new().unwrap();
        let place = temp_dir.path().join("cairo");
        fs::create_dir_all(&place).unwrap();
        fs::write(place.join("broken.jpg"), b"not a jpeg").unwrap();
        write_image(&place.join("pyramids.jpg"), 9);

        let (catalog, stats) = generate_catalog(temp_dir.path(), &options()).unwrap();
        let images = catalog.get("Cairo").unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].display, images[0].full);
        assert_eq!(images[1].display, place.join("pyramids_thumb.jpg"));
        assert_eq!(stats.thumbnails_generated, 1);
    }

    #[test]
    fn test_undecodable_heic_is_dropped_but_siblings_survive() {
        let temp_dir = TempDir::new().unwrap();
        let place = temp_dir.path().join("oslo");
        fs::create_dir_all(&place).unwrap();
        fs::write(place.join("night.heic"), b"garbage").unwrap();
        write_image(&place.join("day.jpg"), 1);

        let (catalog, stats) = generate_catalog(temp_dir.path(), &options()).unwrap();
        assert_eq!(file_names(catalog.get("Oslo").unwrap()), vec!["day.jpg"]);
        assert_eq!(stats.failed, 1);
        assert!(!place.join("night.jpg").exists());
    }

    #[test]
    fn test_heif_ignored_when_conversion_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let place = temp_dir.path().join("oslo");
        fs::create_dir_all(&place).unwrap();
        fs::write(place.join("night.heic"), b"garbage").unwrap();
        write_image(&place.join("day.jpg"), 1);

        let opts = PipelineOptions {
            convert_heif: false,
            ..options()
        };
        let (catalog, stats) = generate_catalog(temp_dir.path(), &opts).unwrap();
        assert_eq!(catalog.total_images(), 1);
        assert_eq!(stats.skipped_heif, 1);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_shared_thumbnail_name_falls_back_to_full_image() {
        let temp_dir = TempDir::new().unwrap();
        let place = temp_dir.path().join("vienna");
        write_image(&place.join("opera.jpg"), 1);
        write_image(&place.join("opera.png"), 2);

        let opts = PipelineOptions {
            dedup: DedupPolicy {
                filename_identity: false,
            },
            ..options()
        };
        let (catalog, _) = generate_catalog(temp_dir.path(), &opts).unwrap();
        let images = catalog.get("Vienna").unwrap();
        assert_eq!(file_names(images), vec!["opera.jpg", "opera.png"]);
        assert_eq!(images[0].display, place.join("opera_thumb.jpg"));
        assert_eq!(images[1].display, images[1].full);
    }

    #[test]
    fn test_structural_errors_are_fatal() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            generate_catalog(&temp_dir.path().join("missing"), &options()),
            Err(GalleryError::MissingRoot(_))
        ));

        fs::create_dir_all(temp_dir.path().join("empty_place")).unwrap();
        assert!(matches!(
            generate_catalog(temp_dir.path(), &options()),
            Err(GalleryError::NoImages(_))
        ));
    }
}
