use crate::cache::is_thumbnail;
use crate::constants::{EXCLUDED_DIRS, HEIF_EXTENSIONS, STANDARD_EXTENSIONS};
use crate::error::{GalleryError, Result};
use crate::hashing::{hash_file, Fingerprint};
use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// How a candidate file has to be treated before it can be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Browsers display it as is
    Standard,
    /// HEIC/HEIF capture that must be converted to JPEG
    Heif,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if STANDARD_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceFormat::Standard)
        } else if HEIF_EXTENSIONS.contains(&ext.as_str()) {
            Some(SourceFormat::Heif)
        } else {
            None
        }
    }

    pub fn needs_conversion(self) -> bool {
        matches!(self, SourceFormat::Heif)
    }
}

/// A candidate photo found during a scan.
///
/// The fingerprint is computed on first request and remembered, so a file that
/// is rejected on its name alone is never read.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    stem_key: String,
    format: SourceFormat,
    fingerprint: OnceLock<Fingerprint>,
}

impl SourceFile {
    /// Returns `None` when the extension is not a supported image format.
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let format = SourceFormat::from_path(&path)?;
        let stem_key = path.file_stem()?.to_string_lossy().to_lowercase();
        Some(Self {
            path,
            stem_key,
            format,
            fingerprint: OnceLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase file name without its extension.
    pub fn stem_key(&self) -> &str {
        &self.stem_key
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn fingerprint(&self) -> Result<Fingerprint> {
        if let Some(fingerprint) = self.fingerprint.get() {
            return Ok(*fingerprint);
        }
        let fingerprint = hash_file(&self.path)?;
        Ok(*self.fingerprint.get_or_init(|| fingerprint))
    }

    pub fn is_hashed(&self) -> bool {
        self.fingerprint.get().is_some()
    }
}

/// One top-level directory under the photo root.
#[derive(Debug, Clone)]
pub struct PlaceFolder {
    pub name: String,
    pub label: String,
    pub path: PathBuf,
    pub files: Vec<SourceFile>,
}

impl PlaceFolder {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let label = place_label(&name);
        Self {
            name,
            label,
            path,
            files: Vec::new(),
        }
    }
}

/// Turns a folder name like `rio_de-janeiro` into `Rio De Janeiro`.
///
/// Underscores and dashes become spaces, whitespace runs collapse, and each
/// run of letters is capitalized.
pub fn place_label(folder_name: &str) -> String {
    let spaced: String = folder_name
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut label = String::with_capacity(collapsed.len());
    let mut in_word = false;
    for c in collapsed.chars() {
        if c.is_alphabetic() {
            if in_word {
                label.extend(c.to_lowercase());
            } else {
                label.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            label.push(c);
            in_word = false;
        }
    }

    if label.is_empty() {
        folder_name.to_string()
    } else {
        label
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_some_and(|ft| ft.is_dir())
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

/// Discovers place folders under `root`, in file-name order.
///
/// Only files directly inside a place folder are candidates; files at the root
/// and deeper subdirectories are ignored. Hidden entries, known non-content
/// directories and thumbnails written by earlier runs are skipped. Place
/// folders without any candidate are still returned.
pub fn scan_places(root: &Path) -> Result<Vec<PlaceFolder>> {
    if !root.is_dir() {
        return Err(GalleryError::MissingRoot(root.to_path_buf()));
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(2))
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| !is_excluded(entry))
        .build();

    let mut places: Vec<PlaceFolder> = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        let is_file = entry.file_type().is_some_and(|ft| ft.is_file());

        match entry.depth() {
            1 if is_dir => places.push(PlaceFolder::new(entry.into_path())),
            2 if is_file => {
                let path = entry.into_path();
                let Some(place) = places.last_mut() else {
                    continue;
                };
                if path.parent() != Some(place.path.as_path()) {
                    continue;
                }
                if is_thumbnail(&path) {
                    debug!("Skipping derived thumbnail {}", path.display());
                    continue;
                }
                match SourceFile::new(path) {
                    Some(file) => place.files.push(file),
                    None => debug!("Skipping non-image file in {}", place.name),
                }
            }
            _ => {}
        }
    }

    Ok(places)
}
