use crate::catalog::PipelineOptions;
use crate::constants::*;
use crate::dedup::DedupPolicy;
use crate::error::{GalleryError, Result};
use crate::thumbnail::ThumbnailSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub photos_dir: PathBuf,
    /// Page to write; defaults to `index.html` inside `photos_dir`
    pub output: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub filename_dedup: bool,
    #[serde(default = "default_true")]
    pub convert_heic: bool,
    pub thumbnail_size: u32,
    pub thumbnail_quality: u8,
    pub conversion_quality: u8,
    /// 0 means one worker per CPU
    #[serde(default)]
    pub max_workers: usize,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            photos_dir: PathBuf::from(DEFAULT_PHOTOS_DIR),
            output: None,
            filename_dedup: true,
            convert_heic: true,
            thumbnail_size: THUMBNAIL_SIZE,
            thumbnail_quality: THUMBNAIL_QUALITY,
            conversion_quality: CONVERSION_QUALITY,
            max_workers: 0,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| GalleryError::Settings(format!("{} has invalid value '{}'", key, value)))
}

impl Settings {
    /// Parses `key = value` lines. `#` starts a comment line, values may be
    /// double-quoted and unknown keys are ignored.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config_map = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim(), value.trim().trim_matches('"'));
            }
        }

        let mut settings = Settings::default();
        if let Some(dir) = config_map.get("photos_dir") {
            settings.photos_dir = PathBuf::from(dir);
        }
        if let Some(output) = config_map.get("output") {
            if !output.is_empty() {
                settings.output = Some(PathBuf::from(output));
            }
        }
        if let Some(value) = config_map.get("filename_dedup") {
            settings.filename_dedup = parse_value("filename_dedup", value)?;
        }
        if let Some(value) = config_map.get("convert_heic") {
            settings.convert_heic = parse_value("convert_heic", value)?;
        }
        if let Some(value) = config_map.get("thumbnail_size") {
            settings.thumbnail_size = parse_value("thumbnail_size", value)?;
        }
        if let Some(value) = config_map.get("thumbnail_quality") {
            settings.thumbnail_quality = parse_value("thumbnail_quality", value)?;
        }
        if let Some(value) = config_map.get("conversion_quality") {
            settings.conversion_quality = parse_value("conversion_quality", value)?;
        }
        if let Some(value) = config_map.get("max_workers") {
            settings.max_workers = parse_value("max_workers", value)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path).map_err(|e| GalleryError::io(path, e))?;
        Self::parse(&content)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| GalleryError::io(parent, e))?;
        }

        let mut content = String::new();
        content.push_str("# Travel Gallery Configuration File\n");
        content.push_str(&format!("photos_dir = \"{}\"\n", self.photos_dir.display()));
        if let Some(ref output) = self.output {
            content.push_str(&format!("output = \"{}\"\n", output.display()));
        }
        content.push_str(&format!("filename_dedup = {}\n", self.filename_dedup));
        content.push_str(&format!("convert_heic = {}\n", self.convert_heic));
        content.push_str(&format!("thumbnail_size = {}\n", self.thumbnail_size));
        content.push_str(&format!("thumbnail_quality = {}\n", self.thumbnail_quality));
        content.push_str(&format!("conversion_quality = {}\n", self.conversion_quality));
        content.push_str(&format!("max_workers = {}\n", self.max_workers));

        fs::write(path, content).map_err(|e| GalleryError::io(path, e))
    }

    pub fn validate(&self) -> Result<()> {
        if self.thumbnail_size == 0 {
            return Err(GalleryError::Settings(
                "thumbnail_size must be greater than 0".to_string(),
            ));
        }
        for (key, quality) in [
            ("thumbnail_quality", self.thumbnail_quality),
            ("conversion_quality", self.conversion_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(GalleryError::Settings(format!(
                    "{} must be between 1 and 100, got {}",
                    key, quality
                )));
            }
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.photos_dir.join(DEFAULT_OUTPUT_NAME))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        let defaults = PipelineOptions::default();
        PipelineOptions {
            dedup: DedupPolicy {
                filename_identity: self.filename_dedup,
            },
            convert_heif: self.convert_heic,
            conversion_quality: self.conversion_quality,
            thumbnail: ThumbnailSpec {
                max_dimension: self.thumbnail_size,
                quality: self.thumbnail_quality,
            },
            max_workers: if self.max_workers == 0 {
                defaults.max_workers
            } else {
                self.max_workers
            },
        }
    }

    /// `travel_gallery.ini` in the working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }
}
