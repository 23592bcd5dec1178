use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything the gallery pipeline can fail with.
///
/// `Io`, `Decode` and `Encode` are per-file failures: callers log them and move
/// on to the next file. `MissingRoot` and `NoImages` end the run.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    #[error("Failed to encode {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },

    #[error("Photos directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("No photos found under {}", .0.display())]
    NoImages(PathBuf),

    #[error("Invalid settings: {0}")]
    Settings(String),
}

impl GalleryError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        GalleryError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn decode(path: &Path, message: impl ToString) -> Self {
        GalleryError::Decode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn encode(path: &Path, message: impl ToString) -> Self {
        GalleryError::Encode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// True for errors that only concern a single file.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            GalleryError::Io { .. } | GalleryError::Decode { .. } | GalleryError::Encode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
