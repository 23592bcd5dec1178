//! Static travel photo gallery.
//!
//! Photos live in one folder per place under a root directory. A run scans
//! those folders, drops duplicate photos, converts HEIC captures to JPEG,
//! derives thumbnails and renders a single HTML page from the resulting
//! [`PlaceCatalog`]. Converted images and thumbnails are written next to
//! their sources and reused by later runs.

pub mod cache;
pub mod catalog;
pub mod constants;
pub mod dedup;
pub mod error;
pub mod hashing;
pub mod html_template;
pub mod image_processing;
pub mod normalize;
pub mod orientation;
pub mod scanner;
pub mod settings;
pub mod thumbnail;

pub use catalog::{
    build_catalog, generate_catalog, CanonicalImage, PipelineOptions, PlaceCatalog, PlaceEntry,
    RunStats,
};
pub use dedup::{resolve, DedupPolicy};
pub use error::{GalleryError, Result};
pub use hashing::{hash_file, Fingerprint};
pub use html_template::render_page;
pub use normalize::normalize;
pub use scanner::{scan_places, PlaceFolder, SourceFile};
pub use settings::Settings;
pub use thumbnail::{ensure_thumbnail, ThumbnailSpec};
