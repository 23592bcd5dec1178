// Derived file naming
pub const THUMBNAIL_SUFFIX: &str = "_thumb";
pub const DERIVED_EXTENSION: &str = "jpg";

// Image sizes and JPEG quality
pub const THUMBNAIL_SIZE: u32 = 400;
pub const THUMBNAIL_QUALITY: u8 = 75;
pub const CONVERSION_QUALITY: u8 = 90;

// Content hashing reads files in chunks of this size
pub const HASH_CHUNK_SIZE: usize = 8192;

// Candidate extensions, compared lowercase
pub const STANDARD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
pub const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];

// Directories that never hold places or photos
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", "target", "__pycache__", ".git", ".github"];

pub const CONFIG_FILE_NAME: &str = "travel_gallery.ini";
pub const DEFAULT_PHOTOS_DIR: &str = "photos";
pub const DEFAULT_OUTPUT_NAME: &str = "index.html";
