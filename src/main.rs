use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use travel_gallery::{generate_catalog, render_page, GalleryError, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "travel_gallery",
    version,
    about = "Build a single-page travel photo gallery from one folder per place"
)]
struct Cli {
    /// Directory holding one subdirectory per place
    #[arg(short, long, value_name = "DIR")]
    photos_dir: Option<PathBuf>,

    /// Page to write (default: `<photos-dir>/index.html`)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Settings file (default: ./travel_gallery.ini)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only treat byte-identical files as duplicates
    #[arg(long)]
    no_filename_dedup: bool,

    /// Skip HEIC/HEIF files instead of converting them
    #[arg(long)]
    no_convert: bool,

    /// Longest thumbnail side in pixels
    #[arg(long, value_name = "PX")]
    thumbnail_size: Option<u32>,

    /// JPEG quality for thumbnails (1-100)
    #[arg(long, value_name = "Q")]
    thumbnail_quality: Option<u8>,

    /// JPEG quality for HEIC conversions (1-100)
    #[arg(long, value_name = "Q")]
    conversion_quality: Option<u8>,

    /// Images decoded in parallel (0 = one per CPU)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Also write the catalog as JSON
    #[arg(long, value_name = "FILE")]
    catalog_json: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(ref dir) = self.photos_dir {
            settings.photos_dir = dir.clone();
        }
        if let Some(ref output) = self.output {
            settings.output = Some(output.clone());
        }
        if self.no_filename_dedup {
            settings.filename_dedup = false;
        }
        if self.no_convert {
            settings.convert_heic = false;
        }
        if let Some(size) = self.thumbnail_size {
            settings.thumbnail_size = size;
        }
        if let Some(quality) = self.thumbnail_quality {
            settings.thumbnail_quality = quality;
        }
        if let Some(quality) = self.conversion_quality {
            settings.conversion_quality = quality;
        }
        if let Some(jobs) = self.jobs {
            settings.max_workers = jobs;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let mut settings = Settings::load(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;
    cli.apply(&mut settings);
    settings.validate()?;

    if cli.save_config {
        settings
            .save(&config_path)
            .with_context(|| format!("Failed to save settings to {}", config_path.display()))?;
        println!("💾 Settings saved to {}", config_path.display());
    }

    println!("🔍 Scanning photos directory: {}", settings.photos_dir.display());
    let start_time = Instant::now();

    // Absolute paths in the catalog let the page link them from any directory.
    let photos_dir =
        fs::canonicalize(&settings.photos_dir).unwrap_or_else(|_| settings.photos_dir.clone());
    let options = settings.pipeline_options();
    let (catalog, stats) = match generate_catalog(&photos_dir, &options) {
        Ok(result) => result,
        Err(e @ GalleryError::MissingRoot(_)) => {
            eprintln!("❌ {}", e);
            eprintln!("   Create it with one folder per place, for example:");
            eprintln!("   photos/");
            eprintln!("     paris/eiffel_tower.jpg");
            eprintln!("     london/big_ben.heic");
            return Err(e.into());
        }
        Err(e @ GalleryError::NoImages(_)) => {
            eprintln!("❌ {}", e);
            eprintln!("   Add some photos to the place folders and run again.");
            return Err(e.into());
        }
        Err(e) => return Err(e).context("Failed to build the gallery catalog"),
    };

    let output_path = settings.output_path();
    let output_dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let page_dir = fs::canonicalize(&output_dir)
        .with_context(|| format!("Failed to resolve {}", output_dir.display()))?;

    let html = render_page(&catalog, &page_dir, Local::now().date_naive());
    fs::write(&output_path, html)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if let Some(ref json_path) = cli.catalog_json {
        let json = catalog.to_json().context("Failed to serialize catalog")?;
        fs::write(json_path, json)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        println!("🗂️  Catalog written to {}", json_path.display());
    }

    let elapsed = start_time.elapsed().as_secs_f64();
    println!("✅ Gallery generated: {}", output_path.display());
    println!(
        "📸 {} photos in {} places:",
        catalog.total_images(),
        catalog.len()
    );
    for place in catalog.places() {
        println!("   • {}: {} photos", place.label, place.images.len());
    }

    println!("\n📊 Processing statistics:");
    println!("   🔍 Candidate files: {}", stats.candidates);
    println!("   ♻️  Duplicates skipped: {}", stats.duplicates);
    println!("   📱 HEIC converted: {} (reused {})", stats.converted, stats.conversions_reused);
    println!(
        "   🖼️  Thumbnails generated: {} (reused {})",
        stats.thumbnails_generated, stats.thumbnails_reused
    );
    if stats.skipped_heif > 0 {
        println!("   ⏭️  HEIC skipped (conversion off): {}", stats.skipped_heif);
    }
    if stats.unreadable + stats.failed > 0 {
        println!("   ❌ Failed: {} unreadable, {} not processed", stats.unreadable, stats.failed);
    }
    println!("   ⏱️  Time: {:.2} s", elapsed);

    Ok(())
}
