use crate::catalog::PlaceCatalog;
use chrono::NaiveDate;
use std::fmt::Write;
use std::path::{Component, Path, PathBuf};

/// Renders the gallery page for `catalog`.
///
/// Image references are written relative to `output_dir`, the directory the
/// page will be saved in.
pub fn render_page(catalog: &PlaceCatalog, output_dir: &Path, updated_on: NaiveDate) -> String {
    let mut sections = String::new();

    for place in catalog.places() {
        let label = escape_html(&place.label);
        let _ = writeln!(sections, "  <section class=\"place-section\" data-place=\"{}\">", label);
        let _ = writeln!(sections, "    <h2 class=\"place-title\">{}</h2>", label);
        sections.push_str("    <div class=\"gallery-grid\">\n");

        for image in &place.images {
            let display = escape_html(&asset_url(&image.display, output_dir));
            let full = escape_html(&asset_url(&image.full, output_dir));
            let _ = write!(
                sections,
                r#"      <figure class="gallery-item" data-place="{label}" data-title="{label}">
        <a href="{full}" data-full="{full}">
          <img class="gallery-img" src="{display}" alt="{label}" loading="lazy">
        </a>
        <figcaption class="image-overlay">
          <div class="image-title">{label}</div>
          <div class="image-location">{label}</div>
        </figcaption>
      </figure>
"#
            );
        }

        sections.push_str("    </div>\n  </section>\n");
    }

    PAGE_HTML
        .replace("{{UPDATED_ON}}", &updated_on.format("%B %d, %Y").to_string())
        .replace("{{PHOTO_COUNT}}", &catalog.total_images().to_string())
        .replace("{{PLACE_COUNT}}", &catalog.len().to_string())
        .replace("<!-- GALLERY_PLACEHOLDER -->\n", &sections)
}

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Path of `path` as seen from the directory `base`, using `..` where needed.
/// Absolute paths that share nothing with `base` are returned unchanged.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let base_parts: Vec<Component> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if path.is_absolute() != base.is_absolute() {
        return path.to_path_buf();
    }
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 && path.is_absolute() {
        return path.to_path_buf();
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

/// Relative, `/`-separated and percent-encoded reference to `path`.
fn asset_url(path: &Path, base: &Path) -> String {
    let relative = relative_to(path, base);
    let mut url = String::new();
    for component in relative.components() {
        match component {
            Component::RootDir => url.push('/'),
            Component::Normal(part) => {
                if !url.is_empty() && !url.ends_with('/') {
                    url.push('/');
                }
                percent_encode(&part.to_string_lossy(), &mut url);
            }
            Component::ParentDir => {
                if !url.is_empty() && !url.ends_with('/') {
                    url.push('/');
                }
                url.push_str("..");
            }
            Component::CurDir | Component::Prefix(_) => {}
        }
    }
    url
}

fn percent_encode(segment: &str, out: &mut String) {
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
}

// Page skeleton; styling and the lightbox script live in style.css and script.js
const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>My Travel Gallery</title>
  <link rel="stylesheet" href="style.css">
</head>
<body>
<header>
  <div class="header-left">
    <div class="gallery-title">Travel Gallery</div>
    <div class="gallery-updated">Updated on {{UPDATED_ON}}</div>
    <div class="gallery-stats">{{PHOTO_COUNT}} photos from {{PLACE_COUNT}} places</div>
  </div>
</header>

<main>
<!-- GALLERY_PLACEHOLDER -->
</main>

<script src="script.js"></script>
</body>
</html>
"#;
