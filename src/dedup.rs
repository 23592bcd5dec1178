use crate::error::GalleryError;
use crate::hashing::Fingerprint;
use crate::scanner::SourceFile;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Which duplicate signals are allowed to reject a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPolicy {
    /// Reject a file whose lowercase stem was already accepted, even when its
    /// bytes differ. Content duplicates are always rejected.
    pub filename_identity: bool,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            filename_identity: true,
        }
    }
}

/// Stems and fingerprints accepted so far within one place.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    stems: HashSet<String>,
    fingerprints: HashSet<Fingerprint>,
}

#[derive(Debug)]
pub enum Verdict {
    Accepted(Fingerprint),
    DuplicateStem,
    DuplicateContent(Fingerprint),
    Unreadable(GalleryError),
}

impl SeenSet {
    /// Decides whether `file` survives and returns the updated accumulator.
    ///
    /// The stem check runs before hashing, so a name match never reads the file.
    pub fn admit(mut self, file: &SourceFile, policy: DedupPolicy) -> (Self, Verdict) {
        if policy.filename_identity && self.stems.contains(file.stem_key()) {
            return (self, Verdict::DuplicateStem);
        }

        let fingerprint = match file.fingerprint() {
            Ok(fingerprint) => fingerprint,
            Err(e) => return (self, Verdict::Unreadable(e)),
        };
        if !self.fingerprints.insert(fingerprint) {
            return (self, Verdict::DuplicateContent(fingerprint));
        }

        self.stems.insert(file.stem_key().to_string());
        (self, Verdict::Accepted(fingerprint))
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

/// Survivors of one place, in path order.
#[derive(Debug, Default)]
pub struct Resolution {
    pub survivors: Vec<SourceFile>,
    pub duplicates: usize,
    pub unreadable: usize,
}

/// Files needing no conversion go first so an existing JPEG claims its stem
/// before the HEIC it was converted from. Ties break on path.
fn resolution_order(a: &SourceFile, b: &SourceFile) -> Ordering {
    a.format()
        .needs_conversion()
        .cmp(&b.format().needs_conversion())
        .then_with(|| a.path().cmp(b.path()))
}

/// Drops duplicate files from one place.
///
/// The first file in resolution order wins each duplicate group; there is no
/// quality comparison. Files that cannot be hashed are logged and left out.
pub fn resolve(mut files: Vec<SourceFile>, policy: DedupPolicy) -> Resolution {
    files.sort_by(resolution_order);

    let (_, mut resolution) = files.into_iter().fold(
        (SeenSet::default(), Resolution::default()),
        |(seen, mut resolution), file| {
            let (seen, verdict) = seen.admit(&file, policy);
            match verdict {
                Verdict::Accepted(_) => resolution.survivors.push(file),
                Verdict::DuplicateStem => {
                    debug!("Duplicate name, skipping {}", file.path().display());
                    resolution.duplicates += 1;
                }
                Verdict::DuplicateContent(fingerprint) => {
                    debug!(
                        "Duplicate content {}, skipping {}",
                        fingerprint,
                        file.path().display()
                    );
                    resolution.duplicates += 1;
                }
                Verdict::Unreadable(e) => {
                    warn!("Skipping unreadable file: {}", e);
                    resolution.unreadable += 1;
                }
            }
            (seen, resolution)
        },
    );

    resolution.survivors.sort_by(|a, b| a.path().cmp(b.path()));
    resolution
}
