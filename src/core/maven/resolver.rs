// ─── Library Resolver ───
// Turns manifest library entries into concrete artifact descriptors relative
// to the instance's library root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::maven::MavenArtifact;
use crate::core::version::LibraryEntry;

const MOJANG_LIBRARIES_BASE: &str = "https://libraries.minecraft.net/";

/// A resolved `{relative path, source URL}` pair. Computed on demand, never
/// persisted outside the manifest it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// `/`-separated path under the libraries root.
    pub relative_path: String,
    /// Empty when the manifest names the library without a source; such
    /// artifacts are expected to be supplied by an installer step.
    pub url: String,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

/// Resolve one library entry. An explicit artifact path wins; otherwise the
/// path and URL are derived from the Maven coordinate. `None` means the entry
/// cannot produce a path at all.
pub fn resolve_entry(lib: &LibraryEntry) -> Option<ArtifactDescriptor> {
    if let Some(artifact) = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
        if let Some(path) = artifact.path.as_deref().filter(|p| !p.is_empty()) {
            return Some(ArtifactDescriptor {
                relative_path: path.to_string(),
                url: artifact.url.clone().unwrap_or_default(),
                sha1: artifact.sha1.clone(),
                size: artifact.size,
            });
        }
    }

    let coordinate = MavenArtifact::parse(&lib.name).ok()?;
    let base = lib.url.as_deref().unwrap_or(MOJANG_LIBRARIES_BASE);
    Some(ArtifactDescriptor {
        relative_path: coordinate.relative_path(),
        url: coordinate.url(base),
        sha1: None,
        size: None,
    })
}

/// Resolve every entry, dropping unresolvable ones with a warning and
/// deduplicating by relative path (first occurrence wins).
pub fn resolve_all<'a, I>(libraries: I) -> Vec<ArtifactDescriptor>
where
    I: IntoIterator<Item = &'a LibraryEntry>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut resolved = Vec::new();
    for lib in libraries {
        match resolve_entry(lib) {
            Some(descriptor) => {
                if seen.insert(descriptor.relative_path.clone()) {
                    resolved.push(descriptor);
                }
            }
            None => warn!("Library entry {} has no resolvable path, dropped", lib.name),
        }
    }
    resolved
}

/// Absolute classpath entries for descriptors whose file exists locally.
/// Insertion order is preserved; duplicates are removed by path equality.
pub fn classpath_for(descriptors: &[ArtifactDescriptor], library_root: &Path) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut classpath = Vec::new();
    for descriptor in descriptors {
        let path = library_root.join(&descriptor.relative_path);
        if path.is_file() && seen.insert(path.clone()) {
            classpath.push(path);
        }
    }
    classpath
}
