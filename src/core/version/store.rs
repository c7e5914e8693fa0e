// ─── Manifest Store ───
// Disk-backed version manifests: load, inheritance-chain resolution, argument
// merging and tolerant atomic rewrites.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::manifest::VersionList;
use crate::core::version::version_file::{
    flatten_argument_values, AssetIndexInfo, DownloadArtifact, LibraryEntry, VersionDoc,
};

/// A freshly downloaded client jar should be well above this; anything
/// smaller is treated as a truncated write and refetched.
const CLIENT_JAR_MIN_BYTES: u64 = 1024 * 1024;

pub struct ManifestStore {
    instance_dir: PathBuf,
}

impl ManifestStore {
    pub fn new(instance_dir: impl Into<PathBuf>) -> Self {
        Self {
            instance_dir: instance_dir.into(),
        }
    }

    // ── Layout ──────────────────────────────────────────

    pub fn instance_dir(&self) -> &Path {
        &self.instance_dir
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.instance_dir.join("versions").join(version_id)
    }

    pub fn manifest_path(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id)
            .join(format!("{}.json", version_id))
    }

    pub fn jar_path(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id)
            .join(format!("{}.jar", version_id))
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.instance_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.instance_dir.join("assets")
    }

    pub fn natives_dir(&self, version_id: &str) -> PathBuf {
        self.instance_dir.join("natives").join(version_id)
    }

    // ── Load / write ────────────────────────────────────

    pub fn load(&self, version_id: &str) -> LauncherResult<VersionDoc> {
        let path = self.manifest_path(version_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LauncherError::ManifestMissing {
                    version_id: version_id.to_string(),
                    path,
                });
            }
            Err(e) => return Err(LauncherError::Io { path, source: e }),
        };
        serde_json::from_str(&raw).map_err(|e| LauncherError::ManifestParse {
            path,
            message: e.to_string(),
        })
    }

    /// Persist a manifest, pretty-printed, replacing the old file atomically.
    pub fn write(&self, version_id: &str, doc: &VersionDoc) -> LauncherResult<()> {
        let json = serde_json::to_string_pretty(doc)?;
        self.write_raw(version_id, &json)
    }

    pub fn write_raw(&self, version_id: &str, json: &str) -> LauncherResult<()> {
        let path = self.manifest_path(version_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LauncherError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        write_tolerant(&path, json)
    }

    // ── Inheritance chain ───────────────────────────────

    /// Walk `inheritsFrom` links into a parents-first chain ending at the
    /// target. A missing or unparseable parent manifest is skipped with a
    /// warning; only the target itself is load-fatal.
    pub fn resolve_chain(&self, target: VersionDoc) -> ResolvedManifest {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(target.id.clone());

        let mut chain = vec![target];
        loop {
            let Some(parent_id) = chain.last().and_then(|d| d.inherits_from.clone()) else {
                break;
            };
            if !visited.insert(parent_id.clone()) {
                warn!("Inheritance cycle at {}, stopping chain walk", parent_id);
                break;
            }
            match self.load(&parent_id) {
                Ok(parent) => chain.push(parent),
                Err(e) => {
                    warn!("Parent manifest {} unavailable, skipping: {}", parent_id, e);
                    break;
                }
            }
        }

        chain.reverse();
        ResolvedManifest { chain }
    }

    // ── Base version materialization ────────────────────

    /// Make sure the base version's manifest and client jar exist locally,
    /// fetching both from the published version list when absent.
    pub async fn ensure_base_version(
        &self,
        client: &reqwest::Client,
        downloader: &Downloader,
        version_id: &str,
    ) -> LauncherResult<VersionDoc> {
        let doc = match self.load(version_id) {
            Ok(doc) => doc,
            Err(LauncherError::ManifestMissing { .. }) => {
                info!("Base manifest {} absent, fetching", version_id);
                let list = VersionList::fetch(client).await?;
                let summary = list.find(version_id).ok_or_else(|| {
                    LauncherError::Other(format!("Version {} is not published", version_id))
                })?;
                let raw = client.get(&summary.url).send().await?.text().await?;
                self.write_raw(version_id, &raw)?;
                serde_json::from_str(&raw).map_err(|e| LauncherError::ManifestParse {
                    path: self.manifest_path(version_id),
                    message: e.to_string(),
                })?
            }
            Err(e) => return Err(e),
        };

        if let Some(dl) = doc.downloads.as_ref().and_then(|d| d.client.as_ref()) {
            let jar = self.jar_path(version_id);
            let present = fs::metadata(&jar)
                .map(|m| m.len() >= CLIENT_JAR_MIN_BYTES)
                .unwrap_or(false);
            if !present {
                info!("Fetching client jar for {}", version_id);
                downloader
                    .download_file(&dl.url, &jar, dl.sha1.as_deref())
                    .await?;
            }
        }
        Ok(doc)
    }
}

// ─── Resolved Chain View ───

/// An inheritance chain in parents-first order; the requested version is the
/// last member. Single-valued fields read child-first, list fields union
/// parent-first.
pub struct ResolvedManifest {
    pub chain: Vec<VersionDoc>,
}

/// Flattened argument vectors in parent-first, child-last order.
#[derive(Debug, Default, Clone)]
pub struct MergedArguments {
    pub jvm: Vec<String>,
    pub game: Vec<String>,
}

impl ResolvedManifest {
    pub fn target(&self) -> &VersionDoc {
        self.chain.last().expect("chain is never empty")
    }

    fn child_first(&self) -> impl Iterator<Item = &VersionDoc> {
        self.chain.iter().rev()
    }

    pub fn main_class(&self) -> Option<&str> {
        self.child_first().find_map(|d| d.main_class.as_deref())
    }

    pub fn asset_index(&self) -> Option<&AssetIndexInfo> {
        self.child_first().find_map(|d| d.asset_index.as_ref())
    }

    pub fn assets_id(&self) -> Option<&str> {
        self.asset_index()
            .map(|a| a.id.as_str())
            .or_else(|| self.child_first().find_map(|d| d.assets.as_deref()))
    }

    pub fn client_download(&self) -> Option<&DownloadArtifact> {
        self.child_first()
            .find_map(|d| d.downloads.as_ref().and_then(|dl| dl.client.as_ref()))
    }

    pub fn java_major(&self) -> Option<u32> {
        self.child_first()
            .find_map(|d| d.java_version.as_ref().map(|j| j.major_version))
    }

    /// Id of the version whose client jar the launch runs against: an
    /// explicit `jar` field wins, else the root of the chain.
    pub fn jar_id(&self) -> &str {
        self.child_first()
            .find_map(|d| d.jar.as_deref())
            .unwrap_or_else(|| self.chain.first().expect("chain is never empty").id.as_str())
    }

    /// Libraries from every chain member, parent-first. Loader manifests are
    /// known to occasionally omit entries their parent supplies, so callers
    /// must never consult the target manifest alone.
    pub fn all_libraries(&self) -> Vec<&LibraryEntry> {
        self.chain.iter().flat_map(|d| d.libraries.iter()).collect()
    }

    /// Concatenate each member's argument lists parent-first so loader tokens
    /// follow vanilla tokens. Legacy `minecraftArguments` manifests feed the
    /// game list only.
    pub fn merge_arguments(&self) -> MergedArguments {
        let mut merged = MergedArguments::default();
        for doc in &self.chain {
            if let Some(args) = &doc.arguments {
                merged
                    .jvm
                    .extend(args.jvm.iter().flat_map(flatten_argument_values));
                merged
                    .game
                    .extend(args.game.iter().flat_map(flatten_argument_values));
            } else if let Some(legacy) = &doc.minecraft_arguments {
                merged
                    .game
                    .extend(legacy.split_whitespace().map(ToString::to_string));
            }
        }
        merged
    }
}

// ─── Required Game Arguments ───

pub struct GameArgContext<'a> {
    pub version_id: &'a str,
    pub access_token: &'a str,
    pub game_dir: &'a str,
    pub assets_dir: &'a str,
    pub asset_index: Option<&'a str>,
    pub uuid: &'a str,
    pub user_type: &'a str,
    pub version_type: &'a str,
}

/// Guarantee the essential game flags are present exactly once, appending a
/// missing pair and never duplicating an existing flag.
pub fn ensure_required_game_args(args: &mut Vec<String>, ctx: &GameArgContext<'_>) {
    let mut required: Vec<(&str, &str)> = vec![
        ("--version", ctx.version_id),
        ("--accessToken", ctx.access_token),
        ("--gameDir", ctx.game_dir),
        ("--assetsDir", ctx.assets_dir),
    ];
    if let Some(index) = ctx.asset_index {
        required.push(("--assetIndex", index));
    }
    required.push(("--uuid", ctx.uuid));
    required.push(("--userType", ctx.user_type));
    required.push(("--versionType", ctx.version_type));

    for (flag, value) in required {
        if !args.iter().any(|a| a == flag) {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
    }
}

// ─── Tolerant Atomic Write ───

/// Write through a temp file and rename over the target. A read-only target
/// has its permissions cleared first; if the rename is still denied the old
/// file is removed and the rename retried. No half-written file survives a
/// failure.
fn write_tolerant(path: &Path, contents: &str) -> LauncherResult<()> {
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            let _ = fs::set_permissions(path, perms);
        }
    }

    let tmp = path.with_extension("json.tmp");
    if let Err(e) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(LauncherError::Io {
            path: tmp,
            source: e,
        });
    }

    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            let _ = fs::remove_file(path);
            fs::rename(&tmp, path).map_err(|e| {
                let _ = fs::remove_file(&tmp);
                LauncherError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            })
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(LauncherError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}
