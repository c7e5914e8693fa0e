// ─── Forge Installer ───
// Forge ships as an interactive installer that writes into the machine-wide
// `.minecraft` directory, so installation is installer-run + adoption: run the
// headless CLI against the default directory (falling back to the windowed
// installer with a hard ceiling), then copy the produced profile into the
// instance. Repair paths reuse the same adoption machinery.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::context::InstallContext;
use crate::core::loaders::installer::{LoaderInstallOutcome, LoaderInstaller};
use crate::core::version::{LibraryEntry, VersionDoc};

const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";
const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2/";
const PROMOTIONS_URL: &str =
    "https://maven.minecraftforge.net/net/minecraftforge/forge/promotions_slim.json";
const FORGE_METADATA_URL: &str =
    "https://maven.minecraftforge.net/net/minecraftforge/forge/maven-metadata.xml";

const CLI_INSTALL_TIMEOUT: Duration = Duration::from_secs(180);
const GUI_INSTALL_CEILING: Duration = Duration::from_secs(300);

/// A version jar at or under this size is treated as a truncated write.
const JAR_MIN_BYTES: u64 = 10 * 1024;

/// Module opens the bootstrap module path needs on modern JVMs.
const ADD_OPENS_TARGETS: &[&str] = &[
    "java.base/java.lang.invoke=ALL-UNNAMED",
    "java.base/java.lang.reflect=ALL-UNNAMED",
    "java.base/java.io=ALL-UNNAMED",
    "java.base/java.util.jar=ALL-UNNAMED",
];

/// Libraries the installer-written manifest is known to omit on some builds.
const SUPPORT_LIBRARIES: &[&str] = &[
    "net.sf.jopt-simple:jopt-simple:5.0.4",
    "org.apache.logging.log4j:log4j-core:2.17.1",
    "org.apache.logging.log4j:log4j-api:2.17.1",
    "org.slf4j:slf4j-api:1.7.36",
    "org.apache.logging.log4j:log4j-slf4j-impl:2.17.1",
    "com.mojang:logging:1.1.1",
    "com.lmax:disruptor:3.4.4",
];

// ─── Jar Validation ───

#[derive(Debug, Clone, Copy)]
pub struct JarInfo {
    pub exists: bool,
    pub size: u64,
    pub magic_ok: bool,
}

impl JarInfo {
    pub fn healthy(&self) -> bool {
        self.exists && self.size > JAR_MIN_BYTES && self.magic_ok
    }
}

/// Cheap integrity check: present, plausibly sized, and starting with the
/// ZIP magic bytes.
pub fn validate_jar(path: &Path) -> JarInfo {
    let Ok(meta) = std::fs::metadata(path) else {
        return JarInfo {
            exists: false,
            size: 0,
            magic_ok: false,
        };
    };
    let magic_ok = std::fs::File::open(path)
        .ok()
        .map(|mut f| {
            use std::io::Read;
            let mut buf = [0u8; 2];
            f.read_exact(&mut buf).is_ok() && buf == [0x50, 0x4b]
        })
        .unwrap_or(false);
    JarInfo {
        exists: true,
        size: meta.len(),
        magic_ok,
    }
}

// ─── Installer Version Feeds ───

#[derive(Debug, Deserialize)]
struct PromotionsSlim {
    #[serde(default)]
    promos: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct MavenMetadata {
    versioning: MavenVersioning,
}

#[derive(Debug, Deserialize)]
struct MavenVersioning {
    versions: MavenVersions,
}

#[derive(Debug, Deserialize)]
struct MavenVersions {
    #[serde(default, rename = "version")]
    entries: Vec<String>,
}

#[derive(Debug, Clone)]
struct InstalledProfile {
    id: String,
    dir: PathBuf,
}

pub struct ForgeInstaller;

impl ForgeInstaller {
    // ── Detection / adoption ────────────────────────────

    /// Find a Forge profile for the given game version under `<root>/versions`.
    /// A profile with a healthy jar wins over a newer broken one; among equals
    /// the most recently modified directory is picked.
    fn find_installed(root: &Path, minecraft_version: &str) -> Option<InstalledProfile> {
        let needle = minecraft_version.to_lowercase();
        let entries = std::fs::read_dir(root.join("versions")).ok()?;
        let mut candidates: Vec<(PathBuf, String)> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter_map(|p| {
                let id = p.file_name()?.to_string_lossy().to_string();
                Some((p, id))
            })
            .filter(|(_, id)| {
                let lower = id.to_lowercase();
                lower.contains("forge") && lower.contains(&needle)
            })
            .collect();

        candidates.sort_by_key(|(p, _)| std::fs::metadata(p).and_then(|m| m.modified()).ok());
        let picked = candidates
            .iter()
            .rev()
            .find(|(p, id)| validate_jar(&p.join(format!("{}.jar", id))).healthy())
            .or_else(|| candidates.last())?;
        Some(InstalledProfile {
            id: picked.1.clone(),
            dir: picked.0.clone(),
        })
    }

    /// The machine-wide game directory the official installer writes into.
    fn default_minecraft_dir() -> Option<PathBuf> {
        if cfg!(target_os = "macos") {
            dirs::config_dir().map(|d| d.join("minecraft"))
        } else if cfg!(target_os = "windows") {
            dirs::config_dir().map(|d| d.join(".minecraft"))
        } else {
            dirs::home_dir().map(|d| d.join(".minecraft"))
        }
    }

    /// Copy a Forge profile from the default game directory into the instance.
    fn adopt_from_default(instance_dir: &Path, minecraft_version: &str) -> Option<String> {
        let default_dir = Self::default_minecraft_dir()?;
        Self::adopt_into(instance_dir, minecraft_version, &default_dir)
    }

    /// Copy a Forge profile from `default_dir` into the instance. An existing
    /// destination is left untouched; only a wholesale-missing profile is
    /// copied over.
    fn adopt_into(
        instance_dir: &Path,
        minecraft_version: &str,
        default_dir: &Path,
    ) -> Option<String> {
        let found = Self::find_installed(default_dir, minecraft_version)?;
        let dest = instance_dir.join("versions").join(&found.id);
        if !dest.exists() {
            if let Err(e) = copy_dir_recursive(&found.dir, &dest) {
                warn!("Could not adopt Forge profile {}: {}", found.id, e);
                return None;
            }
            info!("Adopted Forge profile {} from {:?}", found.id, found.dir);
        }
        Some(found.id)
    }

    /// Repair a profile whose jar failed validation against the default game
    /// directory. Returns whether the jar is healthy afterwards.
    pub fn repair_broken_jar(
        instance_dir: &Path,
        version_id: &str,
        minecraft_version: &str,
    ) -> bool {
        let Some(default_dir) = Self::default_minecraft_dir() else {
            let jar = instance_dir
                .join("versions")
                .join(version_id)
                .join(format!("{}.jar", version_id));
            return validate_jar(&jar).healthy();
        };
        Self::repair_broken_jar_via(instance_dir, version_id, minecraft_version, &default_dir)
    }

    /// The repair chain proper: re-run adoption first (heals a profile whose
    /// whole directory is gone, manifest and siblings included), then fall
    /// back to copying just a healthy donor jar over the broken one.
    fn repair_broken_jar_via(
        instance_dir: &Path,
        version_id: &str,
        minecraft_version: &str,
        default_dir: &Path,
    ) -> bool {
        let version_dir = instance_dir.join("versions").join(version_id);
        let jar = version_dir.join(format!("{}.jar", version_id));
        if validate_jar(&jar).healthy() {
            return true;
        }

        if Self::adopt_into(instance_dir, minecraft_version, default_dir).is_some()
            && validate_jar(&jar).healthy()
        {
            info!("Repaired {} by re-adopting the default profile", version_id);
            return true;
        }

        let Some(donor) = Self::find_installed(default_dir, minecraft_version) else {
            return false;
        };
        let donor_jar = donor.dir.join(format!("{}.jar", donor.id));
        if !validate_jar(&donor_jar).healthy() {
            return false;
        }

        let _ = std::fs::create_dir_all(&version_dir);
        if std::fs::copy(&donor_jar, &jar).is_err() {
            return false;
        }
        let json = version_dir.join(format!("{}.json", version_id));
        if !json.exists() {
            let _ = std::fs::copy(donor.dir.join(format!("{}.json", donor.id)), &json);
        }
        info!("Repaired jar for {} from donor profile {}", version_id, donor.id);
        validate_jar(&jar).healthy()
    }

    // ── Installer resolution / execution ────────────────

    /// Full `<mc>-<build>` coordinate of the installer to run: the promoted
    /// recommended (else latest) build, falling back to the newest entry in
    /// the repository metadata.
    async fn resolve_installer_version(
        client: &reqwest::Client,
        minecraft_version: &str,
    ) -> LauncherResult<String> {
        if let Some(full) = Self::promoted_version(client, minecraft_version).await {
            return Ok(full);
        }
        let xml = client.get(FORGE_METADATA_URL).send().await?.text().await?;
        let meta: MavenMetadata = quick_xml::de::from_str(&xml)?;
        let prefix = format!("{}-", minecraft_version);
        meta.versioning
            .versions
            .entries
            .into_iter()
            .filter(|v| v.starts_with(&prefix))
            .max()
            .ok_or_else(|| {
                LauncherError::LoaderApi(format!(
                    "No Forge build published for {}",
                    minecraft_version
                ))
            })
    }

    async fn promoted_version(client: &reqwest::Client, minecraft_version: &str) -> Option<String> {
        let promos: PromotionsSlim = client
            .get(PROMOTIONS_URL)
            .send()
            .await
            .ok()?
            .json()
            .await
            .ok()?;
        let build = promos
            .promos
            .get(&format!("{}-recommended", minecraft_version))
            .or_else(|| promos.promos.get(&format!("{}-latest", minecraft_version)))?;
        Some(format!("{}-{}", minecraft_version, build))
    }

    /// Headless install. Returns whether the installer exited cleanly within
    /// the time budget.
    async fn run_installer_cli(
        &self,
        ctx: &InstallContext<'_>,
        installer_jar: &Path,
        work_dir: &Path,
    ) -> LauncherResult<bool> {
        info!("Running Forge installer (CLI) in {:?}", work_dir);
        let mut child = tokio::process::Command::new(ctx.java_bin)
            .arg("-jar")
            .arg(installer_jar)
            .arg("--installClient")
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
        if let Some(out) = child.stdout.take() {
            ctx.events.forward_lines(out);
        }
        if let Some(err) = child.stderr.take() {
            ctx.events.forward_lines(err);
        }

        match tokio::time::timeout(CLI_INSTALL_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => Ok(status.success()),
            Ok(Err(e)) => Err(LauncherError::JavaExecution(e.to_string())),
            Err(_) => {
                warn!("Forge CLI install exceeded its time budget, killing it");
                let _ = child.start_kill();
                Ok(false)
            }
        }
    }

    /// Windowed installer as a last resort. The user drives it; a hard
    /// ceiling keeps an abandoned window from wedging the launch forever.
    async fn run_installer_gui(
        &self,
        ctx: &InstallContext<'_>,
        installer_jar: &Path,
        work_dir: &Path,
    ) -> LauncherResult<()> {
        ctx.events
            .log("Opening the Forge installer window; pick Install Client");
        let mut child = tokio::process::Command::new(ctx.java_bin)
            .arg("-jar")
            .arg(installer_jar)
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
        if let Some(out) = child.stdout.take() {
            ctx.events.forward_lines(out);
        }
        if let Some(err) = child.stderr.take() {
            ctx.events.forward_lines(err);
        }

        match tokio::time::timeout(GUI_INSTALL_CEILING, child.wait()).await {
            Ok(Ok(_)) | Ok(Err(_)) => {}
            Err(_) => {
                warn!("Forge installer window still open after the ceiling, killing it");
                let _ = child.start_kill();
            }
        }
        Ok(())
    }

    // ── Module jars ─────────────────────────────────────

    /// Make sure the non-classpath module jars the bootstrap launcher loads
    /// by convention exist under the instance library tree. Missing jars are
    /// adopted from the default game directory, then fetched from the Forge
    /// repository, then (last resort) recreated by re-running the installer.
    pub async fn ensure_module_jars(
        &self,
        ctx: &InstallContext<'_>,
        version_id: &str,
        game_args: &[String],
    ) -> LauncherResult<()> {
        let mcp = mcp_version_from_args(game_args);
        let forge = forge_version_from_id(version_id);
        let rels = required_module_jars(ctx.minecraft_version, mcp.as_deref(), forge.as_deref());
        if rels.is_empty() {
            return Ok(());
        }

        let libraries_dir = ctx.store.libraries_dir();
        let missing = missing_of(&libraries_dir, &rels);
        if missing.is_empty() {
            return Ok(());
        }
        info!("{} Forge module jar(s) missing, recovering", missing.len());

        let adopted = Self::adopt_missing_libs_from_default(ctx.store.instance_dir(), &missing);
        if adopted > 0 {
            info!("Adopted {} module jar(s) from the default game directory", adopted);
        }

        for rel in missing_of(&libraries_dir, &rels) {
            if !rel.starts_with("net/minecraftforge/") {
                continue;
            }
            let url = format!("{}/{}", FORGE_MAVEN, rel);
            let dest = libraries_dir.join(&rel);
            if let Err(e) = ctx.downloader.download_file(&url, &dest, None).await {
                warn!("Module jar fetch failed for {}: {}", rel, e);
            }
        }

        let still_missing = missing_of(&libraries_dir, &rels);
        if !still_missing.is_empty() {
            info!("Re-running the Forge installer to restore {} jar(s)", still_missing.len());
            if let Err(e) = self.reinstall_into_default(ctx).await {
                warn!("Forge reinstall failed: {}", e);
            }
            Self::adopt_missing_libs_from_default(ctx.store.instance_dir(), &still_missing);
        }

        for rel in missing_of(&libraries_dir, &rels) {
            warn!("Module jar still missing, launch may fail: {}", rel);
        }
        Ok(())
    }

    /// Copy library files from the default game directory's library tree.
    /// Returns how many files were copied.
    fn adopt_missing_libs_from_default(instance_dir: &Path, rels: &[String]) -> usize {
        let Some(default_dir) = Self::default_minecraft_dir() else {
            return 0;
        };
        let mut copied = 0;
        for rel in rels {
            let dest = instance_dir.join("libraries").join(rel);
            if dest.exists() {
                continue;
            }
            let src = default_dir.join("libraries").join(rel);
            if !src.is_file() {
                continue;
            }
            if let Some(parent) = dest.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if std::fs::copy(&src, &dest).is_ok() {
                copied += 1;
            }
        }
        copied
    }

    async fn reinstall_into_default(&self, ctx: &InstallContext<'_>) -> LauncherResult<()> {
        let installer_jar = self.fetch_installer(ctx).await?;
        let work_dir = Self::default_minecraft_dir().ok_or_else(|| {
            LauncherError::LoaderInstallFailed("No default game directory on this platform".into())
        })?;
        std::fs::create_dir_all(&work_dir).map_err(|e| LauncherError::Io {
            path: work_dir.clone(),
            source: e,
        })?;
        self.run_installer_cli(ctx, &installer_jar, &work_dir)
            .await?;
        Ok(())
    }

    async fn fetch_installer(&self, ctx: &InstallContext<'_>) -> LauncherResult<PathBuf> {
        let full = Self::resolve_installer_version(ctx.client, ctx.minecraft_version).await?;
        let url = format!(
            "{}/net/minecraftforge/forge/{}/forge-{}-installer.jar",
            FORGE_MAVEN, full, full
        );
        let jar = std::env::temp_dir()
            .join("minelite")
            .join(format!("forge-{}-installer.jar", full));
        ctx.downloader.download_file(&url, &jar, None).await?;
        Ok(jar)
    }

    // ── Manifest surgery ────────────────────────────────

    /// JVM opens and support libraries the installer-written manifest misses
    /// on some builds. Only applies to bootstrap-launcher profiles. Returns
    /// whether anything changed.
    pub fn apply_compat_fixes(doc: &mut VersionDoc) -> bool {
        if !is_bootstrap(doc) {
            return false;
        }
        let mut changed = false;
        let args = doc.arguments.get_or_insert_with(Default::default);
        for target in ADD_OPENS_TARGETS {
            changed |= ensure_add_opens(&mut args.jvm, target);
        }
        for coordinate in SUPPORT_LIBRARIES {
            changed |= ensure_support_library(&mut doc.libraries, coordinate);
        }
        changed
    }

    /// A bootstrap profile with no client download of its own runs against
    /// the base jar; fold the base manifest's download metadata in and cut
    /// the inheritance link so the profile stands alone. Returns whether
    /// anything changed.
    pub fn enrich_with_base(doc: &mut VersionDoc, base: &VersionDoc, base_version: &str) -> bool {
        if !is_bootstrap(doc) {
            return false;
        }
        if doc.downloads.as_ref().and_then(|d| d.client.as_ref()).is_some() {
            return false;
        }
        let mut changed = false;
        if doc.jar.as_deref() != Some(base_version) {
            doc.jar = Some(base_version.to_string());
            changed = true;
        }
        if doc.downloads.is_none() && base.downloads.is_some() {
            doc.downloads = base.downloads.clone();
            changed = true;
        }
        if doc.asset_index.is_none() && base.asset_index.is_some() {
            doc.asset_index = base.asset_index.clone();
            changed = true;
        }
        if doc.assets.is_none() && base.assets.is_some() {
            doc.assets = base.assets.clone();
            changed = true;
        }
        if doc.main_class.is_none() && base.main_class.is_some() {
            doc.main_class = base.main_class.clone();
            changed = true;
        }
        if doc.inherits_from.take().is_some() {
            changed = true;
        }
        if doc.version_type.as_deref() != Some("custom") {
            doc.version_type = Some("custom".to_string());
            changed = true;
        }
        changed
    }
}

#[async_trait]
impl LoaderInstaller for ForgeInstaller {
    async fn ensure_installed(
        &self,
        ctx: &InstallContext<'_>,
    ) -> LauncherResult<LoaderInstallOutcome> {
        let instance_dir = ctx.store.instance_dir();

        if let Some(found) = Self::find_installed(instance_dir, ctx.minecraft_version) {
            return Ok(LoaderInstallOutcome {
                already_present: true,
                version_id: Some(found.id),
            });
        }

        ctx.store
            .ensure_base_version(ctx.client, ctx.downloader, ctx.minecraft_version)
            .await?;

        // An existing machine-wide install saves an installer run.
        if let Some(id) = Self::adopt_from_default(instance_dir, ctx.minecraft_version) {
            return Ok(LoaderInstallOutcome {
                already_present: false,
                version_id: Some(id),
            });
        }

        let installer_jar = self.fetch_installer(ctx).await?;
        let work_dir = Self::default_minecraft_dir().ok_or_else(|| {
            LauncherError::LoaderInstallFailed("No default game directory on this platform".into())
        })?;
        std::fs::create_dir_all(&work_dir).map_err(|e| LauncherError::Io {
            path: work_dir.clone(),
            source: e,
        })?;

        let cli_ok = self.run_installer_cli(ctx, &installer_jar, &work_dir).await?;
        if !cli_ok {
            self.run_installer_gui(ctx, &installer_jar, &work_dir).await?;
        }

        if let Some(id) = Self::adopt_from_default(instance_dir, ctx.minecraft_version) {
            return Ok(LoaderInstallOutcome {
                already_present: false,
                version_id: Some(id),
            });
        }
        // The installer may target the instance directly when it doubles as
        // the default game directory.
        if let Some(found) = Self::find_installed(instance_dir, ctx.minecraft_version) {
            return Ok(LoaderInstallOutcome {
                already_present: false,
                version_id: Some(found.id),
            });
        }
        Err(LauncherError::LoaderInstallFailed(format!(
            "No Forge profile detected for {} after install",
            ctx.minecraft_version
        )))
    }
}

// ─── Helpers ───

fn is_bootstrap(doc: &VersionDoc) -> bool {
    doc.main_class
        .as_deref()
        .map(|m| m.to_lowercase().contains("bootstraplauncher"))
        .unwrap_or(false)
}

/// `--add-opens <target>` is present when the pair appears verbatim or any
/// existing token already names the target module.
fn ensure_add_opens(jvm: &mut Vec<serde_json::Value>, target: &str) -> bool {
    let strings: Vec<Option<&str>> = jvm.iter().map(|v| v.as_str()).collect();
    let present = strings
        .windows(2)
        .any(|w| w[0] == Some("--add-opens") && w[1] == Some(target))
        || strings.iter().flatten().any(|s| s.contains(target));
    if present {
        return false;
    }
    jvm.push(serde_json::Value::String("--add-opens".to_string()));
    jvm.push(serde_json::Value::String(target.to_string()));
    true
}

/// Presence is judged by `group:artifact` so a manifest pinning a different
/// build of the same library is left alone.
fn ensure_support_library(libraries: &mut Vec<LibraryEntry>, coordinate: &str) -> bool {
    let group_artifact = coordinate.rsplit_once(':').map(|(ga, _)| ga).unwrap_or(coordinate);
    let prefix = format!("{}:", group_artifact);
    if libraries.iter().any(|l| l.name.starts_with(&prefix)) {
        return false;
    }
    let mut entry = LibraryEntry::plain(coordinate);
    entry.url = Some(MAVEN_CENTRAL.to_string());
    libraries.push(entry);
    true
}

/// Forge build number out of a profile id such as `1.20.1-forge-47.2.0`.
fn forge_version_from_id(version_id: &str) -> Option<String> {
    let lower = version_id.to_lowercase();
    let at = lower.find("forge")?;
    let mut rest = version_id[at + "forge".len()..].chars().peekable();
    if matches!(rest.peek(), Some('-') | Some(' ')) {
        rest.next();
    }
    let version: String = rest
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    (!version.is_empty()).then_some(version)
}

fn mcp_version_from_args(game_args: &[String]) -> Option<String> {
    game_args
        .iter()
        .position(|a| a == "--fml.mcpVersion")
        .and_then(|i| game_args.get(i + 1))
        .cloned()
}

/// Library-relative paths of the jars the bootstrap module path loads by
/// naming convention rather than through the manifest library list.
fn required_module_jars(
    minecraft_version: &str,
    mcp: Option<&str>,
    forge_version: Option<&str>,
) -> Vec<String> {
    let mut rels = Vec::new();
    if let Some(mcp) = mcp {
        let v = format!("{}-{}", minecraft_version, mcp);
        for suffix in ["srg", "extra"] {
            rels.push(format!("net/minecraft/client/{}/client-{}-{}.jar", v, v, suffix));
        }
    }
    if let Some(fv) = forge_version {
        let v = format!("{}-{}", minecraft_version, fv);
        for suffix in ["client", "universal"] {
            rels.push(format!(
                "net/minecraftforge/forge/{}/forge-{}-{}.jar",
                v, v, suffix
            ));
        }
        for module in ["fmlcore", "javafmllanguage", "lowcodelanguage", "mclanguage"] {
            rels.push(format!(
                "net/minecraftforge/{}/{}/{}-{}.jar",
                module, v, module, v
            ));
        }
    }
    rels
}

fn missing_of(libraries_dir: &Path, rels: &[String]) -> Vec<String> {
    rels.iter()
        .filter(|rel| !libraries_dir.join(rel.as_str()).is_file())
        .cloned()
        .collect()
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_healthy_jar(path: &Path) {
        let mut bytes = vec![0x50, 0x4b];
        bytes.extend(std::iter::repeat(0u8).take((JAR_MIN_BYTES + 1) as usize));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn jar_validation_checks_size_and_magic() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("absent.jar");
        assert!(!validate_jar(&missing).exists);

        let tiny = dir.path().join("tiny.jar");
        std::fs::write(&tiny, [0x50, 0x4b, 0x03, 0x04]).unwrap();
        let info = validate_jar(&tiny);
        assert!(info.exists && info.magic_ok && !info.healthy());

        let wrong_magic = dir.path().join("html.jar");
        let mut bytes = b"<html>".to_vec();
        bytes.extend(std::iter::repeat(0u8).take(20 * 1024));
        std::fs::write(&wrong_magic, bytes).unwrap();
        assert!(!validate_jar(&wrong_magic).healthy());

        let good = dir.path().join("good.jar");
        write_healthy_jar(&good);
        assert!(validate_jar(&good).healthy());
    }

    #[test]
    fn forge_build_parses_out_of_profile_ids() {
        assert_eq!(
            forge_version_from_id("1.20.1-forge-47.2.0").as_deref(),
            Some("47.2.0")
        );
        assert_eq!(
            forge_version_from_id("1.12.2-Forge 14.23.5.2860").as_deref(),
            Some("14.23.5.2860")
        );
        assert_eq!(forge_version_from_id("fabric-loader-0.15.11-1.20.1"), None);
        assert_eq!(forge_version_from_id("1.20.1"), None);
    }

    #[test]
    fn module_jar_paths_follow_naming_convention() {
        let rels = required_module_jars("1.20.1", Some("20230612.114412"), Some("47.2.0"));
        assert!(rels.contains(
            &"net/minecraft/client/1.20.1-20230612.114412/client-1.20.1-20230612.114412-srg.jar"
                .to_string()
        ));
        assert!(rels.contains(
            &"net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-universal.jar".to_string()
        ));
        assert!(rels
            .contains(&"net/minecraftforge/fmlcore/1.20.1-47.2.0/fmlcore-1.20.1-47.2.0.jar".to_string()));
        assert_eq!(rels.len(), 8);

        assert!(required_module_jars("1.20.1", None, None).is_empty());
    }

    #[test]
    fn mcp_version_reads_the_flag_value() {
        let args: Vec<String> = ["--launchTarget", "forgeclient", "--fml.mcpVersion", "20230612.114412"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(mcp_version_from_args(&args).as_deref(), Some("20230612.114412"));
        assert_eq!(mcp_version_from_args(&[]), None);
    }

    #[test]
    fn detection_prefers_profile_with_healthy_jar() {
        let dir = tempfile::tempdir().unwrap();
        let versions = dir.path().join("versions");

        let broken = versions.join("1.20.1-forge-47.1.0");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join("1.20.1-forge-47.1.0.jar"), b"PK").unwrap();

        let good = versions.join("1.20.1-forge-47.2.0");
        write_healthy_jar(&good.join("1.20.1-forge-47.2.0.jar"));

        let found = ForgeInstaller::find_installed(dir.path(), "1.20.1").unwrap();
        assert_eq!(found.id, "1.20.1-forge-47.2.0");

        assert!(ForgeInstaller::find_installed(dir.path(), "1.19.4").is_none());
    }

    #[test]
    fn repair_adopts_a_missing_profile_wholesale() {
        let donor_root = tempfile::tempdir().unwrap();
        let instance = tempfile::tempdir().unwrap();
        let id = "1.20.1-forge-47.2.0";

        let donor_profile = donor_root.path().join("versions").join(id);
        write_healthy_jar(&donor_profile.join(format!("{}.jar", id)));
        std::fs::write(donor_profile.join(format!("{}.json", id)), b"{}").unwrap();

        assert!(ForgeInstaller::repair_broken_jar_via(
            instance.path(),
            id,
            "1.20.1",
            donor_root.path(),
        ));
        let repaired = instance.path().join("versions").join(id);
        assert!(validate_jar(&repaired.join(format!("{}.jar", id))).healthy());
        // Adoption brings the manifest along with the jar.
        assert!(repaired.join(format!("{}.json", id)).is_file());
    }

    #[test]
    fn repair_falls_back_to_a_donor_jar_copy_for_a_corrupt_profile() {
        let donor_root = tempfile::tempdir().unwrap();
        let instance = tempfile::tempdir().unwrap();
        let id = "1.20.1-forge-47.2.0";

        let donor_profile = donor_root.path().join("versions").join(id);
        write_healthy_jar(&donor_profile.join(format!("{}.jar", id)));
        std::fs::write(donor_profile.join(format!("{}.json", id)), b"{}").unwrap();

        // The instance profile exists but its jar is a truncated write, so
        // adoption declines and only the jar is copied over.
        let broken = instance.path().join("versions").join(id);
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join(format!("{}.jar", id)), b"PK").unwrap();
        std::fs::write(broken.join(format!("{}.json", id)), b"{\"id\":\"ours\"}").unwrap();

        assert!(ForgeInstaller::repair_broken_jar_via(
            instance.path(),
            id,
            "1.20.1",
            donor_root.path(),
        ));
        assert!(validate_jar(&broken.join(format!("{}.jar", id))).healthy());
        let json = std::fs::read(broken.join(format!("{}.json", id))).unwrap();
        assert_eq!(json, b"{\"id\":\"ours\"}");
    }

    #[test]
    fn repair_reports_failure_without_a_healthy_donor() {
        let donor_root = tempfile::tempdir().unwrap();
        let instance = tempfile::tempdir().unwrap();
        let id = "1.20.1-forge-47.2.0";

        // Donor profile exists but its jar is broken too.
        let donor_profile = donor_root.path().join("versions").join(id);
        std::fs::create_dir_all(&donor_profile).unwrap();
        std::fs::write(donor_profile.join(format!("{}.jar", id)), b"PK").unwrap();

        let broken = instance.path().join("versions").join(id);
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join(format!("{}.jar", id)), b"PK").unwrap();

        assert!(!ForgeInstaller::repair_broken_jar_via(
            instance.path(),
            id,
            "1.20.1",
            donor_root.path(),
        ));
    }

    #[test]
    fn compat_fixes_apply_once_and_only_to_bootstrap_profiles() {
        let mut doc: VersionDoc = serde_json::from_value(serde_json::json!({
            "id": "1.20.1-forge-47.2.0",
            "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
            "libraries": [
                { "name": "org.slf4j:slf4j-api:2.0.1" }
            ]
        }))
        .unwrap();

        assert!(ForgeInstaller::apply_compat_fixes(&mut doc));
        let jvm = &doc.arguments.as_ref().unwrap().jvm;
        assert!(jvm
            .windows(2)
            .any(|w| w[0] == serde_json::json!("--add-opens")
                && w[1] == serde_json::json!("java.base/java.lang.invoke=ALL-UNNAMED")));
        // Pinned slf4j left alone, missing ones added with their repo base.
        assert!(!doc.libraries.iter().any(|l| l.name == "org.slf4j:slf4j-api:1.7.36"));
        assert!(doc
            .libraries
            .iter()
            .any(|l| l.name == "com.lmax:disruptor:3.4.4"
                && l.url.as_deref() == Some(MAVEN_CENTRAL)));

        // Second pass is a no-op.
        assert!(!ForgeInstaller::apply_compat_fixes(&mut doc));

        let mut vanilla: VersionDoc = serde_json::from_value(serde_json::json!({
            "id": "1.20.1",
            "mainClass": "net.minecraft.client.main.Main"
        }))
        .unwrap();
        assert!(!ForgeInstaller::apply_compat_fixes(&mut vanilla));
    }

    #[test]
    fn base_enrichment_folds_downloads_and_cuts_inheritance() {
        let base: VersionDoc = serde_json::from_value(serde_json::json!({
            "id": "1.20.1",
            "mainClass": "net.minecraft.client.main.Main",
            "assets": "5",
            "assetIndex": { "id": "5", "url": "https://example.invalid/5.json" },
            "downloads": { "client": { "url": "https://example.invalid/client.jar" } }
        }))
        .unwrap();
        let mut doc: VersionDoc = serde_json::from_value(serde_json::json!({
            "id": "1.20.1-forge-47.2.0",
            "inheritsFrom": "1.20.1",
            "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher"
        }))
        .unwrap();

        assert!(ForgeInstaller::enrich_with_base(&mut doc, &base, "1.20.1"));
        assert_eq!(doc.jar.as_deref(), Some("1.20.1"));
        assert!(doc.inherits_from.is_none());
        assert_eq!(doc.version_type.as_deref(), Some("custom"));
        assert!(doc.downloads.as_ref().unwrap().client.is_some());
        assert_eq!(doc.assets.as_deref(), Some("5"));

        // A profile that carries its own client download is left untouched.
        let mut own: VersionDoc = serde_json::from_value(serde_json::json!({
            "id": "1.20.1-forge-47.2.0",
            "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
            "downloads": { "client": { "url": "https://example.invalid/own.jar" } }
        }))
        .unwrap();
        assert!(!ForgeInstaller::enrich_with_base(&mut own, &base, "1.20.1"));
    }
}
