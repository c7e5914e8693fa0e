// ─── Fabric Installer ───
// Installs as a single versioned profile (`fabric-loader-<loader>-<mc>`)
// referencing the base client jar. The official installer runs headless
// against the instance directory; afterwards the local manifest is rewritten
// from the public profile endpoint so it inherits from the base version.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::context::InstallContext;
use crate::core::loaders::installer::{LoaderInstallOutcome, LoaderInstaller};
use crate::core::version::VersionDoc;

const FABRIC_META_BASE: &str = "https://meta.fabricmc.net/v2";
const FABRIC_MAVEN: &str = "https://maven.fabricmc.net";

#[derive(Debug, Deserialize)]
struct InstallerRelease {
    version: String,
}

pub struct FabricInstaller;

impl FabricInstaller {
    /// Version directories are named `fabric-loader-<loader>-<mc>`.
    fn find_installed(instance_dir: &Path, minecraft_version: &str) -> Option<String> {
        let versions_dir = instance_dir.join("versions");
        let entries = std::fs::read_dir(versions_dir).ok()?;
        entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .find(|name| name.contains("fabric-loader") && name.ends_with(minecraft_version))
    }

    async fn latest_installer_url(client: &reqwest::Client) -> LauncherResult<String> {
        let url = format!("{}/versions/installer", FABRIC_META_BASE);
        let releases: Vec<InstallerRelease> = client.get(&url).send().await?.json().await?;
        let version = releases
            .first()
            .map(|r| r.version.clone())
            .ok_or_else(|| LauncherError::LoaderApi("No Fabric installer release listed".into()))?;
        Ok(format!(
            "{}/net/fabricmc/fabric-installer/{}/fabric-installer-{}.jar",
            FABRIC_MAVEN, version, version
        ))
    }

    async fn run_installer(&self, ctx: &InstallContext<'_>) -> LauncherResult<()> {
        let installer_url = Self::latest_installer_url(ctx.client).await?;
        let tmp_dir = std::env::temp_dir().join("minelite");
        let jar_path = tmp_dir.join("fabric-installer.jar");
        ctx.downloader
            .download_file(&installer_url, &jar_path, None)
            .await?;

        let instance_dir = ctx.store.instance_dir();
        info!("Running Fabric installer for {}", ctx.minecraft_version);
        let output = tokio::process::Command::new(ctx.java_bin)
            .arg("-jar")
            .arg(&jar_path)
            .arg("client")
            .arg("-dir")
            .arg(instance_dir)
            .arg("-mcversion")
            .arg(ctx.minecraft_version)
            .arg("-noprofile")
            .output()
            .await
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        for line in combined.lines().filter(|l| !l.trim().is_empty()) {
            ctx.events.log(line);
        }
        if !output.status.success() {
            return Err(LauncherError::LoaderInstallFailed(format!(
                "Fabric installer exited with {:?}",
                output.status.code()
            )));
        }
        Ok(())
    }

    /// Rewrite the local manifest from the public profile endpoint so it
    /// inherits from the base version and reuses the base client jar instead
    /// of a self-referential one. Best effort: the installer-written manifest
    /// still works if this fails.
    async fn materialize_profile(
        &self,
        ctx: &InstallContext<'_>,
        version_id: &str,
    ) -> LauncherResult<()> {
        let Some((loader_version, mc_version)) = split_version_id(version_id) else {
            return Ok(());
        };

        let url = format!(
            "{}/versions/loader/{}/{}/profile/json",
            FABRIC_META_BASE, mc_version, loader_version
        );
        let response = ctx.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LauncherError::LoaderApi(format!(
                "Fabric Meta returned {} for {}",
                response.status(),
                url
            )));
        }
        let mut profile: VersionDoc = response.json().await?;

        // Keep the directory name and the manifest id in lockstep, and point
        // everything jar-related at the base version.
        profile.id = version_id.to_string();
        profile.inherits_from = Some(mc_version.to_string());
        profile.jar = Some(mc_version.to_string());
        profile.downloads = None;
        profile.version_type = Some("custom".to_string());
        ctx.store.write(version_id, &profile)?;
        info!("Materialized Fabric profile {}", version_id);

        ctx.store
            .ensure_base_version(ctx.client, ctx.downloader, mc_version)
            .await?;

        let base_jar = ctx.store.jar_path(mc_version);
        let version_jar = ctx.store.jar_path(version_id);
        if base_jar.exists() && !version_jar.exists() {
            std::fs::copy(&base_jar, &version_jar).map_err(|e| LauncherError::Io {
                path: version_jar,
                source: e,
            })?;
        }
        Ok(())
    }
}

/// `fabric-loader-<loader>-<mc>` → (`<loader>`, `<mc>`).
fn split_version_id(version_id: &str) -> Option<(&str, &str)> {
    version_id
        .strip_prefix("fabric-loader-")?
        .split_once('-')
        .filter(|(loader, mc)| !loader.is_empty() && !mc.is_empty())
}

#[async_trait]
impl LoaderInstaller for FabricInstaller {
    async fn ensure_installed(
        &self,
        ctx: &InstallContext<'_>,
    ) -> LauncherResult<LoaderInstallOutcome> {
        let instance_dir = ctx.store.instance_dir();

        let already_present = Self::find_installed(instance_dir, ctx.minecraft_version);
        if already_present.is_none() {
            self.run_installer(ctx).await?;
        }

        let version_id = Self::find_installed(instance_dir, ctx.minecraft_version)
            .ok_or_else(|| {
                LauncherError::LoaderInstallFailed(format!(
                    "No Fabric profile detected for {} after install",
                    ctx.minecraft_version
                ))
            })?;

        if let Err(e) = self.materialize_profile(ctx, &version_id).await {
            warn!("Fabric profile materialization failed, keeping installer manifest: {}", e);
        }

        Ok(LoaderInstallOutcome {
            already_present: already_present.is_some(),
            version_id: Some(version_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_id_splits_into_loader_and_game() {
        assert_eq!(
            split_version_id("fabric-loader-0.15.11-1.20.1"),
            Some(("0.15.11", "1.20.1"))
        );
        assert_eq!(split_version_id("1.20.1"), None);
        assert_eq!(split_version_id("fabric-loader-"), None);
    }

    #[test]
    fn detects_installed_profile_by_name_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let versions = dir.path().join("versions");
        std::fs::create_dir_all(versions.join("1.20.1")).unwrap();
        std::fs::create_dir_all(versions.join("fabric-loader-0.15.11-1.20.1")).unwrap();

        assert_eq!(
            FabricInstaller::find_installed(dir.path(), "1.20.1").as_deref(),
            Some("fabric-loader-0.15.11-1.20.1")
        );
        assert_eq!(FabricInstaller::find_installed(dir.path(), "1.19.4"), None);
    }
}
