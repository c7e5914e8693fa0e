use async_trait::async_trait;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};

use super::context::InstallContext;
use super::installer::{LoaderInstallOutcome, LoaderInstaller};

/// Vanilla needs no loader install, only the base version materialized.
pub struct VanillaInstaller;

#[async_trait]
impl LoaderInstaller for VanillaInstaller {
    async fn ensure_installed(
        &self,
        ctx: &InstallContext<'_>,
    ) -> LauncherResult<LoaderInstallOutcome> {
        let already_present = !matches!(
            ctx.store.load(ctx.minecraft_version),
            Err(LauncherError::ManifestMissing { .. })
        );
        ctx.store
            .ensure_base_version(ctx.client, ctx.downloader, ctx.minecraft_version)
            .await?;
        info!("Vanilla {} ready", ctx.minecraft_version);
        Ok(LoaderInstallOutcome {
            already_present,
            version_id: None,
        })
    }
}
