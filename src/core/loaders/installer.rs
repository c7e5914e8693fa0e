use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::LauncherResult;

use super::context::InstallContext;
use super::fabric::FabricInstaller;
use super::forge::ForgeInstaller;
use super::vanilla::VanillaInstaller;
use super::LoaderKind;

/// Unified result of `ensure_installed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderInstallOutcome {
    /// The loader was detected locally before any installer ran.
    pub already_present: bool,
    /// Discovered version id of the loader profile; `None` for vanilla,
    /// which launches the base version directly.
    pub version_id: Option<String>,
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn ensure_installed(&self, ctx: &InstallContext<'_>)
        -> LauncherResult<LoaderInstallOutcome>;
}

/// Dispatcher without Box<dyn>.
pub enum Installer {
    Vanilla(VanillaInstaller),
    Fabric(FabricInstaller),
    Forge(ForgeInstaller),
}

impl Installer {
    pub fn new(kind: LoaderKind) -> Self {
        match kind {
            LoaderKind::Vanilla => Self::Vanilla(VanillaInstaller),
            LoaderKind::Fabric => Self::Fabric(FabricInstaller),
            LoaderKind::Forge => Self::Forge(ForgeInstaller),
        }
    }

    pub async fn ensure_installed(
        &self,
        ctx: &InstallContext<'_>,
    ) -> LauncherResult<LoaderInstallOutcome> {
        match self {
            Installer::Vanilla(i) => i.ensure_installed(ctx).await,
            Installer::Fabric(i) => i.ensure_installed(ctx).await,
            Installer::Forge(i) => i.ensure_installed(ctx).await,
        }
    }
}
