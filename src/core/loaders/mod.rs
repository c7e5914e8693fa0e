mod context;
mod fabric;
mod forge;
mod installer;
mod vanilla;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use context::InstallContext;
pub use fabric::FabricInstaller;
pub use forge::{validate_jar, ForgeInstaller, JarInfo};
pub use installer::{Installer, LoaderInstallOutcome, LoaderInstaller};
pub use vanilla::VanillaInstaller;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderKind {
    Vanilla,
    /// Transforms the base client at class-load time; installs as a single
    /// versioned profile referencing the base jar.
    Fabric,
    /// Boots through a module-path bootstrap launcher; installs via an
    /// external Java installer and is adopted into the instance.
    Forge,
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoaderKind::Vanilla => "vanilla",
            LoaderKind::Fabric => "fabric",
            LoaderKind::Forge => "forge",
        };
        f.write_str(name)
    }
}
