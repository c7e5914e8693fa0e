mod manifest;
mod store;
mod version_file;

pub use manifest::{VersionList, VersionSummary};
pub use store::{
    ensure_required_game_args, GameArgContext, ManifestStore, MergedArguments, ResolvedManifest,
};
pub use version_file::{
    flatten_argument_values, ArgumentLists, AssetIndexInfo, DownloadArtifact, JavaVersionInfo,
    LibraryArtifact, LibraryDownloads, LibraryEntry, VersionDoc, VersionDownloads,
};
