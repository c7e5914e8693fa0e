// ─── Asset Index ───
// Hash-addressed game assets. The index maps logical names to content
// hashes; objects live under `objects/<hash[0:2]>/<hash>`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::downloader::DownloadEntry;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::AssetIndexInfo;

const RESOURCES_BASE: &str = "https://resources.download.minecraft.net";

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndex {
    /// Load the index from `assets/indexes/<id>.json`, fetching and caching
    /// it when absent.
    pub async fn ensure(
        client: &reqwest::Client,
        info: &AssetIndexInfo,
        assets_dir: &Path,
    ) -> LauncherResult<Self> {
        let index_path = assets_dir.join("indexes").join(format!("{}.json", info.id));
        if let Ok(raw) = tokio::fs::read_to_string(&index_path).await {
            if let Ok(index) = serde_json::from_str::<AssetIndex>(&raw) {
                return Ok(index);
            }
        }

        info!("Fetching asset index {}", info.id);
        let raw = client.get(&info.url).send().await?.text().await?;
        let index: AssetIndex = serde_json::from_str(&raw)?;

        if let Some(parent) = index_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(&index_path, &raw)
            .await
            .map_err(|e| LauncherError::Io {
                path: index_path,
                source: e,
            })?;
        Ok(index)
    }

    /// Batch entries for every object in the index.
    pub fn object_entries(&self, assets_dir: &Path) -> Vec<DownloadEntry> {
        self.objects
            .values()
            .map(|object| {
                let prefix = &object.hash[..2.min(object.hash.len())];
                DownloadEntry {
                    url: format!("{}/{}/{}", RESOURCES_BASE, prefix, object.hash),
                    dest: assets_dir.join("objects").join(prefix).join(&object.hash),
                    sha1: Some(object.hash.clone()),
                    size: Some(object.size),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn object_entries_use_hash_prefix_layout() {
        let index: AssetIndex = serde_json::from_value(serde_json::json!({
            "objects": {
                "minecraft/sounds/ambient/cave/cave1.ogg": {
                    "hash": "c16157c6743e8ff29ed41e678fbf1c8f3a3e460c",
                    "size": 27645
                }
            }
        }))
        .unwrap();

        let entries = index.object_entries(&PathBuf::from("/inst/assets"));
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].dest,
            PathBuf::from("/inst/assets/objects/c1/c16157c6743e8ff29ed41e678fbf1c8f3a3e460c")
        );
        assert!(entries[0].url.ends_with("/c1/c16157c6743e8ff29ed41e678fbf1c8f3a3e460c"));
        assert_eq!(entries[0].size, Some(27645));
    }
}
