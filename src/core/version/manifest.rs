// ─── Version List ───
// The remote index of published game versions, used to materialize a base
// version manifest that is not yet on disk.

use serde::Deserialize;
use tracing::info;

use crate::core::error::LauncherResult;

const VERSION_LIST_URL: &str = "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Deserialize)]
pub struct VersionList {
    pub versions: Vec<VersionSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionList {
    pub async fn fetch(client: &reqwest::Client) -> LauncherResult<Self> {
        let list: VersionList = client.get(VERSION_LIST_URL).send().await?.json().await?;
        info!("Loaded {} published versions", list.versions.len());
        Ok(list)
    }

    pub fn find(&self, id: &str) -> Option<&VersionSummary> {
        self.versions.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_summary() {
        let json = r#"{
            "id": "1.20.1",
            "type": "release",
            "url": "https://example.com/1.20.1.json",
            "sha1": "abc123"
        }"#;
        let entry: VersionSummary = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "1.20.1");
        assert_eq!(entry.version_type, "release");
    }
}
