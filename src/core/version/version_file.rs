// ─── Version Document ───
// A version manifest as stored on disk. Only the fields the launcher reads
// are modeled; everything else round-trips untouched through `extra` so the
// document stays readable by external tooling after a rewrite.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub version_type: Option<String>,
    /// Id of the version whose client jar this manifest runs against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<ArgumentLists>,
    /// Legacy space-separated argument string (pre-1.13 manifests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<VersionDownloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgumentLists {
    /// Entries are either literal strings or conditional objects carrying a
    /// `value` payload; kept as raw values to preserve the on-disk shape.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub game: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jvm: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<DownloadArtifact>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ─── Library Entries ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Maven-style coordinate `group:artifact:version[:classifier]`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    /// Repository base URL used by loader manifests instead of `downloads`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LibraryEntry {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            downloads: None,
            url: None,
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<LibraryArtifact>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Flatten one argument-list entry into plain tokens.
///
/// Conditional entries are taken by their `value` payload unconditionally;
/// platform-rule evaluation is intentionally skipped for portability, and the
/// downstream sanitizer drops anything that does not substitute cleanly.
pub fn flatten_argument_values(value: &serde_json::Value) -> Vec<String> {
    if let Some(s) = value.as_str() {
        return vec![s.to_string()];
    }
    let Some(obj) = value.as_object() else {
        return vec![];
    };
    match obj.get("value") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_round_trip() {
        let raw = serde_json::json!({
            "id": "1.20.1",
            "mainClass": "net.minecraft.client.main.Main",
            "type": "release",
            "complianceLevel": 1,
            "logging": { "client": { "type": "log4j2-xml" } },
            "libraries": [
                { "name": "a:b:1.0", "serverreq": true }
            ]
        });

        let doc: VersionDoc = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.extra.get("complianceLevel"), Some(&serde_json::json!(1)));
        assert!(doc.libraries[0].extra.contains_key("serverreq"));

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn flatten_takes_value_payload_unconditionally() {
        let literal = serde_json::json!("--username");
        let single = serde_json::json!({
            "rules": [{"action": "allow", "os": {"name": "osx"}}],
            "value": "-XstartOnFirstThread"
        });
        let multi = serde_json::json!({
            "rules": [{"action": "allow", "features": {"is_demo_user": true}}],
            "value": ["--width", "${resolution_width}"]
        });

        assert_eq!(flatten_argument_values(&literal), vec!["--username"]);
        assert_eq!(flatten_argument_values(&single), vec!["-XstartOnFirstThread"]);
        assert_eq!(
            flatten_argument_values(&multi),
            vec!["--width", "${resolution_width}"]
        );
        assert!(flatten_argument_values(&serde_json::json!(42)).is_empty());
    }
}
