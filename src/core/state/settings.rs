// ─── Launcher Settings ───
// Persisted selections supplied by the UI collaborator: instance directory,
// chosen runtime, player name, target version and loader.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderKind;

const APP_DIR_NAME: &str = "MineLite";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherSettings {
    pub instance_dir: PathBuf,
    pub java_path: Option<PathBuf>,
    pub username: String,
    pub game_version: String,
    pub loader: LoaderKind,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            instance_dir: default_instance_dir(),
            java_path: None,
            username: "Player".to_string(),
            game_version: "1.20.1".to_string(),
            loader: LoaderKind::Fabric,
        }
    }
}

impl LauncherSettings {
    pub fn load() -> Self {
        Self::load_from(&config_dir())
    }

    pub fn load_from(dir: &std::path::Path) -> Self {
        let path = dir.join(SETTINGS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Settings at {:?} unreadable, using defaults: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> LauncherResult<()> {
        self.save_to(&config_dir())
    }

    pub fn save_to(&self, dir: &std::path::Path) -> LauncherResult<()> {
        std::fs::create_dir_all(dir).map_err(|e| LauncherError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::Io { path, source: e })
    }
}

fn config_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

fn default_instance_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minelite")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LauncherSettings {
            instance_dir: PathBuf::from("/games/minelite"),
            java_path: Some(PathBuf::from("/usr/bin/java")),
            username: "Steve".into(),
            game_version: "1.16.5".into(),
            loader: LoaderKind::Forge,
        };
        settings.save_to(dir.path()).unwrap();

        let loaded = LauncherSettings::load_from(dir.path());
        assert_eq!(loaded.username, "Steve");
        assert_eq!(loaded.game_version, "1.16.5");
        assert_eq!(loaded.loader, LoaderKind::Forge);
    }

    #[test]
    fn unreadable_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{broken").unwrap();

        let loaded = LauncherSettings::load_from(dir.path());
        assert_eq!(loaded.username, "Player");
        assert_eq!(loaded.loader, LoaderKind::Fabric);
    }
}
