use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the entire launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Transfer failed for {url} after {attempts} attempts: {reason}")]
    TransferFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Invalid version JAR at {path:?}: size={size}B, magic_ok={magic_ok}")]
    JarValidationFailed {
        path: PathBuf,
        size: u64,
        magic_ok: bool,
    },

    // ── Manifests ───────────────────────────────────────
    #[error("Version manifest missing for {version_id}: {path:?}")]
    ManifestMissing { version_id: String, path: PathBuf },

    #[error("Version manifest unparseable at {path:?}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── XML ─────────────────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Java runtime ────────────────────────────────────
    #[error("No compatible Java runtime for Minecraft {minecraft_version}: {requirement}")]
    RuntimeUnresolved {
        minecraft_version: String,
        requirement: String,
    },

    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    // ── Loader ──────────────────────────────────────────
    #[error("Loader install failed: {0}")]
    LoaderInstallFailed(String),

    #[error("Loader API unreachable: {0}")]
    LoaderApi(String),

    // ── Launch lifecycle ────────────────────────────────
    #[error("A launch session is already running")]
    AlreadyRunning,

    #[error("No launch session is running")]
    NotRunning,

    #[error("Failed to spawn game process: {0}")]
    ProcessSpawnFailed(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// Errors cross the UI-collaborator boundary as plain strings
// (`{ ok: false, error: "..." }`), so the type serializes to its Display form.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
