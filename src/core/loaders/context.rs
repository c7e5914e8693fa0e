use std::path::Path;

use crate::core::downloader::Downloader;
use crate::core::events::EventSink;
use crate::core::version::ManifestStore;

/// Everything an installer needs, borrowed from the orchestrator for the
/// duration of one launch attempt.
pub struct InstallContext<'a> {
    pub store: &'a ManifestStore,
    pub client: &'a reqwest::Client,
    pub downloader: &'a Downloader,
    pub events: &'a EventSink,
    pub java_bin: &'a Path,
    pub minecraft_version: &'a str,
}
