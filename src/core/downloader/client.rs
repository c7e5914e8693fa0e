use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use reqwest::header::LOCATION;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;
use crate::core::http::build_download_client;

/// Per-fetch knobs. The timeout applies to each attempt independently of the
/// retry count; redirects share one budget across the whole fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_redirects: u32,
    pub retries: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_redirects: 3,
            retries: 2,
        }
    }
}

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// A single file to fetch with optional expected size / SHA-1.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

/// Outcome of a batch fetch. Failures degrade to `skipped`; the batch itself
/// never fails — some artifacts may be supplied later by an installer step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub checked: u64,
    pub downloaded: u64,
    pub skipped: u64,
}

enum Attempt {
    Done,
    Redirect(String),
}

/// Robust, retrying, redirect-following artifact fetcher.
pub struct Downloader {
    client: Client,
    events: EventSink,
}

impl Downloader {
    pub fn new(events: EventSink) -> LauncherResult<Self> {
        let client = build_download_client()?;
        Ok(Self { client, events })
    }

    // ── Single file download ────────────────────────────

    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<()> {
        self.download_file_with(url, dest, FetchOptions::default(), sha1_expected)
            .await
    }

    /// Streaming download to `dest`.
    ///
    /// Redirects are followed through an explicit bounded loop; network errors
    /// and timeouts are retried with a fixed short backoff. A failed attempt
    /// always removes any partially written file before retrying or failing.
    pub async fn download_file_with(
        &self,
        url: &str,
        dest: &Path,
        options: FetchOptions,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let mut current_url = url.to_string();
        let mut remaining_redirects = options.max_redirects;
        let mut remaining_retries = options.retries;

        loop {
            match self
                .attempt(&current_url, dest, options.timeout, sha1_expected)
                .await
            {
                Ok(Attempt::Done) => {
                    debug!("Downloaded: {} -> {:?}", current_url, dest);
                    return Ok(());
                }
                Ok(Attempt::Redirect(location)) => {
                    remove_partial(dest).await;
                    if remaining_redirects == 0 {
                        return Err(LauncherError::TransferFailed {
                            url: current_url,
                            attempts: options.retries - remaining_retries + 1,
                            reason: "redirect budget exhausted".into(),
                        });
                    }
                    remaining_redirects -= 1;
                    current_url = location;
                }
                Err(err) => {
                    remove_partial(dest).await;
                    if !is_retryable(&err) {
                        return Err(err);
                    }
                    if remaining_retries == 0 {
                        return Err(LauncherError::TransferFailed {
                            url: current_url,
                            attempts: options.retries + 1,
                            reason: err.to_string(),
                        });
                    }
                    remaining_retries -= 1;
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<Attempt> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();

        if status.is_redirection() {
            if let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                return Ok(Attempt::Redirect(location.to_string()));
            }
        }
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut hasher = sha1_expected.map(|_| Sha1::new());
        // Write inside a block so the handle drops before validation/rename.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| LauncherError::Io {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                if let Some(h) = hasher.as_mut() {
                    h.update(&chunk);
                }
                file.write_all(&chunk).await.map_err(|e| LauncherError::Io {
                    path: dest.to_path_buf(),
                    source: e,
                })?;
            }
            file.flush().await.map_err(|e| LauncherError::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;
        }

        if let (Some(expected), Some(h)) = (sha1_expected, hasher) {
            let actual = hex::encode(h.finalize());
            if actual != expected {
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(Attempt::Done)
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Fetch many artifacts across a bounded worker pool.
    ///
    /// An entry is skipped without a network call when its destination already
    /// exists with the expected size (or, with no expected size, is non-empty)
    /// or when it carries no source URL. Per-item failures are tolerated and
    /// counted as skipped.
    pub async fn fetch_batch(&self, entries: Vec<DownloadEntry>, concurrency: usize) -> BatchStats {
        let total = entries.len() as u64;
        if total == 0 {
            return BatchStats::default();
        }
        let pool = concurrency.min(entries.len()).max(1);
        debug!("Batch fetch: {} items, pool={}", total, pool);

        let completed = AtomicU64::new(0);
        let outcomes: Vec<bool> = stream::iter(entries)
            .map(|entry| {
                let completed = &completed;
                async move {
                    let downloaded = self.fetch_entry(&entry).await;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    self.events.progress(done, total);
                    downloaded
                }
            })
            .buffer_unordered(pool)
            .collect()
            .await;

        let downloaded = outcomes.iter().filter(|d| **d).count() as u64;
        BatchStats {
            checked: total,
            downloaded,
            skipped: total - downloaded,
        }
    }

    /// Returns true when the entry was actually downloaded.
    async fn fetch_entry(&self, entry: &DownloadEntry) -> bool {
        if destination_satisfied(&entry.dest, entry.size) {
            return false;
        }
        if entry.url.is_empty() {
            // No URL in the manifest; the file may be provided by an
            // installer step instead.
            return false;
        }
        match self
            .download_file(&entry.url, &entry.dest, entry.sha1.as_deref())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!("Batch item failed (tolerated): {}: {}", entry.url, err);
                false
            }
        }
    }
}

/// Existence/size short-circuit for batch items.
fn destination_satisfied(dest: &Path, expected_size: Option<u64>) -> bool {
    let Ok(meta) = std::fs::metadata(dest) else {
        return false;
    };
    match expected_size {
        Some(expected) => meta.len() == expected,
        None => meta.len() > 0,
    }
}

fn is_retryable(err: &LauncherError) -> bool {
    // Non-2xx statuses and checksum mismatches are deterministic; only
    // transport-level failures are worth another attempt.
    matches!(err, LauncherError::Http(_))
}

async fn remove_partial(dest: &Path) {
    let _ = tokio::fs::remove_file(dest).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dest: PathBuf, size: Option<u64>) -> DownloadEntry {
        DownloadEntry {
            url: String::new(),
            dest,
            sha1: None,
            size,
        }
    }

    #[test]
    fn satisfied_when_size_matches_expected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.jar");
        std::fs::write(&path, b"12345").unwrap();

        assert!(destination_satisfied(&path, Some(5)));
        assert!(!destination_satisfied(&path, Some(6)));
    }

    #[test]
    fn satisfied_when_no_expected_size_and_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join("full.jar");
        let empty = dir.path().join("empty.jar");
        std::fs::write(&full, b"x").unwrap();
        std::fs::write(&empty, b"").unwrap();

        assert!(destination_satisfied(&full, None));
        assert!(!destination_satisfied(&empty, None));
        assert!(!destination_satisfied(&dir.path().join("absent.jar"), None));
    }

    #[tokio::test]
    async fn batch_is_idempotent_against_populated_destination() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jar");
        let b = dir.path().join("b.jar");
        std::fs::write(&a, b"aaaa").unwrap();
        std::fs::write(&b, b"bb").unwrap();

        let downloader = Downloader::new(EventSink::disabled()).unwrap();
        let entries = vec![entry(a, Some(4)), entry(b, None)];

        // Both items short-circuit; no URL is ever touched.
        let stats = downloader.fetch_batch(entries.clone(), 8).await;
        assert_eq!(stats.checked, 2);
        assert_eq!(stats.downloaded, 0);
        assert_eq!(stats.skipped, 2);

        let again = downloader.fetch_batch(entries, 8).await;
        assert_eq!(again.skipped, 2);
    }

    #[tokio::test]
    async fn empty_batch_reports_zero_stats() {
        let downloader = Downloader::new(EventSink::disabled()).unwrap();
        let stats = downloader.fetch_batch(Vec::new(), 16).await;
        assert_eq!(stats, BatchStats::default());
    }
}
