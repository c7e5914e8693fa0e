mod client;

pub use client::{BatchStats, DownloadEntry, Downloader, FetchOptions};
