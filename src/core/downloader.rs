//! Download streamer
//!
//! Streams a direct URL into a local file through a fixed-size write
//! buffer, so memory use stays flat whatever the file size. Progress is
//! reported through a [`ProgressThrottle`]. On failure the partial file is
//! left in place; removing it is the caller's job.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::core::progress::ProgressThrottle;
use crate::error::DownloadError;

/// Size of the write buffer, and so of every disk write
pub const CHUNK_SIZE: usize = 64 * 1024;

static DISPOSITION_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).expect("valid disposition regex")
});

/// What the streamer learned about the file it wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub bytes: u64,
    pub content_type: Option<String>,
    pub file_name: String,
}

pub struct Downloader {
    client: reqwest::Client,
    max_size: Option<u64>,
    progress_interval: Duration,
}

impl Downloader {
    pub fn new(client: reqwest::Client, max_size: Option<u64>, progress_interval: Duration) -> Self {
        Self {
            client,
            max_size,
            progress_interval,
        }
    }

    /// Streams `url` into `dest`, calling `on_progress(bytes_so_far, total)`
    /// at a bounded rate
    pub async fn download<F>(
        &self,
        url: &str,
        dest: &Path,
        mut on_progress: F,
    ) -> Result<DownloadedFile, DownloadError>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        info!("Downloading {} -> {}", url, dest.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let total = response.content_length().filter(|len| *len > 0);
        if let (Some(limit), Some(size)) = (self.max_size, total) {
            if size > limit {
                return Err(DownloadError::TooLarge { size, limit });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .or_else(|| filename_from_url(response.url()))
            .unwrap_or_else(fallback_file_name);

        let file = tokio::fs::File::create(dest)
            .await
            .map_err(DownloadError::from_write)?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);

        let mut throttle = ProgressThrottle::new(self.progress_interval);
        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                debug!("Stream broke after {} bytes: {}", received, e);
                DownloadError::IncompleteTransfer {
                    received,
                    expected: total,
                }
            })?;

            writer
                .write_all(&chunk)
                .await
                .map_err(DownloadError::from_write)?;
            received += chunk.len() as u64;

            if let Some(limit) = self.max_size {
                if received > limit {
                    return Err(DownloadError::TooLarge {
                        size: received,
                        limit,
                    });
                }
            }

            if throttle.should_notify(received, total) {
                on_progress(received, total);
            }
        }

        writer.flush().await.map_err(DownloadError::from_write)?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(DownloadError::from_write)?;

        if let Some(expected) = total {
            if received < expected {
                return Err(DownloadError::IncompleteTransfer {
                    received,
                    expected: Some(expected),
                });
            }
        }

        if throttle.should_notify(received, Some(received)) {
            on_progress(received, total);
        }

        info!("Downloaded {} bytes as {}", received, file_name);
        Ok(DownloadedFile {
            bytes: received,
            content_type,
            file_name,
        })
    }
}

fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = DISPOSITION_RX.captures(header)?.get(1)?.as_str().trim();
    let decoded = urlencoding::decode(raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    sanitize_file_name(&decoded)
}

fn filename_from_url(url: &reqwest::Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(last)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| last.to_string());
    sanitize_file_name(&decoded)
}

/// Keeps only the final path component and rejects empty or dot names
fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}

fn fallback_file_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("file_{:x}", nanos)
}
