use humansize::{format_size as humanize, BINARY};

use crate::core::progress::percent;
use crate::core::settings::Stats;

/// Format byte count in human-readable format (KiB, MiB, GiB)
pub fn format_size(size: u64) -> String {
    humanize(size, BINARY)
}

/// Status line for a running transfer, e.g. `Downloading: 42% (1 MiB/3 MiB)`
pub fn format_progress(prefix: &str, bytes: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => format!(
            "{}: {}% ({}/{})",
            prefix,
            percent(bytes, total),
            format_size(bytes),
            format_size(total)
        ),
        _ => format!("{}: {}", prefix, format_size(bytes)),
    }
}

pub fn format_stats(stats: &Stats) -> String {
    format!(
        "Total requests: {}\nResolved links: {}\nUploaded files: {}\nBytes transferred: {}",
        stats.total_requests,
        stats.resolved_links,
        stats.uploaded_files,
        format_size(stats.bytes_transferred)
    )
}
