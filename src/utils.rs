//! Utility functions for size and speed display formatting

/// Format a byte count as a human-readable size string
///
/// Uses binary units (1 KB = 1024 bytes), matching the strings the queue
/// server renders into `speed_formatted`.
///
/// # Examples
///
/// ```
/// use hf_queue_sync::utils::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(2048), "2.0 KB");
/// assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a transfer speed as a human-readable rate string
///
/// A zero or negative speed renders as `-`, the placeholder presentation
/// layers show for idle tasks. Used as a fallback when a record arrives
/// without a server-rendered `speed_formatted`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec <= 0.0 {
        return "-".to_string();
    }
    format!("{}/s", format_size(bytes_per_sec as u64))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_picks_the_right_unit() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn format_speed_appends_rate_suffix() {
        assert_eq!(format_speed(1536.0), "1.5 KB/s");
        assert_eq!(format_speed(2.5 * 1024.0 * 1024.0), "2.5 MB/s");
    }

    #[test]
    fn format_speed_renders_placeholder_when_idle() {
        assert_eq!(format_speed(0.0), "-");
        assert_eq!(format_speed(-1.0), "-");
    }
}
