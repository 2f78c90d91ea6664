//! Human-readable formatting for dashboard and log output

use std::time::Duration;

/// Format bytes in human-readable format (KB, MB, GB)
#[inline]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a run time as days, hours, minutes and seconds
///
/// Zero components are left out; under one second gives `"..."`.
pub fn format_elapsed(elapsed: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    let total = elapsed.as_secs();
    let parts = [
        (total / DAY, "day", "days"),
        (total % DAY / HOUR, "hour", "hours"),
        (total % HOUR / MINUTE, "minute", "minutes"),
        (total % MINUTE, "second", "seconds"),
    ];

    let text = parts
        .iter()
        .filter(|(value, _, _)| *value > 0)
        .map(|(value, one, many)| format!("{} {}", value, if *value == 1 { one } else { many }))
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() { "...".to_string() } else { text }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(29312178), "27.95 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "...");
        assert_eq!(format_elapsed(Duration::from_millis(999)), "...");
        assert_eq!(format_elapsed(Duration::from_secs(1)), "1 second");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "59 seconds");
        assert_eq!(format_elapsed(Duration::from_secs(61)), "1 minute 1 second");
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "1 hour");
        assert_eq!(
            format_elapsed(Duration::from_secs(2 * 86400 + 3 * 3600 + 5)),
            "2 days 3 hours 5 seconds"
        );
    }
}
