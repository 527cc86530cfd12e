use chrono::{DateTime, Local};

/// Binary-prefixed size, e.g. `1.5 KB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < 5 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, prefix)
}

/// `m:ss`; negative values render as `0:00`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Local-time rendering of an epoch timestamp, or `-` when out of range.
pub fn format_epoch(epoch_secs: i64, pattern: &str) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|utc| utc.with_timezone(&Local).format(pattern).to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(3600), "60:00");
        assert_eq!(format_duration(-4), "0:00");
    }

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_epoch(i64::MAX, "%Y"), "-");
        assert_eq!(format_epoch(86_400 * 365, "%Y").len(), 4);
    }
}
