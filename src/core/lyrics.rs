//! Synced lyric parsing and line lookup
//!
//! Synced lyrics arrive as line-oriented LRC text:
//! [mm:ss.xx] Lyrics line here
//!
//! Lines keep their source order; nothing is re-sorted.

/// A single line of lyrics with its start time
#[derive(Debug, Clone, PartialEq)]
pub struct TimedLine {
    /// Seconds from the start of the track
    pub time_secs: f64,
    pub text: String,
}

impl TimedLine {
    pub fn new(time_secs: f64, text: impl Into<String>) -> Self {
        Self {
            time_secs,
            text: text.into(),
        }
    }
}

/// Parse raw synced lyrics. Blank lines, lines without a bracketed time or
/// without text, and lines whose time does not parse are skipped.
pub fn parse_synced(raw: &str) -> Vec<TimedLine> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (time_part, text) = split_lrc_line(line)?;
            let seconds = parse_lrc_time(time_part)?;
            Some(TimedLine::new(seconds, text))
        })
        .collect()
}

/// Index of the last line whose time is at or before `position_secs`.
///
/// Returns `None` when the position precedes every line. Past the final
/// timestamp the final line stays current.
pub fn find_current_line_index(lines: &[TimedLine], position_secs: f64) -> Option<usize> {
    lines
        .iter()
        .take_while(|line| line.time_secs <= position_secs)
        .count()
        .checked_sub(1)
}

fn split_lrc_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    if end == 0 {
        return None;
    }

    let time_part = &rest[..end];
    let text = rest[end + 1..].trim();
    if text.is_empty() {
        return None;
    }

    Some((time_part, text))
}

/// Parse `[hh:]mm:ss[.frac]` into seconds.
fn parse_lrc_time(raw: &str) -> Option<f64> {
    let parts: Vec<f64> = raw
        .split(':')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let total = match parts.as_slice() {
        [minutes, seconds] => minutes * 60.0 + seconds,
        [hours, minutes, seconds] => hours * 3600.0 + minutes * 60.0 + seconds,
        _ => return None,
    };

    if total < 0.0 || !total.is_finite() {
        return None;
    }

    Some(total)
}

/// `m:ss.ss`, used for lyric previews.
pub fn format_timestamp(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = seconds - (minutes * 60) as f64;
    format!("{}:{:05.2}", minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_lines() {
        let lines = parse_synced("[00:01.50]Hello\n[00:03.00]World");
        assert_eq!(
            lines,
            vec![TimedLine::new(1.5, "Hello"), TimedLine::new(3.0, "World")]
        );
    }

    #[test]
    fn test_parse_skips_bad_lines() {
        let raw = r#"
[ar:Some Artist]
[00:05.00]
no timestamp here
[]empty time
[aa:bb]garbage time
[00:10.25]  Kept line
"#;
        let lines = parse_synced(raw);
        assert_eq!(lines, vec![TimedLine::new(10.25, "Kept line")]);
    }

    #[test]
    fn test_parse_hours_and_order() {
        let lines = parse_synced("[01:00:02]Late\r\n[00:30]Early");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].time_secs, 3602.0);
        assert_eq!(lines[1].time_secs, 30.0, "source order is preserved");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_synced("").is_empty());
        assert!(parse_synced("\n\n   \n").is_empty());
    }

    #[test]
    fn test_find_current_line_index() {
        let lines = parse_synced("[00:01.50]Hello\n[00:03.00]World");

        assert_eq!(find_current_line_index(&lines, 2.0), Some(0));
        assert_eq!(find_current_line_index(&lines, 0.5), None);
        assert_eq!(find_current_line_index(&lines, 10.0), Some(1));
        assert_eq!(find_current_line_index(&lines, 1.5), Some(0));
        assert_eq!(find_current_line_index(&[], 5.0), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00.00");
        assert_eq!(format_timestamp(75.5), "1:15.50");
    }
}
