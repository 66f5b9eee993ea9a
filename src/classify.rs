//! Line classification: turns one raw log line into a [`LogEntry`].
//!
//! Matchers are tried in order and the first one that accepts the line wins:
//!
//! 1. `[ts] PHP <Label> error: msg` (PHP `error_log` output)
//! 2. `[ts] [<label>] msg` (bracketed level tag, e.g. WordPress plugin loggers)
//! 3. `[ts] msg` (level found by keyword search in the message)
//!
//! Lines no matcher accepts keep the ingestion time, level `info` and the
//! whole line as message.

use crate::entry::LogEntry;
use crate::level::Level;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("classify: invalid regex")
}

static PHP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"^\[([^\]]+)\]\s+(?i:PHP)\s+([A-Za-z][A-Za-z ]*?)(?:\s+(?i:error))?:\s*(.*)$")
});
static TAGGED_LINE: LazyLock<Regex> =
    LazyLock::new(|| re(r"^\[([^\]]+)\]\s+\[([^\]]+)\]\s*(.*)$"));
static STAMPED_LINE: LazyLock<Regex> = LazyLock::new(|| re(r"^\[([^\]]+)\]\s*(.*)$"));
static LEVEL_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(fatal|error|warning|notice|info|debug)\b"));

/// What a matcher extracted from a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Matched<'a> {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Level,
    pub message: &'a str,
}

type Matcher = fn(&str) -> Option<Matched<'_>>;

/// Priority order is the slice order.
const MATCHERS: &[(&str, Matcher)] = &[
    ("php", match_php_error as Matcher),
    ("tagged", match_level_tag as Matcher),
    ("stamped", match_timestamp_only as Matcher),
];

/// Classifies `line`. `ingested_at` stands in for the timestamp when the
/// line carries none, or carries one that does not parse.
pub fn classify_line(line: &str, ingested_at: DateTime<Utc>) -> LogEntry {
    let matched = MATCHERS
        .iter()
        .find_map(|(name, matcher)| matcher(line).map(|m| (*name, m)));

    match matched {
        Some((name, m)) => {
            if m.timestamp.is_none() {
                tracing::trace!(matcher = name, line, "unparsable timestamp, using ingestion time");
            }
            LogEntry {
                timestamp: m.timestamp.unwrap_or(ingested_at),
                timestamp_parsed: m.timestamp.is_some(),
                level: m.level,
                message: m.message.trim_end().to_string(),
                raw: line.to_string(),
            }
        }
        None => LogEntry {
            timestamp: ingested_at,
            timestamp_parsed: false,
            level: Level::Info,
            message: line.to_string(),
            raw: line.to_string(),
        },
    }
}

pub(crate) fn match_php_error(line: &str) -> Option<Matched<'_>> {
    let caps = PHP_LINE.captures(line)?;
    let (stamp, label, message) = (caps.get(1)?, caps.get(2)?, caps.get(3)?);
    Some(Matched {
        timestamp: parse_timestamp(stamp.as_str()),
        level: Level::from_label(label.as_str()).unwrap_or(Level::Info),
        message: message.as_str(),
    })
}

/// Only accepts tags that name a known level, so `[ts] [php7:error] ...`
/// falls through to the keyword search.
pub(crate) fn match_level_tag(line: &str) -> Option<Matched<'_>> {
    let caps = TAGGED_LINE.captures(line)?;
    let level = Level::from_label(caps.get(2)?.as_str())?;
    Some(Matched {
        timestamp: parse_timestamp(caps.get(1)?.as_str()),
        level,
        message: caps.get(3)?.as_str(),
    })
}

pub(crate) fn match_timestamp_only(line: &str) -> Option<Matched<'_>> {
    let caps = STAMPED_LINE.captures(line)?;
    let message = caps.get(2)?.as_str();
    let timestamp = parse_timestamp(caps.get(1)?.as_str());

    // A bracket that is not a date is part of the text, e.g. `[error] ...`.
    let haystack = if timestamp.is_some() { message } else { line };
    Some(Matched {
        timestamp,
        level: find_level_keyword(haystack).unwrap_or(Level::Info),
        message,
    })
}

/// First severity keyword in `text`, on word boundaries.
pub(crate) fn find_level_keyword(text: &str) -> Option<Level> {
    LEVEL_KEYWORD
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Level::from_label(m.as_str()))
}

const OFFSET_FORMATS: &[&str] = &["%d-%b-%Y %H:%M:%S %z", "%Y-%m-%d %H:%M:%S %z"];

const NAIVE_FORMATS: &[&str] = &[
    "%d-%b-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%a %b %d %H:%M:%S %Y",
    "%a %b %d %H:%M:%S%.f %Y",
];

/// Parses the bracketed timestamp formats seen in PHP, WordPress and Apache
/// logs. Zone names (`UTC`, `Europe/Berlin`) are not resolved: the wall-clock
/// time is taken as UTC. Numeric offsets are honoured.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let wall_clock = strip_zone_name(raw);
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(wall_clock, format).ok())
        .map(|naive| naive.and_utc())
}

/// Drops a trailing zone name such as `UTC` or `America/New_York`.
fn strip_zone_name(raw: &str) -> &str {
    match raw.rsplit_once(' ') {
        Some((head, tail))
            if tail
                .chars()
                .all(|c| c.is_ascii_alphabetic() || c == '/' || c == '_')
                && tail.chars().any(|c| c.is_ascii_alphabetic()) =>
        {
            head.trim_end()
        }
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_php_fatal_error() {
        let line = "[01-Jan-2024 10:00:00 UTC] PHP Fatal error: Out of memory";
        let entry = classify_line(line, now());

        assert_eq!(entry.level, Level::Fatal);
        assert_eq!(entry.message, "Out of memory");
        assert_eq!(entry.timestamp, utc(2024, 1, 1, 10, 0, 0));
        assert!(entry.timestamp_parsed);
        assert_eq!(entry.raw, line);
    }

    #[test]
    fn test_bracketed_level_tag() {
        let entry = classify_line(
            "[01-Jan-2024 10:00:01 UTC] [warning] Deprecated function",
            now(),
        );

        assert_eq!(entry.level, Level::Warning);
        assert_eq!(entry.message, "Deprecated function");
        assert_eq!(entry.timestamp, utc(2024, 1, 1, 10, 0, 1));
    }

    #[test]
    fn test_keyword_detected_level() {
        let entry = classify_line(
            "[01-Jan-2024 10:00:02] Something odd happened, notice logged",
            now(),
        );

        assert_eq!(entry.level, Level::Notice);
        assert_eq!(entry.message, "Something odd happened, notice logged");
        assert_eq!(entry.timestamp, utc(2024, 1, 1, 10, 0, 2));
    }

    #[test]
    fn test_unstructured_line() {
        let line = "random line with no brackets";
        let entry = classify_line(line, now());

        assert_eq!(entry.level, Level::Info);
        assert_eq!(entry.message, line);
        assert_eq!(entry.timestamp, now());
        assert!(!entry.timestamp_parsed);
    }

    #[test]
    fn test_php_labels_without_error_suffix() {
        let warning = classify_line(
            "[01-Jan-2024 10:00:00 UTC] PHP Warning:  Undefined variable $x",
            now(),
        );
        assert_eq!(warning.level, Level::Warning);
        assert_eq!(warning.message, "Undefined variable $x");

        let deprecated = classify_line(
            "[01-Jan-2024 10:00:00 UTC] PHP Deprecated: Creation of dynamic property",
            now(),
        );
        assert_eq!(deprecated.level, Level::Notice);

        let parse = classify_line(
            "[01-Jan-2024 10:00:00 UTC] PHP Parse error: syntax error, unexpected '}'",
            now(),
        );
        assert_eq!(parse.level, Level::Fatal);
        assert_eq!(parse.message, "syntax error, unexpected '}'");

        let catchable = classify_line(
            "[01-Jan-2024 10:00:00 UTC] PHP Catchable fatal error: Object could not be converted",
            now(),
        );
        assert_eq!(catchable.level, Level::Error);
    }

    #[test]
    fn test_php_label_is_case_insensitive() {
        let entry = classify_line("[01-Jan-2024 10:00:00 UTC] PHP FATAL ERROR: boom", now());
        assert_eq!(entry.level, Level::Fatal);
        assert_eq!(entry.message, "boom");
    }

    #[test]
    fn test_php_unknown_label_defaults_to_info() {
        let entry = classify_line("[01-Jan-2024 10:00:00 UTC] PHP Stack trace:", now());
        assert_eq!(entry.level, Level::Info);
        assert_eq!(entry.message, "");
    }

    #[test]
    fn test_unknown_tag_falls_through_to_keyword_search() {
        let line = "[Mon Jan 01 10:00:00.123456 2024] [php7:error] [pid 42] PHP Warning: foo";
        assert!(match_level_tag(line).is_none());

        let entry = classify_line(line, now());
        assert_eq!(entry.level, Level::Error);
        assert_eq!(entry.message, "[php7:error] [pid 42] PHP Warning: foo");
        assert_eq!(
            entry.timestamp,
            utc(2024, 1, 1, 10, 0, 0) + chrono::Duration::microseconds(123456)
        );
    }

    #[test]
    fn test_keyword_requires_word_boundary() {
        let entry = classify_line("[2024-01-01 10:00:00] no errors, debugging disabled", now());
        assert_eq!(entry.level, Level::Info);
    }

    #[test]
    fn test_first_keyword_wins() {
        let entry = classify_line("[2024-01-01 10:00:00] warning raised after error", now());
        assert_eq!(entry.level, Level::Warning);
    }

    #[test]
    fn test_malformed_timestamp_falls_back_to_ingestion_time() {
        let entry = classify_line("[not a date] PHP Fatal error: still fatal", now());

        assert_eq!(entry.level, Level::Fatal);
        assert_eq!(entry.message, "still fatal");
        assert_eq!(entry.timestamp, now());
        assert!(!entry.timestamp_parsed);
    }

    #[test]
    fn test_bracketed_level_without_timestamp() {
        let entry = classify_line("[error] cron job failed", now());

        assert_eq!(entry.level, Level::Error);
        assert_eq!(entry.message, "cron job failed");
        assert_eq!(entry.timestamp, now());
    }

    #[test]
    fn test_matchers_are_independent() {
        let line = "[01-Jan-2024 10:00:01 UTC] [warning] Deprecated function";
        assert!(match_php_error(line).is_none());
        assert!(match_level_tag(line).is_some());

        // The stamped matcher accepts it too; only ordering keeps it from winning.
        let loose = match_timestamp_only(line).unwrap();
        assert_eq!(loose.message, "[warning] Deprecated function");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = utc(2024, 1, 1, 10, 0, 0);

        assert_eq!(parse_timestamp("01-Jan-2024 10:00:00 UTC"), Some(expected));
        assert_eq!(parse_timestamp("01-Jan-2024 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("01-Jan-2024 10:00:00 America/New_York"), Some(expected));
        assert_eq!(parse_timestamp("01-Jan-2024 12:00:00 +0200"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T11:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("Mon Jan 01 10:00:00 2024"), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("warning"), None);
        assert_eq!(parse_timestamp("32-Jan-2024 10:00:00 UTC"), None);
        assert_eq!(parse_timestamp("2024-13-01 10:00:00"), None);
    }

    #[test]
    fn test_find_level_keyword() {
        assert_eq!(find_level_keyword("a FATAL thing"), Some(Level::Fatal));
        assert_eq!(find_level_keyword("info: started"), Some(Level::Info));
        assert_eq!(find_level_keyword("nothing here"), None);
    }
}
