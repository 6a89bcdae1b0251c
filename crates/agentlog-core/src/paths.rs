//! Timestamp and filename helpers
//!
//! Log files are named `<start-time>_<id-prefix>.jsonl` so a plain directory
//! listing sorts them chronologically.

use chrono::{DateTime, SecondsFormat, Utc};

/// Extension used for session log files
pub const LOG_FILE_EXTENSION: &str = "jsonl";

const FILENAME_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Current UTC time as an ISO-8601 string with millisecond precision
pub fn now_iso() -> String {
    to_iso(Utc::now())
}

/// Format a UTC time as an ISO-8601 string with millisecond precision
pub fn to_iso(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// First `len` characters of a session identifier, made safe for filenames
pub fn session_id_prefix(session_id: &str, len: usize) -> String {
    session_id
        .chars()
        .take(len)
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' | '.' => '-',
            _ => c,
        })
        .collect()
}

/// Suffix shared by every log file of a session
pub fn session_file_suffix(session_id: &str, prefix_len: usize) -> String {
    format!(
        "_{}.{LOG_FILE_EXTENSION}",
        session_id_prefix(session_id, prefix_len)
    )
}

/// Deterministic log filename for a session first seen at `started_at`
pub fn session_file_name(started_at: DateTime<Utc>, session_id: &str, prefix_len: usize) -> String {
    format!(
        "{}{}",
        started_at.format(FILENAME_TIME_FORMAT),
        session_file_suffix(session_id, prefix_len)
    )
}

/// Variant of a log filename with a `-<n>` counter after the timestamp
///
/// The session suffix is kept so the file is still found on resumption.
pub fn disambiguated_file_name(file_name: &str, n: usize) -> String {
    match file_name.split_once('_') {
        Some((stamp, rest)) => format!("{stamp}-{n}_{rest}"),
        None => format!("{n}-{file_name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_now_iso_is_rfc3339() {
        let stamp = now_iso();
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn test_to_iso_uses_millis() {
        assert_eq!(to_iso(fixed_time()), "2026-03-14T09:26:53.000Z");
    }

    #[rstest]
    #[case("abc12345-6789-ffff", 8, "2026-03-14T09-26-53_abc12345.jsonl")]
    #[case("short", 8, "2026-03-14T09-26-53_short.jsonl")]
    #[case("abc12345-6789-ffff", 4, "2026-03-14T09-26-53_abc1.jsonl")]
    #[case("a/b\\c:d", 8, "2026-03-14T09-26-53_a-b-c-d.jsonl")]
    fn test_session_file_name(#[case] id: &str, #[case] len: usize, #[case] expected: &str) {
        assert_eq!(session_file_name(fixed_time(), id, len), expected);
    }

    #[test]
    fn test_file_names_sort_chronologically() {
        let earlier = session_file_name(fixed_time(), "zzzzzzzz", 8);
        let later = session_file_name(
            Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap(),
            "aaaaaaaa",
            8,
        );
        assert!(earlier < later);
    }

    #[test]
    fn test_suffix_matches_file_name() {
        let name = session_file_name(fixed_time(), "abc12345xyz", 8);
        assert!(name.ends_with(&session_file_suffix("abc12345other", 8)));
    }

    #[rstest]
    #[case("2026-03-14T09-26-53_a-b.jsonl", 1, "2026-03-14T09-26-53-1_a-b.jsonl")]
    #[case("2026-03-14T09-26-53_a_b.jsonl", 2, "2026-03-14T09-26-53-2_a_b.jsonl")]
    #[case("plain.jsonl", 3, "3-plain.jsonl")]
    fn test_disambiguated_file_name(#[case] name: &str, #[case] n: usize, #[case] expected: &str) {
        assert_eq!(disambiguated_file_name(name, n), expected);
    }

    #[test]
    fn test_disambiguated_name_keeps_session_suffix() {
        let name = session_file_name(fixed_time(), "a.b12345", 8);
        assert!(disambiguated_file_name(&name, 1).ends_with(&session_file_suffix("a-b12345", 8)));
    }
}
