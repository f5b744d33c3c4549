//! Pure display formatting: byte sizes, dates, HTML escaping and file-type
//! icons. No I/O and no shared state, so everything here is directly testable.

use chrono::{DateTime, NaiveDateTime};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable byte count, scaled by powers of 1024 to the largest unit
/// where the scaled value is at least 1. Up to two decimal places, trailing
/// zeros stripped: 0 -> "0 Bytes", 1536 -> "1.5 KB".
pub fn human_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut scaled = bytes as f64;
    let mut exponent = 0;
    while scaled >= 1024.0 && exponent < SIZE_UNITS.len() - 1 {
        scaled /= 1024.0;
        exponent += 1;
    }
    format!("{} {}", trim_decimals(scaled), SIZE_UNITS[exponent])
}

fn trim_decimals(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Icon for a filename, chosen by the lowercased extension after the last
/// dot. Unknown or missing extensions fall back to a generic icon.
pub fn icon_for(filename: &str) -> &'static str {
    let extension = filename
        .rfind('.')
        .map(|index| filename[index + 1..].to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "📕",
        "doc" | "docx" => "📘",
        "ppt" | "pptx" => "📙",
        "xls" | "xlsx" | "csv" => "📗",
        "txt" | "md" => "📄",
        "jpg" | "jpeg" | "png" | "gif" => "🖼️",
        "zip" | "rar" | "7z" => "🗜️",
        "mp4" | "mov" => "🎬",
        "mp3" | "wav" => "🎵",
        _ => "📎",
    }
}

/// Escape `& < > " '` for safe insertion into markup. `&` is replaced first,
/// so text that is already plain never gets double-encoded.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Short display date from a server timestamp. Missing or unparseable input
/// yields "Unknown" rather than an error.
pub fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "Unknown".to_string();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%b %-d, %Y").to_string();
    }
    // The backend emits naive ISO timestamps without an offset.
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%b %-d, %Y").to_string();
    }
    "Unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_is_literal() {
        assert_eq!(human_size(0), "0 Bytes");
    }

    #[test]
    fn sizes_below_one_kilobyte_stay_in_bytes() {
        assert_eq!(human_size(532), "532 Bytes");
        assert_eq!(human_size(1023), "1023 Bytes");
    }

    #[test]
    fn kilobyte_boundary_and_fraction() {
        assert_eq!(human_size(1024), "1 KB");
        assert_eq!(human_size(1536), "1.5 KB");
    }

    #[test]
    fn larger_units_round_to_two_decimals() {
        assert_eq!(human_size(50 * 1024 * 1024), "50 MB");
        assert_eq!(human_size(1024 * 1024 * 1024), "1 GB");
        assert_eq!(human_size(1_572_864), "1.5 MB");
    }

    #[test]
    fn unit_never_exceeds_gigabytes() {
        assert!(human_size(5 * 1024u64.pow(4)).ends_with(" GB"));
    }

    #[test]
    fn escapes_script_tags_completely() {
        let escaped = escape_html("<script>alert('x')</script>");
        for forbidden in ['<', '>', '"', '\''] {
            assert!(!escaped.contains(forbidden), "raw {forbidden:?} survived");
        }
        assert_eq!(
            escaped,
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        assert_eq!(escape_html("Linear Algebra notes"), "Linear Algebra notes");
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn ampersand_is_encoded_once() {
        assert_eq!(escape_html("rock & roll"), "rock &amp; roll");
    }

    #[test]
    fn icon_lookup_is_case_insensitive() {
        assert_eq!(icon_for("Notes.PDF"), "📕");
        assert_eq!(icon_for("archive.tar.gz"), "📎");
        assert_eq!(icon_for("photo.JPeG"), "🖼️");
    }

    #[test]
    fn icon_falls_back_without_extension() {
        assert_eq!(icon_for("README"), "📎");
    }

    #[test]
    fn formats_rfc3339_and_naive_dates() {
        assert_eq!(format_date(Some("2026-08-26T10:30:00Z")), "Aug 26, 2026");
        assert_eq!(
            format_date(Some("2026-08-26T10:30:00.123456")),
            "Aug 26, 2026"
        );
    }

    #[test]
    fn invalid_or_missing_dates_are_unknown() {
        assert_eq!(format_date(None), "Unknown");
        assert_eq!(format_date(Some("not a date")), "Unknown");
        assert_eq!(format_date(Some("")), "Unknown");
    }
}
