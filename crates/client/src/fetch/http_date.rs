//! HTTP-date formatting and parsing (RFC 9110 §5.6.7).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Obsolete forms recipients are still required to accept.
const OBSOLETE_FORMATS: [&str; 2] = [
    // RFC 850
    "%A, %d-%b-%y %H:%M:%S GMT",
    // asctime()
    "%a %b %e %H:%M:%S %Y",
];

/// Format a timestamp as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP-date in any of the three accepted forms.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    OBSOLETE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
