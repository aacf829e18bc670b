use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

// Tried in order after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Reads a remote timestamp: an ISO 8601 string or seconds since the Unix
/// epoch, as a JSON number or numeric string.
///
/// Strings without an offset are taken as UTC; a bare date is midnight UTC.
/// Anything unreadable gives `None`.
pub fn parse_date(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(text) => parse_date_str(text),
        serde_json::Value::Number(number) => number.as_f64().and_then(from_epoch_seconds),
        _ => None,
    }
}

pub fn parse_date_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    text.parse::<f64>().ok().and_then(from_epoch_seconds)
}

fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_iso_strings() {
        let expected = utc(2014, 5, 1, 12, 0, 0);
        assert_eq!(parse_date(&json!("2014-05-01T12:00:00Z")), Some(expected));
        assert_eq!(parse_date(&json!("2014-05-01T14:00:00+02:00")), Some(expected));
        assert_eq!(parse_date(&json!("2014-05-01T14:00:00+0200")), Some(expected));
        assert_eq!(parse_date(&json!("2014-05-01T12:00:00")), Some(expected));
        assert_eq!(parse_date(&json!("2014-05-01 12:00:00")), Some(expected));
        assert_eq!(
            parse_date(&json!("2014-05-01")),
            Some(utc(2014, 5, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_fractional_seconds() {
        let parsed = parse_date(&json!("2014-05-01T12:00:00.250Z")).unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_epoch_values() {
        let expected = utc(2014, 5, 1, 12, 0, 0);
        let epoch = expected.timestamp();
        assert_eq!(parse_date(&json!(epoch)), Some(expected));
        assert_eq!(parse_date(&json!(epoch.to_string())), Some(expected));
        assert_eq!(
            parse_date(&json!(epoch as f64 + 0.5)).unwrap().timestamp_subsec_millis(),
            500
        );
    }

    #[test]
    fn test_unreadable_input() {
        assert_eq!(parse_date(&json!("not-a-date")), None);
        assert_eq!(parse_date(&json!("")), None);
        assert_eq!(parse_date(&json!(null)), None);
        assert_eq!(parse_date(&json!(true)), None);
        assert_eq!(parse_date(&json!({"at": 1})), None);
        assert_eq!(parse_date(&json!(1e300)), None);
    }
}
