use chrono::{DateTime, NaiveDate, NaiveDateTime};
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Deserializer};

use crate::error::GeosysError;

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Upper bound for buffers pre-sized from a server or archive supplied length.
const MAX_PREALLOC: u64 = 64 << 20;

pub(crate) fn prealloc(hint: u64) -> usize {
    hint.min(MAX_PREALLOC) as usize
}

pub(crate) fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), GeosysError> {
    if start > end {
        return Err(GeosysError::InvalidArgument(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    Ok(())
}

pub(crate) fn iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Parses `2020-01-01`, `2020-01-01T00:00:00`, `2020-01-01T00:00:00.0000000Z` or
/// an RFC 3339 timestamp, keeping the calendar date.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    None
}

pub(crate) fn de_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid date [{}]", s)))
}

/// The identity service hands out the refresh token as a cookie rather than in the body.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|c| c.split(';').next())
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn joins_urls() {
        assert_eq!(urljoin("http://a/", "/b"), "http://a/b");
        assert_eq!(urljoin("http://a", "b/c"), "http://a/b/c");
        assert_eq!(urljoin("http://a", "https://x/y"), "https://x/y");
    }

    #[test]
    fn parses_service_dates() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 3).unwrap();
        assert_eq!(parse_date("2020-01-03"), Some(d));
        assert_eq!(parse_date("2020-01-03T00:00:00"), Some(d));
        assert_eq!(parse_date("2020-01-03T00:00:00.0000000Z"), Some(d));
        assert_eq!(parse_date("2020-01-03T10:00:00+02:00"), Some(d));
        assert_eq!(parse_date("03/01/2020"), None);
    }

    #[test]
    fn rejects_inverted_range() {
        let a = NaiveDate::from_ymd_opt(2020, 1, 7).unwrap();
        let b = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(check_range(b, a).is_ok());
        assert!(check_range(a, a).is_ok());
        assert!(matches!(check_range(a, b), Err(GeosysError::InvalidArgument(_))));
    }

    #[test]
    fn size_hints_are_capped() {
        assert_eq!(prealloc(1024), 1024);
        assert_eq!(prealloc(u64::MAX), 64 << 20);
    }

    #[test]
    fn finds_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("idsrv=abc; path=/"));
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("refresh_token=r-123; path=/; HttpOnly"),
        );
        assert_eq!(cookie_value(&headers, "refresh_token").as_deref(), Some("r-123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
