use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use httpdate::parse_http_date;

/// Delay requested by a `Retry-After` header, given as delta seconds or an HTTP-date.
pub fn parse_retry_after(headers: &BTreeMap<String, String>, now: SystemTime) -> Option<Duration> {
    let v = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("retry-after"))
        .map(|(_, v)| v.trim())?;
    if let Ok(secs) = v.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = parse_http_date(v).ok()?;
    at.duration_since(now).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_seconds_and_dates() {
        let now = SystemTime::now();
        let mut headers = BTreeMap::new();
        headers.insert("retry-after".to_string(), "3".to_string());
        assert_eq!(parse_retry_after(&headers, now), Some(Duration::from_secs(3)));

        headers.insert(
            "retry-after".to_string(),
            httpdate::fmt_http_date(now + Duration::from_secs(10)),
        );
        let d = parse_retry_after(&headers, now).unwrap();
        assert!(d.as_secs() >= 9 && d.as_secs() <= 10);
    }

    #[test]
    fn garbage_is_ignored() {
        let mut headers = BTreeMap::new();
        headers.insert("Retry-After".to_string(), "soon".to_string());
        assert_eq!(parse_retry_after(&headers, SystemTime::now()), None);
    }
}
