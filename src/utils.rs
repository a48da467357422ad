//! Shared utility functions

use tagwatch::config::MAX_POLL_INTERVAL_SECS;

/// Minimum poll interval, keeps the intranet from being hammered
pub const MIN_INTERVAL_SECS: u64 = 5;

/// Duration parser - supports "30s", "5m", "2h" or plain seconds
pub fn parse_duration(s: &str) -> Option<u64> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Some(secs);
    }

    let (num_str, unit) = if let Some(n) = s.strip_suffix('s') {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60u64)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600u64)
    } else {
        return None;
    };

    num_str.parse::<u64>().ok()?.checked_mul(unit)
}

/// Parse an interval string into seconds, enforcing the minimum
pub fn parse_interval_str(s: &str) -> tagwatch::Result<u64> {
    let secs = parse_duration(s).ok_or_else(|| {
        tagwatch::TagwatchError::ConfigError(format!(
            "Invalid interval '{}'. Use format like 30s, 5m, 1h", s
        ))
    })?;

    if secs < MIN_INTERVAL_SECS {
        return Err(tagwatch::TagwatchError::ConfigError(format!(
            "Interval {}s is too short. Minimum is {}s.",
            secs, MIN_INTERVAL_SECS
        )));
    }

    if secs > MAX_POLL_INTERVAL_SECS {
        return Err(tagwatch::TagwatchError::ConfigError(format!(
            "Interval {} is too long. Maximum is {}.",
            s.trim(), format_interval(MAX_POLL_INTERVAL_SECS)
        )));
    }

    Ok(secs)
}

/// Format seconds as human-readable interval (e.g., "30s", "5m")
pub fn format_interval(secs: u64) -> String {
    if secs < 60 || secs % 60 != 0 {
        format!("{}s", secs)
    } else if secs < 3600 || secs % 3600 != 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h", secs / 3600)
    }
}

/// Accept bare hosts ("localhost:3000/p1") as well as full URLs
pub fn page_url(input: &str) -> tagwatch::Result<url::Url> {
    let input = input.trim();
    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else if input.starts_with("localhost") || input.starts_with("127.0.0.1") {
        format!("http://{}", input)
    } else {
        format!("https://{}", input)
    };
    Ok(url::Url::parse(&with_scheme)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(30));
        assert_eq!(parse_duration("5m"), Some(300));
        assert_eq!(parse_duration("2h"), Some(7200));
        assert_eq!(parse_duration("45"), Some(45));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn test_interval_minimum() {
        assert_eq!(parse_interval_str("5s").unwrap(), 5);
        assert!(parse_interval_str("2s").is_err());
        assert!(parse_interval_str("abc").is_err());
    }

    #[test]
    fn test_interval_maximum() {
        assert_eq!(parse_interval_str("24h").unwrap(), 86400);
        assert!(parse_interval_str("25h").is_err());
        assert!(parse_interval_str("18446744073709551615").is_err());
        assert_eq!(parse_duration("9999999999999999999h"), None);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(30), "30s");
        assert_eq!(format_interval(90), "90s");
        assert_eq!(format_interval(300), "5m");
        assert_eq!(format_interval(7200), "2h");
    }

    #[test]
    fn test_page_url() {
        assert_eq!(page_url("localhost:3000/").unwrap().as_str(), "http://localhost:3000/");
        assert_eq!(
            page_url("intra.forge.epita.fr/p1").unwrap().as_str(),
            "https://intra.forge.epita.fr/p1"
        );
        assert_eq!(page_url("http://x.test/a").unwrap().as_str(), "http://x.test/a");
    }
}
