use regex::Regex;
use std::sync::OnceLock;

fn iso_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").ok())
        .as_ref()
}

/// Parse an ISO 8601 duration such as `PT1H2M3S` into seconds
pub fn parse_iso8601_duration(text: &str) -> Option<u64> {
    let caps = iso_pattern()?.captures(text.trim())?;
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    Some(part(1) * 86_400 + part(2) * 3600 + part(3) * 60 + part(4))
}

/// `H:MM:SS` when an hour or more, otherwise `MM:SS`
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format an ISO 8601 duration for display, `0:00` when unparseable
pub fn format_iso_duration(text: &str) -> String {
    parse_iso8601_duration(text)
        .map(format_duration)
        .unwrap_or_else(|| "0:00".to_string())
}

/// Whole minutes, rounded up
pub fn duration_minutes(seconds: u64) -> u64 {
    seconds.div_ceil(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT39M33S"), Some(2373));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT2H"), Some(7200));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
        assert_eq!(parse_iso8601_duration("12:30"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3723), "1:02:03");
        assert_eq!(format_duration(123), "02:03");
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_iso_duration("PT10M5S"), "10:05");
        assert_eq!(format_iso_duration("bogus"), "0:00");
    }

    #[test]
    fn test_duration_minutes_rounds_up() {
        assert_eq!(duration_minutes(0), 0);
        assert_eq!(duration_minutes(60), 1);
        assert_eq!(duration_minutes(61), 2);
        assert_eq!(duration_minutes(2373), 40);
    }
}
