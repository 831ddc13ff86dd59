//! Go-style duration strings: `30s`, `5m`, `1h30m`, `500ms`.

use std::time::Duration;

/// Parse a duration string like "5s", "500ms", "1h30m".
///
/// A bare number is taken as seconds. Units may be chained and the number
/// before a unit may carry a fraction (`1.5h`).
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() {
            return None;
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let unit_nanos: u64 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return None,
        };

        let part = match number.parse::<u64>() {
            Ok(whole) => Duration::from_nanos(whole.checked_mul(unit_nanos)?),
            Err(_) => {
                let value: f64 = number.parse().ok()?;
                Duration::try_from_secs_f64(value * unit_nanos as f64 / 1e9).ok()?
            }
        };
        total = total.checked_add(part)?;
        rest = next;
    }

    Some(total)
}

/// Render a duration in the same compact form [`parse_duration`] accepts.
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }

    let mut out = String::new();
    let mut secs = d.as_secs();
    let nanos = d.subsec_nanos();
    let millis = nanos / 1_000_000;
    let micros = nanos / 1_000 % 1_000;
    let sub_micros = nanos % 1_000;

    let hours = secs / 3_600;
    secs %= 3_600;
    let mins = secs / 60;
    secs %= 60;

    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if mins > 0 {
        out.push_str(&format!("{mins}m"));
    }
    if secs > 0 {
        out.push_str(&format!("{secs}s"));
    }
    if millis > 0 {
        out.push_str(&format!("{millis}ms"));
    }
    if micros > 0 {
        out.push_str(&format!("{micros}us"));
    }
    if sub_micros > 0 {
        out.push_str(&format!("{sub_micros}ns"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("900s"), Some(Duration::from_secs(900)));
    }

    #[test]
    fn parse_duration_milliseconds() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn parse_duration_minutes_and_hours() {
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7_200)));
    }

    #[test]
    fn parse_duration_compound() {
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5_400)));
        assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(
            parse_duration("2s250ms"),
            Some(Duration::from_millis(2_250))
        );
    }

    #[test]
    fn parse_duration_fractional() {
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5_400)));
        assert_eq!(parse_duration("0.5s"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn parse_duration_plain_number_as_seconds() {
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration(" 30 "), Some(Duration::from_secs(30)));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("5x"), None);
        assert_eq!(parse_duration("m5"), None);
        assert_eq!(parse_duration("5s-"), None);
    }

    #[test]
    fn format_duration_compact() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
        assert_eq!(format_duration(Duration::from_secs(900)), "15m");
        assert_eq!(format_duration(Duration::from_secs(5_430)), "1h30m30s");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1s500ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn format_duration_keeps_sub_millisecond_parts() {
        assert_eq!(format_duration(Duration::from_micros(1_500)), "1ms500us");
        assert_eq!(format_duration(Duration::from_nanos(2_000_007)), "2ms7ns");
        assert_eq!(format_duration(Duration::from_nanos(750)), "750ns");
    }

    #[test]
    fn format_then_parse_is_stable() {
        for d in [
            Duration::from_secs(30),
            Duration::from_secs(5_430),
            Duration::from_millis(250),
            Duration::from_micros(1_500),
            Duration::from_nanos(1_000_001_001),
        ] {
            assert_eq!(parse_duration(&format_duration(d)), Some(d));
        }
    }
}
