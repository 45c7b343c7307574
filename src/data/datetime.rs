use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Date-time layouts tried when detecting a timestamp column, most specific first.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

/// How a timestamp column is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// RFC 3339 / ISO 8601 with an offset, e.g. `2021-08-09T00:01:00+01:00`.
    Rfc3339,
    /// A `chrono` strftime pattern from [`DATE_FORMATS`].
    Pattern(&'static str),
}

/// Detect the most likely format for a column's non-empty values.
///
/// Formats are ranked by parse success over the first 100 values. The first
/// ranked format that parses every value wins, so an ambiguous prefix
/// (day-first dates with days up to 12) does not lock in the wrong layout.
/// Otherwise the best-scoring format is returned, or `None` if nothing parses.
pub fn detect_format(values: &[String]) -> Option<TimestampFormat> {
    let cells: Vec<&str> = values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let sample = &cells[..cells.len().min(100)];

    let mut ranked: Vec<(TimestampFormat, usize)> = std::iter::once(TimestampFormat::Rfc3339)
        .chain(DATE_FORMATS.iter().map(|f| TimestampFormat::Pattern(*f)))
        .map(|format| {
            let hits = sample
                .iter()
                .filter(|s| parse_timestamp(s, format).is_some())
                .count();
            (format, hits)
        })
        .filter(|&(_, hits)| hits > 0)
        .collect();
    // Stable: ties keep DATE_FORMATS order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .iter()
        .find(|(format, _)| cells.iter().all(|s| parse_timestamp(s, *format).is_some()))
        .or_else(|| ranked.first())
        .map(|&(format, _)| format)
}

/// Parse one value under `format`. Offsetted values keep their local wall-clock
/// time; no timezone conversion is done.
pub fn parse_timestamp(value: &str, format: TimestampFormat) -> Option<NaiveDateTime> {
    let value = value.trim();
    match format {
        TimestampFormat::Rfc3339 => chrono::DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.naive_local()),
        TimestampFormat::Pattern(fmt) => NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, fmt)
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detects_dashboard_layout() {
        let values = strings(&["2021-08-09 00:01", "2021-08-09 00:02", ""]);
        assert_eq!(
            detect_format(&values),
            Some(TimestampFormat::Pattern("%Y-%m-%d %H:%M"))
        );
    }

    #[test]
    fn test_detects_rfc3339() {
        let values = strings(&["2021-08-09T00:01:00Z", "2021-08-09T00:02:00+01:00"]);
        assert_eq!(detect_format(&values), Some(TimestampFormat::Rfc3339));
    }

    #[test]
    fn test_rfc3339_keeps_wall_clock() {
        let dt = parse_timestamp("2021-08-09T10:30:00+01:00", TimestampFormat::Rfc3339).unwrap();
        assert_eq!(dt.to_string(), "2021-08-09 10:30:00");
    }

    #[test]
    fn test_date_only_is_midnight() {
        let dt = parse_timestamp("2021-08-09", TimestampFormat::Pattern("%Y-%m-%d")).unwrap();
        assert_eq!(dt.to_string(), "2021-08-09 00:00:00");
    }

    #[test]
    fn test_day_first_found_past_ambiguous_prefix() {
        let mut values: Vec<String> = (1..=12)
            .cycle()
            .take(150)
            .map(|d| format!("{d:02}/08/2021 10:00"))
            .collect();
        values.push("25/08/2021 10:00".to_string());

        let format = detect_format(&values).unwrap();
        assert_eq!(format, TimestampFormat::Pattern("%d/%m/%Y %H:%M"));
        assert!(values.iter().all(|v| parse_timestamp(v, format).is_some()));
    }

    #[test]
    fn test_ambiguous_column_keeps_month_first() {
        let values = strings(&["01/02/2021 10:00", "03/04/2021 10:00"]);
        assert_eq!(
            detect_format(&values),
            Some(TimestampFormat::Pattern("%m/%d/%Y %H:%M"))
        );
    }

    #[test]
    fn test_garbage_detects_nothing() {
        assert_eq!(detect_format(&strings(&["n/a", "-", ""])), None);
        assert_eq!(detect_format(&[]), None);
    }
}
