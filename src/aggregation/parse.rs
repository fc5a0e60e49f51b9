use crate::error::{AppError, Result};

/// Characters the stats site uses as digit grouping separators.
const GROUPING: [char; 5] = [',', ' ', '\u{a0}', '\u{202f}', '\u{2009}'];

/// Parses a percent string such as `"54.2%"` into its numeric value (`54.2`).
/// A decimal comma is accepted when no `.` is present.
pub fn parse_percent(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let normalized = if !number.contains('.') {
        number.replacen(',', ".", 1)
    } else {
        number.to_string()
    };

    normalized
        .parse::<f64>()
        .map_err(|_| AppError::Parse(format!("not a percentage: {:?}", raw)))
}

/// Parses a games-played count such as `"1,234,567"`.
pub fn parse_count(raw: &str) -> Result<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| !GROUPING.contains(c)).collect();

    cleaned
        .parse::<f64>()
        .map_err(|_| AppError::Parse(format!("not a count: {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("54.2%").unwrap(), 54.2);
        assert_eq!(parse_percent(" 7% ").unwrap(), 7.0);
        assert_eq!(parse_percent("12,5 %").unwrap(), 12.5);
        assert_eq!(parse_percent("0.3").unwrap(), 0.3);
        assert!(parse_percent("X%").is_err());
        assert!(parse_percent("").is_err());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234,567").unwrap(), 1_234_567.0);
        assert_eq!(parse_count("12\u{a0}345").unwrap(), 12_345.0);
        assert_eq!(parse_count("0").unwrap(), 0.0);
        assert!(parse_count("n/a").is_err());
    }
}
