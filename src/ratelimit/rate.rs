//! Rate string parsing.
//!
//! Rates are written as `"<count>/<unit>"`, e.g. `"100/min"` or `"5 / Seconds"`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FloodgateError, Result};

/// Time window unit of a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    /// Per-second rate limiting
    Second,
    /// Per-minute rate limiting
    Minute,
    /// Per-hour rate limiting
    Hour,
    /// Per-day rate limiting
    Day,
}

impl TimeWindow {
    /// Get the duration of this time window.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.as_secs())
    }

    /// Length of the window in whole seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            TimeWindow::Second => 1,
            TimeWindow::Minute => 60,
            TimeWindow::Hour => 3600,
            TimeWindow::Day => 86400,
        }
    }

    /// Resolve a unit spelling. Matching is case-insensitive and ignores
    /// surrounding whitespace.
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Some(TimeWindow::Second),
            "m" | "min" | "minute" | "minutes" => Some(TimeWindow::Minute),
            "h" | "hr" | "hour" | "hours" => Some(TimeWindow::Hour),
            "d" | "day" | "days" => Some(TimeWindow::Day),
            _ => None,
        }
    }

    fn from_secs(secs: u64) -> Option<Self> {
        match secs {
            1 => Some(TimeWindow::Second),
            60 => Some(TimeWindow::Minute),
            3600 => Some(TimeWindow::Hour),
            86400 => Some(TimeWindow::Day),
            _ => None,
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            TimeWindow::Second => "sec",
            TimeWindow::Minute => "min",
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
        }
    }
}

/// A parsed rate: at most `limit` requests per `window_secs` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateSpec {
    limit: u64,
    window_secs: u64,
}

impl RateSpec {
    /// Build a rate directly. Both values must be at least 1.
    pub fn new(limit: u64, window_secs: u64) -> Result<Self> {
        if limit == 0 || window_secs == 0 {
            return Err(FloodgateError::invalid_rate(
                &format!("{limit}/{window_secs}s"),
                "limit and window must both be positive",
            ));
        }
        Ok(Self { limit, window_secs })
    }

    /// Parse a rate string such as `"100/min"`.
    pub fn parse(rate: &str) -> Result<Self> {
        let (count, unit) = rate
            .split_once('/')
            .ok_or_else(|| FloodgateError::invalid_rate(rate, "expected '<count>/<unit>'"))?;

        let limit: u64 = count
            .trim()
            .parse()
            .map_err(|_| FloodgateError::invalid_rate(rate, format!("'{}' is not an integer", count.trim())))?;

        if limit == 0 {
            return Err(FloodgateError::invalid_rate(rate, "limit must be at least 1"));
        }

        let window = TimeWindow::from_unit(unit).ok_or_else(|| {
            FloodgateError::invalid_rate(rate, format!("unknown time unit '{}'", unit.trim()))
        })?;

        Ok(Self {
            limit,
            window_secs: window.as_secs(),
        })
    }

    /// Maximum requests allowed per window.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Window length in seconds.
    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl FromStr for RateSpec {
    type Err = FloodgateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match TimeWindow::from_secs(self.window_secs) {
            Some(window) => write!(f, "{}/{}", self.limit, window.short_name()),
            None => write!(f, "{}/{}s", self.limit, self.window_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window_duration() {
        assert_eq!(TimeWindow::Second.duration(), Duration::from_secs(1));
        assert_eq!(TimeWindow::Minute.duration(), Duration::from_secs(60));
        assert_eq!(TimeWindow::Hour.duration(), Duration::from_secs(3600));
        assert_eq!(TimeWindow::Day.duration(), Duration::from_secs(86400));
    }

    #[test]
    fn test_parse_common_rates() {
        assert_eq!(RateSpec::parse("100/min").unwrap(), RateSpec::new(100, 60).unwrap());
        assert_eq!(RateSpec::parse("5/sec").unwrap(), RateSpec::new(5, 1).unwrap());
        assert_eq!(RateSpec::parse("10/hr").unwrap().window_secs(), 3600);
        assert_eq!(RateSpec::parse("1000/days").unwrap().window_secs(), 86400);
    }

    #[test]
    fn test_unit_spellings() {
        for unit in ["s", "sec", "second", "seconds"] {
            assert_eq!(TimeWindow::from_unit(unit), Some(TimeWindow::Second));
        }
        for unit in ["m", "min", "minute", "minutes"] {
            assert_eq!(TimeWindow::from_unit(unit), Some(TimeWindow::Minute));
        }
        for unit in ["h", "hr", "hour", "hours"] {
            assert_eq!(TimeWindow::from_unit(unit), Some(TimeWindow::Hour));
        }
        for unit in ["d", "day", "days"] {
            assert_eq!(TimeWindow::from_unit(unit), Some(TimeWindow::Day));
        }
    }

    #[test]
    fn test_parse_is_case_and_space_tolerant() {
        let rate = RateSpec::parse("20/ MINUTES ").unwrap();
        assert_eq!(rate.limit(), 20);
        assert_eq!(rate.window_secs(), 60);

        let rate = RateSpec::parse(" 3 /Hour").unwrap();
        assert_eq!(rate.limit(), 3);
        assert_eq!(rate.window_secs(), 3600);
    }

    #[test]
    fn test_parse_rejects_unknown_unit() {
        let err = RateSpec::parse("3/bogus").unwrap_err();
        assert!(matches!(err, FloodgateError::InvalidRateSpec { ref rate, .. } if rate == "3/bogus"));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for bad in ["100", "", "abc/min", "1.5/min", "-1/min", "0/min", "5/min/extra", "/min"] {
            let err = RateSpec::parse(bad).unwrap_err();
            assert!(
                matches!(err, FloodgateError::InvalidRateSpec { .. }),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn test_new_rejects_zero() {
        assert!(RateSpec::new(0, 60).is_err());
        assert!(RateSpec::new(10, 0).is_err());
    }

    #[test]
    fn test_display_canonical_form() {
        assert_eq!(RateSpec::parse("100/minutes").unwrap().to_string(), "100/min");
        assert_eq!(RateSpec::parse("5/s").unwrap().to_string(), "5/sec");
        assert_eq!(RateSpec::new(7, 90).unwrap().to_string(), "7/90s");
    }

    #[test]
    fn test_from_str() {
        let rate: RateSpec = "2/day".parse().unwrap();
        assert_eq!(rate.limit(), 2);
        assert_eq!(rate.window(), Duration::from_secs(86400));
    }
}
