//! Quarterly period grid.
//!
//! Raw report dates are snapped onto one canonical date per calendar quarter so
//! that filings dated the 28th, 30th or 31st of a quarter's month all land on
//! the same panel period. The mapping is total: every valid raw date has
//! exactly one canonical period.

use crate::{PipelineError, Result};
use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Raw date encoding of the input file.
pub const RAW_DATE_FORMAT: &str = "%Y%m%d";

/// Encoding of canonical periods in the panel `date` column.
pub const PERIOD_FORMAT: &str = "%Y-%m-%d";

/// Month each calendar quarter is anchored to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuarterAnchor {
    /// Last month of the quarter: March, June, September, December
    #[display("quarter-end")]
    QuarterEnd,
    /// First month of the quarter: January, April, July, October
    #[display("quarter-start")]
    QuarterStart,
}

impl QuarterAnchor {
    /// Anchor month for a calendar month in 1..=12.
    pub const fn anchor_month(self, month: u32) -> u32 {
        let quarter = (month - 1) / 3;
        match self {
            Self::QuarterEnd => quarter * 3 + 3,
            Self::QuarterStart => quarter * 3 + 1,
        }
    }

    /// Snap a date onto its canonical quarter anchor.
    pub fn snap(self, date: NaiveDate, anchor_day: u32) -> Result<NaiveDate> {
        let month = self.anchor_month(date.month());
        NaiveDate::from_ymd_opt(date.year(), month, anchor_day).ok_or_else(|| {
            PipelineError::config("loader.anchor_day", format!("{anchor_day} is not a valid day"))
        })
    }
}

impl FromStr for QuarterAnchor {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quarter-end" => Ok(Self::QuarterEnd),
            "quarter-start" => Ok(Self::QuarterStart),
            other => Err(PipelineError::config(
                "loader.anchor",
                format!("unsupported anchor scheme {other:?}"),
            )),
        }
    }
}

/// Parse a raw `YYYYMMDD` date and return its canonical period string.
///
/// `symbol` is only used to identify the row in the error.
pub fn canonical_period(
    raw: &str,
    symbol: &str,
    anchor: QuarterAnchor,
    anchor_day: u32,
) -> Result<String> {
    // integer-valued floats such as "20180331.0" are common in exported extracts
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    let date = NaiveDate::parse_from_str(digits, RAW_DATE_FORMAT).map_err(|_| {
        PipelineError::InvalidDate {
            symbol: symbol.to_string(),
            raw: raw.to_string(),
        }
    })?;
    Ok(anchor
        .snap(date, anchor_day)?
        .format(PERIOD_FORMAT)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("20180131", "2018-03-28")]
    #[case("20180228", "2018-03-28")]
    #[case("20180331", "2018-03-28")]
    #[case("20180401", "2018-06-28")]
    #[case("20180630", "2018-06-28")]
    #[case("20180715", "2018-09-28")]
    #[case("20180930", "2018-09-28")]
    #[case("20181001", "2018-12-28")]
    #[case("20181231", "2018-12-28")]
    fn test_quarter_end_buckets(#[case] raw: &str, #[case] expected: &str) {
        let period = canonical_period(raw, "AAPL", QuarterAnchor::QuarterEnd, 28).unwrap();
        assert_eq!(period, expected);
    }

    #[rstest]
    #[case("20180331", "2018-01-28")]
    #[case("20180630", "2018-04-28")]
    #[case("20180930", "2018-07-28")]
    #[case("20181231", "2018-10-28")]
    fn test_quarter_start_buckets(#[case] raw: &str, #[case] expected: &str) {
        let period = canonical_period(raw, "AAPL", QuarterAnchor::QuarterStart, 28).unwrap();
        assert_eq!(period, expected);
    }

    #[test]
    fn test_float_encoded_date() {
        let period = canonical_period("20200630.0", "MSFT", QuarterAnchor::QuarterEnd, 1).unwrap();
        assert_eq!(period, "2020-06-01");
    }

    #[rstest]
    #[case("2018-03-31")]
    #[case("20181301")]
    #[case("")]
    fn test_invalid_date(#[case] raw: &str) {
        match canonical_period(raw, "ABBV", QuarterAnchor::QuarterEnd, 28) {
            Err(PipelineError::InvalidDate { symbol, raw: r }) => {
                assert_eq!(symbol, "ABBV");
                assert_eq!(r, raw);
            }
            other => panic!("expected invalid date, got {other:?}"),
        }
    }

    #[test]
    fn test_anchor_from_str() {
        assert_eq!(
            "quarter-end".parse::<QuarterAnchor>().unwrap(),
            QuarterAnchor::QuarterEnd
        );
        assert_eq!(QuarterAnchor::QuarterStart.to_string(), "quarter-start");
        assert!("monthly".parse::<QuarterAnchor>().unwrap_err().is_config());
    }
}
