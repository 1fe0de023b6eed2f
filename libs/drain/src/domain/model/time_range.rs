use chrono::{Datelike, NaiveDateTime};
use snafu::Snafu;
use std::fmt;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Invalid Time Range: start {} is after end {}", start, end))]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// Closed interval of calendar date-times, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, Error> {
        if start > end {
            Err(Error::InvalidRange { start, end })
        } else {
            Ok(TimeRange { start, end })
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Calendar months touched by the range, in ascending order.
    ///
    /// Months are compared as (year, month) pairs, so a range starting and
    /// ending in the middle of a month still yields every month it overlaps.
    pub fn months(&self) -> Months {
        Months {
            next: Some(Month::of(&self.start)),
            last: Month::of(&self.end),
        }
    }
}

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    #[cfg(test)]
    fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then(|| Month { year, month })
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Month {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Month {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn token(&self) -> MonthToken {
        MonthToken(format!("{:04}{:02}", self.year, self.month))
    }
}

/// `YYYYMM` key identifying the indices of one month, eg `202001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonthToken(String);

impl MonthToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MonthToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Iterator over the months of a [`TimeRange`].
#[derive(Debug, Clone)]
pub struct Months {
    next: Option<Month>,
    last: Month,
}

impl Iterator for Months {
    type Item = Month;

    fn next(&mut self) -> Option<Month> {
        let current = self.next.filter(|month| *month <= self.last)?;
        self.next = Some(current.succ());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid datetime")
    }

    #[test]
    fn should_reject_start_after_end() {
        let res = TimeRange::new(
            datetime("2020-02-01 00:00:00"),
            datetime("2020-01-31 23:59:59"),
        );
        assert!(std::matches!(res, Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn should_accept_empty_range() {
        let instant = datetime("2020-02-01 00:00:00");
        let range = TimeRange::new(instant, instant).expect("valid range");
        assert_eq!(range.months().count(), 1);
    }

    #[test]
    fn should_format_tokens_with_zero_padding() {
        assert_eq!(Month::new(2020, 1).unwrap().token().as_str(), "202001");
        assert_eq!(Month::new(2021, 12).unwrap().token().as_str(), "202112");
        assert_eq!(Month::new(987, 3).unwrap().token().as_str(), "098703");
        assert!(Month::new(2021, 13).is_none());
    }

    #[test]
    fn should_count_every_overlapped_month_with_mid_month_bounds() {
        let range = TimeRange::new(
            datetime("2019-09-15 12:00:00"),
            datetime("2020-02-03 08:30:00"),
        )
        .expect("valid range");

        let tokens = range
            .months()
            .map(|month| month.token().to_string())
            .collect::<Vec<_>>();

        assert_eq!(
            tokens,
            vec!["201909", "201910", "201911", "201912", "202001", "202002"]
        );
    }

    #[test]
    fn should_roll_over_december() {
        let month = Month::new(2020, 12).unwrap().succ();
        assert_eq!((month.year(), month.month()), (2021, 1));
    }
}
