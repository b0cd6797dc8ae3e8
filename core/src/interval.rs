//! Monthly draw intervals and their windows

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::CASHOUT_HOUR;
use crate::error::{CoreError, Result};

/// One draw cycle, keyed `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    year: i32,
    month: u32,
}

/// Half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time < self.end
    }
}

impl Interval {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(CoreError::InvalidInterval(format!("{}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Interval of the calendar month `now` falls in, seen from `offset`
    pub fn containing(now: DateTime<Utc>, offset: &FixedOffset) -> Self {
        let local = now.with_timezone(offset);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Moment this interval's draw becomes due.
    ///
    /// Start of the month, pushed to the Sunday closing its ISO week, at
    /// 21:00 local time. A month starting on a Sunday cashes out on the 1st.
    pub fn cashout_date(&self, offset: &FixedOffset) -> DateTime<Utc> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN);
        let to_sunday = 6 - i64::from(first.weekday().num_days_from_monday());
        let sunday = first + Duration::days(to_sunday);
        let naive = sunday
            .and_hms_opt(CASHOUT_HOUR, 0, 0)
            .unwrap_or_else(|| sunday.and_time(Default::default()));

        // A fixed offset maps every local time to exactly one instant
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }

    /// `[cashout(previous), cashout(self))`
    pub fn window(&self, offset: &FixedOffset) -> Window {
        Window {
            start: self.previous().cashout_date(offset),
            end: self.cashout_date(offset),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Interval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidInterval(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Interval::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Interval {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.to_string()
    }
}
