//! Time handling for forecast-model coordinates.
//!
//! Runtimes are absolute UTC instants. Forecast offsets are whole counts of a
//! [`TimeUnit`] measured from a runtime, either a single point or an
//! interval (accumulations, averages).

use chrono::{DateTime, Datelike, Duration, Months, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{CoordError, Result};

/// Slop added toward the later date when counting whole units, so a record
/// stamped 23:59:59 still lands on the next hour.
const OFFSET_SLOP_SECONDS: i64 = 5;

/// Calendar field a [`TimeUnit`] counts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodField {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl PeriodField {
    /// Fixed length in seconds, `None` for calendar-dependent fields.
    fn seconds(&self) -> Option<i64> {
        match self {
            PeriodField::Second => Some(1),
            PeriodField::Minute => Some(60),
            PeriodField::Hour => Some(3600),
            PeriodField::Day => Some(86_400),
            PeriodField::Month | PeriodField::Year => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PeriodField::Second => "second",
            PeriodField::Minute => "minute",
            PeriodField::Hour => "hour",
            PeriodField::Day => "day",
            PeriodField::Month => "month",
            PeriodField::Year => "year",
        }
    }
}

/// A calendar period: `value` multiples of `field` (e.g. 6 hours).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeUnit {
    value: i32,
    field: PeriodField,
}

impl TimeUnit {
    pub const HOUR: TimeUnit = TimeUnit {
        value: 1,
        field: PeriodField::Hour,
    };

    pub fn new(value: i32, field: PeriodField) -> Result<Self> {
        if value <= 0 {
            return Err(CoordError::InvalidTimeUnit(format!(
                "multiplier must be positive, got {}",
                value
            )));
        }
        Ok(Self { value, field })
    }

    /// Map a GRIB2 time unit code (code table 4.4).
    pub fn from_grib2_code(code: i32) -> Result<Self> {
        let (value, field) = match code {
            0 => (1, PeriodField::Minute),
            1 => (1, PeriodField::Hour),
            2 => (1, PeriodField::Day),
            3 => (1, PeriodField::Month),
            4 => (1, PeriodField::Year),
            10 => (3, PeriodField::Hour),
            11 => (6, PeriodField::Hour),
            12 => (12, PeriodField::Hour),
            13 => (1, PeriodField::Second),
            _ => {
                return Err(CoordError::InvalidTimeUnit(format!(
                    "unsupported GRIB2 time unit code {}",
                    code
                )))
            }
        };
        Self::new(value, field)
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn field(&self) -> PeriodField {
        self.field
    }

    /// Number of whole units from `start` to `end`, negative when `end` is
    /// earlier.
    pub fn offset(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
        if start == end {
            return 0;
        }

        let fields = match self.field.seconds() {
            Some(secs) => {
                let diff = (end - start).num_seconds();
                let slopped = if diff >= 0 {
                    diff + OFFSET_SLOP_SECONDS
                } else {
                    diff - OFFSET_SLOP_SECONDS
                };
                slopped / secs
            }
            None => {
                let slop = Duration::seconds(OFFSET_SLOP_SECONDS);
                let months = if start < end {
                    whole_months(start, end + slop)
                } else {
                    whole_months(start + slop, end)
                };
                match self.field {
                    PeriodField::Year => months / 12,
                    _ => months,
                }
            }
        };

        (fields / self.value as i64) as i32
    }

    /// Date `n` units after `date`.
    pub fn add(&self, date: DateTime<Utc>, n: i32) -> DateTime<Utc> {
        let total = n as i64 * self.value as i64;
        match self.field.seconds() {
            Some(secs) => date + Duration::seconds(total * secs),
            None => match self.field {
                PeriodField::Year => shift_months(date, total * 12),
                _ => shift_months(date, total),
            },
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value == 1 {
            write!(f, "{}", self.field.name())
        } else {
            write!(f, "{} {}", self.value, self.field.name())
        }
    }
}

fn whole_months(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let mut months = (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64
        - from.month() as i64;
    if months > 0 && shift_months(from, months) > to {
        months -= 1;
    } else if months < 0 && shift_months(from, months) < to {
        months += 1;
    }
    months
}

fn shift_months(date: DateTime<Utc>, months: i64) -> DateTime<Utc> {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs() as u32))
    };
    shifted.unwrap_or(date)
}

/// Parse a timestamp label.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and a bare
/// `YYYY-MM-DD` date.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}T00:00:00", s), "%Y-%m-%dT%H:%M:%S")
    {
        return Some(Utc.from_utc_datetime(&ndt));
    }

    None
}

/// Interval offsets `(start, end)` relative to a reference date.
///
/// Ordered by end bound, then start bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeIntv {
    pub start: i32,
    pub end: i32,
}

impl TimeIntv {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> i32 {
        self.end - self.start
    }

    /// Same interval seen from a reference date `n` units earlier.
    pub fn shift(&self, n: i32) -> Self {
        Self {
            start: self.start + n,
            end: self.end + n,
        }
    }

    /// Absolute dates of the bounds.
    pub fn to_date_value(&self, reference: DateTime<Utc>, unit: TimeUnit) -> TimeIntvDate {
        TimeIntvDate {
            start: unit.add(reference, self.start),
            end: unit.add(reference, self.end),
        }
    }
}

impl Ord for TimeIntv {
    fn cmp(&self, other: &Self) -> Ordering {
        self.end
            .cmp(&other.end)
            .then_with(|| self.start.cmp(&other.start))
    }
}

impl PartialOrd for TimeIntv {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeIntv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.start, self.end)
    }
}

/// Interval with absolute bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeIntvDate {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeIntvDate {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Express the bounds as offsets from `reference` in `unit`.
    pub fn convert_reference_date(&self, reference: DateTime<Utc>, unit: TimeUnit) -> TimeIntv {
        TimeIntv {
            start: unit.offset(reference, self.start),
            end: unit.offset(reference, self.end),
        }
    }
}

impl fmt::Display for TimeIntvDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = (self.start.to_rfc3339(), self.end.to_rfc3339());
        write!(f, "({} - {})", start, end)
    }
}

/// A forecast offset from a runtime: a single point or an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeOffset {
    Point(i32),
    Interval(TimeIntv),
}

impl TimeOffset {
    pub fn is_interval(&self) -> bool {
        matches!(self, TimeOffset::Interval(_))
    }

    pub fn shift(&self, n: i32) -> Self {
        match self {
            TimeOffset::Point(p) => TimeOffset::Point(p + n),
            TimeOffset::Interval(intv) => TimeOffset::Interval(intv.shift(n)),
        }
    }

    /// Offset of the valid time: the point itself or the interval end.
    pub fn valid_offset(&self) -> i32 {
        match self {
            TimeOffset::Point(p) => *p,
            TimeOffset::Interval(intv) => intv.end,
        }
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeOffset::Point(p) => write!(f, "{}", p),
            TimeOffset::Interval(intv) => write!(f, "{}", intv),
        }
    }
}

/// One `(runtime, offset)` cell of a two-level time coordinate.
///
/// Ordered by runtime, then offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Time2D {
    pub run: DateTime<Utc>,
    pub offset: TimeOffset,
}

impl Time2D {
    pub fn new(run: DateTime<Utc>, offset: TimeOffset) -> Self {
        Self { run, offset }
    }

    pub fn point(run: DateTime<Utc>, offset: i32) -> Self {
        Self::new(run, TimeOffset::Point(offset))
    }

    pub fn interval(run: DateTime<Utc>, start: i32, end: i32) -> Self {
        Self::new(run, TimeOffset::Interval(TimeIntv::new(start, end)))
    }

    /// Absolute valid time in `unit`.
    pub fn valid_time(&self, unit: TimeUnit) -> DateTime<Utc> {
        unit.add(self.run, self.offset.valid_offset())
    }
}

impl fmt::Display for Time2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.run.format("%Y-%m-%dT%H:%MZ"), self.offset)
    }
}
