//! Forecast offset axis, relative to one runtime.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

use super::{CoordValue, CoordinateType};
use crate::error::{CoordError, Result};
use crate::time::{TimeOffset, TimeUnit};

/// Name reported when interval lengths differ across one axis.
pub const MIXED_INTERVALS: &str = "Mixed_intervals";

/// Sorted, distinct forecast offsets, all points or all intervals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoordinateTime {
    code: i32,
    time_unit: TimeUnit,
    ref_date: Option<DateTime<Utc>>,
    is_interval: bool,
    values: Vec<TimeOffset>,
}

impl CoordinateTime {
    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    pub fn unit(&self) -> String {
        self.time_unit.to_string()
    }

    /// Runtime the offsets are measured from, when known.
    pub fn ref_date(&self) -> Option<DateTime<Utc>> {
        self.ref_date
    }

    pub fn is_interval(&self) -> bool {
        self.is_interval
    }

    pub fn coord_type(&self) -> CoordinateType {
        if self.is_interval {
            CoordinateType::TimeIntv
        } else {
            CoordinateType::Time
        }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[TimeOffset] {
        &self.values
    }

    pub fn value(&self, idx: usize) -> Result<TimeOffset> {
        self.values
            .get(idx)
            .copied()
            .ok_or_else(|| CoordError::out_of_range(idx, self.values.len()))
    }

    pub fn index_of(&self, value: &TimeOffset) -> Option<usize> {
        self.values.binary_search(value).ok()
    }

    /// Same offsets, measured from another runtime.
    pub fn with_ref_date(&self, ref_date: Option<DateTime<Utc>>) -> Self {
        Self {
            ref_date,
            ..self.clone()
        }
    }

    /// Common interval length as `"<n>_<unit>"`, [`MIXED_INTERVALS`] when
    /// lengths differ, `None` for point offsets.
    pub fn interval_name(&self) -> Option<String> {
        if !self.is_interval {
            return None;
        }
        let lengths: BTreeSet<i32> = self
            .values
            .iter()
            .filter_map(|v| match v {
                TimeOffset::Interval(intv) => Some(intv.length() * self.time_unit.value()),
                TimeOffset::Point(_) => None,
            })
            .collect();
        match lengths.len() {
            0 => None,
            1 => lengths
                .first()
                .map(|len| format!("{}_{}", len, self.time_unit.field().name())),
            _ => Some(MIXED_INTERVALS.to_string()),
        }
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(
            out,
            "{} code={} unit={} n={}",
            self.coord_type(),
            self.code,
            self.unit(),
            self.size()
        )?;
        if let Some(name) = self.interval_name() {
            write!(out, " intervals={}", name)?;
        }
        writeln!(out)
    }

    pub fn show_coords(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}:", self.coord_type())?;
        for value in &self.values {
            write!(out, " {},", value)?;
        }
        writeln!(out)
    }
}

/// Accumulates offsets in any order.
#[derive(Debug, Clone)]
pub struct TimeBuilder {
    code: i32,
    time_unit: TimeUnit,
    ref_date: Option<DateTime<Utc>>,
    is_interval: bool,
    values: BTreeSet<TimeOffset>,
}

impl TimeBuilder {
    pub fn new(
        code: i32,
        time_unit: TimeUnit,
        ref_date: Option<DateTime<Utc>>,
        is_interval: bool,
    ) -> Self {
        Self {
            code,
            time_unit,
            ref_date,
            is_interval,
            values: BTreeSet::new(),
        }
    }

    pub fn add_offset(&mut self, offset: TimeOffset) -> Result<()> {
        if offset.is_interval() != self.is_interval {
            return Err(CoordError::MixedTimeKinds);
        }
        self.values.insert(offset);
        Ok(())
    }

    pub fn add(&mut self, value: &CoordValue) -> Result<()> {
        match value {
            CoordValue::Time(offset) => self.add_offset(*offset),
            other => Err(CoordError::type_mismatch(
                if self.is_interval {
                    CoordinateType::TimeIntv
                } else {
                    CoordinateType::Time
                },
                other.kind_name(),
            )),
        }
    }

    pub fn finish(self) -> CoordinateTime {
        CoordinateTime {
            code: self.code,
            time_unit: self.time_unit,
            ref_date: self.ref_date,
            is_interval: self.is_interval,
            values: self.values.into_iter().collect(),
        }
    }
}
