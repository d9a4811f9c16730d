//! Discrete, ordered, deduplicated coordinate axes.
//!
//! Every axis is accumulated by a builder (values in any order, duplicates
//! allowed) and frozen by `finish()` into a sorted, distinct, immutable
//! coordinate. The axis kinds form a closed set, so [`Coordinate`] is an
//! enum and every operation is an exhaustive match.
//!
//! Lookups never fail: `index_of` returns `None` when the axis does not
//! contain a value. Index access past the end of an axis is an error.

mod runtime;
mod time;
mod time2d;
mod unionizer;
mod vert;

pub use runtime::{CoordinateRuntime, RuntimeBuilder, RuntimeValue};
pub use time::{CoordinateTime, TimeBuilder, MIXED_INTERVALS};
pub use time2d::{
    test_orthogonal, test_regular, BestTimeCoordinate, CoordinateTime2D, Time2DBuilder,
    Time2DLayout,
};
pub use unionizer::{Time2DUnion, Time2DUnionizer};
pub use vert::{CoordinateVert, VertBuilder, VertLevel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::time::{Time2D, TimeOffset, TimeUnit};

/// Axis kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateType {
    Runtime,
    Time,
    TimeIntv,
    Time2D,
    Vertical,
}

impl CoordinateType {
    pub fn name(&self) -> &'static str {
        match self {
            CoordinateType::Runtime => "runtime",
            CoordinateType::Time => "time",
            CoordinateType::TimeIntv => "timeIntv",
            CoordinateType::Time2D => "time2D",
            CoordinateType::Vertical => "vert",
        }
    }
}

impl fmt::Display for CoordinateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single value on some axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoordValue {
    Runtime(RuntimeValue),
    Time(TimeOffset),
    Time2D(Time2D),
    Vertical(VertLevel),
}

impl CoordValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            CoordValue::Runtime(_) => "runtime",
            CoordValue::Time(TimeOffset::Point(_)) => "time",
            CoordValue::Time(TimeOffset::Interval(_)) => "timeIntv",
            CoordValue::Time2D(_) => "time2D",
            CoordValue::Vertical(_) => "vert",
        }
    }
}

impl From<DateTime<Utc>> for CoordValue {
    fn from(date: DateTime<Utc>) -> Self {
        CoordValue::Runtime(RuntimeValue::Date(date))
    }
}

impl From<TimeOffset> for CoordValue {
    fn from(offset: TimeOffset) -> Self {
        CoordValue::Time(offset)
    }
}

impl From<Time2D> for CoordValue {
    fn from(value: Time2D) -> Self {
        CoordValue::Time2D(value)
    }
}

impl From<VertLevel> for CoordValue {
    fn from(level: VertLevel) -> Self {
        CoordValue::Vertical(level)
    }
}

impl fmt::Display for CoordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordValue::Runtime(v) => write!(f, "{}", v),
            CoordValue::Time(v) => write!(f, "{}", v),
            CoordValue::Time2D(v) => write!(f, "{}", v),
            CoordValue::Vertical(v) => write!(f, "{}", v),
        }
    }
}

/// Structural identity of an axis: kind, code and ordered values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoordKey {
    pub coord_type: CoordinateType,
    pub code: i32,
    pub values: Vec<CoordValue>,
}

/// One immutable axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Coordinate {
    Runtime(CoordinateRuntime),
    Time(CoordinateTime),
    Time2D(CoordinateTime2D),
    Vertical(CoordinateVert),
}

impl Coordinate {
    pub fn coord_type(&self) -> CoordinateType {
        match self {
            Coordinate::Runtime(_) => CoordinateType::Runtime,
            Coordinate::Time(c) => c.coord_type(),
            Coordinate::Time2D(_) => CoordinateType::Time2D,
            Coordinate::Vertical(_) => CoordinateType::Vertical,
        }
    }

    /// Domain sub-type: time unit code for time axes, level type for
    /// vertical axes.
    pub fn code(&self) -> i32 {
        match self {
            Coordinate::Runtime(c) => c.code(),
            Coordinate::Time(c) => c.code(),
            Coordinate::Time2D(c) => c.code(),
            Coordinate::Vertical(c) => c.code(),
        }
    }

    pub fn unit(&self) -> String {
        match self {
            Coordinate::Runtime(c) => c.unit(),
            Coordinate::Time(c) => c.unit(),
            Coordinate::Time2D(c) => c.unit(),
            Coordinate::Vertical(c) => c.unit().to_string(),
        }
    }

    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            Coordinate::Runtime(c) => Some(c.time_unit()),
            Coordinate::Time(c) => Some(c.time_unit()),
            Coordinate::Time2D(c) => Some(c.time_unit()),
            Coordinate::Vertical(_) => None,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Coordinate::Runtime(c) => c.size(),
            Coordinate::Time(c) => c.size(),
            Coordinate::Time2D(c) => c.size(),
            Coordinate::Vertical(c) => c.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Position of `value`, or `None` when the axis does not hold it
    /// (including values of another kind).
    pub fn index_of(&self, value: &CoordValue) -> Option<usize> {
        match (self, value) {
            (Coordinate::Runtime(c), CoordValue::Runtime(v)) => c.index_of(v),
            (Coordinate::Time(c), CoordValue::Time(v)) => c.index_of(v),
            (Coordinate::Time2D(c), CoordValue::Time2D(v)) => c.index_of(v),
            (Coordinate::Vertical(c), CoordValue::Vertical(v)) => c.index_of(v),
            _ => None,
        }
    }

    /// Value at `idx`; errors when `idx >= size()`.
    pub fn value(&self, idx: usize) -> Result<CoordValue> {
        Ok(match self {
            Coordinate::Runtime(c) => CoordValue::Runtime(c.value(idx)?.clone()),
            Coordinate::Time(c) => CoordValue::Time(c.value(idx)?),
            Coordinate::Time2D(c) => CoordValue::Time2D(c.value(idx)?),
            Coordinate::Vertical(c) => CoordValue::Vertical(c.value(idx)?),
        })
    }

    pub fn values(&self) -> Vec<CoordValue> {
        match self {
            Coordinate::Runtime(c) => c.values().iter().cloned().map(CoordValue::Runtime).collect(),
            Coordinate::Time(c) => c.values().iter().copied().map(CoordValue::Time).collect(),
            Coordinate::Time2D(c) => c.values().iter().copied().map(CoordValue::Time2D).collect(),
            Coordinate::Vertical(c) => {
                c.values().iter().copied().map(CoordValue::Vertical).collect()
            }
        }
    }

    pub fn key(&self) -> CoordKey {
        CoordKey {
            coord_type: self.coord_type(),
            code: self.code(),
            values: self.values(),
        }
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            Coordinate::Runtime(c) => c.show_info(out),
            Coordinate::Time(c) => c.show_info(out),
            Coordinate::Time2D(c) => c.show_info(out),
            Coordinate::Vertical(c) => c.show_info(out),
        }
    }

    pub fn show_coords(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            Coordinate::Runtime(c) => c.show_coords(out),
            Coordinate::Time(c) => c.show_coords(out),
            Coordinate::Time2D(c) => c.show_coords(out),
            Coordinate::Vertical(c) => c.show_coords(out),
        }
    }
}

/// Builder for any axis kind.
#[derive(Debug, Clone)]
pub enum CoordinateBuilder {
    Runtime(RuntimeBuilder),
    Time(TimeBuilder),
    Time2D(Time2DBuilder),
    Vertical(VertBuilder),
}

impl CoordinateBuilder {
    /// Record one observed value; order and duplicates do not matter.
    pub fn add(&mut self, value: &CoordValue) -> Result<()> {
        match self {
            CoordinateBuilder::Runtime(b) => b.add(value),
            CoordinateBuilder::Time(b) => b.add(value),
            CoordinateBuilder::Time2D(b) => b.add(value),
            CoordinateBuilder::Vertical(b) => b.add(value),
        }
    }

    pub fn finish(self) -> Coordinate {
        match self {
            CoordinateBuilder::Runtime(b) => Coordinate::Runtime(b.finish()),
            CoordinateBuilder::Time(b) => Coordinate::Time(b.finish()),
            CoordinateBuilder::Time2D(b) => Coordinate::Time2D(b.finish()),
            CoordinateBuilder::Vertical(b) => Coordinate::Vertical(b.finish()),
        }
    }
}

impl From<RuntimeBuilder> for CoordinateBuilder {
    fn from(b: RuntimeBuilder) -> Self {
        CoordinateBuilder::Runtime(b)
    }
}

impl From<TimeBuilder> for CoordinateBuilder {
    fn from(b: TimeBuilder) -> Self {
        CoordinateBuilder::Time(b)
    }
}

impl From<Time2DBuilder> for CoordinateBuilder {
    fn from(b: Time2DBuilder) -> Self {
        CoordinateBuilder::Time2D(b)
    }
}

impl From<VertBuilder> for CoordinateBuilder {
    fn from(b: VertBuilder) -> Self {
        CoordinateBuilder::Vertical(b)
    }
}
