//! Runtime (model initialization time) axis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

use super::{CoordValue, CoordinateType};
use crate::error::{CoordError, Result};
use crate::time::{parse_datetime, TimeUnit};

/// One runtime value.
///
/// Axes hold dates whenever every observed label parses as a date; a
/// degraded axis keeps the raw labels instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuntimeValue {
    Date(DateTime<Utc>),
    Label(String),
}

impl RuntimeValue {
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            RuntimeValue::Date(d) => Some(*d),
            RuntimeValue::Label(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for RuntimeValue {
    fn from(date: DateTime<Utc>) -> Self {
        RuntimeValue::Date(date)
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Date(d) => write!(f, "{}", format_date(*d)),
            RuntimeValue::Label(s) => write!(f, "{}", s),
        }
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Sorted, distinct runtimes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoordinateRuntime {
    code: i32,
    time_unit: TimeUnit,
    values: Vec<RuntimeValue>,
    degraded: bool,
}

impl CoordinateRuntime {
    /// Build directly from dates, sorting and dropping duplicates.
    pub fn from_dates<I>(code: i32, time_unit: TimeUnit, dates: I) -> Self
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut builder = RuntimeBuilder::new(code, time_unit);
        for date in dates {
            builder.add_date(date);
        }
        builder.finish()
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    pub fn unit(&self) -> String {
        self.time_unit.to_string()
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when the axis fell back to raw labels.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn values(&self) -> &[RuntimeValue] {
        &self.values
    }

    pub fn value(&self, idx: usize) -> Result<&RuntimeValue> {
        self.values
            .get(idx)
            .ok_or_else(|| CoordError::out_of_range(idx, self.values.len()))
    }

    /// Index of `value`, read the way the builder stored it: labels parse
    /// as dates on a date axis, dates print as labels on a degraded one.
    pub fn index_of(&self, value: &RuntimeValue) -> Option<usize> {
        let normalized = match (self.degraded, value) {
            (false, RuntimeValue::Label(label)) => RuntimeValue::Date(parse_datetime(label)?),
            (true, RuntimeValue::Date(date)) => RuntimeValue::Label(format_date(*date)),
            (true, RuntimeValue::Label(label)) => RuntimeValue::Label(label.trim().to_string()),
            (false, RuntimeValue::Date(_)) => value.clone(),
        };
        self.values.binary_search(&normalized).ok()
    }

    pub fn index_of_date(&self, date: DateTime<Utc>) -> Option<usize> {
        self.index_of(&RuntimeValue::Date(date))
    }

    /// Date at `idx`; errors on a degraded (label) axis.
    pub fn date(&self, idx: usize) -> Result<DateTime<Utc>> {
        let value = self.value(idx)?;
        value
            .as_date()
            .ok_or_else(|| {
                CoordError::type_mismatch(CoordinateType::Runtime, value.to_string())
            })
    }

    pub fn dates(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.values.iter().filter_map(RuntimeValue::as_date)
    }

    pub fn first_date(&self) -> Option<DateTime<Utc>> {
        self.values.first().and_then(RuntimeValue::as_date)
    }

    /// Offsets of each runtime from the first one, in the axis time unit.
    pub fn offsets_from_first(&self) -> Vec<i32> {
        match self.first_date() {
            Some(first) => self
                .dates()
                .map(|d| self.time_unit.offset(first, d))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "reftime code={} unit={} n={} degraded={}",
            self.code,
            self.unit(),
            self.size(),
            self.degraded
        )
    }

    pub fn show_coords(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "reftime:")?;
        for value in &self.values {
            write!(out, " {},", value)?;
        }
        writeln!(out)
    }
}

/// Accumulates runtimes in any order.
#[derive(Debug, Clone)]
pub struct RuntimeBuilder {
    code: i32,
    time_unit: TimeUnit,
    dates: BTreeSet<DateTime<Utc>>,
    labels: BTreeSet<String>,
    unparsed: usize,
}

impl RuntimeBuilder {
    pub fn new(code: i32, time_unit: TimeUnit) -> Self {
        Self {
            code,
            time_unit,
            dates: BTreeSet::new(),
            labels: BTreeSet::new(),
            unparsed: 0,
        }
    }

    pub fn add_date(&mut self, date: DateTime<Utc>) {
        self.labels.insert(format_date(date));
        self.dates.insert(date);
    }

    /// Record a raw label, parsed as a date when possible.
    pub fn add_label(&mut self, label: &str) {
        match parse_datetime(label) {
            Some(date) => {
                self.dates.insert(date);
            }
            None => self.unparsed += 1,
        }
        self.labels.insert(label.trim().to_string());
    }

    pub fn add(&mut self, value: &CoordValue) -> Result<()> {
        match value {
            CoordValue::Runtime(RuntimeValue::Date(date)) => self.add_date(*date),
            CoordValue::Runtime(RuntimeValue::Label(label)) => self.add_label(label),
            other => {
                return Err(CoordError::type_mismatch(
                    CoordinateType::Runtime,
                    other.kind_name(),
                ));
            }
        }
        Ok(())
    }

    pub fn finish(self) -> CoordinateRuntime {
        if self.unparsed == 0 {
            return CoordinateRuntime {
                code: self.code,
                time_unit: self.time_unit,
                values: self.dates.into_iter().map(RuntimeValue::Date).collect(),
                degraded: false,
            };
        }

        warn!(
            unparsed = self.unparsed,
            labels = self.labels.len(),
            "Runtime labels do not all parse as dates, keeping raw labels"
        );

        CoordinateRuntime {
            code: self.code,
            time_unit: self.time_unit,
            values: self.labels.into_iter().map(RuntimeValue::Label).collect(),
            degraded: true,
        }
    }
}
