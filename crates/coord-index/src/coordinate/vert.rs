//! Vertical level axis.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{CoordValue, CoordinateType};
use crate::error::{CoordError, Result};

/// A vertical level, or a layer between two levels.
///
/// Compared with IEEE total order, so NaN levels sort consistently and
/// equality agrees with hashing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VertLevel {
    pub value1: f64,
    pub value2: Option<f64>,
}

impl VertLevel {
    pub fn level(value: f64) -> Self {
        Self {
            value1: value,
            value2: None,
        }
    }

    pub fn layer(bottom: f64, top: f64) -> Self {
        Self {
            value1: bottom,
            value2: Some(top),
        }
    }

    pub fn is_layer(&self) -> bool {
        self.value2.is_some()
    }
}

impl Ord for VertLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value1
            .total_cmp(&other.value1)
            .then_with(|| match (self.value2, other.value2) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.total_cmp(&b),
            })
    }
}

impl PartialOrd for VertLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VertLevel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VertLevel {}

impl Hash for VertLevel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value1.to_bits().hash(state);
        self.value2.map(f64::to_bits).hash(state);
    }
}

impl fmt::Display for VertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value2 {
            Some(top) => write!(f, "({}-{})", self.value1, top),
            None => write!(f, "{}", self.value1),
        }
    }
}

/// Sorted, distinct vertical levels of one level type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoordinateVert {
    code: i32,
    unit: String,
    values: Vec<VertLevel>,
}

impl CoordinateVert {
    /// Level type code (e.g. GRIB2 100 = isobaric).
    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn is_layer(&self) -> bool {
        self.values.first().map(VertLevel::is_layer).unwrap_or(false)
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[VertLevel] {
        &self.values
    }

    pub fn value(&self, idx: usize) -> Result<VertLevel> {
        self.values
            .get(idx)
            .copied()
            .ok_or_else(|| CoordError::out_of_range(idx, self.values.len()))
    }

    pub fn index_of(&self, value: &VertLevel) -> Option<usize> {
        self.values.binary_search(value).ok()
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "vert code={} unit={} n={} layer={}",
            self.code,
            self.unit,
            self.size(),
            self.is_layer()
        )
    }

    pub fn show_coords(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "vert:")?;
        for value in &self.values {
            write!(out, " {},", value)?;
        }
        writeln!(out)
    }
}

/// Accumulates levels in any order.
#[derive(Debug, Clone)]
pub struct VertBuilder {
    code: i32,
    unit: String,
    values: BTreeSet<VertLevel>,
}

impl VertBuilder {
    pub fn new(code: i32, unit: impl Into<String>) -> Self {
        Self {
            code,
            unit: unit.into(),
            values: BTreeSet::new(),
        }
    }

    pub fn add_level(&mut self, level: VertLevel) {
        self.values.insert(level);
    }

    pub fn add(&mut self, value: &CoordValue) -> Result<()> {
        match value {
            CoordValue::Vertical(level) => {
                self.add_level(*level);
                Ok(())
            }
            other => Err(CoordError::type_mismatch(
                CoordinateType::Vertical,
                other.kind_name(),
            )),
        }
    }

    pub fn finish(self) -> CoordinateVert {
        CoordinateVert {
            code: self.code,
            unit: self.unit,
            values: self.values.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_sorted_distinct() {
        let mut builder = VertBuilder::new(100, "Pa");
        for v in [85000.0, 50000.0, 100000.0, 50000.0] {
            builder.add_level(VertLevel::level(v));
        }
        let coord = builder.finish();
        assert_eq!(coord.size(), 3);
        assert_eq!(coord.value(0).unwrap(), VertLevel::level(50000.0));
        assert_eq!(coord.index_of(&VertLevel::level(100000.0)), Some(2));
        assert_eq!(coord.index_of(&VertLevel::level(70000.0)), None);
    }

    #[test]
    fn test_layers_order_after_levels() {
        let mut builder = VertBuilder::new(106, "m");
        builder.add_level(VertLevel::layer(0.0, 0.1));
        builder.add_level(VertLevel::level(0.0));
        builder.add_level(VertLevel::layer(0.0, 0.4));
        let coord = builder.finish();
        assert_eq!(
            coord.values(),
            &[
                VertLevel::level(0.0),
                VertLevel::layer(0.0, 0.1),
                VertLevel::layer(0.0, 0.4)
            ]
        );
    }

    #[test]
    fn test_wrong_value_kind() {
        let mut builder = VertBuilder::new(100, "Pa");
        let err = builder
            .add(&CoordValue::Time(crate::time::TimeOffset::Point(0)))
            .unwrap_err();
        assert!(matches!(err, CoordError::TypeMismatch { .. }));
    }
}
