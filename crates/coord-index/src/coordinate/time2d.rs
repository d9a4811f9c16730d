//! Two-level time coordinate: runtime × forecast offset.
//!
//! Every runtime carries its own offset axis. When all runtimes share one
//! offset axis the coordinate is *orthogonal* and can be stored as a single
//! cross-product; when runtimes at the same hour of day share an axis it is
//! *regular*. The flat axis exposed for indexing is the sorted list of every
//! `(runtime, offset)` pair regardless of layout.

use chrono::{DateTime, Timelike, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::runtime::CoordinateRuntime;
use super::time::{CoordinateTime, TimeBuilder};
use super::{CoordValue, CoordinateType};
use crate::error::{CoordError, Result};
use crate::time::{Time2D, TimeOffset, TimeUnit};

/// How the per-runtime offset axes are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Time2DLayout {
    /// One offset axis per runtime.
    Ragged(Vec<CoordinateTime>),
    /// One offset axis shared by every runtime.
    Orthogonal(CoordinateTime),
    /// One offset axis per runtime hour of day.
    Regular(BTreeMap<u32, CoordinateTime>),
}

impl Time2DLayout {
    pub fn name(&self) -> &'static str {
        match self {
            Time2DLayout::Ragged(_) => "ragged",
            Time2DLayout::Orthogonal(_) => "orthogonal",
            Time2DLayout::Regular(_) => "regular",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoordinateTime2D {
    code: i32,
    time_unit: TimeUnit,
    is_interval: bool,
    runtime: CoordinateRuntime,
    runs: Vec<DateTime<Utc>>,
    layout: Time2DLayout,
    values: Vec<Time2D>,
}

impl CoordinateTime2D {
    /// Ragged coordinate from sorted distinct runtimes and one offset axis
    /// per runtime.
    pub fn ragged(
        code: i32,
        time_unit: TimeUnit,
        is_interval: bool,
        runs: Vec<DateTime<Utc>>,
        times: Vec<CoordinateTime>,
    ) -> Result<Self> {
        if runs.len() != times.len() {
            return Err(CoordError::RankMismatch {
                expected: runs.len(),
                actual: times.len(),
            });
        }
        if runs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoordError::InvalidTrack(
                "runtimes must be strictly ascending".to_string(),
            ));
        }
        if times.iter().any(|t| t.is_interval() != is_interval) {
            return Err(CoordError::MixedTimeKinds);
        }

        let times = runs
            .iter()
            .zip(times)
            .map(|(run, time)| time.with_ref_date(Some(*run)))
            .collect();
        Ok(Self::from_parts(
            code,
            time_unit,
            is_interval,
            runs,
            Time2DLayout::Ragged(times),
        ))
    }

    fn from_parts(
        code: i32,
        time_unit: TimeUnit,
        is_interval: bool,
        runs: Vec<DateTime<Utc>>,
        layout: Time2DLayout,
    ) -> Self {
        let runtime = CoordinateRuntime::from_dates(code, time_unit, runs.iter().copied());
        let mut coord = Self {
            code,
            time_unit,
            is_interval,
            runtime,
            runs,
            layout,
            values: Vec::new(),
        };
        let mut values = Vec::new();
        for (run_idx, run) in coord.runs.iter().enumerate() {
            for offset in coord.offsets_for_run(run_idx) {
                values.push(Time2D::new(*run, *offset));
            }
        }
        coord.values = values;
        coord
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

    pub fn is_interval(&self) -> bool {
        self.is_interval
    }

    pub fn runtime(&self) -> &CoordinateRuntime {
        &self.runtime
    }

    pub fn runs(&self) -> &[DateTime<Utc>] {
        &self.runs
    }

    pub fn layout(&self) -> &Time2DLayout {
        &self.layout
    }

    pub fn nruns(&self) -> usize {
        self.runs.len()
    }

    /// Longest per-runtime offset axis.
    pub fn ntimes(&self) -> usize {
        (0..self.runs.len())
            .map(|idx| self.offsets_for_run(idx).len())
            .max()
            .unwrap_or(0)
    }

    /// Size of the flat `(runtime, offset)` axis.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Time2D] {
        &self.values
    }

    pub fn value(&self, idx: usize) -> Result<Time2D> {
        self.values
            .get(idx)
            .copied()
            .ok_or_else(|| CoordError::out_of_range(idx, self.values.len()))
    }

    pub fn index_of(&self, value: &Time2D) -> Option<usize> {
        self.values.binary_search(value).ok()
    }

    /// `(run index, offset index)` of a value within the 2D layout.
    pub fn index_2d(&self, value: &Time2D) -> Option<(usize, usize)> {
        let run_idx = self.runs.binary_search(&value.run).ok()?;
        let time_idx = self
            .offsets_for_run(run_idx)
            .binary_search(&value.offset)
            .ok()?;
        Some((run_idx, time_idx))
    }

    fn offsets_for_run(&self, run_idx: usize) -> &[TimeOffset] {
        let Some(run) = self.runs.get(run_idx) else {
            return &[];
        };
        match &self.layout {
            Time2DLayout::Ragged(times) => times[run_idx].values(),
            Time2DLayout::Orthogonal(otime) => otime.values(),
            Time2DLayout::Regular(by_hour) => by_hour
                .get(&run.hour())
                .map(CoordinateTime::values)
                .unwrap_or(&[]),
        }
    }

    /// Offset axis of one runtime, referenced to that runtime.
    pub fn time_coordinate(&self, run_idx: usize) -> Result<CoordinateTime> {
        let run = *self
            .runs
            .get(run_idx)
            .ok_or_else(|| CoordError::out_of_range(run_idx, self.runs.len()))?;
        let time = match &self.layout {
            Time2DLayout::Ragged(times) => Some(&times[run_idx]),
            Time2DLayout::Orthogonal(otime) => Some(otime),
            Time2DLayout::Regular(by_hour) => by_hour.get(&run.hour()),
        };
        time.map(|t| t.with_ref_date(Some(run)))
            .ok_or_else(|| CoordError::out_of_range(run_idx, self.runs.len()))
    }

    /// Offset of a runtime from the first runtime, in the coordinate unit.
    pub fn run_offset(&self, run_idx: usize) -> Result<i32> {
        let first = self
            .runs
            .first()
            .ok_or_else(|| CoordError::out_of_range(run_idx, 0))?;
        let run = self
            .runs
            .get(run_idx)
            .ok_or_else(|| CoordError::out_of_range(run_idx, self.runs.len()))?;
        Ok(self.time_unit.offset(*first, *run))
    }

    fn per_run_times(&self) -> Vec<CoordinateTime> {
        (0..self.runs.len())
            .filter_map(|idx| self.time_coordinate(idx).ok())
            .collect()
    }

    pub fn is_orthogonal(&self) -> bool {
        match &self.layout {
            Time2DLayout::Orthogonal(_) => true,
            Time2DLayout::Ragged(times) => test_orthogonal(times).is_some(),
            Time2DLayout::Regular(by_hour) => {
                let hours: Vec<CoordinateTime> = by_hour.values().cloned().collect();
                test_orthogonal(&hours).is_some()
            }
        }
    }

    pub fn is_regular(&self) -> bool {
        match &self.layout {
            Time2DLayout::Orthogonal(_) | Time2DLayout::Regular(_) => true,
            Time2DLayout::Ragged(times) => test_regular(&self.runs, times).is_some(),
        }
    }

    /// Compact cross-product form, when every runtime shares its offsets.
    pub fn to_orthogonal(&self) -> Option<CoordinateTime2D> {
        let otime = test_orthogonal(&self.per_run_times())?;
        Some(Self::from_parts(
            self.code,
            self.time_unit,
            self.is_interval,
            self.runs.clone(),
            Time2DLayout::Orthogonal(otime),
        ))
    }

    /// Hour-of-day form, when runtimes at the same hour share offsets.
    pub fn to_regular(&self) -> Option<CoordinateTime2D> {
        let by_hour = test_regular(&self.runs, &self.per_run_times())?;
        Some(Self::from_parts(
            self.code,
            self.time_unit,
            self.is_interval,
            self.runs.clone(),
            Time2DLayout::Regular(by_hour),
        ))
    }

    /// Every distinct offset across all runtimes, sorted.
    pub fn offsets_sorted(&self) -> Vec<TimeOffset> {
        let all: BTreeSet<TimeOffset> = (0..self.runs.len())
            .flat_map(|idx| self.offsets_for_run(idx).iter().copied())
            .collect();
        all.into_iter().collect()
    }

    /// Flatten onto offsets from the first runtime, keeping for each valid
    /// offset the latest runtime that provides it.
    pub fn make_best_time(&self, master: &CoordinateRuntime) -> Result<BestTimeCoordinate> {
        let first = self.runs.first().copied();
        let mut run2master = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            let idx = master
                .index_of_date(*run)
                .ok_or_else(|| CoordError::RuntimeNotInMaster(run.to_rfc3339()))?;
            run2master.push(idx);
        }

        let mut best: BTreeMap<TimeOffset, usize> = BTreeMap::new();
        if let Some(first) = first {
            for (run_idx, run) in self.runs.iter().enumerate() {
                let shift = self.time_unit.offset(first, *run);
                for offset in self.offsets_for_run(run_idx) {
                    best.insert(offset.shift(shift), run2master[run_idx]);
                }
            }
        }

        let mut builder = TimeBuilder::new(self.code, self.time_unit, first, self.is_interval);
        let mut time2runtime = Vec::with_capacity(best.len());
        for (offset, master_idx) in best {
            builder.add_offset(offset)?;
            time2runtime.push(master_idx);
        }

        Ok(BestTimeCoordinate {
            time: builder.finish(),
            time2runtime,
        })
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "{} nruns={} ntimes={} layout={} isOrthogonal={} isRegular={}",
            CoordinateType::Time2D,
            self.nruns(),
            self.ntimes(),
            self.layout.name(),
            self.is_orthogonal(),
            self.is_regular()
        )?;
        self.runtime.show_info(out)?;

        write!(out, "  all offsets=")?;
        let offsets = self.offsets_sorted();
        for offset in &offsets {
            write!(out, " {},", offset)?;
        }
        writeln!(out, " (n={})", offsets.len())?;

        match &self.layout {
            Time2DLayout::Orthogonal(otime) => {
                write!(out, "  ")?;
                otime.show_info(out)
            }
            Time2DLayout::Regular(by_hour) => {
                for (hour, time) in by_hour {
                    write!(out, "  hour {}: ", hour)?;
                    time.show_info(out)?;
                }
                Ok(())
            }
            Time2DLayout::Ragged(times) => {
                for (run, time) in self.runs.iter().zip(times) {
                    write!(out, "  {}: ", run.format("%Y-%m-%dT%H:%MZ"))?;
                    time.show_info(out)?;
                }
                Ok(())
            }
        }
    }

    pub fn show_coords(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "{} nruns={} ntimes={} layout={}",
            CoordinateType::Time2D,
            self.nruns(),
            self.ntimes(),
            self.layout.name()
        )?;
        self.runtime.show_coords(out)?;
        match &self.layout {
            Time2DLayout::Orthogonal(otime) => otime.show_coords(out),
            Time2DLayout::Regular(by_hour) => {
                for (hour, time) in by_hour {
                    write!(out, "hour {}: ", hour)?;
                    time.show_coords(out)?;
                }
                Ok(())
            }
            Time2DLayout::Ragged(times) => {
                for time in times {
                    time.show_coords(out)?;
                }
                Ok(())
            }
        }
    }
}

/// Offsets shared by every runtime, or `None` when any runtime's offset
/// sequence differs from the first one's.
pub fn test_orthogonal(times: &[CoordinateTime]) -> Option<CoordinateTime> {
    let first = times.first()?;
    if times.iter().all(|t| t.values() == first.values()) {
        Some(first.with_ref_date(None))
    } else {
        None
    }
}

/// Offsets per runtime hour of day, or `None` when runtimes sharing an hour
/// disagree.
pub fn test_regular(
    runs: &[DateTime<Utc>],
    times: &[CoordinateTime],
) -> Option<BTreeMap<u32, CoordinateTime>> {
    if runs.is_empty() || runs.len() != times.len() {
        return None;
    }

    let mut by_hour: BTreeMap<u32, Vec<CoordinateTime>> = BTreeMap::new();
    for (run, time) in runs.iter().zip(times) {
        by_hour.entry(run.hour()).or_default().push(time.clone());
    }

    by_hour
        .into_iter()
        .map(|(hour, group)| test_orthogonal(&group).map(|t| (hour, t)))
        .collect()
}

/// A 1D time axis flattened from a 2D one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestTimeCoordinate {
    time: CoordinateTime,
    time2runtime: Vec<usize>,
}

impl BestTimeCoordinate {
    /// Offsets relative to the first runtime.
    pub fn time(&self) -> &CoordinateTime {
        &self.time
    }

    pub fn into_time(self) -> CoordinateTime {
        self.time
    }

    /// Master runtime index that supplies each offset.
    pub fn time2runtime(&self) -> &[usize] {
        &self.time2runtime
    }

    pub fn runtime_index(&self, time_idx: usize) -> Result<usize> {
        self.time2runtime
            .get(time_idx)
            .copied()
            .ok_or_else(|| {
                CoordError::out_of_range(time_idx, self.time2runtime.len())
            })
    }
}

/// Accumulates `(runtime, offset)` pairs in any order.
#[derive(Debug, Clone)]
pub struct Time2DBuilder {
    code: i32,
    time_unit: TimeUnit,
    is_interval: bool,
    runs: BTreeMap<DateTime<Utc>, TimeBuilder>,
}

impl Time2DBuilder {
    pub fn new(code: i32, time_unit: TimeUnit, is_interval: bool) -> Self {
        Self {
            code,
            time_unit,
            is_interval,
            runs: BTreeMap::new(),
        }
    }

    pub fn add_time2d(&mut self, value: Time2D) -> Result<()> {
        let (code, time_unit, is_interval) = (self.code, self.time_unit, self.is_interval);
        self.runs
            .entry(value.run)
            .or_insert_with(|| {
                TimeBuilder::new(code, time_unit, Some(value.run), is_interval)
            })
            .add_offset(value.offset)
    }

    pub fn add(&mut self, value: &CoordValue) -> Result<()> {
        match value {
            CoordValue::Time2D(t) => self.add_time2d(*t),
            other => Err(CoordError::type_mismatch(
                CoordinateType::Time2D,
                other.kind_name(),
            )),
        }
    }

    pub fn nruns(&self) -> usize {
        self.runs.len()
    }

    /// Ragged coordinate over every runtime seen.
    pub fn finish(self) -> CoordinateTime2D {
        let mut runs = Vec::with_capacity(self.runs.len());
        let mut times = Vec::with_capacity(self.runs.len());
        for (run, builder) in self.runs {
            runs.push(run);
            times.push(builder.finish());
        }
        CoordinateTime2D::from_parts(
            self.code,
            self.time_unit,
            self.is_interval,
            runs,
            Time2DLayout::Ragged(times),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    /// `nruns` runtimes six hours apart, each with `offsets(run_idx)`.
    fn build<F>(nruns: usize, offsets: F) -> CoordinateTime2D
    where
        F: Fn(usize) -> Vec<i32>,
    {
        let mut builder = Time2DBuilder::new(1, TimeUnit::HOUR, false);
        for run_idx in 0..nruns {
            let run = base() + Duration::hours(6 * run_idx as i64);
            for offset in offsets(run_idx) {
                builder.add_time2d(Time2D::point(run, offset)).unwrap();
            }
        }
        builder.finish()
    }

    #[test]
    fn test_flat_values_sorted() {
        let coord = build(2, |_| vec![6, 0, 3]);
        assert_eq!(coord.size(), 6);
        assert_eq!(coord.nruns(), 2);
        assert_eq!(coord.ntimes(), 3);
        assert_eq!(coord.value(0).unwrap(), Time2D::point(base(), 0));
        let second = Time2D::point(base() + Duration::hours(6), 3);
        assert_eq!(coord.index_of(&second), Some(4));
        assert_eq!(coord.index_2d(&second), Some((1, 1)));
    }

    #[test]
    fn test_same_offsets_are_orthogonal() {
        let coord = build(4, |_| vec![0, 6, 12]);
        assert!(matches!(coord.layout(), Time2DLayout::Ragged(_)));
        assert!(coord.is_orthogonal());

        let ortho = coord.to_orthogonal().unwrap();
        assert!(matches!(ortho.layout(), Time2DLayout::Orthogonal(_)));
        assert_eq!(ortho.values(), coord.values());
        assert_eq!(
            ortho.time_coordinate(2).unwrap().ref_date(),
            Some(base() + Duration::hours(12))
        );
    }

    #[test]
    fn test_orthogonal_requires_same_sequence() {
        // same size, different values
        let coord = build(2, |run| if run == 0 { vec![0, 6] } else { vec![0, 12] });
        assert!(!coord.is_orthogonal());
        assert!(coord.to_orthogonal().is_none());
    }

    #[test]
    fn test_regular_by_hour_of_day() {
        // 00Z and 12Z runs go long, 06Z and 18Z runs go short
        let coord = build(8, |run| {
            if run % 2 == 0 {
                vec![0, 6, 12, 18, 24]
            } else {
                vec![0, 6]
            }
        });
        assert!(!coord.is_orthogonal());
        assert!(coord.is_regular());

        let regular = coord.to_regular().unwrap();
        match regular.layout() {
            Time2DLayout::Regular(by_hour) => assert_eq!(by_hour.len(), 4),
            other => panic!("expected regular layout, got {}", other.name()),
        }
        assert_eq!(regular.values(), coord.values());
    }

    #[test]
    fn test_best_time_latest_run_wins() {
        let coord = build(2, |_| vec![0, 6, 12]);
        let best = coord.make_best_time(coord.runtime()).unwrap();
        let offsets: Vec<TimeOffset> = best.time().values().to_vec();
        assert_eq!(
            offsets,
            vec![0, 6, 12, 18]
                .into_iter()
                .map(TimeOffset::Point)
                .collect::<Vec<_>>()
        );
        assert_eq!(best.time2runtime(), &[0, 1, 1, 1]);
    }

    #[test]
    fn test_best_time_rejects_unknown_runtime() {
        let coord = build(2, |_| vec![0]);
        let master = CoordinateRuntime::from_dates(1, TimeUnit::HOUR, vec![base()]);
        assert!(matches!(
            coord.make_best_time(&master),
            Err(CoordError::RuntimeNotInMaster(_))
        ));
    }

    #[test]
    fn test_ragged_rejects_mismatched_lengths() {
        let time = TimeBuilder::new(1, TimeUnit::HOUR, None, false).finish();
        let result = CoordinateTime2D::ragged(
            1,
            TimeUnit::HOUR,
            false,
            vec![base()],
            vec![time.clone(), time],
        );
        assert!(matches!(result, Err(CoordError::RankMismatch { .. })));
    }

    #[test]
    fn test_time_coordinate_out_of_range() {
        let coord = build(1, |_| vec![0]);
        assert!(coord.time_coordinate(1).is_err());
    }

    #[test]
    fn test_show_info_mentions_layout() {
        let coord = build(2, |_| vec![0, 6]);
        let mut out = String::new();
        coord.show_info(&mut out).unwrap();
        assert!(out.contains("nruns=2"));
        assert!(out.contains("isOrthogonal=true"));
    }
}
