//! Folds many partitions' two-level time coordinates into one.

use std::fmt;
use tracing::debug;

use super::runtime::CoordinateRuntime;
use super::time::CoordinateTime;
use super::time2d::{BestTimeCoordinate, CoordinateTime2D, Time2DBuilder};
use super::Coordinate;
use crate::error::{CoordError, Result};
use crate::time::{Time2D, TimeUnit};

/// Result of [`Time2DUnionizer::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Time2DUnion {
    /// Ragged two-level coordinate over every runtime seen.
    Time2D(CoordinateTime2D),
    /// Flattened offsets, for collections that are not two-dimensional.
    Best(BestTimeCoordinate),
}

impl Time2DUnion {
    /// True when the union can be stored as runtime × offset.
    ///
    /// A flattened result has a single time axis and is trivially
    /// orthogonal.
    pub fn is_orthogonal(&self) -> bool {
        match self {
            Time2DUnion::Time2D(coord) => coord.is_orthogonal(),
            Time2DUnion::Best(_) => true,
        }
    }

    pub fn as_time2d(&self) -> Option<&CoordinateTime2D> {
        match self {
            Time2DUnion::Time2D(coord) => Some(coord),
            Time2DUnion::Best(_) => None,
        }
    }

    pub fn into_coordinate(self) -> Coordinate {
        match self {
            Time2DUnion::Time2D(coord) => Coordinate::Time2D(coord),
            Time2DUnion::Best(best) => Coordinate::Time(best.into_time()),
        }
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            Time2DUnion::Time2D(coord) => coord.show_info(out),
            Time2DUnion::Best(best) => best.time().show_info(out),
        }
    }
}

/// Accumulates every `(runtime, offset)` pair from many coordinates.
///
/// Exact repeats collapse. Runtimes and per-runtime offsets come out sorted
/// and distinct; the result is ragged and callers opt into the orthogonal
/// form through [`CoordinateTime2D::to_orthogonal`].
#[derive(Debug, Clone)]
pub struct Time2DUnionizer {
    is_time2d: bool,
    master: Option<CoordinateRuntime>,
    builder: Time2DBuilder,
    added: usize,
}

impl Time2DUnionizer {
    pub fn new(
        is_time2d: bool,
        time_unit: TimeUnit,
        code: i32,
        is_interval: bool,
        master: Option<CoordinateRuntime>,
    ) -> Self {
        Self {
            is_time2d,
            master,
            builder: Time2DBuilder::new(code, time_unit, is_interval),
            added: 0,
        }
    }

    pub fn add(&mut self, value: Time2D) -> Result<()> {
        self.added += 1;
        self.builder.add_time2d(value)
    }

    pub fn add_all(&mut self, coord: &CoordinateTime2D) -> Result<()> {
        for value in coord.values() {
            self.add(*value)?;
        }
        Ok(())
    }

    /// Add a single-runtime offset axis; its reference date is the runtime.
    pub fn add_time(&mut self, time: &CoordinateTime) -> Result<()> {
        let run = time.ref_date().ok_or_else(|| {
            CoordError::InvalidTrack("time coordinate has no reference date".to_string())
        })?;
        for offset in time.values() {
            self.add(Time2D::new(run, *offset))?;
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Time2DUnion> {
        let coord = self.builder.finish();

        if let Some(master) = &self.master {
            if let Some(missing) = coord
                .runs()
                .iter()
                .find(|run| master.index_of_date(**run).is_none())
            {
                return Err(CoordError::RuntimeNotInMaster(missing.to_rfc3339()));
            }
        }

        debug!(
            added = self.added,
            nruns = coord.nruns(),
            ntimes = coord.ntimes(),
            distinct = coord.size(),
            "Unionized time coordinates"
        );

        if self.is_time2d {
            return Ok(Time2DUnion::Time2D(coord));
        }

        let master = self.master.unwrap_or_else(|| coord.runtime().clone());
        Ok(Time2DUnion::Best(coord.make_best_time(&master)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeOffset;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn run(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn partition(run_hours: i64, offsets: &[i32]) -> CoordinateTime2D {
        let mut builder = Time2DBuilder::new(1, TimeUnit::HOUR, false);
        for o in offsets {
            builder.add_time2d(Time2D::point(run(run_hours), *o)).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn test_repeats_collapse() {
        let mut unionizer = Time2DUnionizer::new(true, TimeUnit::HOUR, 1, false, None);
        unionizer.add_all(&partition(0, &[0, 6])).unwrap();
        unionizer.add_all(&partition(0, &[6, 12])).unwrap();
        unionizer.add_all(&partition(12, &[0])).unwrap();
        let union = unionizer.finish().unwrap();
        let coord = union.as_time2d().unwrap();
        assert_eq!(coord.nruns(), 2);
        assert_eq!(coord.size(), 4);
        assert!(!union.is_orthogonal());
    }

    #[test]
    fn test_master_must_cover_runs() {
        let master = CoordinateRuntime::from_dates(1, TimeUnit::HOUR, vec![run(0)]);
        let mut unionizer = Time2DUnionizer::new(true, TimeUnit::HOUR, 1, false, Some(master));
        unionizer.add_all(&partition(6, &[0])).unwrap();
        assert!(matches!(
            unionizer.finish(),
            Err(CoordError::RuntimeNotInMaster(_))
        ));
    }

    #[test]
    fn test_not_time2d_flattens() {
        let mut unionizer = Time2DUnionizer::new(false, TimeUnit::HOUR, 1, false, None);
        unionizer.add_all(&partition(0, &[0, 3])).unwrap();
        unionizer.add_all(&partition(6, &[0, 3])).unwrap();
        match unionizer.finish().unwrap() {
            Time2DUnion::Best(best) => {
                assert_eq!(
                    best.time().values(),
                    &[
                        TimeOffset::Point(0),
                        TimeOffset::Point(3),
                        TimeOffset::Point(6),
                        TimeOffset::Point(9)
                    ]
                );
                assert_eq!(best.time2runtime(), &[0, 0, 1, 1]);
            }
            other => panic!("expected best time, got {:?}", other),
        }
    }

    #[test]
    fn test_add_time_needs_reference() {
        let mut unionizer = Time2DUnionizer::new(true, TimeUnit::HOUR, 1, false, None);
        let time = crate::coordinate::TimeBuilder::new(1, TimeUnit::HOUR, None, false).finish();
        assert!(unionizer.add_time(&time).is_err());
    }
}
