//! Tests for two-level time coordinates, orthogonality and unionizing.

use chrono::{DateTime, Utc};
use coord_index::{
    test_orthogonal, CoordError, CoordinateRuntime, CoordinateTime, CoordinateTime2D, Time2D,
    Time2DBuilder, Time2DLayout, Time2DUnion, Time2DUnionizer, TimeBuilder, TimeOffset, TimeUnit,
};
use test_utils::cycles::{CycleSpec, DAILY_4, GFS_LIKE, SIX_HOURLY_12};
use test_utils::{make_offsets, make_reference_runtimes, scrambled_pairs};

fn offsets_axis(ntimes: usize, step: i32) -> CoordinateTime {
    let mut builder = TimeBuilder::new(1, TimeUnit::HOUR, None, false);
    for o in make_offsets(ntimes, step) {
        builder.add_offset(TimeOffset::Point(o)).unwrap();
    }
    builder.finish()
}

fn time2d(runs: &[DateTime<Utc>], offsets: &[i32]) -> CoordinateTime2D {
    let mut builder = Time2DBuilder::new(1, TimeUnit::HOUR, false);
    for (run, o) in scrambled_pairs(runs, offsets) {
        builder.add_time2d(Time2D::point(run, o)).unwrap();
    }
    builder.finish()
}

fn cycle(spec: CycleSpec) -> CoordinateTime2D {
    time2d(
        &make_reference_runtimes(spec.nruns, spec.run_spacing),
        &make_offsets(spec.ntimes, spec.time_step),
    )
}

// ============================================================================
// Orthogonality
// ============================================================================

#[test]
fn test_different_shapes_not_orthogonal() {
    let six_hourly = offsets_axis(SIX_HOURLY_12.ntimes, SIX_HOURLY_12.run_spacing as i32);
    let daily = offsets_axis(DAILY_4.nruns, DAILY_4.run_spacing as i32);
    assert!(test_orthogonal(&[six_hourly, daily]).is_none());
}

#[test]
fn test_same_size_different_values_not_orthogonal() {
    let axes = [offsets_axis(4, 6), offsets_axis(4, 3)];
    assert!(test_orthogonal(&axes).is_none());
}

#[test]
fn test_identical_sequences_orthogonal() {
    let axis = offsets_axis(5, 3);
    let shared = test_orthogonal(&[axis.clone(), axis.clone(), axis]).unwrap();
    assert_eq!(shared.size(), 5);
    assert!(test_orthogonal(&[]).is_none());
}

#[test]
fn test_unionize_same_shape_is_orthogonal() {
    let mut unionizer = Time2DUnionizer::new(true, TimeUnit::HOUR, 1, false, None);
    let runs = make_reference_runtimes(8, 6);
    for chunk in runs.chunks(2) {
        let offsets = make_offsets(GFS_LIKE.ntimes, GFS_LIKE.time_step);
        unionizer.add_all(&time2d(chunk, &offsets)).unwrap();
    }
    let union = unionizer.finish().unwrap();
    assert!(union.is_orthogonal());

    let coord = union.as_time2d().unwrap();
    assert_eq!(coord.nruns(), 8);
    assert_eq!(coord.size(), 8 * GFS_LIKE.ntimes);
    let orth = coord.to_orthogonal().unwrap();
    assert!(matches!(orth.layout(), Time2DLayout::Orthogonal(_)));
    assert_eq!(orth.values(), coord.values());
}

#[test]
fn test_unionizer_stays_ragged_by_default() {
    let mut unionizer = Time2DUnionizer::new(true, TimeUnit::HOUR, 1, false, None);
    unionizer.add_all(&cycle(GFS_LIKE)).unwrap();
    let union = unionizer.finish().unwrap();
    let coord = union.as_time2d().unwrap();
    assert!(matches!(coord.layout(), Time2DLayout::Ragged(_)));
    assert!(coord.is_orthogonal());
}

// ============================================================================
// Layouts
// ============================================================================

#[test]
fn test_regular_by_hour_of_day() {
    let runs = make_reference_runtimes(4, 12);
    let mut builder = Time2DBuilder::new(1, TimeUnit::HOUR, false);
    for (i, run) in runs.iter().enumerate() {
        // 00Z runs go out further than 12Z runs
        let n = if i % 2 == 0 { 5 } else { 3 };
        for o in make_offsets(n, 6) {
            builder.add_time2d(Time2D::point(*run, o)).unwrap();
        }
    }
    let coord = builder.finish();
    assert!(!coord.is_orthogonal());
    assert!(coord.is_regular());

    let regular = coord.to_regular().unwrap();
    match regular.layout() {
        Time2DLayout::Regular(by_hour) => {
            assert_eq!(by_hour.len(), 2);
            assert_eq!(by_hour[&0].size(), 5);
            assert_eq!(by_hour[&12].size(), 3);
        }
        other => panic!("expected regular layout, got {}", other.name()),
    }
    assert_eq!(regular.time_coordinate(3).unwrap().size(), 3);
    assert_eq!(regular.run_offset(3).unwrap(), 36);
}

#[test]
fn test_index_2d() {
    let coord = cycle(GFS_LIKE);
    let runs = make_reference_runtimes(GFS_LIKE.nruns, GFS_LIKE.run_spacing);
    assert_eq!(coord.index_2d(&Time2D::point(runs[2], 9)), Some((2, 3)));
    assert_eq!(coord.index_2d(&Time2D::point(runs[2], 10)), None);
    assert!(coord.time_coordinate(GFS_LIKE.nruns).is_err());
}

#[test]
fn test_ragged_constructor_checks_runs() {
    let runs = make_reference_runtimes(2, 6);
    let reversed = vec![runs[1], runs[0]];
    assert!(CoordinateTime2D::ragged(
        1,
        TimeUnit::HOUR,
        false,
        reversed,
        vec![offsets_axis(2, 1), offsets_axis(2, 1)]
    )
    .is_err());
    assert!(matches!(
        CoordinateTime2D::ragged(1, TimeUnit::HOUR, false, runs, vec![offsets_axis(2, 1)]),
        Err(CoordError::RankMismatch { .. })
    ));
}

// ============================================================================
// Best time
// ============================================================================

#[test]
fn test_best_time_latest_run_wins() {
    let runs = make_reference_runtimes(2, 6);
    let master = CoordinateRuntime::from_dates(1, TimeUnit::HOUR, runs.clone());
    let mut unionizer = Time2DUnionizer::new(false, TimeUnit::HOUR, 1, false, Some(master));
    unionizer.add_all(&time2d(&runs, &[0, 6, 12])).unwrap();

    match unionizer.finish().unwrap() {
        Time2DUnion::Best(best) => {
            let offsets: Vec<i32> = best
                .time()
                .values()
                .iter()
                .map(TimeOffset::valid_offset)
                .collect();
            assert_eq!(offsets, vec![0, 6, 12, 18]);
            assert_eq!(best.time2runtime(), &[0, 1, 1, 1]);
        }
        Time2DUnion::Time2D(_) => panic!("expected best time"),
    }
}

#[test]
fn test_master_must_contain_runs() {
    let runs = make_reference_runtimes(3, 6);
    let master = CoordinateRuntime::from_dates(1, TimeUnit::HOUR, runs[..2].to_vec());
    let mut unionizer = Time2DUnionizer::new(true, TimeUnit::HOUR, 1, false, Some(master));
    unionizer.add_all(&time2d(&runs, &[0])).unwrap();
    assert!(matches!(
        unionizer.finish(),
        Err(CoordError::RuntimeNotInMaster(_))
    ));
}
