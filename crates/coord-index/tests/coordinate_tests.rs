//! Tests for coordinate builders and axis lookups.

use chrono::{Duration, TimeZone, Utc};
use coord_index::{
    CoordError, CoordValue, Coordinate, CoordinateBuilder, CoordinateNDBuilder, CoordinateType,
    RuntimeBuilder, RuntimeValue, TimeBuilder, TimeIntv, TimeOffset, TimeUnit, VertBuilder,
    VertLevel,
};
use test_utils::{make_levels, make_offsets, make_reference_runtimes, reference_time};

fn assert_round_trip(coord: &Coordinate, raw: &[CoordValue]) {
    let mut distinct = raw.to_vec();
    distinct.sort();
    distinct.dedup();
    assert_eq!(coord.size(), distinct.len());
    for v in &distinct {
        let idx = coord.index_of(v).expect("value on axis");
        assert_eq!(&coord.value(idx).unwrap(), v);
    }
}

// ============================================================================
// Builder properties
// ============================================================================

#[test]
fn test_runtime_builder_distinct_sorted() {
    let mut runs = make_reference_runtimes(6, 6);
    runs.extend(make_reference_runtimes(3, 6));
    runs.reverse();
    let raw: Vec<CoordValue> = runs.iter().map(|r| CoordValue::from(*r)).collect();

    let mut builder: CoordinateBuilder = RuntimeBuilder::new(1, TimeUnit::HOUR).into();
    for v in &raw {
        builder.add(v).unwrap();
    }
    let coord = builder.finish();
    assert_eq!(coord.coord_type(), CoordinateType::Runtime);
    assert_round_trip(&coord, &raw);

    let values = coord.values();
    assert!(values.windows(2).all(|w| w[0] < w[1]));
}

fn runtime_label(label: &str) -> CoordValue {
    CoordValue::Runtime(RuntimeValue::Label(label.to_string()))
}

#[test]
fn test_runtime_labels_index_records_on_date_axis() {
    let mut builder =
        CoordinateNDBuilder::new(vec![RuntimeBuilder::new(1, TimeUnit::HOUR).into()]);
    builder
        .add_record(vec![runtime_label("2024-01-15T06:00:00Z")], "b")
        .unwrap();
    builder
        .add_record(vec![runtime_label("2024-01-15T00:00:00Z")], "a")
        .unwrap();
    let nd = builder.finish().unwrap();

    let runtime = &nd.axes()[0];
    assert_eq!(runtime.size(), 2);
    assert_eq!(nd.density(), 1.0);
    assert_eq!(
        nd.lookup(&[CoordValue::from(reference_time())]).unwrap(),
        Some(&"a")
    );
    assert_eq!(
        nd.lookup(&[runtime_label("2024-01-15T06:00:00Z")]).unwrap(),
        Some(&"b")
    );
}

#[test]
fn test_mixed_runtime_records_on_degraded_axis() {
    let run = reference_time();
    let mut builder =
        CoordinateNDBuilder::new(vec![RuntimeBuilder::new(1, TimeUnit::HOUR).into()]);
    builder.add_record(vec![CoordValue::from(run)], 1).unwrap();
    builder.add_record(vec![runtime_label(" run_b ")], 2).unwrap();
    let nd = builder.finish().unwrap();

    match &nd.axes()[0] {
        Coordinate::Runtime(runtime) => assert!(runtime.is_degraded()),
        other => panic!("expected a runtime axis, got {:?}", other.coord_type()),
    }
    assert_eq!(nd.lookup(&[CoordValue::from(run)]).unwrap(), Some(&1));
    assert_eq!(nd.lookup(&[runtime_label("run_b")]).unwrap(), Some(&2));
}

#[test]
fn test_time_builder_distinct_sorted() {
    let mut raw: Vec<CoordValue> = make_offsets(8, 3)
        .into_iter()
        .chain(make_offsets(4, 6))
        .map(|o| TimeOffset::Point(o).into())
        .collect();
    raw.reverse();

    let mut builder: CoordinateBuilder = TimeBuilder::new(1, TimeUnit::HOUR, None, false).into();
    for v in &raw {
        builder.add(v).unwrap();
    }
    let coord = builder.finish();
    assert_eq!(coord.size(), 8);
    assert_round_trip(&coord, &raw);
}

#[test]
fn test_vert_builder_distinct_sorted() {
    let raw: Vec<CoordValue> = make_levels(5, 1000.0, 100.0)
        .into_iter()
        .chain(make_levels(3, 950.0, 200.0))
        .map(|v| VertLevel::level(v).into())
        .collect();

    let mut builder: CoordinateBuilder = VertBuilder::new(100, "hPa").into();
    for v in &raw {
        builder.add(v).unwrap();
    }
    let coord = builder.finish();
    assert_eq!(coord.size(), 8);
    assert_round_trip(&coord, &raw);
    assert_eq!(coord.unit(), "hPa");
    assert_eq!(coord.code(), 100);
}

#[test]
fn test_zero_length_axis_is_valid() {
    let coord = CoordinateBuilder::from(VertBuilder::new(1, "m")).finish();
    assert!(coord.is_empty());
    assert_eq!(coord.index_of(&VertLevel::level(0.0).into()), None);
}

// ============================================================================
// Lookup misses and range errors
// ============================================================================

#[test]
fn test_index_of_miss_is_none() {
    let mut builder = TimeBuilder::new(1, TimeUnit::HOUR, None, false);
    builder.add_offset(TimeOffset::Point(0)).unwrap();
    let coord = Coordinate::Time(builder.finish());
    assert_eq!(coord.index_of(&TimeOffset::Point(1).into()), None);
}

#[test]
fn test_value_past_end_fails_fast() {
    let mut builder = VertBuilder::new(100, "hPa");
    builder.add_level(VertLevel::level(500.0));
    let coord = Coordinate::Vertical(builder.finish());
    assert_eq!(
        coord.value(1),
        Err(CoordError::IndexOutOfRange { index: 1, size: 1 })
    );
}

#[test]
fn test_builder_rejects_wrong_kind() {
    let mut builder: CoordinateBuilder = RuntimeBuilder::new(1, TimeUnit::HOUR).into();
    assert!(matches!(
        builder.add(&VertLevel::level(1.0).into()),
        Err(CoordError::TypeMismatch { .. })
    ));
}

// ============================================================================
// Runtime normalization
// ============================================================================

#[test]
fn test_runtime_labels_parse_to_dates() {
    let mut builder = RuntimeBuilder::new(1, TimeUnit::HOUR);
    builder.add_label("2024-01-15T06:00:00Z");
    builder.add_label("2024-01-15T00:00:00");
    builder.add_label("2024-01-15");
    let coord = builder.finish();
    assert!(!coord.is_degraded());
    assert_eq!(coord.size(), 2);
    assert_eq!(coord.first_date(), Some(reference_time()));
    assert_eq!(coord.offsets_from_first(), vec![0, 6]);
}

#[test]
fn test_runtime_unparseable_labels_degrade() {
    let mut builder = RuntimeBuilder::new(1, TimeUnit::HOUR);
    builder.add_label("2024-01-15T00:00:00Z");
    builder.add_label("run-b");
    builder.add_label("run-a");
    let coord = builder.finish();
    assert!(coord.is_degraded());
    assert_eq!(coord.size(), 3);
    assert_eq!(
        coord.index_of(&RuntimeValue::Label("run-a".to_string())),
        Some(1)
    );
    assert!(coord.date(1).is_err());
}

// ============================================================================
// Intervals and layers
// ============================================================================

#[test]
fn test_interval_axis_orders_by_end() {
    let mut builder = TimeBuilder::new(1, TimeUnit::HOUR, None, true);
    for (s, e) in [(0, 12), (6, 12), (0, 6), (0, 12)] {
        builder
            .add_offset(TimeOffset::Interval(TimeIntv::new(s, e)))
            .unwrap();
    }
    let coord = builder.finish();
    assert_eq!(
        coord.values(),
        &[
            TimeOffset::Interval(TimeIntv::new(0, 6)),
            TimeOffset::Interval(TimeIntv::new(0, 12)),
            TimeOffset::Interval(TimeIntv::new(6, 12)),
        ]
    );
    assert_eq!(coord.coord_type(), CoordinateType::TimeIntv);
    assert_eq!(
        coord.interval_name().as_deref(),
        Some(coord_index::coordinate::MIXED_INTERVALS)
    );
}

#[test]
fn test_interval_axis_rejects_points() {
    let mut builder = TimeBuilder::new(1, TimeUnit::HOUR, None, true);
    assert_eq!(
        builder.add_offset(TimeOffset::Point(3)),
        Err(CoordError::MixedTimeKinds)
    );
}

#[test]
fn test_show_coords_lists_values() {
    let run = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
    let mut builder = RuntimeBuilder::new(1, TimeUnit::HOUR);
    builder.add_date(run);
    builder.add_date(run + Duration::hours(6));
    let coord = Coordinate::Runtime(builder.finish());

    let mut out = String::new();
    coord.show_coords(&mut out).unwrap();
    assert!(out.contains("2024-01-15T06:00:00"));
}
