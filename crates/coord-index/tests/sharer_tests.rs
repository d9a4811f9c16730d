//! Tests for collection-wide axis sharing.

use coord_index::{
    Coordinate, CoordinateNDBuilder, CoordinateSharer, RuntimeBuilder, TimeBuilder, TimeOffset,
    TimeUnit, VertBuilder, VertLevel,
};
use test_utils::levels::{HEIGHT_M, ISOBARIC_CODE, ISOBARIC_HPA};
use test_utils::{make_offsets, make_reference_runtimes};

fn vert(code: i32, levels: &[f64]) -> Coordinate {
    let mut builder = VertBuilder::new(code, "hPa");
    for &v in levels {
        builder.add_level(VertLevel::level(v));
    }
    Coordinate::Vertical(builder.finish())
}

fn time(offsets: &[i32]) -> Coordinate {
    let mut builder = TimeBuilder::new(1, TimeUnit::HOUR, None, false);
    for &o in offsets {
        builder.add_offset(TimeOffset::Point(o)).unwrap();
    }
    Coordinate::Time(builder.finish())
}

fn runtime(n: usize) -> Coordinate {
    let mut builder = RuntimeBuilder::new(1, TimeUnit::HOUR);
    for run in make_reference_runtimes(n, 6) {
        builder.add_date(run);
    }
    Coordinate::Runtime(builder.finish())
}

fn variable_axes() -> Vec<Vec<Coordinate>> {
    vec![
        vec![
            runtime(4),
            time(&make_offsets(5, 3)),
            vert(ISOBARIC_CODE, &ISOBARIC_HPA),
        ],
        vec![
            runtime(4),
            time(&make_offsets(5, 3)),
            vert(ISOBARIC_CODE, &ISOBARIC_HPA[..4]),
        ],
        vec![runtime(4), time(&make_offsets(5, 3)), vert(103, &HEIGHT_M)],
        vec![runtime(2), time(&make_offsets(9, 1))],
    ]
}

// ============================================================================
// Deduplication
// ============================================================================

#[test]
fn test_shared_count_stable_across_runs() {
    let mut counts = Vec::new();
    for _ in 0..2 {
        let mut sharer = CoordinateSharer::new();
        for axes in variable_axes() {
            sharer.add_coordinates(&axes);
        }
        counts.push(sharer.finish().len());
    }
    assert_eq!(counts[0], counts[1]);
    assert_eq!(counts[0], 7);
}

#[test]
fn test_every_registered_axis_resolves() {
    let mut sharer = CoordinateSharer::new();
    let all = variable_axes();
    for axes in &all {
        sharer.add_coordinates(axes);
    }
    assert_eq!(sharer.registered(), 4);
    let shared = sharer.finish();

    for axes in &all {
        let ids = shared.reindex_to_shared(axes).unwrap();
        for (id, axis) in ids.iter().zip(axes) {
            assert_eq!(shared.get(*id).unwrap(), axis);
        }
    }
}

#[test]
fn test_same_values_different_kind_not_shared() {
    let mut sharer = CoordinateSharer::new();
    sharer.add_coordinates(&[time(&[0, 1]), runtime(2)]);
    let shared = sharer.finish();
    assert_eq!(shared.len(), 2);
}

// ============================================================================
// Shared indices
// ============================================================================

#[test]
fn test_share_rewrites_references_only() {
    let mut builder = CoordinateNDBuilder::new(vec![
        TimeBuilder::new(1, TimeUnit::HOUR, None, false).into(),
        VertBuilder::new(ISOBARIC_CODE, "hPa").into(),
    ]);
    for o in make_offsets(3, 6) {
        for &level in &ISOBARIC_HPA[..2] {
            builder
                .add_record(
                    vec![TimeOffset::Point(o).into(), VertLevel::level(level).into()],
                    (o, level as i32),
                )
                .unwrap();
        }
    }
    let nd = builder.finish().unwrap();
    let density = nd.density();

    let mut sharer = CoordinateSharer::new();
    sharer.add_coordinates(nd.axes());
    sharer.add_coordinates(nd.axes());
    let shared = sharer.finish();
    assert_eq!(shared.len(), 2);

    let snd = shared.share(nd).unwrap();
    assert_eq!(snd.density(), density);
    assert_eq!(
        snd.lookup(
            &shared,
            &[TimeOffset::Point(12).into(), VertLevel::level(925.0).into()]
        )
        .unwrap(),
        Some(&(12, 925))
    );

    let mut out = String::new();
    shared.show_info(&mut out).unwrap();
    assert!(out.starts_with("Shared coordinates: 2"));
}
