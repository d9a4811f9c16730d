//! Generators for synthetic forecast-collection coordinates.
//!
//! These produce plain chrono dates and numbers so any crate can turn them
//! into its own coordinate values.

use chrono::{DateTime, Duration, Utc};

use crate::fixtures::time::reference_time;

/// Creates evenly spaced model runtimes.
///
/// # Arguments
///
/// * `start` - First runtime
/// * `count` - Number of runtimes
/// * `spacing_hours` - Hours between consecutive runtimes
///
/// # Example
///
/// ```
/// use test_utils::{make_runtimes, reference_time};
///
/// let runs = make_runtimes(reference_time(), 4, 6);
/// assert_eq!(runs.len(), 4);
/// assert_eq!((runs[3] - runs[0]).num_hours(), 18);
/// ```
pub fn make_runtimes(start: DateTime<Utc>, count: usize, spacing_hours: i64) -> Vec<DateTime<Utc>> {
    (0..count)
        .map(|i| start + Duration::hours(i as i64 * spacing_hours))
        .collect()
}

/// Runtimes starting at [`reference_time`].
pub fn make_reference_runtimes(count: usize, spacing_hours: i64) -> Vec<DateTime<Utc>> {
    make_runtimes(reference_time(), count, spacing_hours)
}

/// Creates forecast offsets `0, step, 2*step, ...`.
///
/// ```
/// use test_utils::make_offsets;
///
/// assert_eq!(make_offsets(4, 6), vec![0, 6, 12, 18]);
/// ```
pub fn make_offsets(count: usize, step: i32) -> Vec<i32> {
    (0..count as i32).map(|i| i * step).collect()
}

/// Creates accumulation intervals `(0, step), (step, 2*step), ...`.
pub fn make_intervals(count: usize, step: i32) -> Vec<(i32, i32)> {
    (0..count as i32).map(|i| (i * step, (i + 1) * step)).collect()
}

/// Creates `count` levels descending from `bottom` by `step`.
///
/// Mimics pressure levels, which are reported top-down in most files.
pub fn make_levels(count: usize, bottom: f64, step: f64) -> Vec<f64> {
    (0..count).map(|i| bottom - i as f64 * step).collect()
}

/// Every `(runtime, offset)` pair of a run × offset grid, in a scrambled but
/// deterministic order with each pair repeated twice.
///
/// Useful for checking that builders sort and deduplicate.
pub fn scrambled_pairs(runs: &[DateTime<Utc>], offsets: &[i32]) -> Vec<(DateTime<Utc>, i32)> {
    let mut pairs: Vec<(DateTime<Utc>, i32)> = runs
        .iter()
        .flat_map(|r| offsets.iter().map(move |o| (*r, *o)))
        .collect();
    pairs.reverse();
    let n = pairs.len();
    let mut out = Vec::with_capacity(n * 2);
    for i in 0..n {
        out.push(pairs[(i * 7) % n]);
    }
    out.extend(pairs);
    out
}
