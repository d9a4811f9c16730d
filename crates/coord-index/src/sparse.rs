//! Sparse N-dimensional lookup table.
//!
//! A `track` cell per index position points into a compact `content` list.
//! Cells are stored as `Option<NonZeroU32>` holding the 1-based content
//! position, so an empty cell costs the same four bytes as a full one.
//!
//! Invariant: the occupied track cells are a bijection onto the content
//! positions. No two cells share a content slot and no slot is orphaned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::{CoordError, Result};

/// Which value survives when two records land on the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the first value registered.
    #[default]
    First,
    /// Replace with the latest value registered.
    Last,
}

impl FromStr for DuplicatePolicy {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(CoordError::invalid_config(format!(
                "unknown duplicate policy: {}",
                other
            ))),
        }
    }
}

/// Product of `shape`, erroring on overflow.
fn total_size(shape: &[usize]) -> Result<usize> {
    shape.iter().try_fold(1usize, |acc, &n| {
        acc.checked_mul(n).ok_or_else(|| {
            CoordError::InvalidTrack(format!("shape {:?} overflows index space", shape))
        })
    })
}

/// Row-major strides.
fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for k in (0..shape.len().saturating_sub(1)).rev() {
        strides[k] = strides[k + 1] * shape[k + 1];
    }
    strides
}

fn flat_index_of(shape: &[usize], strides: &[usize], index: &[usize]) -> Result<usize> {
    if index.len() != shape.len() {
        return Err(CoordError::RankMismatch {
            expected: shape.len(),
            actual: index.len(),
        });
    }
    let mut flat = 0;
    for ((&i, &n), &stride) in index.iter().zip(shape).zip(strides) {
        if i >= n {
            return Err(CoordError::out_of_range(i, n));
        }
        flat += i * stride;
    }
    Ok(flat)
}

/// Immutable sparse array over a fixed shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseArray<T> {
    shape: Vec<usize>,
    track: Vec<Option<NonZeroU32>>,
    content: Vec<T>,
    ndups: usize,
}

impl<T> SparseArray<T> {
    /// Build from an externally computed track.
    ///
    /// Rejects a track whose length is not the product of `shape`, cells
    /// pointing past `content`, shared content slots and orphaned content.
    pub fn new(shape: Vec<usize>, track: Vec<Option<NonZeroU32>>, content: Vec<T>) -> Result<Self> {
        let total = total_size(&shape)?;
        if track.len() != total {
            return Err(CoordError::InvalidTrack(format!(
                "track length {} does not match shape {:?} (size {})",
                track.len(),
                shape,
                total
            )));
        }

        let mut referenced = vec![false; content.len()];
        for cell in track.iter().flatten() {
            let pos = cell.get() as usize - 1;
            match referenced.get_mut(pos) {
                None => {
                    return Err(CoordError::InvalidTrack(format!(
                        "track points to content {} of {}",
                        pos + 1,
                        content.len()
                    )))
                }
                Some(true) => {
                    return Err(CoordError::InvalidTrack(format!(
                        "content {} referenced more than once",
                        pos + 1
                    )))
                }
                Some(seen) => *seen = true,
            }
        }
        if let Some(orphan) = referenced.iter().position(|seen| !seen) {
            return Err(CoordError::InvalidTrack(format!(
                "content {} is not referenced",
                orphan + 1
            )));
        }

        Ok(Self {
            shape,
            track,
            content,
            ndups: 0,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn total_size(&self) -> usize {
        self.track.len()
    }

    /// Number of occupied cells.
    pub fn content_size(&self) -> usize {
        self.content.len()
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn track(&self) -> &[Option<NonZeroU32>] {
        &self.track
    }

    /// Values that collided with an occupied cell while building.
    pub fn ndups(&self) -> usize {
        self.ndups
    }

    /// Occupied cells over all cells; an empty shape has density 0.
    pub fn density(&self) -> f32 {
        if self.track.is_empty() {
            return 0.0;
        }
        self.content.len() as f32 / self.track.len() as f32
    }

    pub fn flat_index(&self, index: &[usize]) -> Result<usize> {
        flat_index_of(&self.shape, &strides(&self.shape), index)
    }

    /// Per-axis indices of a flat position.
    pub fn unravel(&self, flat: usize) -> Result<Vec<usize>> {
        if flat >= self.track.len() {
            return Err(CoordError::out_of_range(flat, self.track.len()));
        }
        let mut rest = flat;
        let mut index = vec![0; self.shape.len()];
        for (k, stride) in strides(&self.shape).into_iter().enumerate() {
            index[k] = rest / stride;
            rest %= stride;
        }
        Ok(index)
    }

    pub fn get(&self, index: &[usize]) -> Result<Option<&T>> {
        let flat = self.flat_index(index)?;
        self.get_flat(flat)
    }

    pub fn get_flat(&self, flat: usize) -> Result<Option<&T>> {
        let cell = self
            .track
            .get(flat)
            .ok_or_else(|| CoordError::out_of_range(flat, self.track.len()))?;
        Ok(cell.map(|pos| &self.content[pos.get() as usize - 1]))
    }

    /// Occupied cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.track.iter().enumerate().filter_map(move |(flat, cell)| {
            cell.map(|pos| (flat, &self.content[pos.get() as usize - 1]))
        })
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<Option<NonZeroU32>>, Vec<T>) {
        (self.shape, self.track, self.content)
    }

    /// Occupied count at each index of each axis.
    pub fn fill_counts(&self) -> Vec<Vec<usize>> {
        let mut counts: Vec<Vec<usize>> = self.shape.iter().map(|&n| vec![0; n]).collect();
        let strides = strides(&self.shape);
        for (flat, cell) in self.track.iter().enumerate() {
            if cell.is_none() {
                continue;
            }
            let mut rest = flat;
            for (k, stride) in strides.iter().enumerate() {
                counts[k][rest / stride] += 1;
                rest %= stride;
            }
        }
        counts
    }

    /// Per-axis fill histogram, for logs.
    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            out,
            "SparseArray shape={:?} content={} total={} density={:.6} ndups={}",
            self.shape,
            self.content.len(),
            self.track.len(),
            self.density(),
            self.ndups
        )?;
        for (axis, counts) in self.fill_counts().iter().enumerate() {
            let full = self.track.len() / self.shape[axis].max(1);
            let n = self.shape[axis];
            write!(out, "  axis {} (n={}, full={}):", axis, n, full)?;
            for count in counts {
                write!(out, " {}", count)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Accumulates values by cell position.
#[derive(Debug, Clone)]
pub struct SparseArrayBuilder<T> {
    shape: Vec<usize>,
    strides: Vec<usize>,
    track: Vec<Option<NonZeroU32>>,
    content: Vec<T>,
    policy: DuplicatePolicy,
    ndups: usize,
}

impl<T> SparseArrayBuilder<T> {
    pub fn new(shape: Vec<usize>) -> Result<Self> {
        let total = total_size(&shape)?;
        Ok(Self {
            strides: strides(&shape),
            shape,
            track: vec![None; total],
            content: Vec::new(),
            policy: DuplicatePolicy::default(),
            ndups: 0,
        })
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn total_size(&self) -> usize {
        self.track.len()
    }

    pub fn add(&mut self, index: &[usize], value: T) -> Result<()> {
        let flat = flat_index_of(&self.shape, &self.strides, index)?;
        self.add_flat(flat, value)
    }

    /// Set the cell at row-major position `flat`.
    pub fn add_flat(&mut self, flat: usize, value: T) -> Result<()> {
        let total = self.track.len();
        let cell = self
            .track
            .get_mut(flat)
            .ok_or_else(|| CoordError::out_of_range(flat, total))?;

        if let Some(pos) = cell {
            self.ndups += 1;
            if self.policy == DuplicatePolicy::Last {
                self.content[pos.get() as usize - 1] = value;
            }
            return Ok(());
        }

        let next = u32::try_from(self.content.len() + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| CoordError::InvalidTrack("content exceeds u32 range".into()))?;
        self.content.push(value);
        *cell = Some(next);
        Ok(())
    }

    pub fn finish(self) -> SparseArray<T> {
        SparseArray {
            shape: self.shape,
            track: self.track,
            content: self.content,
            ndups: self.ndups,
        }
    }
}
