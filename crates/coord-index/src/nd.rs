//! Axes paired with a sparse array, and projection onto other axes.

use std::fmt;
use tracing::debug;

use crate::coordinate::{CoordValue, Coordinate, CoordinateBuilder};
use crate::error::{CoordError, Result};
use crate::sparse::{DuplicatePolicy, SparseArray, SparseArrayBuilder};

/// An ordered axis list and the sparse array indexed by it.
///
/// `data.shape()[k] == axes[k].size()` for every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateND<T> {
    axes: Vec<Coordinate>,
    data: SparseArray<T>,
}

impl<T> CoordinateND<T> {
    pub fn new(axes: Vec<Coordinate>, data: SparseArray<T>) -> Result<Self> {
        if axes.len() != data.rank() {
            return Err(CoordError::RankMismatch {
                expected: axes.len(),
                actual: data.rank(),
            });
        }
        for (axis, (coord, &array_size)) in axes.iter().zip(data.shape()).enumerate() {
            if coord.size() != array_size {
                return Err(CoordError::ShapeMismatch {
                    axis,
                    axis_size: coord.size(),
                    array_size,
                });
            }
        }
        Ok(Self { axes, data })
    }

    pub fn axes(&self) -> &[Coordinate] {
        &self.axes
    }

    pub fn axis(&self, k: usize) -> Option<&Coordinate> {
        self.axes.get(k)
    }

    pub fn data(&self) -> &SparseArray<T> {
        &self.data
    }

    pub fn rank(&self) -> usize {
        self.axes.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Coordinate::size).collect()
    }

    pub fn density(&self) -> f32 {
        self.data.density()
    }

    pub fn into_parts(self) -> (Vec<Coordinate>, SparseArray<T>) {
        (self.axes, self.data)
    }

    /// Per-axis indices of a coordinate tuple, `None` if any axis misses.
    pub fn indices_of(&self, values: &[CoordValue]) -> Result<Option<Vec<usize>>> {
        if values.len() != self.axes.len() {
            return Err(CoordError::RankMismatch {
                expected: self.axes.len(),
                actual: values.len(),
            });
        }
        Ok(self
            .axes
            .iter()
            .zip(values)
            .map(|(axis, value)| axis.index_of(value))
            .collect())
    }

    /// Stored item for a coordinate tuple, or `None` when absent.
    pub fn lookup(&self, values: &[CoordValue]) -> Result<Option<&T>> {
        match self.indices_of(values)? {
            Some(index) => self.data.get(&index),
            None => Ok(None),
        }
    }

    /// Axis values of the cell at row-major position `flat`.
    pub fn cell_values(&self, flat: usize) -> Result<Vec<CoordValue>> {
        self.data
            .unravel(flat)?
            .into_iter()
            .zip(&self.axes)
            .map(|(idx, axis)| axis.value(idx))
            .collect()
    }

    /// Occupied cells with their axis values, in row-major order.
    pub fn cells(&self) -> Result<Vec<(Vec<CoordValue>, &T)>> {
        self.data
            .iter()
            .map(|(flat, item)| Ok((self.cell_values(flat)?, item)))
            .collect()
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for axis in &self.axes {
            write!(out, "  ")?;
            axis.show_info(out)?;
        }
        self.data.show_info(out)
    }
}

/// Old index to new index, per position of `from`.
fn axis_map(from: &Coordinate, to: &Coordinate) -> Result<Vec<Option<usize>>> {
    (0..from.size())
        .map(|idx| Ok(to.index_of(&from.value(idx)?)))
        .collect()
}

/// Accumulates raw records and builds their axes and sparse array.
#[derive(Debug, Clone)]
pub struct CoordinateNDBuilder<T> {
    builders: Vec<CoordinateBuilder>,
    records: Vec<(Vec<CoordValue>, T)>,
    policy: DuplicatePolicy,
}

impl<T> CoordinateNDBuilder<T> {
    pub fn new(builders: Vec<CoordinateBuilder>) -> Self {
        Self {
            builders,
            records: Vec::new(),
            policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn rank(&self) -> usize {
        self.builders.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Record one item at a coordinate tuple, one value per axis.
    pub fn add_record(&mut self, values: Vec<CoordValue>, item: T) -> Result<()> {
        if values.len() != self.builders.len() {
            return Err(CoordError::RankMismatch {
                expected: self.builders.len(),
                actual: values.len(),
            });
        }
        for (builder, value) in self.builders.iter_mut().zip(&values) {
            builder.add(value)?;
        }
        self.records.push((values, item));
        Ok(())
    }

    /// Freeze the axes and place every record.
    pub fn finish(self) -> Result<CoordinateND<T>> {
        let axes: Vec<Coordinate> = self
            .builders
            .into_iter()
            .map(CoordinateBuilder::finish)
            .collect();
        let shape = axes.iter().map(Coordinate::size).collect();
        let mut sparse = SparseArrayBuilder::new(shape)?.with_policy(self.policy);

        for (values, item) in self.records {
            let index = axes
                .iter()
                .zip(&values)
                .map(|(axis, value)| {
                    axis.index_of(value).ok_or_else(|| {
                        CoordError::InvalidTrack(format!(
                            "{} not on its own {} axis",
                            value,
                            axis.coord_type()
                        ))
                    })
                })
                .collect::<Result<Vec<usize>>>()?;
            sparse.add(&index, item)?;
        }

        CoordinateND::new(axes, sparse.finish())
    }
}

impl<T: Clone> CoordinateNDBuilder<T> {
    /// Project `prev` onto `new_axes`, dropping cells any axis lacks.
    ///
    /// Dropping every cell is a valid result; inspect the density.
    pub fn reindex(new_axes: Vec<Coordinate>, prev: &CoordinateND<T>) -> Result<CoordinateND<T>> {
        Self::merge(new_axes, &[prev], DuplicatePolicy::default())
    }

    /// Project several sources onto `new_axes` in order.
    ///
    /// Cells that land on an occupied position follow `policy`.
    pub fn merge(
        new_axes: Vec<Coordinate>,
        sources: &[&CoordinateND<T>],
        policy: DuplicatePolicy,
    ) -> Result<CoordinateND<T>> {
        let shape = new_axes.iter().map(Coordinate::size).collect();
        let mut sparse = SparseArrayBuilder::new(shape)?.with_policy(policy);
        let mut dropped = 0usize;

        for source in sources {
            if source.rank() != new_axes.len() {
                return Err(CoordError::RankMismatch {
                    expected: new_axes.len(),
                    actual: source.rank(),
                });
            }
            let maps = source
                .axes()
                .iter()
                .zip(&new_axes)
                .map(|(from, to)| axis_map(from, to))
                .collect::<Result<Vec<_>>>()?;

            for (flat, item) in source.data().iter() {
                let old = source.data().unravel(flat)?;
                let new: Option<Vec<usize>> = old
                    .iter()
                    .zip(&maps)
                    .map(|(&idx, map)| map[idx])
                    .collect();
                match new {
                    Some(index) => sparse.add(&index, item.clone())?,
                    None => dropped += 1,
                }
            }
        }

        let nd = CoordinateND::new(new_axes, sparse.finish())?;
        debug!(
            sources = sources.len(),
            kept = nd.data().content_size(),
            dropped,
            ndups = nd.data().ndups(),
            density = nd.density(),
            "Reindexed onto new axes"
        );
        Ok(nd)
    }

    /// Project `prev` onto axes of a different layout.
    ///
    /// `map` turns a source cell's values into a tuple on `new_axes`;
    /// returning `None`, or a tuple with a value missing from its axis,
    /// drops the cell.
    pub fn reindex_mapped<F>(
        new_axes: Vec<Coordinate>,
        prev: &CoordinateND<T>,
        map: F,
    ) -> Result<CoordinateND<T>>
    where
        F: Fn(&[CoordValue]) -> Option<Vec<CoordValue>>,
    {
        let shape = new_axes.iter().map(Coordinate::size).collect();
        let mut sparse = SparseArrayBuilder::new(shape)?;
        let mut dropped = 0usize;

        for (flat, item) in prev.data().iter() {
            let values = prev.cell_values(flat)?;
            let index = map(&values).and_then(|mapped| {
                if mapped.len() != new_axes.len() {
                    return None;
                }
                new_axes
                    .iter()
                    .zip(&mapped)
                    .map(|(axis, value)| axis.index_of(value))
                    .collect::<Option<Vec<usize>>>()
            });
            match index {
                Some(index) => sparse.add(&index, item.clone())?,
                None => dropped += 1,
            }
        }

        let nd = CoordinateND::new(new_axes, sparse.finish())?;
        debug!(
            kept = nd.data().content_size(),
            dropped,
            density = nd.density(),
            "Reindexed onto mapped axes"
        );
        Ok(nd)
    }
}
