//! Collection-wide deduplication of value-identical axes.
//!
//! Axes live in an arena and are referred to by [`CoordId`]. Two axes with
//! the same kind, code and ordered values get the same id; the first one
//! registered is kept as the representative. Sharing rewrites references
//! only and never drops data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::coordinate::{CoordKey, CoordValue, Coordinate};
use crate::error::{CoordError, Result};
use crate::nd::CoordinateND;
use crate::sparse::SparseArray;

/// Handle to a shared axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoordId(usize);

impl CoordId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for CoordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Accumulates the axis lists of many variables.
#[derive(Debug, Clone, Default)]
pub struct CoordinateSharer {
    registered: Vec<Vec<Coordinate>>,
}

impl CoordinateSharer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one variable's axes.
    pub fn add_coordinates(&mut self, axes: &[Coordinate]) {
        self.registered.push(axes.to_vec());
    }

    /// Number of axis lists registered.
    pub fn registered(&self) -> usize {
        self.registered.len()
    }

    /// Keep one representative per distinct axis, in first-seen order.
    pub fn finish(self) -> SharedCoordinates {
        let mut shared = SharedCoordinates::default();
        let mut total = 0usize;
        for axes in self.registered {
            for coord in axes {
                total += 1;
                shared.intern(coord);
            }
        }
        debug!(registered = total, shared = shared.len(), "Shared coordinates");
        shared
    }
}

/// The deduplicated axis universe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedCoordinates {
    coords: Vec<Coordinate>,
    ids: HashMap<CoordKey, CoordId>,
}

impl SharedCoordinates {
    fn intern(&mut self, coord: Coordinate) -> CoordId {
        let key = coord.key();
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = CoordId(self.coords.len());
        self.coords.push(coord);
        self.ids.insert(key, id);
        id
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn get(&self, id: CoordId) -> Result<&Coordinate> {
        self.coords
            .get(id.0)
            .ok_or_else(|| CoordError::UnknownCoordinate(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CoordId, &Coordinate)> + '_ {
        self.coords.iter().enumerate().map(|(i, c)| (CoordId(i), c))
    }

    pub fn id_of(&self, coord: &Coordinate) -> Option<CoordId> {
        self.ids.get(&coord.key()).copied()
    }

    /// Ids of the shared axes value-identical to `axes`.
    pub fn reindex_to_shared(&self, axes: &[Coordinate]) -> Result<Vec<CoordId>> {
        axes.iter()
            .map(|coord| {
                self.id_of(coord).ok_or_else(|| {
                    CoordError::UnknownCoordinate(format!(
                        "{} code={} n={}",
                        coord.coord_type(),
                        coord.code(),
                        coord.size()
                    ))
                })
            })
            .collect()
    }

    /// Point `nd` at the shared axes; the sparse array is kept as is.
    pub fn share<T>(&self, nd: CoordinateND<T>) -> Result<SharedCoordinateND<T>> {
        let axes = self.reindex_to_shared(nd.axes())?;
        let (_, data) = nd.into_parts();
        Ok(SharedCoordinateND { axes, data })
    }

    /// Axes behind a shared index.
    pub fn resolve<T>(&self, nd: &SharedCoordinateND<T>) -> Result<Vec<&Coordinate>> {
        nd.axes.iter().map(|id| self.get(*id)).collect()
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "Shared coordinates: {}", self.coords.len())?;
        for (id, coord) in self.iter() {
            write!(out, "  {} ", id)?;
            coord.show_info(out)?;
        }
        Ok(())
    }
}

/// A sparse index whose axes are shared handles.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedCoordinateND<T> {
    axes: Vec<CoordId>,
    data: SparseArray<T>,
}

impl<T> SharedCoordinateND<T> {
    pub fn axes(&self) -> &[CoordId] {
        &self.axes
    }

    pub fn data(&self) -> &SparseArray<T> {
        &self.data
    }

    pub fn density(&self) -> f32 {
        self.data.density()
    }

    /// Stored item for a coordinate tuple, or `None` when absent.
    pub fn lookup(&self, shared: &SharedCoordinates, values: &[CoordValue]) -> Result<Option<&T>> {
        if values.len() != self.axes.len() {
            return Err(CoordError::RankMismatch {
                expected: self.axes.len(),
                actual: values.len(),
            });
        }
        let mut index = Vec::with_capacity(values.len());
        for (id, value) in self.axes.iter().zip(values) {
            match shared.get(*id)?.index_of(value) {
                Some(idx) => index.push(idx),
                None => return Ok(None),
            }
        }
        self.data.get(&index)
    }
}
