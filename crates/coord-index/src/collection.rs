//! Builds one queryable index over many partitions.
//!
//! # Pipeline
//!
//! ```text
//! Partition (one per model run or file)
//!      │
//!      ▼
//! scan (parallel)  ──► CoordinateND<L> per variable over [time2D, vert?]
//!      │
//!      ▼
//! merge (sequential, earliest runtime then name)
//!      │
//!      ├─► unionize time2D and vertical axes per variable
//!      ├─► reindex every partition onto the union axes
//!      ├─► factor orthogonal time into [runtime, time, vert?]
//!      │
//!      ▼
//! share identical axes ──► CollectionIndex<L>
//! ```

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::coordinate::{
    CoordValue, Coordinate, CoordinateBuilder, CoordinateRuntime, CoordinateType, RuntimeBuilder,
    RuntimeValue, Time2DBuilder, Time2DUnion, Time2DUnionizer, VertBuilder, VertLevel,
};
use crate::error::{CoordError, Result};
use crate::nd::{CoordinateND, CoordinateNDBuilder};
use crate::sharer::{CoordId, CoordinateSharer, SharedCoordinateND, SharedCoordinates};
use crate::time::{Time2D, TimeOffset, TimeUnit};

/// Vertical axis description of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalSpec {
    /// Level type code (e.g. 100 = isobaric).
    pub code: i32,
    pub unit: String,
}

/// How one variable's records are keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    pub time_unit: TimeUnit,
    pub time_code: i32,
    pub is_interval: bool,
    pub vertical: Option<VerticalSpec>,
}

/// One physical record as reported by the reading layer.
///
/// The locator is stored and returned, never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord<L> {
    pub runtime: DateTime<Utc>,
    pub offset: TimeOffset,
    pub level: Option<VertLevel>,
    pub locator: L,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionVariable<L> {
    pub spec: VariableSpec,
    pub records: Vec<RawRecord<L>>,
}

/// Records of one partition, grouped by variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<L> {
    pub name: String,
    pub variables: Vec<PartitionVariable<L>>,
}

/// A partition after the scan phase.
#[derive(Debug, Clone)]
struct ScannedPartition<L> {
    name: String,
    earliest: Option<DateTime<Utc>>,
    variables: Vec<(VariableSpec, CoordinateND<L>)>,
}

/// Values on `[time2D, vert?]`; a level on a variable without a vertical
/// axis surfaces as a rank mismatch.
fn record_values<L>(record: &RawRecord<L>) -> Vec<CoordValue> {
    let time2d = Time2D::new(record.runtime, record.offset);
    let mut values = vec![CoordValue::Time2D(time2d)];
    values.extend(record.level.map(CoordValue::Vertical));
    values
}

fn axis_builders(spec: &VariableSpec) -> Vec<CoordinateBuilder> {
    let time2d = Time2DBuilder::new(spec.time_code, spec.time_unit, spec.is_interval);
    let mut builders: Vec<CoordinateBuilder> = vec![time2d.into()];
    if let Some(vertical) = &spec.vertical {
        let vert = VertBuilder::new(vertical.code, vertical.unit.clone());
        builders.push(vert.into());
    }
    builders
}

fn scan_partition<L: Clone>(
    partition: &Partition<L>,
    config: &IndexConfig,
) -> Result<ScannedPartition<L>> {
    let mut variables = Vec::with_capacity(partition.variables.len());
    let mut earliest: Option<DateTime<Utc>> = None;

    for variable in &partition.variables {
        let mut builder = CoordinateNDBuilder::new(axis_builders(&variable.spec))
            .with_policy(config.duplicate_policy);
        for record in &variable.records {
            builder.add_record(record_values(record), record.locator.clone())?;
            earliest = Some(earliest.map_or(record.runtime, |e| e.min(record.runtime)));
        }
        let nd = builder.finish()?;
        debug!(
            partition = %partition.name,
            variable = %variable.spec.name,
            records = variable.records.len(),
            ndups = nd.data().ndups(),
            density = nd.density(),
            "Scanned variable"
        );
        variables.push((variable.spec.clone(), nd));
    }

    Ok(ScannedPartition {
        name: partition.name.clone(),
        earliest,
        variables,
    })
}

/// Accumulates partitions and builds a [`CollectionIndex`].
#[derive(Debug, Clone)]
pub struct CollectionBuilder<L> {
    config: IndexConfig,
    partitions: Vec<Partition<L>>,
}

impl<L> CollectionBuilder<L>
where
    L: Clone + Send + Sync,
{
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            partitions: Vec::new(),
        }
    }

    pub fn add_partition(&mut self, partition: Partition<L>) {
        self.partitions.push(partition);
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn build(self) -> Result<CollectionIndex<L>> {
        self.config.validate().map_err(CoordError::InvalidConfig)?;
        let config = &self.config;

        let mut scanned: Vec<ScannedPartition<L>> = if config.parallel_scan {
            self.partitions
                .par_iter()
                .map(|p| scan_partition(p, config))
                .collect::<Result<_>>()?
        } else {
            self.partitions
                .iter()
                .map(|p| scan_partition(p, config))
                .collect::<Result<_>>()?
        };

        // Empty partitions last, then by earliest runtime and name.
        scanned.sort_by(|a, b| {
            (a.earliest.is_none(), a.earliest, &a.name)
                .cmp(&(b.earliest.is_none(), b.earliest, &b.name))
        });

        let master = master_runtime(&scanned);
        let grouped = group_by_variable(&scanned);

        let mut merged = Vec::with_capacity(grouped.len());
        for (spec, sources) in grouped {
            merged.push(merge_variable(spec, &sources, &master, config)?);
        }

        let mut sharer = CoordinateSharer::new();
        let master_axis = Coordinate::Runtime(master.clone());
        sharer.add_coordinates(std::slice::from_ref(&master_axis));
        for (_, nd) in &merged {
            sharer.add_coordinates(nd.axes());
        }
        let shared = sharer.finish();

        let master_id = shared
            .id_of(&master_axis)
            .ok_or_else(|| CoordError::UnknownCoordinate("master runtime".into()))?;

        let mut variables = Vec::with_capacity(merged.len());
        let mut by_name = HashMap::with_capacity(merged.len());
        for (spec, nd) in merged {
            by_name.insert(spec.name.clone(), variables.len());
            variables.push(CollectionVariable {
                spec,
                index: shared.share(nd)?,
            });
        }

        info!(
            partitions = scanned.len(),
            runtimes = master.size(),
            variables = variables.len(),
            shared_axes = shared.len(),
            "Built collection index"
        );

        Ok(CollectionIndex {
            master,
            master_id,
            shared,
            variables,
            by_name,
        })
    }
}

fn master_runtime<L>(scanned: &[ScannedPartition<L>]) -> CoordinateRuntime {
    let (code, unit) = scanned
        .iter()
        .flat_map(|p| p.variables.first())
        .map(|(spec, _)| (spec.time_code, spec.time_unit))
        .next()
        .unwrap_or((1, TimeUnit::HOUR));

    let mut builder = RuntimeBuilder::new(code, unit);
    for partition in scanned {
        for (_, nd) in &partition.variables {
            if let Some(Coordinate::Time2D(time2d)) = nd.axis(0) {
                for run in time2d.runs() {
                    builder.add_date(*run);
                }
            }
        }
    }
    builder.finish()
}

/// Variables in first-seen merge order, each with its sources in order.
fn group_by_variable<L>(
    scanned: &[ScannedPartition<L>],
) -> Vec<(VariableSpec, Vec<&CoordinateND<L>>)> {
    let mut grouped: Vec<(VariableSpec, Vec<&CoordinateND<L>>)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for partition in scanned {
        for (spec, nd) in &partition.variables {
            match positions.get(spec.name.as_str()) {
                Some(&pos) => grouped[pos].1.push(nd),
                None => {
                    positions.insert(spec.name.as_str(), grouped.len());
                    grouped.push((spec.clone(), vec![nd]));
                }
            }
        }
    }
    grouped
}

fn merge_variable<L: Clone>(
    spec: VariableSpec,
    sources: &[&CoordinateND<L>],
    master: &CoordinateRuntime,
    config: &IndexConfig,
) -> Result<(VariableSpec, CoordinateND<L>)> {
    let mut unionizer = Time2DUnionizer::new(
        true,
        spec.time_unit,
        spec.time_code,
        spec.is_interval,
        Some(master.clone()),
    );
    let mut vert = spec
        .vertical
        .as_ref()
        .map(|v| VertBuilder::new(v.code, v.unit.clone()));

    for source in sources {
        match source.axis(0) {
            Some(Coordinate::Time2D(time2d)) => unionizer.add_all(time2d)?,
            Some(other) => {
                return Err(CoordError::type_mismatch(
                    CoordinateType::Time2D,
                    other.coord_type().name(),
                ));
            }
            None => {
                return Err(CoordError::RankMismatch {
                    expected: 1,
                    actual: 0,
                })
            }
        }
        if let (Some(builder), Some(axis)) = (vert.as_mut(), source.axis(1)) {
            for value in axis.values() {
                builder.add(&value)?;
            }
        }
    }

    let time2d = match unionizer.finish()? {
        Time2DUnion::Time2D(coord) => coord,
        Time2DUnion::Best(_) => {
            let kind = CoordinateType::Time2D;
            return Err(CoordError::type_mismatch(kind, "best time"));
        }
    };
    let vert_axis = vert.map(|b| Coordinate::Vertical(b.finish()));
    let factor = config.prefer_orthogonal && time2d.is_orthogonal() && !time2d.is_empty();

    let time_axis = if factor {
        Coordinate::Time2D(time2d.clone())
    } else {
        Coordinate::Time2D(time2d.to_regular().unwrap_or_else(|| time2d.clone()))
    };
    let mut union_axes = vec![time_axis];
    union_axes.extend(vert_axis.clone());
    let mut nd = CoordinateNDBuilder::merge(union_axes, sources, config.duplicate_policy)?;

    if factor {
        let offsets = time2d.time_coordinate(0)?.with_ref_date(None);
        let mut axes = vec![
            Coordinate::Runtime(time2d.runtime().clone()),
            Coordinate::Time(offsets),
        ];
        axes.extend(vert_axis);
        nd = CoordinateNDBuilder::reindex_mapped(axes, &nd, |values| {
            let CoordValue::Time2D(t) = values.first()? else {
                return None;
            };
            let mut mapped = vec![
                CoordValue::Runtime(RuntimeValue::Date(t.run)),
                CoordValue::Time(t.offset),
            ];
            mapped.extend(values[1..].iter().cloned());
            Some(mapped)
        })?;
    }

    debug!(
        variable = %spec.name,
        sources = sources.len(),
        nruns = time2d.nruns(),
        orthogonal = factor,
        ndups = nd.data().ndups(),
        density = nd.density(),
        "Merged variable"
    );
    if nd.density() < config.min_density {
        warn!(
            variable = %spec.name,
            density = nd.density(),
            min_density = config.min_density,
            "Variable coordinates fit the records poorly"
        );
    }

    Ok((spec, nd))
}

/// One variable of a built collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionVariable<L> {
    spec: VariableSpec,
    index: SharedCoordinateND<L>,
}

impl<L> CollectionVariable<L> {
    pub fn spec(&self) -> &VariableSpec {
        &self.spec
    }

    pub fn index(&self) -> &SharedCoordinateND<L> {
        &self.index
    }

    pub fn axes(&self) -> &[CoordId] {
        self.index.axes()
    }

    pub fn density(&self) -> f32 {
        self.index.density()
    }
}

/// Queryable index over every partition of a collection.
#[derive(Debug, Clone)]
pub struct CollectionIndex<L> {
    master: CoordinateRuntime,
    master_id: CoordId,
    shared: SharedCoordinates,
    variables: Vec<CollectionVariable<L>>,
    by_name: HashMap<String, usize>,
}

impl<L> CollectionIndex<L> {
    /// Every runtime seen in any partition.
    pub fn master_runtime(&self) -> &CoordinateRuntime {
        &self.master
    }

    pub fn master_runtime_id(&self) -> CoordId {
        self.master_id
    }

    pub fn shared_coordinates(&self) -> &SharedCoordinates {
        &self.shared
    }

    pub fn variable(&self, name: &str) -> Option<&CollectionVariable<L>> {
        self.by_name.get(name).map(|&idx| &self.variables[idx])
    }

    pub fn variables(&self) -> impl Iterator<Item = &CollectionVariable<L>> + '_ {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Locator of the record at a coordinate tuple.
    ///
    /// `Ok(None)` for an unknown variable or a tuple with no record.
    pub fn find(
        &self,
        variable: &str,
        runtime: DateTime<Utc>,
        offset: TimeOffset,
        level: Option<VertLevel>,
    ) -> Result<Option<&L>> {
        let Some(var) = self.variable(variable) else {
            return Ok(None);
        };
        let first = match var.axes().first() {
            Some(id) => self.shared.get(*id)?,
            None => return Ok(None),
        };

        let mut values = match first {
            Coordinate::Runtime(_) => vec![
                CoordValue::Runtime(RuntimeValue::Date(runtime)),
                CoordValue::Time(offset),
            ],
            _ => vec![CoordValue::Time2D(Time2D::new(runtime, offset))],
        };
        values.extend(level.map(CoordValue::Vertical));
        var.index.lookup(&self.shared, &values)
    }

    pub fn show_info(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "Master ")?;
        self.master.show_info(out)?;
        for var in &self.variables {
            write!(out, "{}:", var.spec.name)?;
            for id in var.axes() {
                write!(out, " {}", id)?;
            }
            writeln!(out, " density={:.6}", var.density())?;
        }
        self.shared.show_info(out)
    }
}
