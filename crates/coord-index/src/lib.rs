//! Sparse Multidimensional Coordinate Indexing
//!
//! This crate builds compact, queryable indices over temporally fragmented
//! forecast-model collections. Each record is keyed by its run time, its
//! forecast offset and optionally a vertical level, and the index maps
//! that tuple back to an opaque record locator.
//!
//! - **Coordinates**: sorted, distinct, immutable axes built from raw values
//! - **Sparse arrays**: one `Option` cell per tuple, compact content
//! - **Reindexing**: project an index onto other axes, dropping misses
//! - **Time2D union**: merge run × offset axes and detect orthogonality
//! - **Sharing**: store value-identical axes once, referenced by id
//!
//! # Architecture
//!
//! ```text
//! RawRecord (runtime, offset, level, locator)
//!      │
//!      ▼
//! CoordinateNDBuilder ──► CoordinateND<L> per partition variable
//!      │
//!      ├─► Time2DUnionizer (collection-wide run × offset axis)
//!      │
//!      ├─► CoordinateNDBuilder::merge (reindex onto union axes)
//!      │
//!      └─► CoordinateSharer (dedup axes) ──► CollectionIndex<L>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use coord_index::{CollectionBuilder, IndexConfig, TimeOffset};
//!
//! let mut builder = CollectionBuilder::new(IndexConfig::from_env());
//! for partition in partitions {
//!     builder.add_partition(partition);
//! }
//! let index = builder.build()?;
//!
//! let locator = index.find("TMP", run, TimeOffset::Point(6), None)?;
//! ```

pub mod collection;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod nd;
pub mod sharer;
pub mod sparse;
pub mod time;

// Re-export commonly used types at crate root
pub use collection::{
    CollectionBuilder, CollectionIndex, CollectionVariable, Partition, PartitionVariable,
    RawRecord, VariableSpec, VerticalSpec,
};
pub use config::IndexConfig;
pub use coordinate::{
    test_orthogonal, test_regular, BestTimeCoordinate, CoordKey, CoordValue, Coordinate,
    CoordinateBuilder, CoordinateRuntime, CoordinateTime, CoordinateTime2D, CoordinateType,
    CoordinateVert, RuntimeBuilder, RuntimeValue, Time2DBuilder, Time2DLayout, Time2DUnion,
    Time2DUnionizer, TimeBuilder, VertBuilder, VertLevel,
};
pub use error::{CoordError, Result};
pub use nd::{CoordinateND, CoordinateNDBuilder};
pub use sharer::{CoordId, CoordinateSharer, SharedCoordinateND, SharedCoordinates};
pub use sparse::{DuplicatePolicy, SparseArray, SparseArrayBuilder};
pub use time::{parse_datetime, PeriodField, Time2D, TimeIntv, TimeIntvDate, TimeOffset, TimeUnit};
