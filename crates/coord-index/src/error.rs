//! Error types for coordinate indexing.
//!
//! Only structural problems are errors. A value missing from an axis is an
//! `Option::None` from `index_of`, and a poorly fitting partition shows up as
//! low density, never as an error.

use thiserror::Error;

use crate::coordinate::CoordinateType;

/// Errors raised at builder and constructor boundaries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Index access outside the declared bounds of an axis or array.
    #[error("index {index} out of range for size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// An axis size disagrees with the sparse array dimension it indexes.
    #[error("axis {axis} has size {axis_size} but sparse array dimension is {array_size}")]
    ShapeMismatch {
        axis: usize,
        axis_size: usize,
        array_size: usize,
    },

    /// Number of axes or indices does not match the array rank.
    #[error("expected rank {expected}, got {actual}")]
    RankMismatch { expected: usize, actual: usize },

    /// Externally supplied track/content pair violates the bijection.
    #[error("invalid sparse track: {0}")]
    InvalidTrack(String),

    /// A value of the wrong coordinate kind was handed to a builder.
    #[error("expected {expected} value, found {found}")]
    TypeMismatch {
        expected: CoordinateType,
        found: String,
    },

    /// Point and interval offsets were mixed on one time axis.
    #[error("point and interval offsets mixed on one time axis")]
    MixedTimeKinds,

    /// The sharer was asked about an axis it never registered.
    #[error("coordinate not registered with sharer: {0}")]
    UnknownCoordinate(String),

    /// A runtime is missing from the master runtime axis.
    #[error("runtime {0} not in master runtime coordinate")]
    RuntimeNotInMaster(String),

    /// Time unit code or multiplier cannot be used.
    #[error("invalid time unit: {0}")]
    InvalidTimeUnit(String),

    /// Configuration failed to load or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoordError {
    /// Create an IndexOutOfRange error.
    pub fn out_of_range(index: usize, size: usize) -> Self {
        Self::IndexOutOfRange { index, size }
    }

    /// Create a TypeMismatch error.
    pub fn type_mismatch(expected: CoordinateType, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected,
            found: found.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<serde_yaml::Error> for CoordError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::InvalidConfig(format!("YAML error: {}", err))
    }
}

/// Result type for coordinate indexing operations.
pub type Result<T> = std::result::Result<T, CoordError>;
