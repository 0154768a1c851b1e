//! Error taxonomy for precondition violations and malformed graphs
//!
//! Both kinds are detected on the host before any parallel work starts.
//! Degree-0 nodes are not an error and never surface here.

use thiserror::Error;

/// Rejection reasons for views, matrices and aggregation calls
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SageError {
    /// Two operands disagree on a dimension
    #[error("{what}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Which dimension was checked
        what: &'static str,
        /// Size implied by the other operands
        expected: usize,
        /// Size actually supplied
        found: usize,
    },

    /// Offset array has no entries (needs at least the leading zero)
    #[error("offset array is empty, expected num_nodes + 1 entries")]
    EmptyOffsets,

    /// First offset is not zero
    #[error("first offset must be 0, found {0}")]
    NonZeroFirstOffset(u32),

    /// Offsets decrease somewhere
    #[error("offsets decrease at position {position}: {previous} > {next}")]
    NonMonotoneOffsets {
        /// Index of the offending offset
        position: usize,
        /// Offset before it
        previous: u32,
        /// The offending offset
        next: u32,
    },

    /// Last offset does not match the number of indices
    #[error("last offset {last} does not match index array length {len}")]
    OffsetsLengthMismatch {
        /// Final offset value
        last: u32,
        /// Length of the index array
        len: usize,
    },

    /// A neighbor index points outside `[0, num_nodes)`
    #[error("index {index} at position {position} is out of range for {num_nodes} nodes")]
    IndexOutOfRange {
        /// Position inside the index array
        position: usize,
        /// The offending node id
        index: u32,
        /// Number of nodes in the view
        num_nodes: usize,
    },

    /// Indices inside one segment are not ascending
    #[error("indices of segment {segment} are not sorted ascending")]
    UnsortedIndices {
        /// Column (or row) whose indices are out of order
        segment: usize,
    },

    /// A raw int32 buffer holds a negative value
    #[error("{what} holds negative value {value} at position {position}")]
    NegativeValue {
        /// Which buffer was checked
        what: &'static str,
        /// Position of the value
        position: usize,
        /// The negative value
        value: i32,
    },

    /// An in-degree entry is negative or not finite
    #[error("in-degree of node {node} is invalid: {value}")]
    InvalidDegree {
        /// Node id
        node: usize,
        /// The offending value
        value: f32,
    },

    /// An in-degree entry disagrees with the column view
    #[error("in-degree of node {node} is {found}, column view implies {expected}")]
    DegreeMismatch {
        /// Node id
        node: usize,
        /// Degree counted from the column view
        expected: u32,
        /// Degree supplied by the caller
        found: f32,
    },

    /// An operand lives on a different device than the one dispatching
    #[error("{what} is not resident on the dispatching device")]
    DeviceMismatch {
        /// Which operand was rejected
        what: &'static str,
    },

    /// A buffer exceeds a device or index-width limit
    #[error("{what} needs {size} bytes, limit is {limit}")]
    TooLarge {
        /// Which buffer was rejected
        what: &'static str,
        /// Requested size
        size: u64,
        /// Maximum allowed size
        limit: u64,
    },
}

/// Check a dimension, returning `ShapeMismatch` on disagreement
pub(crate) fn ensure_dim(what: &'static str, expected: usize, found: usize) -> Result<(), SageError> {
    if expected == found {
        Ok(())
    } else {
        Err(SageError::ShapeMismatch {
            what,
            expected,
            found,
        })
    }
}
