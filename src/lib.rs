//! sage-conv: mean-aggregation message passing for GraphSAGE layers
//!
//! # Overview
//!
//! Each node's output row is the mean of the feature rows of the nodes that
//! point at it. The backward pass scatters the incoming gradient back along
//! the same edges, normalized by the destination's in-degree. Both passes run
//! on the CPU (rayon) and, with the `gpu` feature, on any wgpu backend.
//!
//! # Quick Start
//!
//! ```
//! use sage_conv::{
//!     mean_aggregate, mean_aggregate_backward, AggregateConfig, FeatureMatrix, NodeId,
//!     SageGraph,
//! };
//!
//! // 0 → 2, 1 → 2
//! let graph = SageGraph::from_edges(3, &[(NodeId(0), NodeId(2)), (NodeId(1), NodeId(2))])?;
//! let features = FeatureMatrix::new(3, 2, vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0])?;
//! let config = AggregateConfig::default();
//!
//! let out = mean_aggregate(&features, graph.columns(), &config)?;
//! assert_eq!(out.row(2), &[2.0, 3.0]);
//!
//! let grad = FeatureMatrix::new(3, 2, vec![0.0, 0.0, 0.0, 0.0, 2.0, 4.0])?;
//! let input_grad =
//!     mean_aggregate_backward(&grad, graph.in_degree(), graph.rows(), &config)?;
//! assert_eq!(input_grad.row(0), &[1.0, 2.0]);
//! assert_eq!(input_grad.row(1), &[1.0, 2.0]);
//! # Ok::<(), sage_conv::SageError>(())
//! ```
//!
//! # Architecture
//!
//! - **Storage**: column view (CSC, forward) and row view (CSR, backward)
//! - **CPU**: one rayon task per output row, split reductions for hubs
//! - **GPU**: WGSL kernels, one invocation per (node, channel) or one
//!   workgroup per node with a shared-memory tree reduction

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod matrix;
pub mod storage;

// GPU backend (optional)
#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export core types
pub use aggregate::{backward_raw, forward_raw, mean_aggregate, mean_aggregate_backward};
pub use config::{AggregateConfig, KernelStrategy, DEFAULT_SPLIT_THRESHOLD};
pub use error::SageError;
pub use matrix::FeatureMatrix;
pub use storage::{ColumnView, InDegree, NodeId, RowView, SageGraph};

#[cfg(feature = "gpu")]
pub use gpu::{
    gpu_backward, gpu_forward, GpuColumnView, GpuDevice, GpuInDegree, GpuMatrix, GpuRowView,
    GpuSageConv, GpuSageGraph,
};

// Error type
pub use anyhow::{Error, Result};
