//! Backward pass: gradient of the mean aggregation w.r.t. its input features
//!
//! ```text
//! input_grad[i] = Σ_{j ∈ cols[row_starts[i]..row_starts[i+1]]} grad[j] / indeg[j]
//! ```
//!
//! Walking the row view lets every source node gather its own gradient, so
//! each output row has one writer and no atomic scatter is needed.

use super::{aggregate_rows, count_split_nodes, split_threshold};
use crate::config::AggregateConfig;
use crate::error::{ensure_dim, SageError};
use crate::matrix::FeatureMatrix;
use crate::storage::{InDegree, RowView};
use tracing::debug;

/// Gradient of [`mean_aggregate`](super::mean_aggregate) w.r.t. its features
///
/// Destinations with `indeg == 0` contribute nothing. A well-formed graph
/// never produces that case, but malformed degree input must not turn into
/// NaN.
///
/// # Errors
///
/// Returns `ShapeMismatch` if `grad` rows or `indeg` length disagree with
/// the row view's node count
pub fn mean_aggregate_backward(
    grad: &FeatureMatrix,
    indeg: &InDegree,
    rows: &RowView,
    config: &AggregateConfig,
) -> Result<FeatureMatrix, SageError> {
    ensure_dim("gradient rows", rows.num_nodes(), grad.rows())?;
    ensure_dim("in-degree length", rows.num_nodes(), indeg.len())?;

    let num_nodes = grad.rows();
    let width = grad.cols();
    let upstream = grad.as_slice();
    let degrees = indeg.as_slice();
    let split = split_threshold(config);

    debug!(
        nodes = num_nodes,
        edges = rows.num_edges(),
        features = width,
        split_nodes = count_split_nodes(num_nodes, |i| rows.degree(i), split),
        "cpu sage backward"
    );

    let data = aggregate_rows(
        num_nodes,
        width,
        |node| rows.neighbors(node),
        split,
        |dst, acc| {
            let degree = degrees[dst as usize];
            if degree == 0.0 {
                return;
            }
            let start = dst as usize * width;
            for (a, g) in acc.iter_mut().zip(&upstream[start..start + width]) {
                *a += g / degree;
            }
        },
        |_, _| {},
    );

    FeatureMatrix::new(num_nodes, width, data)
}
