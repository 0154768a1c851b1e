//! Forward mean aggregation
//!
//! ```text
//! output[j] = (1 / deg(j)) * Σ_{i ∈ rows[col_starts[j]..col_starts[j+1]]} features[i]
//! ```
//!
//! Sum first, divide once. A node with no sources gets a zero row.

use super::{aggregate_rows, count_split_nodes, split_threshold};
use crate::config::AggregateConfig;
use crate::error::{ensure_dim, SageError};
use crate::matrix::FeatureMatrix;
use crate::storage::ColumnView;
use tracing::debug;

/// Mean of each node's source feature vectors
///
/// # Errors
///
/// Returns `ShapeMismatch` if `features` does not have one row per node
///
/// # Example
///
/// ```
/// use sage_conv::{mean_aggregate, AggregateConfig, FeatureMatrix, NodeId, SageGraph};
///
/// // 0 → 1 → 2 → 3
/// let graph = SageGraph::from_edges(
///     4,
///     &[(NodeId(0), NodeId(1)), (NodeId(1), NodeId(2)), (NodeId(2), NodeId(3))],
/// )?;
/// let features = FeatureMatrix::new(4, 1, vec![1.0, 2.0, 3.0, 4.0])?;
///
/// let out = mean_aggregate(&features, graph.columns(), &AggregateConfig::default())?;
/// assert_eq!(out.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
/// # Ok::<(), sage_conv::SageError>(())
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn mean_aggregate(
    features: &FeatureMatrix,
    columns: &ColumnView,
    config: &AggregateConfig,
) -> Result<FeatureMatrix, SageError> {
    ensure_dim("feature rows", columns.num_nodes(), features.rows())?;

    let num_nodes = features.rows();
    let width = features.cols();
    let input = features.as_slice();
    let split = split_threshold(config);

    debug!(
        nodes = num_nodes,
        edges = columns.num_edges(),
        features = width,
        split_nodes = count_split_nodes(num_nodes, |j| columns.degree(j), split),
        "cpu sage forward"
    );

    let data = aggregate_rows(
        num_nodes,
        width,
        |node| columns.neighbors(node),
        split,
        |src, acc| {
            let start = src as usize * width;
            for (a, x) in acc.iter_mut().zip(&input[start..start + width]) {
                *a += x;
            }
        },
        |node, row| {
            let degree = columns.degree(node);
            if degree == 0 {
                return;
            }
            let degree = degree as f32;
            for v in row.iter_mut() {
                *v /= degree;
            }
        },
    );

    FeatureMatrix::new(num_nodes, width, data)
}
