//! Raw int32 entry points
//!
//! Accept offsets and indices as the `i32` buffers graph loaders hand out,
//! validate everything once, then run the CPU kernels. Any violation is a
//! rejected call; nothing is coerced.

use super::{mean_aggregate, mean_aggregate_backward};
use crate::config::AggregateConfig;
use crate::error::{ensure_dim, SageError};
use crate::matrix::FeatureMatrix;
use crate::storage::{ColumnView, InDegree, RowView};

/// `forward(features, col_starts, rows)` over raw buffers
///
/// # Errors
///
/// Returns any view validation error, or `ShapeMismatch` if `features`
/// does not have one row per node
pub fn forward_raw(
    features: &FeatureMatrix,
    col_starts: &[i32],
    rows: &[i32],
    config: &AggregateConfig,
) -> Result<FeatureMatrix, SageError> {
    let columns = ColumnView::from_i32(col_starts, rows)?;
    mean_aggregate(features, &columns, config)
}

/// `backward(features, grad, indeg, row_starts, cols)` over raw buffers
///
/// `features` is only shape-checked against `grad`.
///
/// # Errors
///
/// Returns any view validation error, `InvalidDegree` for negative or
/// non-finite degrees, or `ShapeMismatch` on disagreeing shapes
pub fn backward_raw(
    features: &FeatureMatrix,
    grad: &FeatureMatrix,
    indeg: &[f32],
    row_starts: &[i32],
    cols: &[i32],
    config: &AggregateConfig,
) -> Result<FeatureMatrix, SageError> {
    ensure_dim("feature rows", grad.rows(), features.rows())?;
    ensure_dim("feature columns", grad.cols(), features.cols())?;

    let rows = RowView::from_i32(row_starts, cols)?;
    let indeg = InDegree::from_values(indeg.to_vec())?;
    mean_aggregate_backward(grad, &indeg, &rows, config)
}
