//! Per-node in-degree used to normalize the backward scatter

use super::ColumnView;
use crate::error::{ensure_dim, SageError};

/// In-degree per node, stored as `f32` so the kernels divide without
/// integer truncation
#[derive(Debug, Clone, PartialEq)]
pub struct InDegree(Vec<f32>);

impl InDegree {
    /// Count in-degrees from the column view
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Degrees above 2^24 lose unit precision
    pub fn from_column_view(view: &ColumnView) -> Self {
        Self(
            view.col_starts()
                .windows(2)
                .map(|w| (w[1] - w[0]) as f32)
                .collect(),
        )
    }

    /// Wrap caller-supplied degrees
    ///
    /// # Errors
    ///
    /// Returns `InvalidDegree` for negative or non-finite entries
    pub fn from_values(values: Vec<f32>) -> Result<Self, SageError> {
        if let Some((node, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(SageError::InvalidDegree { node, value });
        }
        Ok(Self(values))
    }

    /// Verify every entry equals the degree the column view implies
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` on length disagreement, `DegreeMismatch` on
    /// the first differing node
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    pub fn check_against(&self, view: &ColumnView) -> Result<(), SageError> {
        ensure_dim("in-degree length", view.num_nodes(), self.0.len())?;
        for (node, &found) in self.0.iter().enumerate() {
            let expected = view.degree(node);
            if expected as f32 != found {
                return Err(SageError::DegreeMismatch {
                    node,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a graph with no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Degree values
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}
