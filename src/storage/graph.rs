//! Dual-view graph: column view, row view and in-degree built once
//!
//! Forward aggregation enumerates each node's sources, backward scatter
//! enumerates each node's destinations. Instead of transposing per call, both
//! layouts are materialized up front and reused by every pass.
//!
//! ```text
//! Edges (src → dst): 0 → 1, 1 → 2, 2 → 3
//!
//! ColumnView: col_starts [0, 0, 1, 2, 3]   rows [0, 1, 2]
//! RowView:    row_starts [0, 1, 2, 3, 3]   cols [1, 2, 3]
//! InDegree:   [0, 1, 1, 1]
//! ```

use super::{ColumnView, InDegree, RowView};
use crate::error::SageError;

/// Node identifier (zero-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Both compressed views of one edge set plus the in-degree vector
///
/// # Example
///
/// ```
/// use sage_conv::{NodeId, SageGraph};
///
/// let graph = SageGraph::from_edges(3, &[(NodeId(0), NodeId(2)), (NodeId(1), NodeId(2))]).unwrap();
///
/// assert_eq!(graph.columns().neighbors(2), &[0, 1]);
/// assert_eq!(graph.rows().neighbors(0), &[2]);
/// assert_eq!(graph.in_degree().as_slice(), &[0.0, 0.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SageGraph {
    columns: ColumnView,
    rows: RowView,
    in_degree: InDegree,
}

impl SageGraph {
    /// Build from directed `(src, dst)` edges; `dst` aggregates `src`
    ///
    /// Nodes without edges (ids below `num_nodes`) are kept as isolated nodes.
    /// Parallel edges are preserved and count twice toward the degree.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if an endpoint is `>= num_nodes`, or
    /// `TooLarge` if the edge count does not fit a `u32` offset
    pub fn from_edges(num_nodes: usize, edges: &[(NodeId, NodeId)]) -> Result<Self, SageError> {
        if u32::try_from(edges.len()).is_err() {
            return Err(SageError::TooLarge {
                what: "edge count",
                size: edges.len() as u64,
                limit: u64::from(u32::MAX),
            });
        }

        // Temporary adjacency lists for both orientations
        let mut sources: Vec<Vec<u32>> = vec![Vec::new(); num_nodes];
        let mut targets: Vec<Vec<u32>> = vec![Vec::new(); num_nodes];

        for (position, (src, dst)) in edges.iter().enumerate() {
            for endpoint in [src.0, dst.0] {
                if endpoint as usize >= num_nodes {
                    return Err(SageError::IndexOutOfRange {
                        position,
                        index: endpoint,
                        num_nodes,
                    });
                }
            }
            sources[dst.0 as usize].push(src.0);
            targets[src.0 as usize].push(dst.0);
        }

        let columns = ColumnView::new_unchecked_sorted(flatten(sources));
        let rows = RowView::new_unchecked_sorted(flatten(targets));
        let in_degree = InDegree::from_column_view(&columns);

        Ok(Self {
            columns,
            rows,
            in_degree,
        })
    }

    /// Build from an edge list, sizing the graph by the largest node id
    ///
    /// # Errors
    ///
    /// Same as [`SageGraph::from_edges`]
    pub fn from_edge_list(edges: &[(NodeId, NodeId)]) -> Result<Self, SageError> {
        let num_nodes = edges
            .iter()
            .flat_map(|(src, dst)| [src.0, dst.0])
            .max()
            .map_or(0, |max| max as usize + 1);
        Self::from_edges(num_nodes, edges)
    }

    /// Derive the row view and in-degree from an already validated column view
    #[must_use]
    pub fn from_column_view(columns: ColumnView) -> Self {
        let rows = columns.transpose();
        let in_degree = InDegree::from_column_view(&columns);
        Self {
            columns,
            rows,
            in_degree,
        }
    }

    /// Pair a column view with a caller-supplied row view
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the views disagree on node or edge count,
    /// or if the row view is not the exact transpose of the column view
    pub fn from_views(columns: ColumnView, rows: RowView) -> Result<Self, SageError> {
        crate::error::ensure_dim("row view nodes", columns.num_nodes(), rows.num_nodes())?;
        crate::error::ensure_dim("row view edges", columns.num_edges(), rows.num_edges())?;
        if columns.transpose() != rows {
            return Err(SageError::ShapeMismatch {
                what: "row view transpose edges",
                expected: columns.num_edges(),
                found: rows.num_edges(),
            });
        }
        Ok(Self::from_column_view(columns))
    }

    /// Column-oriented view (forward pass)
    #[must_use]
    pub const fn columns(&self) -> &ColumnView {
        &self.columns
    }

    /// Row-oriented view (backward pass)
    #[must_use]
    pub const fn rows(&self) -> &RowView {
        &self.rows
    }

    /// In-degree per node
    #[must_use]
    pub const fn in_degree(&self) -> &InDegree {
        &self.in_degree
    }

    /// Number of nodes
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.columns.num_nodes()
    }

    /// Number of edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.columns.num_edges()
    }
}

/// Sort each list and flatten into (offsets, indices)
#[allow(clippy::cast_possible_truncation)] // Edge count checked against u32::MAX by caller
fn flatten(mut lists: Vec<Vec<u32>>) -> (Vec<u32>, Vec<u32>) {
    let mut offsets = Vec::with_capacity(lists.len() + 1);
    let mut indices = Vec::with_capacity(lists.iter().map(Vec::len).sum());

    offsets.push(0_u32);
    for list in &mut lists {
        list.sort_unstable();
        indices.extend_from_slice(list);
        offsets.push(indices.len() as u32);
    }

    (offsets, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph() -> SageGraph {
        SageGraph::from_edges(
            4,
            &[
                (NodeId(0), NodeId(1)),
                (NodeId(1), NodeId(2)),
                (NodeId(2), NodeId(3)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_path_graph_structure() {
        let graph = path_graph();
        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(graph.num_edges(), 3);
        assert_eq!(graph.columns().col_starts(), &[0, 0, 1, 2, 3]);
        assert_eq!(graph.columns().rows(), &[0, 1, 2]);
        assert_eq!(graph.rows().row_starts(), &[0, 1, 2, 3, 3]);
        assert_eq!(graph.rows().cols(), &[1, 2, 3]);
        assert_eq!(graph.in_degree().as_slice(), &[0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_neighbors_are_sorted() {
        let graph = SageGraph::from_edges(
            4,
            &[
                (NodeId(3), NodeId(0)),
                (NodeId(1), NodeId(0)),
                (NodeId(2), NodeId(0)),
            ],
        )
        .unwrap();
        assert_eq!(graph.columns().neighbors(0), &[1, 2, 3]);
    }

    #[test]
    fn test_isolated_trailing_nodes() {
        let graph = SageGraph::from_edges(6, &[(NodeId(0), NodeId(1))]).unwrap();
        assert_eq!(graph.num_nodes(), 6);
        assert_eq!(graph.in_degree().as_slice()[5], 0.0);
    }

    #[test]
    fn test_rejects_out_of_range_endpoint() {
        let err = SageGraph::from_edges(2, &[(NodeId(0), NodeId(2))]).unwrap_err();
        assert_eq!(
            err,
            SageError::IndexOutOfRange {
                position: 0,
                index: 2,
                num_nodes: 2
            }
        );
    }

    #[test]
    fn test_from_edge_list_infers_size() {
        let graph = SageGraph::from_edge_list(&[(NodeId(4), NodeId(0))]).unwrap();
        assert_eq!(graph.num_nodes(), 5);

        let empty = SageGraph::from_edge_list(&[]).unwrap();
        assert_eq!(empty.num_nodes(), 0);
        assert_eq!(empty.num_edges(), 0);
    }

    #[test]
    fn test_from_column_view_matches_from_edges() {
        let graph = path_graph();
        let rebuilt = SageGraph::from_column_view(graph.columns().clone());
        assert_eq!(rebuilt, graph);
    }

    #[test]
    fn test_from_views_rejects_non_transpose() {
        let graph = path_graph();
        // Same counts, different edges: 0 → 2 instead of 0 → 1
        let wrong_rows = RowView::new(vec![0, 1, 2, 3, 3], vec![2, 2, 3]).unwrap();
        assert!(SageGraph::from_views(graph.columns().clone(), wrong_rows).is_err());
        assert!(SageGraph::from_views(graph.columns().clone(), graph.rows().clone()).is_ok());
    }

    #[test]
    fn test_self_loop_and_multi_edge() {
        let graph = SageGraph::from_edges(
            2,
            &[
                (NodeId(0), NodeId(0)),
                (NodeId(1), NodeId(0)),
                (NodeId(1), NodeId(0)),
            ],
        )
        .unwrap();
        assert_eq!(graph.columns().neighbors(0), &[0, 1, 1]);
        assert_eq!(graph.rows().neighbors(1), &[0, 0]);
        assert_eq!(graph.in_degree().as_slice(), &[3.0, 0.0]);
    }
}
