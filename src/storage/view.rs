//! Column- and row-oriented compressed views of one edge set
//!
//! ```text
//! Edges: 0 → 2, 1 → 2, 2 → 0
//!
//! ColumnView (grouped by destination, used by forward):
//!   col_starts: [0, 1, 1, 3]   // node 2 aggregates rows[1..3]
//!   rows:       [2, 0, 1]
//!
//! RowView (grouped by source, used by backward):
//!   row_starts: [0, 1, 2, 3]
//!   cols:       [2, 2, 0]
//! ```
//!
//! Both views are validated once at construction and are immutable afterwards.

use crate::error::SageError;

/// Offsets + indices shared by both orientations
#[derive(Debug, Clone, PartialEq, Eq)]
struct Compressed {
    /// Length: `num_nodes` + 1
    offsets: Vec<u32>,
    /// Length: `num_edges`
    indices: Vec<u32>,
}

impl Compressed {
    fn new(offsets: Vec<u32>, indices: Vec<u32>) -> Result<Self, SageError> {
        let Some(&first) = offsets.first() else {
            return Err(SageError::EmptyOffsets);
        };
        if first != 0 {
            return Err(SageError::NonZeroFirstOffset(first));
        }

        for (position, pair) in offsets.windows(2).enumerate() {
            if pair[0] > pair[1] {
                return Err(SageError::NonMonotoneOffsets {
                    position: position + 1,
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }

        let last = offsets[offsets.len() - 1];
        if last as usize != indices.len() {
            return Err(SageError::OffsetsLengthMismatch {
                last,
                len: indices.len(),
            });
        }

        let num_nodes = offsets.len() - 1;
        for (position, &index) in indices.iter().enumerate() {
            if index as usize >= num_nodes {
                return Err(SageError::IndexOutOfRange {
                    position,
                    index,
                    num_nodes,
                });
            }
        }

        for (segment, pair) in offsets.windows(2).enumerate() {
            let neighbors = &indices[pair[0] as usize..pair[1] as usize];
            if neighbors.windows(2).any(|w| w[0] > w[1]) {
                return Err(SageError::UnsortedIndices { segment });
            }
        }

        Ok(Self { offsets, indices })
    }

    fn from_i32(offsets: &[i32], indices: &[i32], names: [&'static str; 2]) -> Result<Self, SageError> {
        Self::new(to_u32(offsets, names[0])?, to_u32(indices, names[1])?)
    }

    fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    fn segment(&self, node: usize) -> &[u32] {
        &self.indices[self.offsets[node] as usize..self.offsets[node + 1] as usize]
    }

    fn degree(&self, node: usize) -> u32 {
        self.offsets[node + 1] - self.offsets[node]
    }

    fn max_degree(&self) -> u32 {
        self.offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// Counting-sort transpose
    ///
    /// Segments are walked in ascending order, so every output segment comes
    /// out sorted without a separate sort.
    #[allow(clippy::cast_possible_truncation)] // Node ids fit u32 by construction
    fn transpose(&self) -> Self {
        let n = self.num_nodes();
        let mut counts = vec![0_u32; n + 1];
        for &index in &self.indices {
            counts[index as usize + 1] += 1;
        }
        for i in 0..n {
            counts[i + 1] += counts[i];
        }
        let offsets = counts.clone();

        let mut cursor = counts;
        let mut indices = vec![0_u32; self.indices.len()];
        for segment in 0..n {
            for &index in self.segment(segment) {
                let slot = &mut cursor[index as usize];
                indices[*slot as usize] = segment as u32;
                *slot += 1;
            }
        }

        Self { offsets, indices }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.num_nodes()).flat_map(move |segment| {
            self.segment(segment)
                .iter()
                .map(move |&index| (segment as u32, index))
        })
    }
}

fn to_u32(values: &[i32], what: &'static str) -> Result<Vec<u32>, SageError> {
    values
        .iter()
        .enumerate()
        .map(|(position, &value)| {
            u32::try_from(value).map_err(|_| SageError::NegativeValue {
                what,
                position,
                value,
            })
        })
        .collect()
}

/// Column-oriented layout: node `j` aggregates `rows[col_starts[j]..col_starts[j+1]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView(Compressed);

impl ColumnView {
    /// Wrap parts from an in-crate builder that already sorts and bounds-checks
    pub(crate) fn new_unchecked_sorted((offsets, indices): (Vec<u32>, Vec<u32>)) -> Self {
        Self(Compressed { offsets, indices })
    }

    /// Validate and wrap `col_starts` / `rows`
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant: empty or non-zero-based offsets,
    /// decreasing offsets, last offset != `rows.len()`, a row id outside
    /// `[0, num_nodes)`, or unsorted rows within a column.
    pub fn new(col_starts: Vec<u32>, rows: Vec<u32>) -> Result<Self, SageError> {
        Compressed::new(col_starts, rows).map(Self)
    }

    /// Validate raw int32 buffers
    ///
    /// # Errors
    ///
    /// Returns `NegativeValue` for negative entries, otherwise as [`ColumnView::new`]
    pub fn from_i32(col_starts: &[i32], rows: &[i32]) -> Result<Self, SageError> {
        Compressed::from_i32(col_starts, rows, ["col_starts", "rows"]).map(Self)
    }

    /// Number of nodes
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.0.num_nodes()
    }

    /// Number of edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.0.indices.len()
    }

    /// Sources aggregated by node `node`
    ///
    /// # Panics
    ///
    /// Panics if `node >= self.num_nodes()`
    #[must_use]
    pub fn neighbors(&self, node: usize) -> &[u32] {
        self.0.segment(node)
    }

    /// Number of sources aggregated by `node` (its in-degree)
    #[must_use]
    pub fn degree(&self, node: usize) -> u32 {
        self.0.degree(node)
    }

    /// Largest in-degree, 0 for an edgeless graph
    #[must_use]
    pub fn max_degree(&self) -> u32 {
        self.0.max_degree()
    }

    /// `col_starts` (length `num_nodes` + 1)
    #[must_use]
    pub fn col_starts(&self) -> &[u32] {
        &self.0.offsets
    }

    /// `rows` (length `num_edges`)
    #[must_use]
    pub fn rows(&self) -> &[u32] {
        &self.0.indices
    }

    /// Row-oriented view of the same edges
    #[must_use]
    pub fn transpose(&self) -> RowView {
        RowView(self.0.transpose())
    }

    /// Edges as `(src, dst)` pairs, grouped by destination
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.edges().map(|(dst, src)| (src, dst))
    }
}

/// Row-oriented layout: node `i` scatters into `cols[row_starts[i]..row_starts[i+1]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView(Compressed);

impl RowView {
    /// Wrap parts from an in-crate builder that already sorts and bounds-checks
    pub(crate) fn new_unchecked_sorted((offsets, indices): (Vec<u32>, Vec<u32>)) -> Self {
        Self(Compressed { offsets, indices })
    }

    /// Validate and wrap `row_starts` / `cols`
    ///
    /// # Errors
    ///
    /// Same invariants as [`ColumnView::new`]
    pub fn new(row_starts: Vec<u32>, cols: Vec<u32>) -> Result<Self, SageError> {
        Compressed::new(row_starts, cols).map(Self)
    }

    /// Validate raw int32 buffers
    ///
    /// # Errors
    ///
    /// Returns `NegativeValue` for negative entries, otherwise as [`RowView::new`]
    pub fn from_i32(row_starts: &[i32], cols: &[i32]) -> Result<Self, SageError> {
        Compressed::from_i32(row_starts, cols, ["row_starts", "cols"]).map(Self)
    }

    /// Number of nodes
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.0.num_nodes()
    }

    /// Number of edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.0.indices.len()
    }

    /// Destinations fed by node `node`
    ///
    /// # Panics
    ///
    /// Panics if `node >= self.num_nodes()`
    #[must_use]
    pub fn neighbors(&self, node: usize) -> &[u32] {
        self.0.segment(node)
    }

    /// Out-degree of `node`
    #[must_use]
    pub fn degree(&self, node: usize) -> u32 {
        self.0.degree(node)
    }

    /// Largest out-degree, 0 for an edgeless graph
    #[must_use]
    pub fn max_degree(&self) -> u32 {
        self.0.max_degree()
    }

    /// `row_starts` (length `num_nodes` + 1)
    #[must_use]
    pub fn row_starts(&self) -> &[u32] {
        &self.0.offsets
    }

    /// `cols` (length `num_edges`)
    #[must_use]
    pub fn cols(&self) -> &[u32] {
        &self.0.indices
    }

    /// Column-oriented view of the same edges
    #[must_use]
    pub fn transpose(&self) -> ColumnView {
        ColumnView(self.0.transpose())
    }

    /// Edges as `(src, dst)` pairs, grouped by source
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.edges()
    }
}
