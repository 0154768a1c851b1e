//! Dense row-major feature matrices
//!
//! One row per node, one column per feature channel. Storage is always a
//! single contiguous `Vec<f32>`, so every matrix satisfies the layout
//! precondition of the aggregation kernels by construction.

use crate::error::{ensure_dim, SageError};

/// Dense N×F matrix of `f32`, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Wrap row-major data
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `data.len() != rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, SageError> {
        ensure_dim("feature matrix elements", rows * cols, data.len())?;
        Ok(Self { rows, cols, data })
    }

    /// All-zero matrix
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from `f(row, col)`
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    /// Number of rows (nodes)
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (feature channels)
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Feature vector of one node
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.rows()`
    #[must_use]
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Row-major backing slice
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume into the row-major backing vector
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Keep the first `width` channels of every row
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `width` exceeds the column count
    pub fn leading_columns(&self, width: usize) -> Result<Self, SageError> {
        if width > self.cols {
            return Err(SageError::ShapeMismatch {
                what: "leading columns",
                expected: self.cols,
                found: width,
            });
        }
        if width == self.cols {
            return Ok(self.clone());
        }

        let mut data = Vec::with_capacity(self.rows * width);
        for r in 0..self.rows {
            data.extend_from_slice(&self.row(r)[..width]);
        }
        Ok(Self {
            rows: self.rows,
            cols: width,
            data,
        })
    }

    /// Frobenius inner product `⟨self, other⟩`, accumulated in f64
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the shapes differ
    pub fn dot(&self, other: &Self) -> Result<f64, SageError> {
        ensure_dim("dot rows", self.rows, other.rows)?;
        ensure_dim("dot cols", self.cols, other.cols)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| f64::from(*a) * f64::from(*b))
            .sum())
    }
}
