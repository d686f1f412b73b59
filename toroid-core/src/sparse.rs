//! Sparse accumulation for global assembly.
//!
//! Element blocks are pushed as (row, col, value) triplets and summed when
//! converted to CSR, so memory grows with the element count rather than with
//! DOF².

use crate::error::{Error, Result};
use crate::types::{dof_index, Vec3, DOFS_PER_NODE};
use nalgebra::DMatrix;
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix as NalgebraCsr;

/// Compressed Sparse Row matrix.
pub type CsrMatrix = NalgebraCsr<f64>;

/// Builder for a sparse matrix from triplets (COO format).
pub struct TripletMatrix {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl TripletMatrix {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: Vec::with_capacity(nnz_estimate),
            cols: Vec::with_capacity(nnz_estimate),
            values: Vec::with_capacity(nnz_estimate),
        }
    }

    /// Add a value at (row, col). Duplicates are summed during conversion.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows, "Row index out of bounds");
        debug_assert!(col < self.n_cols, "Column index out of bounds");

        // Exact zeros only; any threshold would depend on the stiffness scale.
        if value != 0.0 {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
    }

    /// Scatter a dense square block at the given global indices.
    pub fn add_submatrix(&mut self, indices: &[usize], submatrix: &DMatrix<f64>) {
        let n = indices.len();
        debug_assert_eq!(submatrix.nrows(), n);
        debug_assert_eq!(submatrix.ncols(), n);

        for (i, &row) in indices.iter().enumerate() {
            for (j, &col) in indices.iter().enumerate() {
                self.add(row, col, submatrix[(i, j)]);
            }
        }
    }

    /// Number of stored triplets.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Convert to CSR format, summing duplicate entries.
    pub fn to_csr(self) -> Result<CsrMatrix> {
        let coo = CooMatrix::try_from_triplets(
            self.n_rows,
            self.n_cols,
            self.rows,
            self.cols,
            self.values,
        )
        .map_err(|e| Error::Solver(format!("invalid triplet data: {e}")))?;

        Ok(CsrMatrix::from(&coo))
    }
}

/// y = A x for a CSR matrix.
pub fn csr_mul_vec(matrix: &CsrMatrix, x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(matrix.ncols(), x.len());
    let offsets = matrix.row_offsets();
    let cols = matrix.col_indices();
    let values = matrix.values();

    (0..matrix.nrows())
        .map(|row| {
            (offsets[row]..offsets[row + 1])
                .map(|idx| values[idx] * x[cols[idx]])
                .sum()
        })
        .collect()
}

/// Diagonal of a square CSR matrix (zero where no entry is stored).
pub fn csr_diagonal(matrix: &CsrMatrix) -> Vec<f64> {
    let mut diag = vec![0.0; matrix.nrows()];
    for (row, col, &value) in matrix.triplet_iter() {
        if row == col {
            diag[row] += value;
        }
    }
    diag
}

/// Dense load vector assembled from nodal contributions.
#[derive(Debug, Clone)]
pub struct LoadVector {
    values: Vec<f64>,
}

impl LoadVector {
    pub fn zeros(size: usize) -> Self {
        Self {
            values: vec![0.0; size],
        }
    }

    pub fn add(&mut self, index: usize, value: f64) {
        self.values[index] += value;
    }

    /// Accumulate a force vector at a node.
    pub fn add_nodal(&mut self, node: usize, force: &Vec3) {
        for c in 0..DOFS_PER_NODE {
            self.values[dof_index(node, c)] += force[c];
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}
