//! Constrained linear solve of K u = f.
//!
//! Prescribed DOFs are eliminated: the free block K_ff u_f = f_f - K_fc u_c is
//! assembled as its own sparse matrix and handed to a direct solver.
//!
//! # Solver Backends
//!
//! - [`FaerCholeskySolver`]: sparse LLᵀ from faer. The free-DOF stiffness of a
//!   properly supported body is symmetric positive definite, so this is the
//!   default.
//! - [`DenseLUSolver`]: nalgebra dense LU, for small meshes and cross-checks.
//!   Partial pivoting only stops on an exact zero pivot, so the matrix rank
//!   is checked from its singular values first.
//!
//! A failed factorization, a non-finite solution or an excessive residual is
//! reported as [`Error::SingularSystem`]; nothing is retried.

use crate::assembly::GlobalSystem;
use crate::constraint::BoundaryConditionSet;
use crate::error::{Error, Result};
use crate::sparse::{csr_diagonal, csr_mul_vec, CsrMatrix, TripletMatrix};
use crate::types::{Vec3, DOFS_PER_NODE};
use faer::linalg::cholesky::llt::factor::LltError;
use faer::prelude::*;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::linalg::LltError as SparseLltError;
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Linear solver interface.
pub trait Solver: Send + Sync {
    /// Solve A x = b.
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>>;

    /// Solver name for diagnostics.
    fn name(&self) -> &str;
}

/// Backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverType {
    /// Sparse Cholesky.
    #[default]
    Cholesky,
    /// Dense LU.
    DenseLu,
}

/// Solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub solver_type: SolverType,
    /// Largest accepted ‖K_ff u_f - b‖ / ‖b‖.
    pub residual_tolerance: f64,
    /// Run the rigid-body audit on the constraint set before factorizing.
    pub check_rigid_body_modes: bool,
    /// DOF count above which a pre-flight warning is logged.
    pub dof_warning_threshold: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            solver_type: SolverType::Cholesky,
            residual_tolerance: 1e-6,
            check_rigid_body_modes: true,
            dof_warning_threshold: 200_000,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.residual_tolerance.is_finite() && self.residual_tolerance > 0.0) {
            return Err(Error::InputValidation(format!(
                "residual tolerance must be positive, got {}",
                self.residual_tolerance
            )));
        }
        Ok(())
    }
}

/// Solve statistics.
#[derive(Debug, Clone)]
pub struct SolveStats {
    pub solver: String,
    pub n_free: usize,
    pub n_fixed: usize,
    /// Relative residual of the reduced system.
    pub residual: f64,
    pub time_seconds: f64,
}

/// Nodal displacements, flat in global DOF order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplacementField(Vec<f64>);

impl DisplacementField {
    pub fn from_dofs(values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len() % DOFS_PER_NODE, 0);
        Self(values)
    }

    pub fn n_nodes(&self) -> usize {
        self.0.len() / DOFS_PER_NODE
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Displacement vector of one node.
    pub fn node(&self, node: usize) -> Vec3 {
        Vec3::from_column_slice(&self.0[node * DOFS_PER_NODE..(node + 1) * DOFS_PER_NODE])
    }

    /// One vector per node, aligned with the mesh nodes.
    pub fn to_vectors(&self) -> Vec<Vec3> {
        self.0.chunks_exact(DOFS_PER_NODE).map(Vec3::from_column_slice).collect()
    }

    /// Largest absolute component.
    pub fn max_abs_component(&self) -> f64 {
        self.0.iter().fold(0.0, |m, u| m.max(u.abs()))
    }

    /// Largest nodal displacement magnitude.
    pub fn max_magnitude(&self) -> f64 {
        (0..self.n_nodes()).map(|n| self.node(n).norm()).fold(0.0, f64::max)
    }
}

/// Output of [`solve_constrained`].
#[derive(Debug, Clone)]
pub struct Solution {
    pub displacements: DisplacementField,
    /// (dof, reaction) at every constrained DOF: (K u - f) there.
    pub reactions: Vec<(usize, f64)>,
    pub stats: SolveStats,
}

/// Singular values below this many machine epsilons (scaled by the largest
/// singular value and the matrix size) count as zero.
const RANK_TOLERANCE: f64 = 100.0;

/// Dense LU via nalgebra, for small problems.
///
/// Consistent singular systems (self-equilibrated loads on an unsupported
/// body) factor without a zero pivot and solve to one of infinitely many
/// answers; the rank check turns those into [`Error::SingularSystem`].
#[derive(Debug, Default)]
pub struct DenseLUSolver;

impl DenseLUSolver {
    pub fn new() -> Self {
        Self
    }
}

fn check_dimensions(matrix: &CsrMatrix, rhs: &[f64]) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(Error::Solver("Matrix must be square".into()));
    }
    if matrix.nrows() != rhs.len() {
        return Err(Error::Solver(format!(
            "RHS size mismatch: matrix {} rows, rhs {}",
            matrix.nrows(),
            rhs.len()
        )));
    }
    Ok(())
}

impl Solver for DenseLUSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        use nalgebra::{DMatrix, DVector};

        check_dimensions(matrix, rhs)?;
        if rhs.is_empty() {
            return Ok(vec![]);
        }

        let dense = DMatrix::from(matrix);
        let singular_values = dense.singular_values();
        let s_max = singular_values.max();
        let tolerance = RANK_TOLERANCE * f64::EPSILON * rhs.len() as f64 * s_max;
        let deficiency = singular_values.iter().filter(|&&s| !(s > tolerance)).count();
        if deficiency > 0 {
            return Err(Error::SingularSystem(format!(
                "matrix is rank deficient by {} (smallest singular value {:e}, largest {:e})",
                deficiency,
                singular_values.min(),
                s_max
            )));
        }

        let b = DVector::from_column_slice(rhs);
        let solution = dense
            .lu()
            .solve(&b)
            .ok_or_else(|| Error::SingularSystem("LU factorization found a zero pivot".into()))?;

        Ok(solution.as_slice().to_vec())
    }

    fn name(&self) -> &str {
        "Dense LU"
    }
}

/// Convert nalgebra-sparse CSR matrix to faer SparseColMat (CSC format).
///
/// Rows are visited in order, so row indices within each column come out
/// sorted as faer requires.
fn csr_to_faer_csc(csr: &CsrMatrix) -> SparseColMat<usize, f64> {
    let nrows = csr.nrows();
    let ncols = csr.ncols();
    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    let mut col_offsets = vec![0usize; ncols + 1];
    for &col in col_indices {
        col_offsets[col + 1] += 1;
    }
    for i in 0..ncols {
        col_offsets[i + 1] += col_offsets[i];
    }

    let nnz = values.len();
    let mut csc_row_indices = vec![0usize; nnz];
    let mut csc_values = vec![0.0f64; nnz];
    let mut col_positions = col_offsets[..ncols].to_vec();

    for row in 0..nrows {
        for idx in row_offsets[row]..row_offsets[row + 1] {
            let col = col_indices[idx];
            let pos = col_positions[col];
            csc_row_indices[pos] = row;
            csc_values[pos] = values[idx];
            col_positions[col] += 1;
        }
    }

    // SAFETY: offsets are monotone, end at nnz, and row indices are in bounds
    // and sorted within each column.
    unsafe {
        SparseColMat::new(
            SymbolicSparseColMat::new_unchecked(nrows, ncols, col_offsets, None, csc_row_indices),
            csc_values,
        )
    }
}

/// Sparse Cholesky (LLᵀ) from faer.
#[derive(Debug, Default)]
pub struct FaerCholeskySolver;

impl FaerCholeskySolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for FaerCholeskySolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        check_dimensions(matrix, rhs)?;
        let n = rhs.len();
        if n == 0 {
            return Ok(vec![]);
        }

        let csc = csr_to_faer_csc(matrix);
        let csc_ref = csc.as_ref();

        let symbolic = SymbolicLlt::try_new(csc_ref.symbolic(), faer::Side::Lower)
            .map_err(|_| Error::Solver("Symbolic Cholesky analysis failed".into()))?;

        let llt = Llt::try_new_with_symbolic(symbolic, csc_ref, faer::Side::Lower).map_err(|e| match e {
            SparseLltError::Generic(err) => Error::Solver(format!("Sparse Cholesky error: {:?}", err)),
            SparseLltError::Numeric(LltError::NonPositivePivot { index }) => Error::SingularSystem(format!(
                "free-DOF stiffness is not positive definite (pivot {})",
                index
            )),
        })?;

        let mut x = faer::Mat::from_fn(n, 1, |i, _| rhs[i]);
        llt.solve_in_place(x.as_mut());

        Ok((0..n).map(|i| x[(i, 0)]).collect())
    }

    fn name(&self) -> &str {
        "faer Sparse Cholesky (LLᵀ)"
    }
}

/// Solver for the configured backend.
pub fn select_solver(config: &SolverConfig) -> Box<dyn Solver> {
    match config.solver_type {
        SolverType::Cholesky => Box::new(FaerCholeskySolver::new()),
        SolverType::DenseLu => Box::new(DenseLUSolver::new()),
    }
}

/// Eliminate prescribed DOFs, solve the free block and rebuild the full field.
///
/// # Errors
///
/// - [`Error::InputValidation`] for out-of-range or non-finite prescribed DOFs
/// - [`Error::SingularSystem`] when the constraints leave a rigid-body mode
///   free (if `config.check_rigid_body_modes`), a free DOF carries no stiffness, the
///   factorization breaks down, or the solution is non-finite or fails the
///   residual check
pub fn solve_constrained(
    system: &GlobalSystem,
    bcs: &BoundaryConditionSet,
    config: &SolverConfig,
) -> Result<Solution> {
    config.validate()?;
    let n = system.n_dofs;
    check_dimensions(&system.stiffness, &system.rhs)?;
    bcs.validate(n)?;
    if config.check_rigid_body_modes {
        if system.nodes.len() * DOFS_PER_NODE < n {
            return Err(Error::InputValidation(format!(
                "rigid-body audit needs coordinates for {} nodes, system has {}",
                n.div_ceil(DOFS_PER_NODE),
                system.nodes.len()
            )));
        }
        bcs.ensure_rigid_body_modes_removed(&system.nodes)?;
    }

    let start = Instant::now();

    // free_index[dof] = position in the reduced system.
    let mut free_index = vec![None; n];
    let mut free_dofs = Vec::with_capacity(n - bcs.len());
    for (dof, slot) in free_index.iter_mut().enumerate() {
        if !bcs.contains(dof) {
            *slot = Some(free_dofs.len());
            free_dofs.push(dof);
        }
    }
    let n_free = free_dofs.len();

    let diagonal = csr_diagonal(&system.stiffness);
    if let Some(&dof) = free_dofs.iter().find(|&&d| diagonal[d] <= 0.0) {
        return Err(Error::SingularSystem(format!(
            "free DOF {} (node {}, component {}) has no stiffness; the node is not attached to the body",
            dof,
            dof / DOFS_PER_NODE,
            dof % DOFS_PER_NODE
        )));
    }

    let mut reduced = TripletMatrix::with_capacity(n_free, n_free, system.stiffness.nnz());
    let mut b: Vec<f64> = free_dofs.iter().map(|&d| system.rhs[d]).collect();
    for (row, col, &value) in system.stiffness.triplet_iter() {
        let Some(fr) = free_index[row] else { continue };
        match free_index[col] {
            Some(fc) => reduced.add(fr, fc, value),
            None => b[fr] -= value * bcs.value(col).unwrap_or(0.0),
        }
    }
    let reduced = reduced.to_csr()?;
    debug!(n_free, n_fixed = bcs.len(), nnz = reduced.nnz(), "reduced system");

    let solver = select_solver(config);
    let u_free = solver.solve(&reduced, &b)?;

    if let Some(i) = u_free.iter().position(|u| !u.is_finite()) {
        return Err(Error::SingularSystem(format!(
            "non-finite displacement at DOF {}",
            free_dofs[i]
        )));
    }

    let ku = csr_mul_vec(&reduced, &u_free);
    let r_norm = ku.iter().zip(&b).map(|(a, c)| (a - c).powi(2)).sum::<f64>().sqrt();
    let b_norm = b.iter().map(|v| v * v).sum::<f64>().sqrt();
    let residual = if b_norm > 0.0 { r_norm / b_norm } else { r_norm };
    if !(residual <= config.residual_tolerance) {
        return Err(Error::SingularSystem(format!(
            "relative residual {:e} exceeds tolerance {:e}; the free-DOF stiffness is ill-conditioned",
            residual, config.residual_tolerance
        )));
    }

    let mut u = vec![0.0; n];
    for (dof, value) in bcs.iter() {
        u[dof] = value;
    }
    for (i, &dof) in free_dofs.iter().enumerate() {
        u[dof] = u_free[i];
    }

    let ku_full = csr_mul_vec(&system.stiffness, &u);
    let reactions = bcs.iter().map(|(dof, _)| (dof, ku_full[dof] - system.rhs[dof])).collect();

    let stats = SolveStats {
        solver: solver.name().to_string(),
        n_free,
        n_fixed: bcs.len(),
        residual,
        time_seconds: start.elapsed().as_secs_f64(),
    };
    info!(
        solver = %stats.solver,
        n_free,
        residual = stats.residual,
        seconds = stats.time_seconds,
        "solved constrained system"
    );

    Ok(Solution {
        displacements: DisplacementField::from_dofs(u),
        reactions,
        stats,
    })
}
