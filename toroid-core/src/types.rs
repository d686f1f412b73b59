//! Core numeric types shared by the pipeline stages.
//!
//! - Geometric primitives (points, displacement vectors)
//! - Stress and strain tensors in Voigt notation
//! - Degree of freedom numbering

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = Vector3<f64>;

/// A 3D vector (displacement, force, etc.).
pub type Vec3 = Vector3<f64>;

/// Constitutive matrix in Voigt notation, σ = D * ε.
pub type ConstitutiveMatrix = Matrix6<f64>;

/// Displacement components per node.
pub const DOFS_PER_NODE: usize = 3;

/// Global DOF id of `component` (0 = x, 1 = y, 2 = z) at `node`.
#[inline]
pub fn dof_index(node: usize, component: usize) -> usize {
    debug_assert!(component < DOFS_PER_NODE);
    node * DOFS_PER_NODE + component
}

/// Symmetric stress tensor in Voigt notation.
///
/// Components are ordered as: [σ_xx, σ_yy, σ_zz, τ_xy, τ_yz, τ_xz]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressTensor(pub Vector6<f64>);

impl StressTensor {
    pub fn new(components: [f64; 6]) -> Self {
        Self(Vector6::from_row_slice(&components))
    }

    pub fn zero() -> Self {
        Self(Vector6::zeros())
    }

    /// Von Mises equivalent stress.
    pub fn von_mises(&self) -> f64 {
        let s = &self.0;
        let normal = (s[0] - s[1]).powi(2) + (s[1] - s[2]).powi(2) + (s[2] - s[0]).powi(2);
        let shear = 6.0 * (s[3].powi(2) + s[4].powi(2) + s[5].powi(2));
        ((normal + shear) / 2.0).sqrt()
    }

    /// Hydrostatic (mean) stress.
    pub fn hydrostatic(&self) -> f64 {
        (self.0[0] + self.0[1] + self.0[2]) / 3.0
    }

    /// Principal stresses in ascending order.
    pub fn principal(&self) -> [f64; 3] {
        let s = &self.0;
        let m = Matrix3::new(
            s[0], s[3], s[5],
            s[3], s[1], s[4],
            s[5], s[4], s[2],
        );
        let eig = m.symmetric_eigenvalues();
        let mut p = [eig[0], eig[1], eig[2]];
        p.sort_by(f64::total_cmp);
        p
    }
}

/// Symmetric strain tensor in Voigt notation.
///
/// Components are ordered as: [ε_xx, ε_yy, ε_zz, γ_xy, γ_yz, γ_xz]
/// where γ = 2ε is the engineering shear strain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainTensor(pub Vector6<f64>);

impl StrainTensor {
    pub fn new(components: [f64; 6]) -> Self {
        Self(Vector6::from_row_slice(&components))
    }

    pub fn zero() -> Self {
        Self(Vector6::zeros())
    }

    /// Volumetric strain.
    pub fn volumetric(&self) -> f64 {
        self.0[0] + self.0[1] + self.0[2]
    }

    /// Largest absolute Voigt component.
    pub fn max_abs(&self) -> f64 {
        self.0.amax()
    }
}
