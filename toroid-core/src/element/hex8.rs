//! 8-node hexahedron (Hex8) element.
//!
//! - 8 nodes at the vertices, 3 DOFs per node, 24 DOFs in total
//! - Trilinear shape functions
//! - 2×2×2 Gauss integration by default, single point on request
//!
//! # Shape Functions
//!
//! Trilinear shape functions in natural coordinates (ξ, η, ζ) ∈ [-1, 1]³:
//! ```text
//! N_i = (1 + ξ_i*ξ)(1 + η_i*η)(1 + ζ_i*ζ) / 8
//! ```
//!
//! # Node Numbering
//!
//! ```text
//!        7-------6
//!       /|      /|
//!      / |     / |
//!     4-------5  |
//!     |  3----|--2
//!     | /     | /
//!     |/      |/
//!     0-------1
//!
//! Node 0: (-1, -1, -1)
//! Node 1: (+1, -1, -1)
//! Node 2: (+1, +1, -1)
//! Node 3: (-1, +1, -1)
//! Node 4: (-1, -1, +1)
//! Node 5: (+1, -1, +1)
//! Node 6: (+1, +1, +1)
//! Node 7: (-1, +1, +1)
//! ```
//!
//! The torus mesher maps ξ to the radial direction through the wall, η to θ
//! and ζ to φ, which keeps (ξ, η, ζ) right-handed in physical space.

use crate::element::gauss::IntegrationRule;
use crate::error::{Error, Result};
use crate::types::{ConstitutiveMatrix, Point3, StrainTensor, Vec3, DOFS_PER_NODE};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector6};

/// Nodes per element.
pub const N_NODES: usize = 8;

/// DOFs per element.
pub const N_DOFS: usize = N_NODES * DOFS_PER_NODE;

/// Natural coordinates of each node.
pub const XI: [f64; 8] = [-1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0];
pub const ETA: [f64; 8] = [-1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0];
pub const ZETA: [f64; 8] = [-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0];

/// Local corners of each face, ordered so that (c1 - c0) × (c3 - c0) points
/// out of the element.
///
/// Faces: 0 ζ=-1, 1 ζ=+1, 2 η=-1, 3 ξ=+1, 4 η=+1, 5 ξ=-1.
pub const FACE_NODES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// Smallest accepted det J / (|J₀| |J₁| |J₂|); 1 for a rectangular brick.
const MIN_SHAPE_QUALITY: f64 = 1e-10;

/// Face of the ξ = -1 side (inner wall for the torus mesh).
pub const FACE_XI_MINUS: usize = 5;

/// Face of the ξ = +1 side (outer wall for the torus mesh).
pub const FACE_XI_PLUS: usize = 3;

/// One hexahedral element bound to its physical corner coordinates.
#[derive(Debug, Clone)]
pub struct Hex8 {
    id: usize,
    coords: [Point3; N_NODES],
}

impl Hex8 {
    /// `id` is the element's index in the mesh, reported in errors.
    pub fn new(id: usize, coords: [Point3; N_NODES]) -> Self {
        Self { id, coords }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn coords(&self) -> &[Point3; N_NODES] {
        &self.coords
    }

    /// Shape functions at a point in natural coordinates.
    #[cfg(test)]
    fn shape_functions(xi: f64, eta: f64, zeta: f64) -> [f64; 8] {
        let mut n = [0.0; 8];
        for i in 0..8 {
            n[i] = 0.125 * (1.0 + XI[i] * xi) * (1.0 + ETA[i] * eta) * (1.0 + ZETA[i] * zeta);
        }
        n
    }

    /// (dN/dξ, dN/dη, dN/dζ) for each node.
    fn shape_derivatives(xi: f64, eta: f64, zeta: f64) -> ([f64; 8], [f64; 8], [f64; 8]) {
        let mut dn_dxi = [0.0; 8];
        let mut dn_deta = [0.0; 8];
        let mut dn_dzeta = [0.0; 8];

        for i in 0..8 {
            dn_dxi[i] = 0.125 * XI[i] * (1.0 + ETA[i] * eta) * (1.0 + ZETA[i] * zeta);
            dn_deta[i] = 0.125 * (1.0 + XI[i] * xi) * ETA[i] * (1.0 + ZETA[i] * zeta);
            dn_dzeta[i] = 0.125 * (1.0 + XI[i] * xi) * (1.0 + ETA[i] * eta) * ZETA[i];
        }

        (dn_dxi, dn_deta, dn_dzeta)
    }

    /// Jacobian matrix at a point in natural coordinates.
    ///
    /// J = [∂x/∂ξ  ∂y/∂ξ  ∂z/∂ξ]
    ///     [∂x/∂η  ∂y/∂η  ∂z/∂η]
    ///     [∂x/∂ζ  ∂y/∂ζ  ∂z/∂ζ]
    fn jacobian(&self, dn_dxi: &[f64; 8], dn_deta: &[f64; 8], dn_dzeta: &[f64; 8]) -> Matrix3<f64> {
        let mut j = Matrix3::zeros();
        for (i, p) in self.coords.iter().enumerate() {
            for c in 0..3 {
                j[(0, c)] += dn_dxi[i] * p[c];
                j[(1, c)] += dn_deta[i] * p[c];
                j[(2, c)] += dn_dzeta[i] * p[c];
            }
        }
        j
    }

    /// Jacobian determinant at a point, failing on inverted or flat geometry.
    pub fn jacobian_determinant(&self, xi: f64, eta: f64, zeta: f64) -> Result<f64> {
        let (dn_dxi, dn_deta, dn_dzeta) = Self::shape_derivatives(xi, eta, zeta);
        let j = self.jacobian(&dn_dxi, &dn_deta, &dn_dzeta);
        let det_j = j.determinant();
        self.check_det(&j, det_j)?;
        Ok(det_j)
    }

    /// det J must be positive relative to the lengths of the Jacobian rows,
    /// otherwise round-off in flat elements passes for a tiny positive volume.
    fn check_det(&self, j: &Matrix3<f64>, det_j: f64) -> Result<()> {
        let scale = j.row(0).norm() * j.row(1).norm() * j.row(2).norm();
        if det_j.is_finite() && det_j > MIN_SHAPE_QUALITY * scale {
            Ok(())
        } else {
            Err(Error::DegenerateElement {
                element: self.id,
                det_j,
            })
        }
    }

    /// Strain-displacement matrix B (6×24) and det J at a point.
    ///
    /// ε = [ε_xx, ε_yy, ε_zz, γ_xy, γ_yz, γ_xz]^T = B * u_e, with u_e ordered
    /// node by node as (u, v, w).
    pub fn strain_displacement(&self, xi: f64, eta: f64, zeta: f64) -> Result<(DMatrix<f64>, f64)> {
        let (dn_dxi, dn_deta, dn_dzeta) = Self::shape_derivatives(xi, eta, zeta);
        let j = self.jacobian(&dn_dxi, &dn_deta, &dn_dzeta);
        let det_j = j.determinant();
        self.check_det(&j, det_j)?;

        let j_inv = j.try_inverse().ok_or(Error::DegenerateElement {
            element: self.id,
            det_j,
        })?;

        let mut b = DMatrix::zeros(6, N_DOFS);

        for i in 0..N_NODES {
            let dn = j_inv * Vector3::new(dn_dxi[i], dn_deta[i], dn_dzeta[i]);
            let (dx, dy, dz) = (dn[0], dn[1], dn[2]);
            let col = i * DOFS_PER_NODE;

            b[(0, col)] = dx;
            b[(1, col + 1)] = dy;
            b[(2, col + 2)] = dz;

            // γ_xy = ∂u/∂y + ∂v/∂x
            b[(3, col)] = dy;
            b[(3, col + 1)] = dx;

            // γ_yz = ∂v/∂z + ∂w/∂y
            b[(4, col + 1)] = dz;
            b[(4, col + 2)] = dy;

            // γ_xz = ∂u/∂z + ∂w/∂x
            b[(5, col)] = dz;
            b[(5, col + 2)] = dx;
        }

        Ok((b, det_j))
    }

    /// Element stiffness k_e = Σ Bᵀ D B |J| w over the integration rule.
    pub fn stiffness(&self, d: &ConstitutiveMatrix, rule: IntegrationRule) -> Result<DMatrix<f64>> {
        let d = DMatrix::from_iterator(6, 6, d.iter().copied());
        let mut k = DMatrix::zeros(N_DOFS, N_DOFS);

        for gp in rule.points() {
            let (b, det_j) = self.strain_displacement(gp.xi(), gp.eta(), gp.zeta())?;
            let db = &d * &b;
            k += b.transpose() * db * (det_j * gp.weight);
        }

        // Round-off asymmetry would otherwise leak into K.
        let k_sym = (&k + k.transpose()) * 0.5;
        Ok(k_sym)
    }

    /// Element volume by 2×2×2 quadrature.
    pub fn volume(&self) -> Result<f64> {
        IntegrationRule::Full
            .points()
            .iter()
            .map(|gp| Ok(self.jacobian_determinant(gp.xi(), gp.eta(), gp.zeta())? * gp.weight))
            .sum()
    }

    /// Strain at the element centroid from the 24 local displacements.
    pub fn centroid_strain(&self, displacements: &[f64]) -> Result<StrainTensor> {
        debug_assert_eq!(displacements.len(), N_DOFS);
        let (b, _) = self.strain_displacement(0.0, 0.0, 0.0)?;
        let strain = &b * DVector::from_column_slice(displacements);
        Ok(StrainTensor(Vector6::from_iterator(strain.iter().copied())))
    }

    /// Centroid of the corner nodes.
    pub fn centroid(&self) -> Point3 {
        self.coords.iter().sum::<Point3>() / N_NODES as f64
    }

    /// Area vector of a face, |A| = area, oriented by [`FACE_NODES`].
    ///
    /// Uses the diagonals, so warped faces give their projected area.
    pub fn face_area_vector(&self, face: usize) -> Vec3 {
        let [a, b, c, d] = FACE_NODES[face];
        let p = &self.coords;
        0.5 * (p[c] - p[a]).cross(&(p[d] - p[b]))
    }

    /// Centre of a face.
    pub fn face_center(&self, face: usize) -> Point3 {
        FACE_NODES[face].iter().map(|&n| self.coords[n]).sum::<Point3>() / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use approx::assert_relative_eq;

    fn cube(sx: f64, sy: f64, sz: f64) -> [Point3; 8] {
        let mut c = [Point3::zeros(); 8];
        for i in 0..8 {
            c[i] = Point3::new(
                0.5 * (XI[i] + 1.0) * sx,
                0.5 * (ETA[i] + 1.0) * sy,
                0.5 * (ZETA[i] + 1.0) * sz,
            );
        }
        c
    }

    #[test]
    fn test_hex8_shape_functions_partition_of_unity() {
        for (xi, eta, zeta) in [(0.0, 0.0, 0.0), (1.0, 1.0, 1.0), (-1.0, 0.5, 0.0), (0.3, -0.7, 0.9)] {
            let sum: f64 = Hex8::shape_functions(xi, eta, zeta).iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_hex8_shape_functions_at_nodes() {
        for i in 0..8 {
            let n = Hex8::shape_functions(XI[i], ETA[i], ZETA[i]);
            for j in 0..8 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(n[j], expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_hex8_volume() {
        assert_relative_eq!(Hex8::new(0, cube(1.0, 1.0, 1.0)).volume().unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(Hex8::new(0, cube(2.0, 1.0, 0.5)).volume().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverted_element_is_degenerate() {
        let mut coords = cube(1.0, 1.0, 1.0);
        // Mirror in z: swaps the bottom and top faces.
        for p in coords.iter_mut() {
            p[2] = -p[2];
        }
        let err = Hex8::new(42, coords).volume().unwrap_err();
        match err {
            Error::DegenerateElement { element, det_j } => {
                assert_eq!(element, 42);
                assert!(det_j < 0.0);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_flat_element_is_degenerate() {
        let mut coords = cube(1.0, 1.0, 1.0);
        for p in coords.iter_mut() {
            p[1] = 0.0;
        }
        let d = Material::steel().constitutive_3d();
        assert!(matches!(
            Hex8::new(3, coords).stiffness(&d, IntegrationRule::Full),
            Err(Error::DegenerateElement { element: 3, .. })
        ));
    }

    #[test]
    fn test_stiffness_symmetric_positive_diagonal() {
        let d = Material::steel().constitutive_3d();
        let k = Hex8::new(0, cube(1.0, 2.0, 0.5)).stiffness(&d, IntegrationRule::Full).unwrap();
        assert_eq!(k.nrows(), N_DOFS);
        for i in 0..N_DOFS {
            assert!(k[(i, i)] > 0.0, "K[{i},{i}] = {} should be positive", k[(i, i)]);
            for j in 0..N_DOFS {
                assert_relative_eq!(k[(i, j)], k[(j, i)], max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_rigid_translation_produces_no_force() {
        let d = Material::new(1.0, 0.3).unwrap().constitutive_3d();
        let k = Hex8::new(0, cube(1.0, 1.0, 1.0)).stiffness(&d, IntegrationRule::Full).unwrap();
        for axis in 0..3 {
            let u = DVector::from_fn(N_DOFS, |r, _| if r % 3 == axis { 1.0 } else { 0.0 });
            assert_relative_eq!((&k * u).norm(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_full_integration_has_exactly_six_zero_modes() {
        let d = Material::new(1.0, 0.3).unwrap().constitutive_3d();
        let count_zero = |rule| {
            let k = Hex8::new(0, cube(1.0, 1.0, 1.0)).stiffness(&d, rule).unwrap();
            let eig = k.symmetric_eigenvalues();
            let max = eig.amax();
            eig.iter().filter(|&&l| l.abs() < 1e-9 * max).count()
        };
        assert_eq!(count_zero(IntegrationRule::Full), 6);
        // 12 hourglass modes on top of the rigid-body ones.
        assert_eq!(count_zero(IntegrationRule::Reduced), 18);
    }

    #[test]
    fn test_constant_strain_patch() {
        // u = 0.001 x gives uniform ε_xx everywhere in the element.
        let coords = cube(1.0, 1.0, 1.0);
        let hex = Hex8::new(0, coords);
        let mut u = [0.0; N_DOFS];
        for (i, p) in coords.iter().enumerate() {
            u[3 * i] = 0.001 * p[0];
        }
        let strain = hex.centroid_strain(&u).unwrap();
        assert_relative_eq!(strain.0[0], 0.001, epsilon = 1e-14);
        for c in 1..6 {
            assert_relative_eq!(strain.0[c], 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_rigid_rotation_produces_no_strain() {
        // Small rotation about z: u = -ω y, v = ω x.
        let coords = cube(1.0, 2.0, 3.0);
        let hex = Hex8::new(0, coords);
        let omega = 1e-3;
        let mut u = [0.0; N_DOFS];
        for (i, p) in coords.iter().enumerate() {
            u[3 * i] = -omega * p[1];
            u[3 * i + 1] = omega * p[0];
        }
        assert_relative_eq!(hex.centroid_strain(&u).unwrap().max_abs(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_face_area_vectors_point_outward() {
        let hex = Hex8::new(0, cube(1.0, 1.0, 1.0));
        let expected = [
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
        ];
        let c = hex.centroid();
        let mut total = Vec3::zeros();
        for face in 0..6 {
            let a = hex.face_area_vector(face);
            assert_relative_eq!(a, expected[face], epsilon = 1e-14);
            assert!(a.dot(&(hex.face_center(face) - c)) > 0.0);
            total += a;
        }
        // Closed surface.
        assert_relative_eq!(total.norm(), 0.0, epsilon = 1e-14);
        assert_eq!(FACE_NODES[FACE_XI_MINUS], [3, 0, 4, 7]);
        assert_eq!(FACE_NODES[FACE_XI_PLUS], [1, 2, 6, 5]);
    }
}
