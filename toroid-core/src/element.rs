//! Hexahedral element formulation.
//!
//! # Submodules
//!
//! - [`gauss`] - Gauss quadrature rules for the reference hexahedron
//! - [`hex8`] - Trilinear brick: B matrix, stiffness, face geometry

pub mod gauss;
pub mod hex8;

pub use gauss::{gauss_hex, GaussPoint, IntegrationRule};
pub use hex8::{Hex8, FACE_NODES, N_DOFS, N_NODES};

use crate::types::{dof_index, DOFS_PER_NODE};

/// Global DOF ids of an element, in the local order B is built with.
pub fn element_dofs(nodes: &[usize; N_NODES]) -> [usize; N_DOFS] {
    let mut dofs = [0; N_DOFS];
    for (local, &node) in nodes.iter().enumerate() {
        for c in 0..DOFS_PER_NODE {
            dofs[local * DOFS_PER_NODE + c] = dof_index(node, c);
        }
    }
    dofs
}
