//! Global stiffness and pressure-load assembly.
//!
//! Element stiffness matrices are scattered into a triplet accumulator keyed
//! by global (row, col) DOF pairs and summed on conversion to CSR. Pressure
//! acts on element faces that are not shared with a neighbour.
//!
//! Meshes follow the torus mesher's convention that local ξ runs through the
//! wall from the cavity to the exterior: an exposed ξ = -1 face is wetted by
//! the internal pressure, an exposed ξ = +1 face by the external one, and any
//! other exposed face (a seam cut) is traction-free.

use crate::element::hex8::{FACE_XI_MINUS, FACE_XI_PLUS};
use crate::element::{element_dofs, IntegrationRule, FACE_NODES, N_DOFS};
use crate::error::{Error, Result};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::sparse::{CsrMatrix, LoadVector, TripletMatrix};
use crate::types::{Point3, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Uniform pressures on the two wall surfaces (Pa, positive in compression
/// of the surface it acts on).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PressureLoads {
    /// Pressure inside the tube cavity.
    pub internal: f64,
    /// Pressure outside the torus.
    pub external: f64,
}

impl PressureLoads {
    pub fn new(internal: f64, external: f64) -> Result<Self> {
        let loads = Self { internal, external };
        loads.validate()?;
        Ok(loads)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.internal.is_finite() || !self.external.is_finite() {
            return Err(Error::InputValidation(format!(
                "pressures must be finite (p_int={}, p_ext={})",
                self.internal, self.external
            )));
        }
        Ok(())
    }

    /// p_int - p_ext.
    pub fn differential(&self) -> f64 {
        self.internal - self.external
    }
}

/// Assembly options.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AssemblyOptions {
    /// Quadrature for element stiffness.
    #[serde(default)]
    pub integration: IntegrationRule,
}

/// Which exposed faces received which load.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadSummary {
    pub inner_faces: usize,
    pub outer_faces: usize,
    /// Exposed faces left traction-free.
    pub free_faces: usize,
    /// Resultant of all nodal forces; zero for a closed wall.
    pub net_force: Vec3,
}

/// Assembled system ready for constraint handling.
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    /// Global stiffness matrix K (symmetric).
    pub stiffness: CsrMatrix,
    /// Load vector F.
    pub rhs: Vec<f64>,
    /// Number of DOFs in the system.
    pub n_dofs: usize,
    /// Node coordinates, for the rigid-body audit at solve time.
    pub nodes: Vec<Point3>,
    pub loads: LoadSummary,
}

/// Assemble K and F for a mesh with one material and uniform pressures.
///
/// # Errors
///
/// [`Error::DegenerateElement`] on the first element with a non-positive
/// Jacobian; [`Error::InputValidation`] for invalid material or loads.
pub fn assemble(
    mesh: &Mesh,
    material: &Material,
    loads: &PressureLoads,
    options: &AssemblyOptions,
) -> Result<GlobalSystem> {
    material.validate()?;
    loads.validate()?;

    let n_dofs = mesh.n_dofs();
    let d = material.constitutive_3d();
    let mut triplet = TripletMatrix::with_capacity(n_dofs, n_dofs, mesh.n_elements() * N_DOFS * N_DOFS);

    for (idx, connectivity) in mesh.elements().iter().enumerate() {
        let hex = mesh
            .hex(idx)
            .ok_or_else(|| Error::InvalidGeometry(format!("element {idx} missing")))?;
        let ke = hex.stiffness(&d, options.integration)?;
        triplet.add_submatrix(&element_dofs(connectivity), &ke);
    }

    debug!(triplets = triplet.nnz(), "scattered element stiffness");

    let (rhs, summary) = assemble_pressure(mesh, loads)?;
    let stiffness = triplet.to_csr()?;

    info!(
        dofs = n_dofs,
        nnz = stiffness.nnz(),
        inner_faces = summary.inner_faces,
        outer_faces = summary.outer_faces,
        net_force = summary.net_force.norm(),
        "assembled global system"
    );

    Ok(GlobalSystem {
        stiffness,
        rhs: rhs.into_vec(),
        n_dofs,
        nodes: mesh.nodes().to_vec(),
        loads: summary,
    })
}

/// Sorted corner ids identify a face regardless of which element owns it.
fn face_key(connectivity: &[usize; 8], face: usize) -> [usize; 4] {
    let mut key = FACE_NODES[face].map(|local| connectivity[local]);
    key.sort_unstable();
    key
}

/// Lumped pressure loads: each corner of an exposed face takes a quarter of
/// -p A, with A the outward area vector.
fn assemble_pressure(mesh: &Mesh, loads: &PressureLoads) -> Result<(LoadVector, LoadSummary)> {
    let mut shared: HashMap<[usize; 4], usize> = HashMap::with_capacity(mesh.n_elements() * 6);
    for connectivity in mesh.elements() {
        for face in 0..FACE_NODES.len() {
            *shared.entry(face_key(connectivity, face)).or_insert(0) += 1;
        }
    }

    let mut rhs = LoadVector::zeros(mesh.n_dofs());
    let mut summary = LoadSummary::default();

    for (idx, connectivity) in mesh.elements().iter().enumerate() {
        let hex = mesh
            .hex(idx)
            .ok_or_else(|| Error::InvalidGeometry(format!("element {idx} missing")))?;
        let centroid = hex.centroid();

        for face in 0..FACE_NODES.len() {
            if shared[&face_key(connectivity, face)] > 1 {
                continue;
            }

            let pressure = match face {
                FACE_XI_MINUS => {
                    summary.inner_faces += 1;
                    loads.internal
                }
                FACE_XI_PLUS => {
                    summary.outer_faces += 1;
                    loads.external
                }
                _ => {
                    summary.free_faces += 1;
                    continue;
                }
            };

            let mut area = hex.face_area_vector(face);
            if area.dot(&(hex.face_center(face) - centroid)) < 0.0 {
                area = -area;
            }

            let nodal = area * (-pressure / 4.0);
            for &local in &FACE_NODES[face] {
                rhs.add_nodal(connectivity[local], &nodal);
                summary.net_force += nodal;
            }
        }
    }

    debug!(free_faces = summary.free_faces, "applied pressure loads");
    Ok((rhs, summary))
}
