//! Stress recovery from the displacement solution.
//!
//! For each element the 24 nodal displacements are gathered in local node
//! order, strain is evaluated at the element centroid as ε = B u_e and stress
//! follows from σ = D ε. One strain and one stress tensor per element.

use crate::element::element_dofs;
use crate::error::{Error, Result};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::solver::DisplacementField;
use crate::types::{StrainTensor, StressTensor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strain and stress of one element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementResult {
    pub strain: StrainTensor,
    pub stress: StressTensor,
    pub von_mises: f64,
}

/// Per-element results, indexed like the mesh elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StressStrainField {
    elements: Vec<ElementResult>,
}

impl StressStrainField {
    pub fn element(&self, idx: usize) -> Option<&ElementResult> {
        self.elements.get(idx)
    }

    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementResult> {
        self.elements.iter()
    }

    pub fn stresses(&self) -> Vec<StressTensor> {
        self.elements.iter().map(|e| e.stress).collect()
    }

    pub fn strains(&self) -> Vec<StrainTensor> {
        self.elements.iter().map(|e| e.strain).collect()
    }

    pub fn von_mises(&self) -> Vec<f64> {
        self.elements.iter().map(|e| e.von_mises).collect()
    }

    /// Maximum von Mises stress across all elements.
    pub fn max_von_mises(&self) -> f64 {
        self.elements.iter().map(|e| e.von_mises).fold(0.0, f64::max)
    }

    /// Largest absolute strain component across all elements.
    pub fn max_strain(&self) -> f64 {
        self.elements.iter().map(|e| e.strain.max_abs()).fold(0.0, f64::max)
    }
}

/// Recover element strains and stresses.
///
/// # Errors
///
/// [`Error::InputValidation`] if the field does not match the mesh,
/// [`Error::DegenerateElement`] if an element cannot be mapped at its centroid.
pub fn recover(mesh: &Mesh, material: &Material, displacements: &DisplacementField) -> Result<StressStrainField> {
    if displacements.as_slice().len() != mesh.n_dofs() {
        return Err(Error::InputValidation(format!(
            "displacement field has {} values, mesh has {} DOFs",
            displacements.as_slice().len(),
            mesh.n_dofs()
        )));
    }

    let d = material.constitutive_3d();
    let u = displacements.as_slice();
    let mut elements = Vec::with_capacity(mesh.n_elements());

    for (idx, connectivity) in mesh.elements().iter().enumerate() {
        let hex = mesh
            .hex(idx)
            .ok_or_else(|| Error::InvalidGeometry(format!("element {idx} missing")))?;
        let u_e = element_dofs(connectivity).map(|dof| u[dof]);
        let strain = hex.centroid_strain(&u_e)?;
        let stress = StressTensor(d * strain.0);
        elements.push(ElementResult {
            strain,
            stress,
            von_mises: stress.von_mises(),
        });
    }

    let field = StressStrainField { elements };
    debug!(
        elements = field.n_elements(),
        max_von_mises = field.max_von_mises(),
        "recovered element stresses"
    );
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{generate_torus_mesh, SeamMode, TorusGeometry};
    use crate::types::Point3;
    use approx::assert_relative_eq;

    fn unit_cube() -> Mesh {
        let mut mesh = Mesh::new();
        for p in [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ] {
            mesh.add_node(Point3::from(p));
        }
        mesh.add_element([0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        mesh
    }

    fn field_from(mesh: &Mesh, f: impl Fn(&Point3) -> [f64; 3]) -> DisplacementField {
        DisplacementField::from_dofs(mesh.nodes().iter().flat_map(f).collect())
    }

    #[test]
    fn test_uniaxial_strain() {
        let mesh = unit_cube();
        let material = Material::new(200e9, 0.3).unwrap();
        let eps = 1e-3;
        let field = recover(&mesh, &material, &field_from(&mesh, |p| [eps * p.x, 0.0, 0.0])).unwrap();

        let result = field.element(0).unwrap();
        assert_relative_eq!(result.strain.0[0], eps, epsilon = 1e-14);
        assert_relative_eq!(result.strain.0[1], 0.0, epsilon = 1e-14);

        // σ_xx = (λ + 2μ) ε, σ_yy = λ ε
        let (e, nu) = (200e9, 0.3);
        let lambda = e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let mu = e / (2.0 * (1.0 + nu));
        assert_relative_eq!(result.stress.0[0], (lambda + 2.0 * mu) * eps, max_relative = 1e-10);
        assert_relative_eq!(result.stress.0[1], lambda * eps, max_relative = 1e-10);
        assert_relative_eq!(result.stress.0[3], 0.0, epsilon = 1e-3);
        assert_relative_eq!(field.max_strain(), eps, epsilon = 1e-14);
    }

    #[test]
    fn test_simple_shear() {
        let mesh = unit_cube();
        let material = Material::new(200e9, 0.3).unwrap();
        let gamma = 2e-4;
        let field = recover(&mesh, &material, &field_from(&mesh, |p| [gamma * p.y, 0.0, 0.0])).unwrap();

        let result = field.element(0).unwrap();
        assert_relative_eq!(result.strain.0[3], gamma, epsilon = 1e-14);
        let tau = material.shear_modulus() * gamma;
        assert_relative_eq!(result.stress.0[3], tau, max_relative = 1e-10);
        assert_relative_eq!(result.von_mises, 3f64.sqrt() * tau, max_relative = 1e-10);
    }

    #[test]
    fn test_rigid_motion_is_stress_free() {
        let geometry = TorusGeometry::new(1.0, 0.25, 0.02).unwrap();
        let mesh = generate_torus_mesh(&geometry, 6, SeamMode::Periodic).unwrap();
        let material = Material::steel();
        // Small rotation about z plus a translation.
        let field = field_from(&mesh, |p| [1e-3 - 1e-6 * p.y, 2e-3 + 1e-6 * p.x, -5e-4]);
        let stresses = recover(&mesh, &material, &field).unwrap();

        assert_eq!(stresses.n_elements(), mesh.n_elements());
        assert!(stresses.max_strain() < 1e-15, "{}", stresses.max_strain());
        assert!(stresses.max_von_mises() < 1e-3, "{}", stresses.max_von_mises());
    }

    #[test]
    fn test_zero_field() {
        let mesh = unit_cube();
        let zero = DisplacementField::from_dofs(vec![0.0; mesh.n_dofs()]);
        let field = recover(&mesh, &Material::steel(), &zero).unwrap();
        assert_eq!(field.max_von_mises(), 0.0);
        assert_eq!(field.von_mises(), vec![0.0]);
        assert_eq!(field.stresses().len(), 1);
        assert_eq!(field.strains().len(), 1);
    }

    #[test]
    fn test_field_size_mismatch() {
        let mesh = unit_cube();
        let short = DisplacementField::from_dofs(vec![0.0; 21]);
        assert!(matches!(
            recover(&mesh, &Material::steel(), &short),
            Err(Error::InputValidation(_))
        ));
    }
}
