//! Isotropic linear elastic material.

use crate::error::{Error, Result};
use crate::types::ConstitutiveMatrix;
use nalgebra::Matrix6;
use serde::{Deserialize, Serialize};

/// Material properties for the shell wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Young's modulus (Pa).
    pub youngs_modulus: f64,
    /// Poisson's ratio (dimensionless).
    pub poissons_ratio: f64,
}

impl Material {
    /// Create a new isotropic linear elastic material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputValidation`] unless `youngs_modulus` is finite and
    /// positive and `poissons_ratio` lies in (-1, 0.5).
    pub fn new(youngs_modulus: f64, poissons_ratio: f64) -> Result<Self> {
        let material = Self {
            youngs_modulus,
            poissons_ratio,
        };
        material.validate()?;
        Ok(material)
    }

    /// Check the properties. Deserialized materials bypass [`Material::new`],
    /// so the pipeline calls this again before use.
    pub fn validate(&self) -> Result<()> {
        if !self.youngs_modulus.is_finite() || self.youngs_modulus <= 0.0 {
            return Err(Error::InputValidation(format!(
                "Young's modulus must be positive and finite, got {}",
                self.youngs_modulus
            )));
        }
        if !self.poissons_ratio.is_finite()
            || self.poissons_ratio <= -1.0
            || self.poissons_ratio >= 0.5
        {
            return Err(Error::InputValidation(format!(
                "Poisson's ratio must be in range (-1, 0.5), got {}",
                self.poissons_ratio
            )));
        }
        Ok(())
    }

    /// Shear modulus G = E / (2(1 + ν)).
    pub fn shear_modulus(&self) -> f64 {
        self.youngs_modulus / (2.0 * (1.0 + self.poissons_ratio))
    }

    /// 3D constitutive matrix for isotropic linear elasticity.
    ///
    /// Returns the 6x6 matrix D such that σ = D * ε in Voigt notation, with
    /// engineering shear strains.
    pub fn constitutive_3d(&self) -> ConstitutiveMatrix {
        let e = self.youngs_modulus;
        let nu = self.poissons_ratio;

        let factor = e / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let c11 = factor * (1.0 - nu);
        let c12 = factor * nu;
        let c44 = factor * (1.0 - 2.0 * nu) / 2.0; // = G

        Matrix6::new(
            c11, c12, c12, 0.0, 0.0, 0.0,
            c12, c11, c12, 0.0, 0.0, 0.0,
            c12, c12, c11, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, c44, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, c44, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, c44,
        )
    }

    /// Structural steel (E = 200 GPa, ν = 0.3).
    pub fn steel() -> Self {
        Self {
            youngs_modulus: 200e9,
            poissons_ratio: 0.3,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::steel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_material_creation() {
        let mat = Material::new(200e9, 0.3).unwrap();
        assert_relative_eq!(mat.youngs_modulus, 200e9);
        assert_relative_eq!(mat.poissons_ratio, 0.3);
    }

    #[test]
    fn test_invalid_youngs_modulus() {
        assert!(matches!(
            Material::new(-100e9, 0.3),
            Err(Error::InputValidation(_))
        ));
        assert!(Material::new(0.0, 0.3).is_err());
        assert!(Material::new(f64::NAN, 0.3).is_err());
        assert!(Material::new(f64::INFINITY, 0.3).is_err());
    }

    #[test]
    fn test_invalid_poissons_ratio() {
        assert!(Material::new(200e9, 0.5).is_err());
        assert!(Material::new(200e9, -1.0).is_err());
        assert!(Material::new(200e9, 0.6).is_err());
        assert!(Material::new(200e9, f64::NAN).is_err());
        assert!(Material::new(200e9, -0.99).is_ok());
    }

    #[test]
    fn test_deserialized_material_is_revalidated() {
        let mat: Material =
            serde_json::from_str(r#"{"youngs_modulus": 1e9, "poissons_ratio": 0.7}"#).unwrap();
        assert!(mat.validate().is_err());
    }

    #[test]
    fn test_constitutive_symmetry() {
        let d = Material::steel().constitutive_3d();
        for i in 0..6 {
            for j in 0..6 {
                assert_relative_eq!(d[(i, j)], d[(j, i)], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_constitutive_shear_term_is_shear_modulus() {
        let mat = Material::steel();
        let d = mat.constitutive_3d();
        // G = E / (2(1+ν)) = 200e9 / 2.6
        assert_relative_eq!(d[(3, 3)], mat.shear_modulus(), max_relative = 1e-12);
        assert_relative_eq!(d[(5, 5)], 200e9 / 2.6, max_relative = 1e-12);
    }

    #[test]
    fn test_uniaxial_stress_recovers_youngs_modulus() {
        // Invert D and apply σ_xx = 1: ε_xx must equal 1/E, ε_yy = -ν/E.
        let mat = Material::new(70e9, 0.25).unwrap();
        let c = mat.constitutive_3d().try_inverse().unwrap();
        assert_relative_eq!(c[(0, 0)], 1.0 / 70e9, max_relative = 1e-10);
        assert_relative_eq!(c[(1, 0)], -0.25 / 70e9, max_relative = 1e-10);
    }
}
