//! Analysis parameters.
//!
//! Every field has a default, so a JSON document only needs the values it
//! changes:
//!
//! ```
//! use toroid_core::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_json_str(r#"{
//!     "geometry": { "major_radius": 2.0, "minor_radius": 0.5, "thickness": 0.02 },
//!     "resolution": 12
//! }"#).unwrap();
//! assert_eq!(config.resolution, 12);
//! assert_eq!(config.material.poissons_ratio, 0.3);
//! ```

use crate::assembly::{AssemblyOptions, PressureLoads};
use crate::constraint::ConstraintScheme;
use crate::element::IntegrationRule;
use crate::error::{Error, Result};
use crate::material::Material;
use crate::mesh::{SeamMode, TorusGeometry, TorusGrid};
use crate::solver::SolverConfig;
use serde::{Deserialize, Serialize};

/// Full input of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub geometry: TorusGeometry,
    pub material: Material,
    pub loads: PressureLoads,
    /// Grid points along each angular direction.
    pub resolution: usize,
    pub seam: SeamMode,
    /// Must be [`IntegrationRule::Full`] for a run; the reduced rule leaves
    /// the assembled stiffness singular.
    pub integration: IntegrationRule,
    pub constraints: ConstraintScheme,
    pub solver: SolverConfig,
}

impl Default for AnalysisConfig {
    /// Steel torus, R = 1 m, r = 0.25 m, t = 10 mm, 1 MPa inside and
    /// 0.1 MPa outside.
    fn default() -> Self {
        Self {
            geometry: TorusGeometry {
                major_radius: 1.0,
                minor_radius: 0.25,
                thickness: 0.01,
            },
            material: Material::steel(),
            loads: PressureLoads {
                internal: 1e6,
                external: 1e5,
            },
            resolution: 10,
            seam: SeamMode::default(),
            integration: IntegrationRule::default(),
            constraints: ConstraintScheme::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every scalar before anything is allocated.
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.material.validate()?;
        self.loads.validate()?;
        TorusGrid::new(self.resolution, self.seam)?;
        if self.integration == IntegrationRule::Reduced {
            return Err(Error::InputValidation(
                "reduced integration has unstabilized hourglass modes and cannot drive an analysis".into(),
            ));
        }
        self.solver.validate()
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            integration: self.integration,
        }
    }
}
