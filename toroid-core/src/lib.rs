//! Toroid Core - finite element stress analysis of toroidal shells
//!
//! Linear elastic analysis of a torus wall under internal and external
//! pressure:
//! - Structured hexahedral meshing of the wall
//! - Trilinear 8-node brick elements with Gauss quadrature
//! - Sparse assembly (triplets to CSR)
//! - Rigid-body audit of the supports and a constrained sparse Cholesky solve
//! - Element strain and stress recovery
//!
//! # Architecture
//!
//! Each stage is a free function over explicit data:
//!
//! - [`generate_torus_mesh`]: [`TorusGeometry`] to [`Mesh`]
//! - [`assemble`]: [`Mesh`] + [`Material`] + [`PressureLoads`] to [`GlobalSystem`]
//! - [`solve_constrained`]: [`GlobalSystem`] + [`BoundaryConditionSet`] to displacements
//! - [`recover`]: [`Mesh`] + displacements to [`StressStrainField`]
//!
//! [`analysis::run`] chains them for an [`AnalysisConfig`].

pub mod analysis;
pub mod assembly;
pub mod config;
pub mod constraint;
pub mod element;
pub mod error;
pub mod material;
pub mod mesh;
pub mod solver;
pub mod sparse;
pub mod stress;
pub mod types;

pub use analysis::{run, AnalysisResult};
pub use assembly::{assemble, GlobalSystem, PressureLoads};
pub use config::AnalysisConfig;
pub use constraint::{BoundaryConditionSet, ConstraintScheme, RigidBodyMode};
pub use element::{Hex8, IntegrationRule};
pub use error::{Error, Result};
pub use material::Material;
pub use mesh::{generate_torus_mesh, Mesh, SeamMode, TorusGeometry};
pub use solver::{solve_constrained, DisplacementField, Solver, SolverConfig};
pub use stress::{recover, StressStrainField};
pub use types::{Point3, StrainTensor, StressTensor, Vec3};
