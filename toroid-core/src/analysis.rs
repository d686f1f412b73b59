//! End-to-end stress analysis of a pressurized torus.
//!
//! Stages run in order and the first error ends the run:
//!
//! 1. validate the configuration and estimate the problem size
//! 2. generate the mesh
//! 3. assemble K and F
//! 4. build the supports, eliminate them and solve
//! 5. recover element strains and stresses

use crate::assembly::{assemble, LoadSummary};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::mesh::{estimate_problem_size, generate_torus_mesh, HexElement};
use crate::solver::{solve_constrained, SolveStats};
use crate::stress::recover;
use crate::types::{Point3, StrainTensor, StressTensor, Vec3};
use tracing::{info, warn};

/// Output of one run. Every per-node vector is indexed like `nodes`, every
/// per-element vector like `elements`.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub nodes: Vec<Point3>,
    pub elements: Vec<HexElement>,
    pub displacements: Vec<Vec3>,
    pub stresses: Vec<StressTensor>,
    pub strains: Vec<StrainTensor>,
    pub von_mises: Vec<f64>,
    /// Largest absolute displacement component.
    pub max_displacement: f64,
    pub max_von_mises: f64,
    /// Largest absolute strain component.
    pub max_strain: f64,
    /// Support reactions as (dof, force).
    pub reactions: Vec<(usize, f64)>,
    pub loads: LoadSummary,
    pub stats: SolveStats,
}

/// Run the full pipeline for one configuration.
pub fn run(config: &AnalysisConfig) -> Result<AnalysisResult> {
    config.validate()?;

    let size = estimate_problem_size(config.resolution, config.seam)?;
    info!(
        resolution = config.resolution,
        nodes = size.n_nodes,
        elements = size.n_elements,
        dofs = size.n_dofs,
        "starting torus analysis"
    );
    if size.n_dofs > config.solver.dof_warning_threshold {
        warn!(
            dofs = size.n_dofs,
            threshold = config.solver.dof_warning_threshold,
            nnz_estimate = size.nnz_estimate,
            "large problem; assembly and factorization may need substantial memory"
        );
    }

    let mesh = generate_torus_mesh(&config.geometry, config.resolution, config.seam)?;
    let system = assemble(&mesh, &config.material, &config.loads, &config.assembly_options())?;
    let bcs = config.constraints.build(&mesh)?;
    let solution = solve_constrained(&system, &bcs, &config.solver)?;
    let field = recover(&mesh, &config.material, &solution.displacements)?;

    let max_displacement = solution.displacements.max_abs_component();
    info!(
        max_displacement,
        max_von_mises = field.max_von_mises(),
        max_strain = field.max_strain(),
        "analysis complete"
    );

    Ok(AnalysisResult {
        nodes: mesh.nodes().to_vec(),
        elements: mesh.elements().to_vec(),
        displacements: solution.displacements.to_vectors(),
        stresses: field.stresses(),
        strains: field.strains(),
        von_mises: field.von_mises(),
        max_displacement,
        max_von_mises: field.max_von_mises(),
        max_strain: field.max_strain(),
        reactions: solution.reactions,
        loads: system.loads,
        stats: solution.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::PressureLoads;
    use crate::constraint::{ConstraintScheme, RigidBodyMode};
    use crate::error::Error;
    use crate::mesh::{SeamMode, TorusGeometry};
    use crate::solver::SolverType;
    use crate::sparse::csr_mul_vec;
    use approx::assert_relative_eq;

    /// Membrane hoop stress at the inner equator of a thin torus.
    fn thin_shell_estimate(g: &TorusGeometry, loads: &PressureLoads) -> f64 {
        let (big_r, r, t) = (g.major_radius, g.minor_radius, g.thickness);
        loads.differential() * r * (2.0 * big_r - r) / (2.0 * t * (big_r - r))
    }

    fn config(resolution: usize) -> AnalysisConfig {
        AnalysisConfig {
            resolution,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_reference_scenario() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let config = config(10);
        let result = run(&config).unwrap();

        assert_eq!(result.nodes.len(), 300);
        assert_eq!(result.elements.len(), 200);
        assert_eq!(result.displacements.len(), 300);
        assert_eq!(result.von_mises.len(), 200);
        assert!(result.displacements.iter().all(|u| u.iter().all(|c| c.is_finite())));
        assert!(result.max_displacement > 0.0);

        let estimate = thin_shell_estimate(&config.geometry, &config.loads);
        assert_relative_eq!(estimate, 26.25e6, max_relative = 1e-12);
        let ratio = result.max_von_mises / estimate;
        assert!((0.1..10.0).contains(&ratio), "max von Mises {} vs estimate {}", result.max_von_mises, estimate);

        // Closed wall under uniform pressure: loads balance, supports carry
        // next to nothing.
        assert!(result.loads.net_force.norm() < 1e-6 * config.loads.internal);
        let max_reaction = result.reactions.iter().map(|(_, r)| r.abs()).fold(0.0, f64::max);
        assert!(max_reaction < 1e-6 * config.loads.internal, "reaction {max_reaction}");
    }

    #[test]
    fn test_zero_load_gives_zero_displacement() {
        let mut config = config(6);
        config.loads = PressureLoads::new(0.0, 0.0).unwrap();
        let result = run(&config).unwrap();
        assert_eq!(result.max_displacement, 0.0);
        assert_eq!(result.max_von_mises, 0.0);
        assert_eq!(result.max_strain, 0.0);
    }

    #[test]
    fn test_residual_on_free_dofs() {
        let config = config(8);
        let mesh = generate_torus_mesh(&config.geometry, config.resolution, config.seam).unwrap();
        let system = assemble(&mesh, &config.material, &config.loads, &config.assembly_options()).unwrap();
        let bcs = config.constraints.build(&mesh).unwrap();
        let solution = solve_constrained(&system, &bcs, &config.solver).unwrap();

        let ku = csr_mul_vec(&system.stiffness, solution.displacements.as_slice());
        let f_norm = system.rhs.iter().map(|f| f * f).sum::<f64>().sqrt();
        let r_norm = (0..system.n_dofs)
            .filter(|&dof| !bcs.contains(dof))
            .map(|dof| (ku[dof] - system.rhs[dof]).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!(r_norm <= 1e-6 * f_norm, "residual {r_norm}, |F| {f_norm}");
        assert!(solution.stats.residual <= config.solver.residual_tolerance);
    }

    #[test]
    fn test_refinement_stays_bounded() {
        let maxima: Vec<f64> = [8, 12, 16]
            .iter()
            .map(|&n| run(&config(n)).unwrap().max_displacement)
            .collect();
        // Successive maxima differ by roughly 10-15%.
        for pair in maxima.windows(2) {
            let ratio = pair[1] / pair[0];
            assert!((0.75..1.25).contains(&ratio), "max displacement {maxima:?}");
        }
    }

    #[test]
    fn test_minimal_scheme_reports_rotations() {
        let mut config = config(6);
        config.constraints = ConstraintScheme::Minimal;
        let err = run(&config).unwrap_err();
        assert_eq!(err.kind(), "SingularSystemError");
        let message = err.to_string();
        for mode in [RigidBodyMode::RotationX, RigidBodyMode::RotationY, RigidBodyMode::RotationZ] {
            assert!(message.contains(&mode.to_string()), "{message}");
        }
        assert!(!message.contains("translation"), "{message}");
    }

    #[test]
    fn test_minimal_scheme_is_singular_for_every_backend() {
        // Rotations about the fixed node are exact null vectors of K_ff, and
        // the pressure load is self-equilibrated, so the reduced system is
        // singular but consistent. Without the audit, sparse Cholesky meets a
        // non-positive pivot; dense LU would return one of many solutions if
        // its rank check did not catch the round-off singular values.
        for solver_type in [SolverType::Cholesky, SolverType::DenseLu] {
            let mut config = config(6);
            config.constraints = ConstraintScheme::Minimal;
            config.solver.check_rigid_body_modes = false;
            config.solver.solver_type = solver_type;
            let err = run(&config).unwrap_err();
            assert!(matches!(err, Error::SingularSystem(_)), "{solver_type:?}: {err}");
        }
    }

    #[test]
    fn test_dense_solver_agrees() {
        let cholesky = config(6);
        let mut dense = cholesky.clone();
        dense.solver.solver_type = SolverType::DenseLu;

        let a = run(&cholesky).unwrap();
        let b = run(&dense).unwrap();
        assert_eq!(b.stats.solver, "Dense LU");
        assert_relative_eq!(a.max_displacement, b.max_displacement, max_relative = 1e-5);
        assert_relative_eq!(a.max_von_mises, b.max_von_mises, max_relative = 1e-5);
    }

    #[test]
    fn test_open_seam_runs() {
        let mut config = config(7);
        config.seam = SeamMode::Open;
        let result = run(&config).unwrap();
        assert_eq!(result.nodes.len(), 3 * 7 * 7);
        assert_eq!(result.elements.len(), 2 * 6 * 6);
        assert!(result.loads.free_faces > 0);
        assert!(result.max_von_mises.is_finite() && result.max_von_mises > 0.0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut bad = config(10);
        bad.geometry.minor_radius = 1.5;
        assert!(matches!(run(&bad), Err(Error::InvalidGeometry(_))));

        let mut bad = config(10);
        bad.material.youngs_modulus = -1.0;
        assert!(matches!(run(&bad), Err(Error::InputValidation(_))));

        assert!(matches!(run(&config(1)), Err(Error::InvalidGeometry(_))));
        // Two grid points fold the periodic wall flat.
        assert!(matches!(run(&config(2)), Err(Error::DegenerateElement { .. })));
    }
}
