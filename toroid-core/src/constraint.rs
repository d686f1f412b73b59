//! Essential boundary conditions and rigid-body mode audit.
//!
//! A 3D solid has six rigid-body modes. Unless the prescribed DOFs suppress
//! all of them, the free-DOF stiffness is singular. The audit here works on
//! the constraint geometry alone, before any factorization, and names the
//! modes that are left free.

use crate::error::{Error, Result};
use crate::mesh::{Mesh, RADIAL_LAYERS};
use crate::types::{dof_index, Point3, Vec3, DOFS_PER_NODE};
use nalgebra::{DMatrix, Matrix6};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// One of the six rigid-body modes of a 3D body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RigidBodyMode {
    TranslationX,
    TranslationY,
    TranslationZ,
    RotationX,
    RotationY,
    RotationZ,
}

impl RigidBodyMode {
    pub const ALL: [RigidBodyMode; 6] = [
        RigidBodyMode::TranslationX,
        RigidBodyMode::TranslationY,
        RigidBodyMode::TranslationZ,
        RigidBodyMode::RotationX,
        RigidBodyMode::RotationY,
        RigidBodyMode::RotationZ,
    ];

    /// Nodal displacement of this mode at `offset` from the rotation centre.
    fn displacement(self, offset: &Vec3) -> Vec3 {
        match self {
            RigidBodyMode::TranslationX => Vec3::x(),
            RigidBodyMode::TranslationY => Vec3::y(),
            RigidBodyMode::TranslationZ => Vec3::z(),
            RigidBodyMode::RotationX => Vec3::x().cross(offset),
            RigidBodyMode::RotationY => Vec3::y().cross(offset),
            RigidBodyMode::RotationZ => Vec3::z().cross(offset),
        }
    }
}

impl fmt::Display for RigidBodyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RigidBodyMode::TranslationX => "translation along x",
            RigidBodyMode::TranslationY => "translation along y",
            RigidBodyMode::TranslationZ => "translation along z",
            RigidBodyMode::RotationX => "rotation about x",
            RigidBodyMode::RotationY => "rotation about y",
            RigidBodyMode::RotationZ => "rotation about z",
        };
        f.write_str(text)
    }
}

/// Built-in support schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintScheme {
    /// Fix all three DOFs of node 0 only. Leaves the rotations free.
    Minimal,
    /// Statically determinate 3-2-1 support on the outer equator.
    #[default]
    ThreeTwoOne,
}

impl ConstraintScheme {
    pub fn build(self, mesh: &Mesh) -> Result<BoundaryConditionSet> {
        match self {
            ConstraintScheme::Minimal => Ok(BoundaryConditionSet::minimal()),
            ConstraintScheme::ThreeTwoOne => BoundaryConditionSet::three_two_one(mesh),
        }
    }
}

/// Prescribed displacements keyed by global DOF id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryConditionSet {
    prescribed: BTreeMap<usize, f64>,
}

impl BoundaryConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prescribe `value` at a global DOF, replacing any earlier value.
    pub fn fix_dof(&mut self, dof: usize, value: f64) -> &mut Self {
        self.prescribed.insert(dof, value);
        self
    }

    /// Clamp all components of a node to zero.
    pub fn fix_node(&mut self, node: usize) -> &mut Self {
        for c in 0..DOFS_PER_NODE {
            self.fix_dof(dof_index(node, c), 0.0);
        }
        self
    }

    /// Node 0 clamped, nothing else.
    pub fn minimal() -> Self {
        let mut bcs = Self::new();
        bcs.fix_node(0);
        bcs
    }

    /// 3-2-1 support on three outer-equator nodes A, B, C spread around the
    /// major circle: A fixed in x, y, z; B in y, z; C in z.
    ///
    /// All three lie in the z = 0 plane and are not collinear, which removes
    /// the six rigid-body modes without over-constraining the body, so a
    /// self-equilibrated load produces no reactions.
    pub fn three_two_one(mesh: &Mesh) -> Result<Self> {
        let grid = mesh.grid().ok_or_else(|| {
            Error::InvalidGeometry("3-2-1 support needs a generated torus mesh".into())
        })?;
        let cells = grid.cells();
        if cells < 3 {
            return Err(Error::InvalidGeometry(format!(
                "3-2-1 support needs at least 3 cells around the major circle, mesh has {cells}"
            )));
        }

        let outer = RADIAL_LAYERS - 1;
        let a = grid.node_index(0, 0, outer);
        let b = grid.node_index(cells / 3, 0, outer);
        let c = grid.node_index(2 * cells / 3, 0, outer);

        let mut bcs = Self::new();
        bcs.fix_node(a)
            .fix_dof(dof_index(b, 1), 0.0)
            .fix_dof(dof_index(b, 2), 0.0)
            .fix_dof(dof_index(c, 2), 0.0);
        debug!(a, b, c, "3-2-1 support nodes");
        Ok(bcs)
    }

    pub fn len(&self) -> usize {
        self.prescribed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prescribed.is_empty()
    }

    pub fn contains(&self, dof: usize) -> bool {
        self.prescribed.contains_key(&dof)
    }

    /// Prescribed value at a DOF, if constrained.
    pub fn value(&self, dof: usize) -> Option<f64> {
        self.prescribed.get(&dof).copied()
    }

    /// (dof, value) pairs in ascending DOF order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.prescribed.iter().map(|(&d, &v)| (d, v))
    }

    /// Check every DOF id and value before use.
    pub fn validate(&self, n_dofs: usize) -> Result<()> {
        for (dof, value) in self.iter() {
            if dof >= n_dofs {
                return Err(Error::InputValidation(format!(
                    "constrained DOF {dof} out of range (system has {n_dofs} DOFs)"
                )));
            }
            if !value.is_finite() {
                return Err(Error::InputValidation(format!(
                    "prescribed displacement at DOF {dof} is not finite"
                )));
            }
        }
        Ok(())
    }

    /// Rigid-body modes that the constrained DOFs fail to suppress.
    ///
    /// Modes are the three translations and the three rotations about the
    /// centroid of the constrained nodes. The count is the nullity of the
    /// constraint map; the names are the basic modes with the largest share
    /// of that null space.
    pub fn unconstrained_modes(&self, nodes: &[Point3]) -> Vec<RigidBodyMode> {
        let fixed_nodes: Vec<usize> = {
            let mut v: Vec<usize> = self.prescribed.keys().map(|d| d / DOFS_PER_NODE).collect();
            v.dedup();
            v
        };
        let centre = if fixed_nodes.is_empty() {
            Point3::zeros()
        } else {
            fixed_nodes.iter().map(|&n| nodes[n]).sum::<Point3>() / fixed_nodes.len() as f64
        };
        let length = fixed_nodes
            .iter()
            .map(|&n| (nodes[n] - centre).norm())
            .fold(0.0, f64::max);
        let length = if length > 0.0 { length } else { 1.0 };

        // Rows: constrained DOFs. Columns: unit-scaled modes.
        let mut map = DMatrix::zeros(self.len(), RigidBodyMode::ALL.len());
        for (row, dof) in self.prescribed.keys().enumerate() {
            let (node, component) = (dof / DOFS_PER_NODE, dof % DOFS_PER_NODE);
            let offset = (nodes[node] - centre) / length;
            for (col, mode) in RigidBodyMode::ALL.iter().enumerate() {
                map[(row, col)] = mode.displacement(&offset)[component];
            }
        }

        let gram: Matrix6<f64> = Matrix6::from_iterator((map.transpose() * &map).iter().copied());
        let eigen = gram.symmetric_eigen();
        let max_eig = eigen.eigenvalues.amax();

        let null: Vec<usize> = (0..6)
            .filter(|&i| eigen.eigenvalues[i] <= 1e-10 * max_eig)
            .collect();
        if null.is_empty() {
            return Vec::new();
        }

        // Share of each basic mode in the null space.
        let mut weights: Vec<(usize, f64)> = (0..6)
            .map(|m| (m, null.iter().map(|&i| eigen.eigenvectors[(m, i)].powi(2)).sum()))
            .collect();
        weights.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut modes: Vec<RigidBodyMode> = weights
            .iter()
            .take(null.len())
            .map(|&(m, _)| RigidBodyMode::ALL[m])
            .collect();
        modes.sort_by_key(|m| RigidBodyMode::ALL.iter().position(|x| x == m));
        modes
    }

    /// Fail with [`Error::SingularSystem`] unless all six rigid-body modes
    /// are suppressed.
    pub fn ensure_rigid_body_modes_removed(&self, nodes: &[Point3]) -> Result<()> {
        let free = self.unconstrained_modes(nodes);
        if free.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = free.iter().map(|m| m.to_string()).collect();
        Err(Error::SingularSystem(format!(
            "{} rigid-body mode(s) not removed by {} constrained DOFs: {}",
            free.len(),
            self.len(),
            names.join(", ")
        )))
    }
}
