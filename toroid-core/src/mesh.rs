//! Structured hexahedral meshes of a thick-walled torus.
//!
//! The torus is swept by θ (around the major circle), φ (around the tube)
//! and three radial node layers spanning the wall:
//!
//! ```text
//! x = (R + ρ cos φ) cos θ
//! y = (R + ρ cos φ) sin θ
//! z = ρ sin φ,        ρ ∈ {r - t/2, r, r + t/2}
//! ```
//!
//! Node (i_θ, j_φ, k) has global index `(i_θ * n + j_φ) * 3 + k`.

use crate::element::{Hex8, N_NODES};
use crate::error::{Error, Result};
use crate::types::{Point3, DOFS_PER_NODE};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::debug;

/// Element connectivity: 8 node indices in hex8 corner order.
pub type HexElement = [usize; N_NODES];

/// Radial node layers through the wall.
pub const RADIAL_LAYERS: usize = 3;

/// Element layers through the wall.
pub const RADIAL_SUBLAYERS: usize = RADIAL_LAYERS - 1;

/// Torus dimensions in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorusGeometry {
    /// Major radius R (axis of revolution to tube centre line).
    pub major_radius: f64,
    /// Minor radius r (tube centre line to wall mid-surface).
    pub minor_radius: f64,
    /// Wall thickness t.
    pub thickness: f64,
}

impl TorusGeometry {
    pub fn new(major_radius: f64, minor_radius: f64, thickness: f64) -> Result<Self> {
        let geometry = Self {
            major_radius,
            minor_radius,
            thickness,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<()> {
        let (big_r, r, t) = (self.major_radius, self.minor_radius, self.thickness);
        if !(big_r.is_finite() && r.is_finite() && t.is_finite()) {
            return Err(Error::InputValidation(format!(
                "torus dimensions must be finite (R={big_r}, r={r}, t={t})"
            )));
        }
        if big_r <= 0.0 {
            return Err(Error::InvalidGeometry(format!("major radius must be positive, got {big_r}")));
        }
        if r <= 0.0 {
            return Err(Error::InvalidGeometry(format!("minor radius must be positive, got {r}")));
        }
        if t <= 0.0 {
            return Err(Error::InvalidGeometry(format!("wall thickness must be positive, got {t}")));
        }
        if r >= big_r {
            return Err(Error::InvalidGeometry(format!(
                "minor radius {r} must be smaller than major radius {big_r}"
            )));
        }
        if 0.5 * t >= r {
            return Err(Error::InvalidGeometry(format!(
                "wall thickness {t} leaves no cavity inside a tube of radius {r}"
            )));
        }
        if r + 0.5 * t >= big_r {
            return Err(Error::InvalidGeometry(format!(
                "outer wall radius {} reaches the axis of revolution (R = {big_r})",
                r + 0.5 * t
            )));
        }
        Ok(())
    }

    /// Wall radius of node layer `k`.
    pub fn layer_radius(&self, k: usize) -> f64 {
        let half = 0.5 * self.thickness;
        self.minor_radius - half + k as f64 * self.thickness / RADIAL_SUBLAYERS as f64
    }

    /// Cartesian position for angles θ, φ and tube radius ρ.
    pub fn point(&self, theta: f64, phi: f64, rho: f64) -> Point3 {
        let ring = self.major_radius + rho * phi.cos();
        Point3::new(ring * theta.cos(), ring * theta.sin(), rho * phi.sin())
    }
}

/// How the angular sweeps close up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeamMode {
    /// θ and φ wrap around: n samples on [0, 2π), closed torus.
    #[default]
    Periodic,
    /// n samples on [0, 2π]: the first and last rows coincide in space but are
    /// distinct, unconnected nodes, so the body is cut along two seams.
    Open,
}

/// Index layout of a generated torus mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorusGrid {
    resolution: usize,
    seam: SeamMode,
}

impl TorusGrid {
    pub fn new(resolution: usize, seam: SeamMode) -> Result<Self> {
        if resolution < 2 {
            return Err(Error::InvalidGeometry(format!(
                "angular resolution must be at least 2, got {resolution}"
            )));
        }
        Ok(Self { resolution, seam })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn seam(&self) -> SeamMode {
        self.seam
    }

    /// Element rows along each angular direction.
    pub fn cells(&self) -> usize {
        match self.seam {
            SeamMode::Periodic => self.resolution,
            SeamMode::Open => self.resolution - 1,
        }
    }

    /// Angle of sample `i` along θ or φ.
    pub fn angle(&self, i: usize) -> f64 {
        TAU * i as f64 / self.cells() as f64
    }

    /// Global node index; angular indices wrap in periodic mode.
    pub fn node_index(&self, i_theta: usize, j_phi: usize, k: usize) -> usize {
        let n = self.resolution;
        let (i, j) = match self.seam {
            SeamMode::Periodic => (i_theta % n, j_phi % n),
            SeamMode::Open => (i_theta, j_phi),
        };
        debug_assert!(i < n && j < n && k < RADIAL_LAYERS);
        (i * n + j) * RADIAL_LAYERS + k
    }

    pub fn n_nodes(&self) -> usize {
        self.resolution * self.resolution * RADIAL_LAYERS
    }

    pub fn n_elements(&self) -> usize {
        self.cells() * self.cells() * RADIAL_SUBLAYERS
    }
}

/// Pre-flight size of an analysis, available before any allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemSize {
    pub n_nodes: usize,
    pub n_elements: usize,
    pub n_dofs: usize,
    /// Element-matrix entries pushed into the triplet accumulator.
    pub triplet_estimate: usize,
    /// Stored entries of the assembled CSR matrix (27-node stencil).
    pub nnz_estimate: usize,
}

/// Sizes for a torus mesh of the given resolution.
pub fn estimate_problem_size(resolution: usize, seam: SeamMode) -> Result<ProblemSize> {
    let grid = TorusGrid::new(resolution, seam)?;
    let n_dofs = grid.n_nodes() * DOFS_PER_NODE;
    Ok(ProblemSize {
        n_nodes: grid.n_nodes(),
        n_elements: grid.n_elements(),
        n_dofs,
        triplet_estimate: grid.n_elements() * crate::element::N_DOFS * crate::element::N_DOFS,
        nnz_estimate: n_dofs * 27 * DOFS_PER_NODE,
    })
}

/// Finite element mesh: nodal coordinates and hexahedral connectivity.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    nodes: Vec<Point3>,
    elements: Vec<HexElement>,
    grid: Option<TorusGrid>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n_nodes: usize, n_elements: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(n_nodes),
            elements: Vec::with_capacity(n_elements),
            grid: None,
        }
    }

    /// Add a node, returning its index.
    pub fn add_node(&mut self, point: Point3) -> usize {
        self.nodes.push(point);
        self.nodes.len() - 1
    }

    /// Add an element after checking its node indices are in range and distinct.
    pub fn add_element(&mut self, nodes: HexElement) -> Result<usize> {
        for (a, &node) in nodes.iter().enumerate() {
            if node >= self.nodes.len() {
                return Err(Error::InvalidGeometry(format!(
                    "node index {} out of bounds (mesh has {} nodes)",
                    node,
                    self.nodes.len()
                )));
            }
            if nodes[..a].contains(&node) {
                return Err(Error::InvalidGeometry(format!(
                    "element repeats node {node}: {nodes:?}"
                )));
            }
        }
        self.elements.push(nodes);
        Ok(self.elements.len() - 1)
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn n_dofs(&self) -> usize {
        self.nodes.len() * DOFS_PER_NODE
    }

    pub fn nodes(&self) -> &[Point3] {
        &self.nodes
    }

    pub fn elements(&self) -> &[HexElement] {
        &self.elements
    }

    /// Grid layout, present for meshes built by [`generate_torus_mesh`].
    pub fn grid(&self) -> Option<&TorusGrid> {
        self.grid.as_ref()
    }

    /// Element `idx` bound to its corner coordinates.
    pub fn hex(&self, idx: usize) -> Option<Hex8> {
        let connectivity = self.elements.get(idx)?;
        Some(Hex8::new(idx, connectivity.map(|n| self.nodes[n])))
    }
}

/// Build the structured mesh of a torus wall.
///
/// The smallest resolution that gives elements with volume is 3 for
/// [`SeamMode::Periodic`] and 4 for [`SeamMode::Open`]: each element must span
/// less than half a turn. Below that the mesh is still built, but every
/// element is flat and assembly fails with [`Error::DegenerateElement`].
///
/// # Errors
///
/// [`Error::InvalidGeometry`] for impossible dimensions or `resolution < 2`,
/// [`Error::InputValidation`] for non-finite dimensions.
pub fn generate_torus_mesh(geometry: &TorusGeometry, resolution: usize, seam: SeamMode) -> Result<Mesh> {
    geometry.validate()?;
    let grid = TorusGrid::new(resolution, seam)?;
    let n = grid.resolution();

    let mut mesh = Mesh::with_capacity(grid.n_nodes(), grid.n_elements());

    for i in 0..n {
        let theta = grid.angle(i);
        for j in 0..n {
            let phi = grid.angle(j);
            for k in 0..RADIAL_LAYERS {
                mesh.add_node(geometry.point(theta, phi, geometry.layer_radius(k)));
            }
        }
    }

    let cells = grid.cells();
    for i in 0..cells {
        for j in 0..cells {
            for k in 0..RADIAL_SUBLAYERS {
                let id = |di: usize, dj: usize, dk: usize| grid.node_index(i + di, j + dj, k + dk);
                mesh.add_element([
                    id(0, 0, 0),
                    id(0, 0, 1),
                    id(1, 0, 1),
                    id(1, 0, 0),
                    id(0, 1, 0),
                    id(0, 1, 1),
                    id(1, 1, 1),
                    id(1, 1, 0),
                ])?;
            }
        }
    }

    mesh.grid = Some(grid);
    debug!(
        nodes = mesh.n_nodes(),
        elements = mesh.n_elements(),
        resolution,
        ?seam,
        "generated torus mesh"
    );
    Ok(mesh)
}
