//! Gauss-Legendre quadrature on the reference hexahedron [-1, 1]³.
//!
//! ```
//! use toroid_core::element::gauss::{gauss_hex, IntegrationRule};
//!
//! let full = IntegrationRule::Full.points();
//! assert_eq!(full.len(), 8);
//! assert_eq!(gauss_hex(1).len(), 1);
//! ```

use serde::{Deserialize, Serialize};

/// A quadrature point in natural coordinates (ξ, η, ζ) with its weight.
#[derive(Debug, Clone, Copy)]
pub struct GaussPoint {
    pub coords: [f64; 3],
    pub weight: f64,
}

impl GaussPoint {
    pub fn new(coords: [f64; 3], weight: f64) -> Self {
        Self { coords, weight }
    }

    #[inline]
    pub fn xi(&self) -> f64 {
        self.coords[0]
    }

    #[inline]
    pub fn eta(&self) -> f64 {
        self.coords[1]
    }

    #[inline]
    pub fn zeta(&self) -> f64 {
        self.coords[2]
    }
}

/// 1D Gauss-Legendre (point, weight) pairs on [-1, 1].
///
/// # Panics
///
/// Panics if `n` is not in 1..=3.
pub fn gauss_1d(n: usize) -> Vec<(f64, f64)> {
    match n {
        1 => vec![(0.0, 2.0)],
        2 => {
            let p = 1.0 / 3.0_f64.sqrt();
            vec![(-p, 1.0), (p, 1.0)]
        }
        3 => {
            let p = (3.0 / 5.0_f64).sqrt();
            vec![(-p, 5.0 / 9.0), (0.0, 8.0 / 9.0), (p, 5.0 / 9.0)]
        }
        _ => panic!("gauss_1d: n must be 1, 2, or 3, got {}", n),
    }
}

/// Tensor-product rule with `n` points per direction (n³ points total).
///
/// - n=1: exact for polynomials up to degree 1
/// - n=2: exact up to degree 3 (standard for Hex8)
/// - n=3: exact up to degree 5
///
/// # Panics
///
/// Panics if `n` is not 1, 2, or 3.
pub fn gauss_hex(n: usize) -> Vec<GaussPoint> {
    let rule_1d = gauss_1d(n);
    let mut points = Vec::with_capacity(n * n * n);

    for &(xi, w_xi) in &rule_1d {
        for &(eta, w_eta) in &rule_1d {
            for &(zeta, w_zeta) in &rule_1d {
                points.push(GaussPoint::new([xi, eta, zeta], w_xi * w_eta * w_zeta));
            }
        }
    }

    points
}

/// Volume integration rule for hexahedral stiffness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationRule {
    /// 2×2×2 Gauss points.
    #[default]
    Full,
    /// Single centroid point with weight 8. Under-integrates the trilinear
    /// brick and leaves 12 hourglass modes in the element stiffness.
    ///
    /// There is no hourglass stabilization, so an assembled torus is
    /// singular with this rule. It is for element-level studies only;
    /// `AnalysisConfig::validate` rejects it.
    Reduced,
}

impl IntegrationRule {
    pub fn points(self) -> Vec<GaussPoint> {
        match self {
            IntegrationRule::Full => gauss_hex(2),
            IntegrationRule::Reduced => gauss_hex(1),
        }
    }
}
