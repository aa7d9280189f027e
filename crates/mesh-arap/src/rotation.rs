//! Batched per-vertex rotation solve (Kabsch algorithm).
//!
//! Each vertex accumulator `S = U Σ Vᵀ` is turned into the closest proper
//! rotation `R = U · diag(1, 1, sign) · Vᵀ` with `sign = det(U Vᵀ)`. The
//! correction is applied to the singular direction with the smallest singular
//! value, which is the third one since the decomposition sorts them in
//! descending order.
//!
//! # Degenerate accumulators
//!
//! - An accumulator whose Frobenius norm is at or below
//!   [`ArapParams::degenerate_tolerance`] (by default: exactly zero, e.g. an
//!   isolated vertex) resolves to the identity rotation.
//! - A decomposition that fails to converge within
//!   [`ArapParams::svd_max_iterations`] also resolves to the identity and is
//!   logged at `warn`.
//! - When `det(U Vᵀ)` is exactly zero the sign is taken as `+1`.
//!
//! # Example
//!
//! ```
//! use mesh_arap::ArapParams;
//! use mesh_arap::rotation::kabsch_rotation;
//! use nalgebra::Matrix3;
//!
//! let params = ArapParams::default();
//! assert_eq!(kabsch_rotation(&Matrix3::zeros(), &params), Matrix3::identity());
//! ```

use nalgebra::{Matrix3, SVD, Vector3};
use rayon::prelude::*;
use tracing::warn;

use crate::params::ArapParams;

/// Factors of one Kabsch solve, kept for differentiating through it.
#[derive(Debug, Clone)]
pub struct KabschFactors {
    /// Left singular vectors.
    pub u: Matrix3<f64>,
    /// Transposed right singular vectors.
    pub v_t: Matrix3<f64>,
    /// Singular values in decomposition order.
    pub singular_values: Vector3<f64>,
    /// Column that received the reflection correction.
    pub corrected_axis: usize,
    /// `+1` or `-1`, the determinant of `U Vᵀ`.
    pub sign: f64,
    /// The proper rotation `U · diag(..sign..) · Vᵀ`.
    pub rotation: Matrix3<f64>,
}

impl KabschFactors {
    /// Eigenvalues of the symmetric factor `Rᵀ S = V · diag(λ) · Vᵀ`.
    ///
    /// Equal to the singular values except on the corrected axis, where the
    /// reflection sign is folded in.
    pub fn polar_eigenvalues(&self) -> Vector3<f64> {
        let mut lambdas = self.singular_values;
        lambdas[self.corrected_axis] *= self.sign;
        lambdas
    }

    /// True when the unconstrained alignment was a reflection.
    pub fn was_reflected(&self) -> bool {
        self.sign < 0.0
    }
}

/// Decompose one accumulator and build its proper rotation.
///
/// Returns `None` for degenerate accumulators and for decompositions that did
/// not converge; callers substitute the identity in both cases.
pub fn kabsch_factors(s: &Matrix3<f64>, params: &ArapParams) -> Option<KabschFactors> {
    if s.norm() <= params.degenerate_tolerance {
        return None;
    }

    let Some(svd) = SVD::try_new(
        *s,
        true,
        true,
        params.svd_epsilon,
        params.svd_max_iterations,
    ) else {
        warn!(
            target: "mesh_arap::rotation",
            max_iterations = params.svd_max_iterations,
            "SVD did not converge, falling back to identity rotation"
        );
        return None;
    };
    let (u, v_t) = (svd.u?, svd.v_t?);
    let singular_values = svd.singular_values;

    // Candidate rotation, possibly a reflection
    let r0 = u * v_t;
    let sign = if r0.determinant() < 0.0 { -1.0 } else { 1.0 };

    let corrected_axis = smallest_singular_axis(&singular_values);
    let mut u_fixed = u;
    u_fixed.column_mut(corrected_axis).scale_mut(sign);
    let rotation = u_fixed * v_t;

    Some(KabschFactors {
        u,
        v_t,
        singular_values,
        corrected_axis,
        sign,
        rotation,
    })
}

/// Index of the smallest singular value, preferring the last on ties.
fn smallest_singular_axis(singular_values: &Vector3<f64>) -> usize {
    let mut axis = 2;
    for candidate in (0..2).rev() {
        if singular_values[candidate] < singular_values[axis] {
            axis = candidate;
        }
    }
    axis
}

/// Closest proper rotation to one accumulator; identity when degenerate.
pub fn kabsch_rotation(s: &Matrix3<f64>, params: &ArapParams) -> Matrix3<f64> {
    kabsch_factors(s, params)
        .map(|f| f.rotation)
        .unwrap_or_else(Matrix3::identity)
}

/// Solve every vertex's rotation independently.
///
/// The batch runs on rayon's pool once it reaches
/// [`ArapParams::parallel_threshold`] vertices.
pub fn solve_rotations(accumulators: &[Matrix3<f64>], params: &ArapParams) -> Vec<Matrix3<f64>> {
    if accumulators.len() >= params.parallel_threshold {
        accumulators
            .par_iter()
            .map(|s| kabsch_rotation(s, params))
            .collect()
    } else {
        accumulators
            .iter()
            .map(|s| kabsch_rotation(s, params))
            .collect()
    }
}

/// Solve every vertex and keep the decomposition factors.
pub fn solve_rotation_factors(
    accumulators: &[Matrix3<f64>],
    params: &ArapParams,
) -> Vec<Option<KabschFactors>> {
    if accumulators.len() >= params.parallel_threshold {
        accumulators
            .par_iter()
            .map(|s| kabsch_factors(s, params))
            .collect()
    } else {
        accumulators
            .iter()
            .map(|s| kabsch_factors(s, params))
            .collect()
    }
}

/// Indices of accumulators that resolve to the identity by the degenerate rule.
pub fn degenerate_vertices(accumulators: &[Matrix3<f64>], params: &ArapParams) -> Vec<usize> {
    accumulators
        .iter()
        .enumerate()
        .filter(|(_, s)| s.norm() <= params.degenerate_tolerance)
        .map(|(i, _)| i)
        .collect()
}
