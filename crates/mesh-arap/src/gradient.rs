//! Analytic reverse-mode gradient of the ARAP energy.
//!
//! The outer interpolation optimizer needs `∂E/∂V_new` (and optionally
//! `∂E/∂V_ref`) including the path through the SVD-based rotation solve.
//! This module replays the forward pipeline and back-propagates through every
//! stage by hand.
//!
//! # Rotation differential
//!
//! For a vertex with accumulator `S` and Kabsch rotation `R`, the factor
//! `P = Rᵀ S = V · diag(λ) · Vᵀ` is symmetric, where `λ` are the singular
//! values with the reflection sign folded into the corrected axis. Writing
//! `dR = R W` with `W` skew, symmetry of `P` gives
//!
//! ```text
//! W P + P W = Rᵀ dS - dSᵀ R
//! ```
//!
//! which in the eigenbasis of `P` decouples into
//! `W'_kl = (Vᵀ (Rᵀ dS - dSᵀ R) V)_kl / (λ_k + λ_l)`. The adjoint of that map
//! turns `∂E/∂R` into `∂E/∂S = 2 R C` with `C = V · B · Vᵀ` and
//! `B_kl = skew(Vᵀ Rᵀ (∂E/∂R) V)_kl / (λ_k + λ_l)`.
//!
//! Pairs with `|λ_k + λ_l|` below the pair tolerance (the rotation is locally
//! undetermined there) contribute nothing, and degenerate accumulators, which
//! resolve to a constant identity, pass no gradient back.

use nalgebra::{Matrix3, Point3, Vector3};

use crate::covariance::{accumulate_covariance, edge_displacements};
use crate::energy::{EnergyBreakdown, assemble_energy, average_edge_rotations, edge_residuals};
use crate::error::ArapResult;
use crate::params::ArapParams;
use crate::rotation::{KabschFactors, solve_rotation_factors};
use crate::tracing_ext::{OperationTimer, log_gradient_norm, log_perf_section};
use crate::types::{Edge, validate_inputs};

/// Smallest `|λ_k + λ_l|` for which the rotation differential is resolved.
pub const PAIR_EPSILON: f64 = 1e-12;

/// Energy together with its gradient with respect to both configurations.
#[derive(Debug, Clone)]
pub struct ArapGradient {
    /// Energy terms at the evaluation point.
    pub breakdown: EnergyBreakdown,
    /// `∂E/∂vert_new`, one vector per vertex.
    pub vert_new: Vec<Vector3<f64>>,
    /// `∂E/∂vert_ref`, one vector per vertex.
    pub vert_ref: Vec<Vector3<f64>>,
}

impl ArapGradient {
    /// The scalar energy.
    #[inline]
    pub fn energy(&self) -> f64 {
        self.breakdown.energy
    }

    /// Euclidean norm of `∂E/∂vert_new` over all coordinates.
    pub fn vert_new_norm(&self) -> f64 {
        stacked_norm(&self.vert_new)
    }

    /// Euclidean norm of `∂E/∂vert_ref` over all coordinates.
    pub fn vert_ref_norm(&self) -> f64 {
        stacked_norm(&self.vert_ref)
    }
}

fn stacked_norm(grad: &[Vector3<f64>]) -> f64 {
    grad.iter().map(|g| g.norm_squared()).sum::<f64>().sqrt()
}

/// Back-propagate `∂E/∂R` through one Kabsch solve to `∂E/∂S`.
pub fn rotation_backward(
    factors: &KabschFactors,
    grad_rotation: &Matrix3<f64>,
    pair_tolerance: f64,
) -> Matrix3<f64> {
    let r = &factors.rotation;
    let v = factors.v_t.transpose();
    let lambdas = factors.polar_eigenvalues();

    let a = v.transpose() * r.transpose() * grad_rotation * v;
    let k = (a - a.transpose()) * 0.5;

    let mut b = Matrix3::zeros();
    for row in 0..3 {
        for col in 0..3 {
            if row == col {
                continue;
            }
            let denom = lambdas[row] + lambdas[col];
            if denom.abs() > pair_tolerance {
                b[(row, col)] = k[(row, col)] / denom;
            }
        }
    }

    let c = v * b * v.transpose();
    r * c * 2.0
}

/// ARAP energy and its gradient with respect to `vert_new` and `vert_ref`.
///
/// # Errors
///
/// Same validation as [`crate::arap_energy_with_params`].
pub fn arap_gradient(
    vert_new: &[Point3<f64>],
    vert_ref: &[Point3<f64>],
    edges: &[Edge],
    params: &ArapParams,
) -> ArapResult<ArapGradient> {
    params.validate()?;
    validate_inputs(vert_new, vert_ref, edges, params.validate_coordinates)?;

    let _timer = OperationTimer::with_context("arap_gradient", vert_ref.len(), edges.len());
    let n = vert_ref.len();
    let scale = params.energy_scale;

    // Forward, with vert_new as the target of the rotations
    let displacements = edge_displacements(vert_new, vert_ref, edges)?;
    let accumulators = accumulate_covariance(&displacements, edges, n)?;
    let factors = solve_rotation_factors(&accumulators, params);
    let rotations: Vec<Matrix3<f64>> = factors
        .iter()
        .map(|f| f.as_ref().map_or_else(Matrix3::identity, |f| f.rotation))
        .collect();
    let edge_rotations = average_edge_rotations(&rotations, edges)?;
    let residuals = edge_residuals(&displacements, &edge_rotations);
    let breakdown = assemble_energy(vert_new, vert_ref, &displacements, &edge_rotations, params);

    // Residual term, direct dependence on the edge vectors
    let mut grad_d_target: Vec<Vector3<f64>> = Vec::with_capacity(edges.len());
    let mut grad_d_source: Vec<Vector3<f64>> = Vec::with_capacity(edges.len());
    let mut grad_rotations = vec![Matrix3::zeros(); n];
    for (e, &[i, j]) in edges.iter().enumerate() {
        let r_e = &residuals[e];
        let d_s = &displacements.source[e];

        grad_d_target.push(r_e * (2.0 * scale));
        grad_d_source.push(edge_rotations[e].transpose() * r_e * (-2.0 * scale));

        // R̄ = (R_i + R_j) / 2
        let grad_edge_rotation = r_e * d_s.transpose() * (-2.0 * scale);
        grad_rotations[i as usize] += grad_edge_rotation * 0.5;
        grad_rotations[j as usize] += grad_edge_rotation * 0.5;
    }

    // Through the rotation solve into the accumulators
    let _section = log_perf_section("rotation_backward");
    let pair_tolerance = params.degenerate_tolerance.max(PAIR_EPSILON);
    let grad_accumulators: Vec<Matrix3<f64>> = factors
        .iter()
        .zip(&grad_rotations)
        .map(|(f, g)| match f {
            Some(f) => rotation_backward(f, g, pair_tolerance),
            None => Matrix3::zeros(),
        })
        .collect();

    // S_i += d_t d_sᵀ for both endpoints
    for (e, &[i, j]) in edges.iter().enumerate() {
        let h = grad_accumulators[i as usize] + grad_accumulators[j as usize];
        grad_d_target[e] += h * displacements.source[e];
        grad_d_source[e] += h.transpose() * displacements.target[e];
    }

    // Edge vectors back onto vertices
    let mut grad_new = vec![Vector3::zeros(); n];
    let mut grad_ref = vec![Vector3::zeros(); n];
    for (e, &[i, j]) in edges.iter().enumerate() {
        grad_new[i as usize] += grad_d_target[e];
        grad_new[j as usize] -= grad_d_target[e];
        grad_ref[i as usize] += grad_d_source[e];
        grad_ref[j as usize] -= grad_d_source[e];
    }

    // Regularizer
    let reg = 2.0 * scale * params.regularization_weight;
    for (v, (p_new, p_ref)) in vert_new.iter().zip(vert_ref).enumerate() {
        let offset = p_new - p_ref;
        grad_new[v] += offset * reg;
        grad_ref[v] -= offset * reg;
    }

    let gradient = ArapGradient {
        breakdown,
        vert_new: grad_new,
        vert_ref: grad_ref,
    };
    log_gradient_norm(gradient.vert_new_norm(), gradient.vert_ref_norm());
    Ok(gradient)
}
