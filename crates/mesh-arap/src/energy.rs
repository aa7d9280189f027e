//! ARAP energy assembly.
//!
//! The energy of `V_new` against `V_ref` over a neighbor graph is
//!
//! ```text
//! E = s * ( Σ_e ||d_new_e - R̄_e d_ref_e||² + λ ||V_new - V_ref||² )
//! ```
//!
//! where `R̄_e = (R_i + R_j) / 2` averages the per-vertex Kabsch rotations of
//! the edge endpoints, `λ = 1e-6` and `s = 0.01` by default. Each `R_i` is the
//! proper rotation that best carries the `V_ref` edges around vertex `i` onto
//! the `V_new` edges. The edge average is a plain arithmetic mean and is not
//! re-orthonormalized.
//!
//! # Example
//!
//! ```
//! use mesh_arap::arap_energy;
//! use nalgebra::Point3;
//!
//! let reference = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
//! let stretched = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
//!
//! let energy = arap_energy(&stretched, &reference, &[[0, 1]]).unwrap();
//! assert!((energy - 0.01 * (1.0 + 1e-6)).abs() < 1e-12);
//! ```

use nalgebra::{Matrix3, Point3, Vector3};

use crate::covariance::{accumulate_covariance, edge_displacements};
use crate::error::{ArapError, ArapResult};
use crate::params::ArapParams;
use crate::rotation::{degenerate_vertices, solve_rotations};
use crate::tracing_ext::{
    OperationTimer, log_degenerate_vertices, log_energy_breakdown, log_perf_section,
};
use crate::types::{Edge, EdgeDisplacements, validate_inputs};

/// The two summed terms of the energy and their scaled total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyBreakdown {
    /// `Σ_e ||d_new_e - R̄_e d_ref_e||²`, unscaled.
    pub rigidity: f64,
    /// `λ ||V_new - V_ref||²`, unscaled.
    pub regularization: f64,
    /// `energy_scale * (rigidity + regularization)`.
    pub energy: f64,
}

/// Full result of one energy evaluation.
#[derive(Debug, Clone)]
pub struct ArapEvaluation {
    /// Energy terms.
    pub breakdown: EnergyBreakdown,
    /// Per-vertex proper rotations, indexed by vertex id.
    pub rotations: Vec<Matrix3<f64>>,
    /// Per-edge averaged rotations, indexed like the edge list.
    pub edge_rotations: Vec<Matrix3<f64>>,
    /// Vertices that resolved to the identity by the degenerate rule.
    pub degenerate_vertices: Vec<usize>,
}

impl ArapEvaluation {
    /// The scalar energy.
    #[inline]
    pub fn energy(&self) -> f64 {
        self.breakdown.energy
    }
}

/// Average the endpoint rotations of every edge: `R̄_e = 0.5 (R_i + R_j)`.
///
/// # Errors
///
/// Returns [`ArapError::InvalidEdgeIndex`] when an edge endpoint has no rotation.
pub fn average_edge_rotations(
    rotations: &[Matrix3<f64>],
    edges: &[Edge],
) -> ArapResult<Vec<Matrix3<f64>>> {
    edges
        .iter()
        .enumerate()
        .map(|(edge_index, &[i, j])| {
            let lookup = |v: u32| {
                rotations.get(v as usize).ok_or_else(|| {
                    ArapError::invalid_edge_index(edge_index, v, rotations.len())
                })
            };
            Ok((lookup(i)? + lookup(j)?) * 0.5)
        })
        .collect()
}

/// Per-edge residual `d_t - R̄ d_s`.
pub fn edge_residuals(
    displacements: &EdgeDisplacements,
    edge_rotations: &[Matrix3<f64>],
) -> Vec<Vector3<f64>> {
    displacements
        .target
        .iter()
        .zip(&displacements.source)
        .zip(edge_rotations)
        .map(|((d_t, d_s), r_edge)| d_t - r_edge * d_s)
        .collect()
}

/// Reduce residuals and the regularizer into the scalar energy.
pub fn assemble_energy(
    vert_new: &[Point3<f64>],
    vert_ref: &[Point3<f64>],
    displacements: &EdgeDisplacements,
    edge_rotations: &[Matrix3<f64>],
    params: &ArapParams,
) -> EnergyBreakdown {
    let rigidity: f64 = edge_residuals(displacements, edge_rotations)
        .iter()
        .map(|r| r.norm_squared())
        .sum();

    let offset: f64 = vert_new
        .iter()
        .zip(vert_ref)
        .map(|(n, r)| (n - r).norm_squared())
        .sum();
    let regularization = params.regularization_weight * offset;

    EnergyBreakdown {
        rigidity,
        regularization,
        energy: params.energy_scale * (rigidity + regularization),
    }
}

/// ARAP energy of `vert_new` against `vert_ref` with the default parameters.
///
/// # Errors
///
/// Fails before any computation when the vertex counts differ, an edge
/// references a missing vertex, or a coordinate is not finite.
pub fn arap_energy(
    vert_new: &[Point3<f64>],
    vert_ref: &[Point3<f64>],
    edges: &[Edge],
) -> ArapResult<f64> {
    arap_energy_with_params(vert_new, vert_ref, edges, &ArapParams::default())
}

/// ARAP energy with explicit parameters.
///
/// # Errors
///
/// See [`arap_energy`]; additionally rejects out-of-range parameters.
pub fn arap_energy_with_params(
    vert_new: &[Point3<f64>],
    vert_ref: &[Point3<f64>],
    edges: &[Edge],
    params: &ArapParams,
) -> ArapResult<f64> {
    arap_evaluate(vert_new, vert_ref, edges, params).map(|eval| eval.energy())
}

/// Run the whole pipeline and keep the intermediate rotation fields.
///
/// `vert_new` is the configuration the rotations map onto: `rotations[i]`
/// carries the `vert_ref` edges around vertex `i` onto the `vert_new` edges.
///
/// # Errors
///
/// See [`arap_energy_with_params`].
pub fn arap_evaluate(
    vert_new: &[Point3<f64>],
    vert_ref: &[Point3<f64>],
    edges: &[Edge],
    params: &ArapParams,
) -> ArapResult<ArapEvaluation> {
    params.validate()?;
    validate_inputs(vert_new, vert_ref, edges, params.validate_coordinates)?;

    let _timer = OperationTimer::with_context("arap_energy", vert_ref.len(), edges.len());

    let displacements = edge_displacements(vert_new, vert_ref, edges)?;
    let accumulators = accumulate_covariance(&displacements, edges, vert_ref.len())?;
    let rotations = {
        let _section = log_perf_section("solve_rotations");
        solve_rotations(&accumulators, params)
    };
    let degenerate = degenerate_vertices(&accumulators, params);
    log_degenerate_vertices(&degenerate, vert_ref.len());

    let edge_rotations = average_edge_rotations(&rotations, edges)?;
    let breakdown = assemble_energy(vert_new, vert_ref, &displacements, &edge_rotations, params);
    log_energy_breakdown(&breakdown);

    Ok(ArapEvaluation {
        breakdown,
        rotations,
        edge_rotations,
        degenerate_vertices: degenerate,
    })
}
