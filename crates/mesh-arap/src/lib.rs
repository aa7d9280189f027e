//! Exact as-rigid-as-possible (ARAP) deformation energy.
//!
//! This crate scores how far a deformed point configuration departs from a
//! locally rigid motion of a reference configuration over a fixed neighbor
//! graph. It is meant to be plugged into shape-interpolation optimizers as
//! one energy term among several.
//!
//! # Pipeline
//!
//! - **Covariance**: each vertex accumulates `S_i = Σ d_new d_refᵀ` over its
//!   incident edges, where `d = v_i - v_j`
//! - **Rotation**: each accumulator is solved for the closest proper rotation
//!   (Kabsch, with the reflection flipped on the weakest singular axis), which
//!   carries the reference edges onto the new ones
//! - **Edge averaging**: every edge uses the mean of its endpoint rotations
//! - **Assembly**: squared edge residuals plus a small anchoring term,
//!   scaled into the final energy
//!
//! ```text
//! E = 0.01 * ( Σ_e ||d_new_e - R̄_e d_ref_e||² + 1e-6 ||V_new - V_ref||² )
//! ```
//!
//! The rotations are recomputed from scratch on every call; there is no
//! local/global alternation and no state between evaluations.
//!
//! # Conventions
//!
//! - Vertices are [`nalgebra::Point3<f64>`], indexed by position in the slice
//! - An [`Edge`] is an unordered `[i, j]` pair of vertex indices; duplicates
//!   count once per occurrence and self-loops contribute nothing
//! - Vertices without incident edges (and any vertex whose accumulator is
//!   exactly zero) get the identity rotation
//!
//! # Quick Start
//!
//! ```
//! use mesh_arap::{ArapParams, arap_energy, arap_evaluate};
//! use nalgebra::Point3;
//!
//! let reference = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let edges = [[0, 1], [1, 2], [2, 0]];
//!
//! // Identical configurations cost nothing
//! let energy = arap_energy(&reference, &reference, &edges).unwrap();
//! assert!(energy.abs() < 1e-12);
//!
//! // The full evaluation keeps the rotation fields
//! let squashed: Vec<_> = reference
//!     .iter()
//!     .map(|p| Point3::new(p.x, 0.5 * p.y, p.z))
//!     .collect();
//! let eval = arap_evaluate(&squashed, &reference, &edges, &ArapParams::default()).unwrap();
//! assert_eq!(eval.rotations.len(), 3);
//! assert!(eval.energy() > 0.0);
//! ```
//!
//! # Interpolation Energies
//!
//! Optimizers that own their shapes go through [`InterpolationEnergy`]:
//!
//! ```
//! use mesh_arap::{ArapInterpolationEnergy, InterpolationEnergy, ShapeGraph};
//! use nalgebra::Point3;
//!
//! let shape = ShapeGraph::new(vec![[0, 1]], "precomputed laplacian");
//! let reference = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
//! let stretched = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
//!
//! let term = ArapInterpolationEnergy::new();
//! let energy = term.forward_single(&stretched, &reference, &shape).unwrap();
//! assert!((energy - 0.01 * (1.0 + 1e-6)).abs() < 1e-12);
//! assert_eq!(*term.get_hessian(&shape).unwrap(), "precomputed laplacian");
//! ```
//!
//! # Gradients
//!
//! [`arap_gradient`] differentiates the energy with respect to both
//! configurations, including the dependence of the rotations on the inputs.
//!
//! # Configuration
//!
//! [`ArapParams`] carries the weights and numerical tolerances. With the
//! `params-config` feature it can be read from and written to TOML or JSON.

mod error;
mod params;
pub mod tracing_ext;
mod types;

#[cfg(test)]
mod edge_cases;

pub mod covariance;
pub mod energy;
pub mod gradient;
pub mod interpolation;
pub mod rotation;

// Re-export core types at crate root
pub use error::{ArapError, ArapResult, ErrorCode, RecoverySuggestion};
pub use params::{ArapParams, DEFAULT_ENERGY_SCALE, DEFAULT_REGULARIZATION_WEIGHT};
pub use types::{Edge, EdgeDisplacements, check_edges, validate_inputs, vertex_degrees};

// Params serialization (requires params-config feature)
#[cfg(feature = "params-config")]
pub use params::ParamsConfigError;

pub use energy::{
    ArapEvaluation, EnergyBreakdown, arap_energy, arap_energy_with_params, arap_evaluate,
};
pub use gradient::{ArapGradient, arap_gradient};
pub use interpolation::{
    ArapInterpolationEnergy, InterpolationEnergy, InterpolationEnergyGradient, NeighborShape,
    ShapeGraph,
};
pub use rotation::{KabschFactors, kabsch_rotation, solve_rotations};
