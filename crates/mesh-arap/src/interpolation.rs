//! ARAP as a plug-in term of a shape-interpolation energy.
//!
//! An interpolation optimizer evaluates energies through two capabilities:
//! [`InterpolationEnergy::forward_single`] scores one deformed configuration
//! against its reference, and [`InterpolationEnergy::get_hessian`] hands back
//! the curvature operator used for its second-order steps. Shapes describe
//! themselves through [`NeighborShape`], which exposes a precomputed neighbor
//! graph and a precomputed Hessian/Laplacian; neither is ever synthesized
//! here.
//!
//! # Example
//!
//! ```
//! use mesh_arap::{ArapInterpolationEnergy, InterpolationEnergy, ShapeGraph};
//! use nalgebra::{DMatrix, Point3};
//!
//! let laplacian = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]);
//! let shape = ShapeGraph::new(vec![[0, 1]], laplacian);
//!
//! let reference = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
//! let energy = ArapInterpolationEnergy::new();
//!
//! let value = energy.forward_single(&reference, &reference, &shape).unwrap();
//! assert!(value.abs() < 1e-12);
//! assert_eq!(energy.get_hessian(&shape).unwrap()[(0, 1)], -1.0);
//! ```

use nalgebra::Point3;

use crate::energy::arap_energy_with_params;
use crate::error::{ArapError, ArapResult};
use crate::gradient::{ArapGradient, arap_gradient};
use crate::params::ArapParams;
use crate::types::Edge;

/// The accessors an interpolation shape offers to energy terms.
pub trait NeighborShape {
    /// Discrete Laplacian/Hessian type; opaque to the energy.
    type Hessian;

    /// The precomputed neighbor graph, if the shape has one.
    fn neighbors(&self) -> Option<&[Edge]>;

    /// The precomputed neighbor Hessian, if the shape has one.
    fn neighbor_hessian(&self) -> Option<&Self::Hessian>;
}

/// An energy term of a shape-interpolation objective.
pub trait InterpolationEnergy<S: NeighborShape + ?Sized> {
    /// Short identifier of the term.
    fn name(&self) -> &'static str;

    /// Energy of `vert_new` against `vert_ref` on `shape`.
    fn forward_single(
        &self,
        vert_new: &[Point3<f64>],
        vert_ref: &[Point3<f64>],
        shape: &S,
    ) -> ArapResult<f64>;

    /// The curvature operator associated with `shape`.
    fn get_hessian<'s>(&self, shape: &'s S) -> ArapResult<&'s S::Hessian>;
}

/// Energy terms that can also report their gradient.
pub trait InterpolationEnergyGradient<S: NeighborShape + ?Sized>: InterpolationEnergy<S> {
    /// Energy and its gradient with respect to both configurations.
    fn backward_single(
        &self,
        vert_new: &[Point3<f64>],
        vert_ref: &[Point3<f64>],
        shape: &S,
    ) -> ArapResult<ArapGradient>;
}

/// A shape carrying an externally built neighbor graph and Hessian.
#[derive(Debug, Clone)]
pub struct ShapeGraph<H> {
    neighbors: Option<Vec<Edge>>,
    hessian: Option<H>,
}

impl<H> ShapeGraph<H> {
    /// Create a shape with both a neighbor graph and a Hessian.
    pub fn new(neighbors: Vec<Edge>, hessian: H) -> Self {
        Self {
            neighbors: Some(neighbors),
            hessian: Some(hessian),
        }
    }

    /// Create a shape with neither attached.
    pub fn empty() -> Self {
        Self {
            neighbors: None,
            hessian: None,
        }
    }

    /// Attach a neighbor graph.
    pub fn with_neighbors(mut self, neighbors: Vec<Edge>) -> Self {
        self.neighbors = Some(neighbors);
        self
    }

    /// Attach a Hessian.
    pub fn with_hessian(mut self, hessian: H) -> Self {
        self.hessian = Some(hessian);
        self
    }

    /// Number of edges in the neighbor graph, if present.
    pub fn edge_count(&self) -> Option<usize> {
        self.neighbors.as_ref().map(Vec::len)
    }
}

impl<H> Default for ShapeGraph<H> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<H> NeighborShape for ShapeGraph<H> {
    type Hessian = H;

    fn neighbors(&self) -> Option<&[Edge]> {
        self.neighbors.as_deref()
    }

    fn neighbor_hessian(&self) -> Option<&H> {
        self.hessian.as_ref()
    }
}

/// The exact ARAP energy as an interpolation term (Sorkine & Alexa, 2007).
#[derive(Debug, Clone, Default)]
pub struct ArapInterpolationEnergy {
    params: ArapParams,
}

impl ArapInterpolationEnergy {
    /// Create the term with the reference parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the term with explicit parameters.
    pub fn with_params(params: ArapParams) -> Self {
        Self { params }
    }

    /// Parameters used for every evaluation.
    pub fn params(&self) -> &ArapParams {
        &self.params
    }
}

fn require_neighbors<S: NeighborShape + ?Sized>(shape: &S) -> ArapResult<&[Edge]> {
    shape.neighbors().ok_or(ArapError::MissingNeighborGraph)
}

impl<S: NeighborShape + ?Sized> InterpolationEnergy<S> for ArapInterpolationEnergy {
    fn name(&self) -> &'static str {
        "arap"
    }

    fn forward_single(
        &self,
        vert_new: &[Point3<f64>],
        vert_ref: &[Point3<f64>],
        shape: &S,
    ) -> ArapResult<f64> {
        let neighbors = require_neighbors(shape)?;
        arap_energy_with_params(vert_new, vert_ref, neighbors, &self.params)
    }

    fn get_hessian<'s>(&self, shape: &'s S) -> ArapResult<&'s S::Hessian> {
        shape.neighbor_hessian().ok_or(ArapError::MissingHessian)
    }
}

impl<S: NeighborShape + ?Sized> InterpolationEnergyGradient<S> for ArapInterpolationEnergy {
    fn backward_single(
        &self,
        vert_new: &[Point3<f64>],
        vert_ref: &[Point3<f64>],
        shape: &S,
    ) -> ArapResult<ArapGradient> {
        let neighbors = require_neighbors(shape)?;
        arap_gradient(vert_new, vert_ref, neighbors, &self.params)
    }
}
