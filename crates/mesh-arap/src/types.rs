//! Core data types shared by the energy pipeline.

use nalgebra::{Point3, Vector3};

use crate::error::{ArapError, ArapResult};

/// An undirected neighbor-graph edge stored as an ordered vertex pair `(i, j)`.
///
/// Each record deposits into both of its endpoints; the list is built and
/// owned by the caller.
pub type Edge = [u32; 2];

/// Per-edge displacement vectors in both configurations.
///
/// `target[e] = V_t[i] - V_t[j]` and `source[e] = V_s[i] - V_s[j]` for edge
/// `e = (i, j)`. Rotations are solved to carry source edges onto target edges.
#[derive(Debug, Clone, Default)]
pub struct EdgeDisplacements {
    /// Edge vectors of the configuration being matched.
    pub target: Vec<Vector3<f64>>,
    /// Edge vectors of the configuration being rotated.
    pub source: Vec<Vector3<f64>>,
}

impl EdgeDisplacements {
    /// Number of edges.
    #[inline]
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// True when the graph has no edges.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

/// Check that the two configurations and the neighbor graph describe the
/// same vertex set.
///
/// Runs before any computation so that a malformed call never produces a
/// partial result.
///
/// # Errors
///
/// - [`ArapError::VertexCountMismatch`] when the configurations differ in length
/// - [`ArapError::InvalidEdgeIndex`] for the first edge with an out-of-range endpoint
/// - [`ArapError::InvalidCoordinate`] for the first NaN/Infinity coordinate
///   (only when `check_coordinates` is set)
pub fn validate_inputs(
    vert_new: &[Point3<f64>],
    vert_ref: &[Point3<f64>],
    edges: &[Edge],
    check_coordinates: bool,
) -> ArapResult<()> {
    if vert_new.len() != vert_ref.len() {
        return Err(ArapError::vertex_count_mismatch(
            vert_ref.len(),
            vert_new.len(),
        ));
    }

    check_edges(edges, vert_ref.len())?;

    if check_coordinates {
        check_finite(vert_ref)?;
        check_finite(vert_new)?;
    }

    Ok(())
}

/// Check every edge endpoint against `vertex_count`.
///
/// # Errors
///
/// Returns [`ArapError::InvalidEdgeIndex`] for the first out-of-range endpoint.
pub fn check_edges(edges: &[Edge], vertex_count: usize) -> ArapResult<()> {
    for (edge_index, edge) in edges.iter().enumerate() {
        for &vertex_index in edge {
            if vertex_index as usize >= vertex_count {
                return Err(ArapError::invalid_edge_index(
                    edge_index,
                    vertex_index,
                    vertex_count,
                ));
            }
        }
    }
    Ok(())
}

fn check_finite(points: &[Point3<f64>]) -> ArapResult<()> {
    const AXES: [&str; 3] = ["x", "y", "z"];
    for (vertex_index, p) in points.iter().enumerate() {
        for (axis, &value) in AXES.iter().zip(p.coords.iter()) {
            if !value.is_finite() {
                return Err(ArapError::invalid_coordinate(vertex_index, *axis, value));
            }
        }
    }
    Ok(())
}

/// Number of edges incident to each vertex, counting both endpoints of every record.
///
/// # Errors
///
/// Returns [`ArapError::InvalidEdgeIndex`] when an edge leaves the vertex set.
pub fn vertex_degrees(edges: &[Edge], vertex_count: usize) -> ArapResult<Vec<usize>> {
    check_edges(edges, vertex_count)?;
    let mut degrees = vec![0usize; vertex_count];
    for &[i, j] in edges {
        degrees[i as usize] += 1;
        degrees[j as usize] += 1;
    }
    Ok(degrees)
}
