//! Per-vertex cross-covariance accumulation over the neighbor graph.
//!
//! For every edge `e = (i, j)` the outer product `S_e = d_t * d_sᵀ` of the
//! target and source edge vectors is scatter-added into the accumulators of
//! both endpoints. Accumulators are plain sums: no degree normalization, and a
//! vertex without incident edges keeps a zero matrix.
//!
//! The rotation solved from `S_i` carries source edges onto target edges. In
//! the energy pipeline the target is `vert_new` and the source is `vert_ref`.

use nalgebra::{Matrix3, Point3};

use crate::error::{ArapError, ArapResult};
use crate::types::{Edge, EdgeDisplacements, check_edges};

/// Compute the per-edge displacement vectors of both configurations.
///
/// # Errors
///
/// - [`ArapError::VertexCountMismatch`] when the configurations differ in length
/// - [`ArapError::InvalidEdgeIndex`] when an edge leaves the vertex set
pub fn edge_displacements(
    vert_target: &[Point3<f64>],
    vert_source: &[Point3<f64>],
    edges: &[Edge],
) -> ArapResult<EdgeDisplacements> {
    if vert_target.len() != vert_source.len() {
        return Err(ArapError::vertex_count_mismatch(
            vert_source.len(),
            vert_target.len(),
        ));
    }
    check_edges(edges, vert_target.len())?;

    let (target, source) = edges
        .iter()
        .map(|&[i, j]| {
            let (i, j) = (i as usize, j as usize);
            (
                vert_target[i] - vert_target[j],
                vert_source[i] - vert_source[j],
            )
        })
        .unzip();

    Ok(EdgeDisplacements { target, source })
}

/// Outer product `d_t * d_sᵀ` for a single edge.
#[inline]
pub fn edge_covariance(displacements: &EdgeDisplacements, edge_index: usize) -> Matrix3<f64> {
    displacements.target[edge_index] * displacements.source[edge_index].transpose()
}

/// Scatter-add each edge's covariance into both endpoint accumulators.
///
/// Returns a flat arena of `vertex_count` matrices indexed by vertex id.
/// The reduction runs on the calling thread, so accumulator cells are never
/// written concurrently.
///
/// # Errors
///
/// Returns [`ArapError::InvalidEdgeIndex`] when an edge leaves the vertex set.
pub fn accumulate_covariance(
    displacements: &EdgeDisplacements,
    edges: &[Edge],
    vertex_count: usize,
) -> ArapResult<Vec<Matrix3<f64>>> {
    debug_assert_eq!(displacements.len(), edges.len());
    check_edges(edges, vertex_count)?;

    let mut accumulators = vec![Matrix3::zeros(); vertex_count];
    for (edge_index, &[i, j]) in edges.iter().enumerate() {
        let s_e = edge_covariance(displacements, edge_index);
        accumulators[i as usize] += s_e;
        accumulators[j as usize] += s_e;
    }
    Ok(accumulators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use approx::assert_relative_eq;

    #[test]
    fn test_edge_displacements() {
        let target = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let source = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 2.0, 0.0)];
        let d = edge_displacements(&target, &source, &[[0, 1]]).unwrap();

        assert_eq!(d.len(), 1);
        assert_relative_eq!(d.target[0].x, -1.0);
        assert_relative_eq!(d.source[0].y, -2.0);
    }

    #[test]
    fn test_edge_displacements_rejects_out_of_range_edge() {
        let verts = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let err = edge_displacements(&verts, &verts, &[[0, 1], [1, 7]]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEdgeIndex);
        assert!(err.to_string().contains("edge 1"));
    }

    #[test]
    fn test_edge_displacements_rejects_count_mismatch() {
        let target = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let source = vec![Point3::new(0.0, 0.0, 0.0)];
        let err = edge_displacements(&target, &source, &[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::VertexCountMismatch);
    }

    #[test]
    fn test_accumulate_rejects_short_arena() {
        let verts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let edges = [[0, 2]];
        let d = edge_displacements(&verts, &verts, &edges).unwrap();
        let err = accumulate_covariance(&d, &edges, 2).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEdgeIndex);
    }

    #[test]
    fn test_both_endpoints_receive_one_contribution() {
        let target = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let source = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
        let edges = [[0, 1]];
        let d = edge_displacements(&target, &source, &edges).unwrap();
        let s = accumulate_covariance(&d, &edges, 2).unwrap();

        // d_t = (-1, 0, 0), d_s = (-2, 0, 0): S_e has a single entry of 2
        let mut expected = Matrix3::zeros();
        expected[(0, 0)] = 2.0;
        assert_relative_eq!(s[0], expected);
        assert_relative_eq!(s[1], expected);
    }

    #[test]
    fn test_isolated_vertex_stays_zero() {
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ];
        let edges = [[0, 1]];
        let d = edge_displacements(&reference, &reference, &edges).unwrap();
        let s = accumulate_covariance(&d, &edges, 3).unwrap();

        assert_eq!(s[2], Matrix3::zeros());
        assert!(s[0].norm() > 0.0);
    }

    #[test]
    fn test_sum_over_incident_edges() {
        // Vertex 0 touches both edges; vertices 1 and 2 one each
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let edges = [[0, 1], [0, 2]];
        let d = edge_displacements(&reference, &reference, &edges).unwrap();
        let s = accumulate_covariance(&d, &edges, 3).unwrap();

        assert_relative_eq!(s[0], s[1] + s[2]);
        assert_relative_eq!(s[0].trace(), 2.0);
    }
}
