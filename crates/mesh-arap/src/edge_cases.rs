//! Edge case tests for ARAP evaluation robustness.
//!
//! Degenerate graphs and unusual configurations must produce documented,
//! deterministic results without panicking.

#[cfg(test)]
mod tests {
    use crate::covariance::{accumulate_covariance, edge_displacements};
    use crate::gradient::arap_gradient;
    use crate::rotation::solve_rotations;
    use crate::{ArapParams, Edge, arap_energy, arap_evaluate};
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Point3, Vector3};

    fn tetrahedron() -> (Vec<Point3<f64>>, Vec<Edge>) {
        (
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]],
        )
    }

    fn assert_proper_rotation(r: &Matrix3<f64>) {
        assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-10);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-10);
    }

    // ==================== Empty Inputs ====================

    #[test]
    fn test_empty_vertex_set() {
        let eval = arap_evaluate(&[], &[], &[], &ArapParams::default()).unwrap();
        assert_eq!(eval.energy(), 0.0);
        assert!(eval.rotations.is_empty());
    }

    #[test]
    fn test_edge_into_empty_vertex_set() {
        assert!(arap_energy(&[], &[], &[[0, 0]]).is_err());
    }

    // ==================== Degenerate Accumulators ====================

    #[test]
    fn test_isolated_vertex_gets_identity() {
        let (mut reference, edges) = tetrahedron();
        reference.push(Point3::new(10.0, 10.0, 10.0));
        let query = reference.clone();

        let eval = arap_evaluate(&query, &reference, &edges, &ArapParams::default()).unwrap();
        assert_eq!(eval.rotations[4], Matrix3::identity());
        assert_eq!(eval.degenerate_vertices, vec![4]);
    }

    #[test]
    fn test_collapsed_query_gets_identity() {
        // Every query vertex at the same point: all new edge vectors vanish
        let (reference, edges) = tetrahedron();
        let query = vec![Point3::new(1.0, 2.0, 3.0); reference.len()];

        let eval = arap_evaluate(&query, &reference, &edges, &ArapParams::default()).unwrap();
        for r in &eval.rotations {
            assert_eq!(*r, Matrix3::identity());
        }
        // Residuals reduce to the reference edge vectors
        let expected: f64 = edges
            .iter()
            .map(|&[i, j]| (reference[i as usize] - reference[j as usize]).norm_squared())
            .sum();
        assert_relative_eq!(eval.breakdown.rigidity, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_self_loop_contributes_nothing() {
        let (reference, mut edges) = tetrahedron();
        let query: Vec<_> = reference
            .iter()
            .map(|p| Point3::new(p.x * 1.2, p.y, p.z - 0.1 * p.x))
            .collect();

        let without = arap_energy(&query, &reference, &edges).unwrap();
        edges.push([2, 2]);
        let with = arap_energy(&query, &reference, &edges).unwrap();
        assert_relative_eq!(without, with, epsilon = 1e-15);
    }

    #[test]
    fn test_duplicate_edges_double_their_term() {
        let reference = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let query = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
        let params = ArapParams::default().without_regularization();

        let once = crate::arap_energy_with_params(&query, &reference, &[[0, 1]], &params).unwrap();
        let twice =
            crate::arap_energy_with_params(&query, &reference, &[[0, 1], [1, 0]], &params)
                .unwrap();
        assert_relative_eq!(twice, 2.0 * once, epsilon = 1e-14);
    }

    // ==================== Reflections ====================

    #[test]
    fn test_mirrored_query_yields_proper_rotations() {
        // Distinct axis lengths keep the singular values of vertex 0 apart
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 3.0),
        ];
        let (_, edges) = tetrahedron();
        let query: Vec<_> = reference
            .iter()
            .map(|p| Point3::new(p.x, p.y, -p.z))
            .collect();

        let eval = arap_evaluate(&query, &reference, &edges, &ArapParams::default()).unwrap();
        for r in &eval.rotations {
            assert_proper_rotation(r);
        }
        // S_0 = diag(1, 4, -9): the weakest axis is flipped
        assert_relative_eq!(
            eval.rotations[0],
            Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, -1.0)),
            epsilon = 1e-10
        );
        // A mirror cannot be absorbed by rotations
        assert!(eval.breakdown.rigidity > 0.5);
    }

    #[test]
    fn test_collinear_chain_rank_one() {
        let reference: Vec<_> = (0..4).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        let query: Vec<_> = (0..4).map(|i| Point3::new(0.0, 1.5 * i as f64, 0.0)).collect();
        let edges = [[0, 1], [1, 2], [2, 3]];

        let d = edge_displacements(&query, &reference, &edges).unwrap();
        let accumulators = accumulate_covariance(&d, &edges, 4).unwrap();
        let rotations = solve_rotations(&accumulators, &ArapParams::default());
        for r in &rotations {
            assert_proper_rotation(r);
            // The reference direction is mapped onto the query direction
            assert_relative_eq!(r * Vector3::x(), Vector3::y(), epsilon = 1e-10);
        }

        // Only the stretch remains: each edge has residual length 0.5
        let eval = arap_evaluate(&query, &reference, &edges, &ArapParams::default()).unwrap();
        assert_relative_eq!(eval.breakdown.rigidity, 3.0 * 0.25, epsilon = 1e-10);
    }

    // ==================== Scale ====================

    #[test]
    fn test_large_coordinates() {
        let (reference, edges) = tetrahedron();
        let reference: Vec<_> = reference.iter().map(|p| Point3::from(p.coords * 1e6)).collect();
        let query: Vec<_> = reference
            .iter()
            .map(|p| p + Vector3::new(1e5, 0.0, 0.0))
            .collect();

        let eval = arap_evaluate(&query, &reference, &edges, &ArapParams::default()).unwrap();
        assert!(eval.energy().is_finite());
        assert_relative_eq!(eval.breakdown.rigidity, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_infinite_coordinate_rejected() {
        let (reference, edges) = tetrahedron();
        let mut query = reference.clone();
        query[3].x = f64::INFINITY;
        assert!(arap_energy(&query, &reference, &edges).is_err());
        assert!(arap_gradient(&query, &reference, &edges, &ArapParams::default()).is_err());
    }
}
