//! Scene-level proximity scenarios
//!
//! These tests run the full resolution pass on small scenes and check the
//! cached distances, the relocated reference points and the clusters.

#[cfg(test)]
mod tests {
    use crate::{resolve_proximity, PairState, ProximityResolver, ResolverParams};
    use crate::resolver::pair_state;
    use avoidance_common::Vector;
    use avoidance_obstacles::{ObstacleConfig, Scene};

    fn vec2(x: f64, y: f64) -> Vector {
        Vector::from_vec(vec![x, y])
    }

    fn scene_with(configs: &[ObstacleConfig]) -> Scene {
        let mut scene = Scene::new();
        for config in configs {
            scene.add_from_config(config).unwrap();
        }
        scene
    }

    fn circles(centers: &[(f64, f64)]) -> Scene {
        let configs: Vec<_> = centers
            .iter()
            .map(|&(x, y)| ObstacleConfig::sphere(vec![x, y], 1.0))
            .collect();
        scene_with(&configs)
    }

    #[test]
    fn test_separated_circles() {
        let mut scene = circles(&[(0.0, 0.0), (5.0, 0.0)]);
        let report = resolve_proximity(&mut scene);

        assert_eq!(report.updated_pairs, vec![(0, 1)]);
        assert!(report.intersecting_pairs.is_empty());
        assert!(report.clusters.is_empty());
        assert!(report.warnings.is_empty());

        assert!((scene.distance(0, 1) - 3.0).abs() < 1e-9);
        assert_eq!(scene.distance(0, 1), scene.distance(1, 0));
        assert!((scene.boundary_reference_point(0, 1).unwrap() - vec2(1.0, 0.0)).norm() < 1e-9);
        assert!((scene.boundary_reference_point(1, 0).unwrap() - vec2(4.0, 0.0)).norm() < 1e-9);

        // Neighbours at the cut-off distance leave the reference points alone
        for obstacle in scene.obstacles() {
            assert_eq!(obstacle.reference_point(), &Vector::zeros(2));
            assert!(!obstacle.has_moved());
        }
    }

    #[test]
    fn test_intersecting_circles_share_reference_point() {
        let mut scene = circles(&[(0.0, 0.0), (1.0, 0.0)]);
        let report = resolve_proximity(&mut scene);

        assert_eq!(pair_state(&scene, 0, 1), PairState::Intersecting);
        assert_eq!(scene.distance(0, 1), 0.0);
        assert_eq!(report.intersecting_pairs, vec![(0, 1)]);
        assert_eq!(report.clusters, vec![vec![0, 1]]);

        let intersection = scene.intersection(0, 1).cloned().unwrap();
        assert!((intersection - vec2(0.5, 0.0)).norm() < 1e-6);
        for obstacle in scene.obstacles() {
            assert!((obstacle.reference_point_global() - vec2(0.5, 0.0)).norm() < 1e-6);
            assert_eq!(obstacle.cluster(), Some(0));
        }
    }

    #[test]
    fn test_resolution_without_motion_is_skipped() {
        let mut scene = circles(&[(0.0, 0.0), (1.2, 0.0), (0.0, 2.5)]);
        let first = resolve_proximity(&mut scene);
        let references: Vec<Vector> = scene.obstacles().iter().map(|o| o.reference_point().clone()).collect();
        let distances = [scene.distance(0, 1), scene.distance(0, 2), scene.distance(1, 2)];

        let second = resolve_proximity(&mut scene);
        assert!(second.is_unchanged());
        assert_eq!(second.intersecting_pairs, first.intersecting_pairs);
        assert_eq!(second.clusters, first.clusters);

        for (obstacle, reference) in scene.obstacles().iter().zip(&references) {
            assert_eq!(obstacle.reference_point(), reference);
        }
        assert_eq!(
            [scene.distance(0, 1), scene.distance(0, 2), scene.distance(1, 2)],
            distances
        );
    }

    #[test]
    fn test_obstacle_inside_boundary() {
        let mut scene = scene_with(&[
            ObstacleConfig::sphere(vec![0.0, 0.0], 5.0).with_boundary(true),
            ObstacleConfig::sphere(vec![2.0, 0.0], 1.0),
        ]);
        resolve_proximity(&mut scene);

        // Closest wall point is straight ahead of the enclosed circle
        assert!((scene.distance(0, 1) - 2.0).abs() < 1e-9);
        assert!((scene.boundary_reference_point(0, 1).unwrap() - vec2(5.0, 0.0)).norm() < 1e-9);
        assert!((scene.boundary_reference_point(1, 0).unwrap() - vec2(3.0, 0.0)).norm() < 1e-9);

        assert_eq!(scene.obstacles()[0].reference_point(), &Vector::zeros(2));
        let reference = scene.obstacles()[1].reference_point();
        assert!(reference[0] > 0.0 && reference[0] < 1.0);
        assert!(reference[1].abs() < 1e-12);
    }

    #[test]
    fn test_chain_of_intersections_forms_one_cluster() {
        let mut scene = circles(&[(0.0, 0.0), (1.5, 0.0), (3.0, 0.0), (10.0, 0.0)]);
        let report = resolve_proximity(&mut scene);

        assert_eq!(report.intersecting_pairs, vec![(0, 1), (1, 2)]);
        assert_eq!(report.clusters, vec![vec![0, 1, 2]]);
        assert!((scene.distance(0, 2) - 1.0).abs() < 1e-9);
        assert!((scene.distance(2, 3) - 5.0).abs() < 1e-9);

        for index in 0..3 {
            assert_eq!(scene.obstacles()[index].cluster(), Some(0));
        }
        assert_eq!(scene.obstacles()[3].cluster(), None);
    }

    #[test]
    fn test_moving_obstacle_is_resolved_again() {
        let mut scene = circles(&[(0.0, 0.0), (5.0, 0.0)]);
        resolve_proximity(&mut scene);

        scene
            .obstacle_mut(1)
            .unwrap()
            .set_center_position(vec2(4.0, 0.0))
            .unwrap();
        let report = resolve_proximity(&mut scene);

        assert_eq!(report.updated_pairs, vec![(0, 1)]);
        assert!((scene.distance(0, 1) - 2.0).abs() < 1e-9);

        // The neighbour within reach pulls the reference point toward it
        let reference = scene.obstacles()[0].reference_point();
        assert!(reference[0] > 0.0 && reference[0] < 1.0);
        assert!(reference[1].abs() < 1e-12);
    }

    #[test]
    fn test_cached_points_seed_the_next_search() {
        let resolver = ProximityResolver::new(ResolverParams::default().with_max_iterations(2000)).unwrap();
        let mut scene = circles(&[(0.0, 0.0), (5.0, 0.0)]);
        resolver.resolve(&mut scene);

        scene
            .obstacle_mut(1)
            .unwrap()
            .set_center_position(vec2(4.0, 1.0))
            .unwrap();
        let report = resolver.resolve(&mut scene);
        assert!(report.warnings.is_empty());

        let expected = 17.0_f64.sqrt() - 2.0;
        let distance = scene.distance(0, 1);
        assert!(distance >= expected - 1e-9);
        assert!(distance < expected + 0.05);
    }

    #[test]
    fn test_shared_cluster_reference_is_size_weighted() {
        let resolver =
            ProximityResolver::new(ResolverParams::default().with_share_cluster_reference(true)).unwrap();
        let mut scene = scene_with(&[
            ObstacleConfig::sphere(vec![0.0, 0.0], 1.0),
            ObstacleConfig::sphere(vec![2.5, 0.0], 2.0),
        ]);
        resolver.resolve(&mut scene);

        let shared = vec2(5.0 / 3.0, 0.0);
        for obstacle in scene.obstacles() {
            assert!((obstacle.reference_point_global() - &shared).norm() < 1e-9);
        }
        // The smaller circle reaches the shared point through its hull
        assert!(scene.obstacles()[0].hull().is_some());
    }

    #[test]
    fn test_separated_circles_moved_into_overlap() {
        for center in [(-1.0, 0.0), (0.0, 0.5), (0.0, 1.5), (-1.5, 0.5), (1.0, 0.0)] {
            let mut scene = circles(&[(0.0, 0.0), (5.0, 0.0)]);
            resolve_proximity(&mut scene);
            assert!(matches!(pair_state(&scene, 0, 1), PairState::Separated { .. }));

            scene
                .obstacle_mut(1)
                .unwrap()
                .set_center_position(vec2(center.0, center.1))
                .unwrap();
            let report = resolve_proximity(&mut scene);

            assert_eq!(pair_state(&scene, 0, 1), PairState::Intersecting, "moved to {center:?}");
            assert_eq!(scene.distance(0, 1), 0.0);
            assert_eq!(report.intersecting_pairs, vec![(0, 1)]);
            assert_eq!(report.clusters, vec![vec![0, 1]]);

            let intersection = scene.intersection(0, 1).cloned().unwrap();
            for obstacle in scene.obstacles() {
                assert!(obstacle.gamma(&intersection) < 1.0, "moved to {center:?}");
            }
        }
    }

    #[test]
    fn test_intersecting_circles_pulled_apart() {
        let mut scene = circles(&[(0.0, 0.0), (1.0, 0.0)]);
        resolve_proximity(&mut scene);
        assert_eq!(scene.clusters(), &[vec![0, 1]]);

        scene
            .obstacle_mut(1)
            .unwrap()
            .set_center_position(vec2(4.0, 0.0))
            .unwrap();
        let report = resolve_proximity(&mut scene);

        match pair_state(&scene, 0, 1) {
            PairState::Separated { distance } => assert!((distance - 2.0).abs() < 1e-9),
            state => panic!("expected separated circles, got {state:?}"),
        }
        assert!(scene.intersection(0, 1).is_none());
        assert!(report.intersecting_pairs.is_empty());
        assert!(report.clusters.is_empty());
        for obstacle in scene.obstacles() {
            assert_eq!(obstacle.cluster(), None);
        }

        let reference = scene.obstacles()[0].reference_point();
        assert!(reference[0] > 0.0 && reference[0] < 1.0);
    }

    #[test]
    fn test_obstacle_moving_through_boundary_and_back() {
        let mut scene = scene_with(&[
            ObstacleConfig::sphere(vec![0.0, 0.0], 5.0).with_boundary(true),
            ObstacleConfig::sphere(vec![2.0, 0.0], 1.0),
        ]);
        resolve_proximity(&mut scene);
        assert!(matches!(pair_state(&scene, 0, 1), PairState::Separated { .. }));

        // The circle now sticks out of the enclosing wall
        scene
            .obstacle_mut(1)
            .unwrap()
            .set_center_position(vec2(4.5, 0.0))
            .unwrap();
        let report = resolve_proximity(&mut scene);
        assert_eq!(pair_state(&scene, 0, 1), PairState::Intersecting);
        assert_eq!(report.intersecting_pairs, vec![(0, 1)]);

        scene
            .obstacle_mut(1)
            .unwrap()
            .set_center_position(vec2(1.0, 0.0))
            .unwrap();
        let report = resolve_proximity(&mut scene);
        match pair_state(&scene, 0, 1) {
            PairState::Separated { distance } => assert!((distance - 3.0).abs() < 1e-9),
            state => panic!("expected the circle back inside, got {state:?}"),
        }
        assert!(report.intersecting_pairs.is_empty());
        assert!((scene.boundary_reference_point(1, 0).unwrap() - vec2(2.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let params = ResolverParams::default().with_step_sizes(0.0, 0.1);
        assert!(ProximityResolver::new(params).is_err());
    }
}
