//! Proximity resolution over a whole scene
//!
//! For every obstacle pair in which at least one obstacle moved since the
//! last resolution, the resolver finds the closest surface points (or a
//! common interior point for intersecting pairs) and caches them in the
//! scene. The cached points then pull each obstacle's reference point toward
//! its close neighbours, and intersecting obstacles are grouped in clusters.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use avoidance_common::{angle_space, orthogonal_basis, unit_axis, Vector, NORM_EPSILON};
use avoidance_obstacles::{Obstacle, Scene};
use log::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::clusters::intersection_clusters;
use crate::config::ResolverParams;
use crate::descent::{angle_descent, gamma_descent, AngleDescent};
use crate::reference_weights::reference_weights;

/// Cached relation between two obstacles
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairState {
    /// Never resolved since the pair appeared
    Unresolved,
    /// Closest surface points are `distance` apart
    Separated { distance: f64 },
    /// The obstacles overlap or touch and share a reference point
    Intersecting,
}

/// Cached state of the pair `(i, j)`
pub fn pair_state(scene: &Scene, i: usize, j: usize) -> PairState {
    match scene.resolved_distance(i, j) {
        None => PairState::Unresolved,
        Some(distance) if distance <= 0.0 => PairState::Intersecting,
        Some(distance) => PairState::Separated { distance },
    }
}

/// Which search failed to converge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescentKind {
    Angle,
    Gamma,
}

/// A descent stopped at the iteration limit; its best point was kept
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceWarning {
    pub pair: (usize, usize),
    pub descent: DescentKind,
    pub iterations: usize,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.descent {
            DescentKind::Angle => "angle",
            DescentKind::Gamma => "gamma",
        };
        write!(
            f,
            "{kind} descent between obstacles {} and {} did not converge within {} iterations",
            self.pair.0, self.pair.1, self.iterations
        )
    }
}

/// Summary of one resolution pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionReport {
    /// Pairs recomputed in this pass
    pub updated_pairs: Vec<(usize, usize)>,
    pub intersecting_pairs: Vec<(usize, usize)>,
    pub clusters: Vec<Vec<usize>>,
    pub warnings: Vec<ConvergenceWarning>,
}

impl ResolutionReport {
    /// Nothing moved, so nothing was recomputed
    pub fn is_unchanged(&self) -> bool {
        self.updated_pairs.is_empty()
    }
}

/// Fresh cache entries for one pair
#[derive(Debug, Clone)]
struct PairOutcome {
    pair: (usize, usize),
    distance: f64,
    points: [Vector; 2],
    intersection: Option<Vector>,
    warnings: Vec<ConvergenceWarning>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProximityResolver {
    params: ResolverParams,
}

impl ProximityResolver {
    pub fn new(params: ResolverParams) -> avoidance_common::Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ResolverParams {
        &self.params
    }

    /// Brings the scene caches and reference points up to date.
    ///
    /// Does nothing if no obstacle moved since the last pass.
    pub fn resolve(&self, scene: &mut Scene) -> ResolutionReport {
        if !scene.any_obstacle_moved() {
            debug!("no obstacle moved, proximity caches are current");
            return ResolutionReport {
                intersecting_pairs: scene.intersecting_pairs(),
                clusters: scene.clusters().to_vec(),
                ..Default::default()
            };
        }

        // Pair searches work on the plain shapes
        if let Err(err) = scene.reset_reference_points() {
            warn!("failed to reset reference points: {err}");
        }

        let pairs: Vec<(usize, usize)> = (0..scene.len())
            .flat_map(|j| (0..j).map(move |i| (i, j)))
            .filter(|&(i, j)| scene.obstacles()[i].has_moved() || scene.obstacles()[j].has_moved())
            .collect();

        let outcomes = self.resolve_pairs(scene, &pairs);

        let mut report = ResolutionReport {
            updated_pairs: pairs,
            ..Default::default()
        };
        for outcome in outcomes {
            let (i, j) = outcome.pair;
            self.store_outcome(scene, &outcome);
            for warning in &outcome.warnings {
                warn!("{warning}");
            }
            report.warnings.extend(outcome.warnings);
            debug!("pair ({i}, {j}) resolved at distance {}", outcome.distance);
        }

        self.update_reference_points(scene);
        self.update_clusters(scene);

        for obstacle in scene.obstacles_mut() {
            obstacle.mark_resolved();
        }

        report.intersecting_pairs = scene.intersecting_pairs();
        report.clusters = scene.clusters().to_vec();
        report
    }

    #[cfg(feature = "parallel")]
    fn resolve_pairs(&self, scene: &Scene, pairs: &[(usize, usize)]) -> Vec<PairOutcome> {
        pairs.par_iter().map(|&(i, j)| self.resolve_pair(scene, i, j)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn resolve_pairs(&self, scene: &Scene, pairs: &[(usize, usize)]) -> Vec<PairOutcome> {
        pairs.iter().map(|&(i, j)| self.resolve_pair(scene, i, j)).collect()
    }

    fn store_outcome(&self, scene: &mut Scene, outcome: &PairOutcome) {
        let (i, j) = outcome.pair;
        let stored = scene
            .set_distance(i, j, outcome.distance)
            .and_then(|_| scene.set_boundary_reference_point(i, j, &outcome.points[0]))
            .and_then(|_| scene.set_boundary_reference_point(j, i, &outcome.points[1]));
        if let Err(err) = stored {
            warn!("could not store proximity of pair ({i}, {j}): {err}");
        }
        scene.set_intersection(i, j, outcome.intersection.clone());
    }

    /// Directions along which each obstacle of the pair looks for the other
    fn search_directions(first: &Obstacle, second: &Obstacle) -> [Vector; 2] {
        let mut between = second.center_position() - first.center_position();
        if between.norm() <= NORM_EPSILON {
            between = unit_axis(first.dimension(), 0);
        }

        // Against a boundary, the enclosed obstacle faces the nearest wall
        let first_direction = if second.is_boundary() { -&between } else { between.clone() };
        let second_direction = if first.is_boundary() { between } else { -between };
        [first_direction, second_direction]
    }

    fn resolve_pair(&self, scene: &Scene, i: usize, j: usize) -> PairOutcome {
        let obstacles = [&scene.obstacles()[i], &scene.obstacles()[j]];
        let directions = Self::search_directions(obstacles[0], obstacles[1]);
        let first_time = scene.resolved_distance(i, j).is_none();

        // Entry test along the current center line
        let surface_points = [
            obstacles[0].local_radius_point(&directions[0]),
            obstacles[1].local_radius_point(&directions[1]),
        ];

        let entry_limit = 1.0 + self.params.entry_margin;
        let mut warnings = Vec::new();
        if obstacles[0].gamma(&surface_points[1]) <= entry_limit
            || obstacles[1].gamma(&surface_points[0]) <= entry_limit
        {
            let start = (&surface_points[0] + &surface_points[1]) * 0.5;
            return self.intersecting_outcome((i, j), obstacles, &start, warnings);
        }

        let null_matrices = [orthogonal_basis(&directions[0]), orthogonal_basis(&directions[1])];
        let seed_angle = |a: usize, b: usize, k: usize| {
            let dim = directions[k].len();
            if first_time {
                return Vector::zeros(dim - 1);
            }
            match scene.boundary_reference_point(a, b) {
                Ok(point) => {
                    let angle = angle_space(&(point - obstacles[k].center_position()), &null_matrices[k]);
                    // Seeds facing away from the other obstacle restart on the center line
                    if angle.norm() < FRAC_PI_2 {
                        angle
                    } else {
                        Vector::zeros(dim - 1)
                    }
                }
                Err(_) => Vector::zeros(dim - 1),
            }
        };
        let angles = [seed_angle(i, j, 0), seed_angle(j, i, 1)];

        match angle_descent(obstacles, [&null_matrices[0], &null_matrices[1]], angles, &self.params) {
            AngleDescent::Separated {
                distance,
                points,
                iterations,
                converged,
            } => {
                if !converged {
                    warnings.push(ConvergenceWarning {
                        pair: (i, j),
                        descent: DescentKind::Angle,
                        iterations,
                    });
                }
                PairOutcome {
                    pair: (i, j),
                    distance,
                    points,
                    intersection: None,
                    warnings,
                }
            }
            AngleDescent::Contact { points, .. } => {
                let start = (&points[0] + &points[1]) * 0.5;
                self.intersecting_outcome((i, j), obstacles, &start, warnings)
            }
        }
    }

    fn intersecting_outcome(
        &self,
        pair: (usize, usize),
        obstacles: [&Obstacle; 2],
        start: &Vector,
        mut warnings: Vec<ConvergenceWarning>,
    ) -> PairOutcome {
        let descent = gamma_descent(obstacles, start, &self.params);
        if !descent.converged {
            warnings.push(ConvergenceWarning {
                pair,
                descent: DescentKind::Gamma,
                iterations: descent.iterations,
            });
        }

        PairOutcome {
            pair,
            distance: 0.0,
            points: [descent.point.clone(), descent.point.clone()],
            intersection: Some(descent.point),
            warnings,
        }
    }

    /// Moves each solid obstacle's reference point toward its close neighbours
    fn update_reference_points(&self, scene: &mut Scene) {
        let sizes: Vec<f64> = scene.obstacles().iter().map(Obstacle::reference_length).collect();

        for k in 0..scene.len() {
            if scene.obstacles()[k].is_boundary() {
                continue;
            }

            let distances: Vec<f64> = (0..scene.len()).map(|j| scene.distance(k, j)).collect();
            let weights = reference_weights(
                &distances,
                &sizes,
                self.params.distance_max,
                self.params.reference_weight_power,
            );

            let dim = scene.obstacles()[k].dimension();
            let mut reference_point = Vector::zeros(dim);
            for (j, weight) in weights.iter().enumerate() {
                if *weight == 0.0 {
                    continue;
                }
                if let Ok(point) = scene.boundary_reference_point_local(k, j) {
                    reference_point += point * *weight;
                }
            }

            if let Some(obstacle) = scene.obstacle_mut(k) {
                if let Err(err) = obstacle.set_reference_point(reference_point) {
                    warn!("could not move reference point of obstacle {k}: {err}");
                }
            }
        }
    }

    fn update_clusters(&self, scene: &mut Scene) {
        let resolved: &Scene = scene;
        let touching: Vec<(usize, usize)> = (0..resolved.len())
            .flat_map(|j| (0..j).map(move |i| (i, j)))
            .filter(|&(i, j)| matches!(pair_state(resolved, i, j), PairState::Intersecting))
            .collect();
        let clusters = intersection_clusters(scene.len(), &touching);

        if self.params.share_cluster_reference {
            for members in &clusters {
                let dim = scene.obstacles()[members[0]].dimension();
                let mut center = Vector::zeros(dim);
                let mut total = 0.0;
                for &index in members {
                    let obstacle = &scene.obstacles()[index];
                    center += obstacle.center_position() * obstacle.reference_length();
                    total += obstacle.reference_length();
                }
                if total <= 0.0 {
                    continue;
                }
                center /= total;

                for &index in members {
                    if let Some(obstacle) = scene.obstacle_mut(index) {
                        if obstacle.is_boundary() {
                            continue;
                        }
                        if let Err(err) = obstacle.set_reference_point_global(&center) {
                            warn!("could not share cluster reference with obstacle {index}: {err}");
                        }
                    }
                }
            }
        }

        scene.set_clusters(clusters);
    }
}

/// Resolves the scene with the default parameters
pub fn resolve_proximity(scene: &mut Scene) -> ResolutionReport {
    ProximityResolver::default().resolve(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use avoidance_obstacles::ObstacleConfig;

    fn vec2(x: f64, y: f64) -> Vector {
        Vector::from_vec(vec![x, y])
    }

    fn circles(centers: &[(f64, f64)]) -> Scene {
        let mut scene = Scene::new();
        for &(x, y) in centers {
            scene.add_from_config(&ObstacleConfig::sphere(vec![x, y], 1.0)).unwrap();
        }
        scene
    }

    #[test]
    fn test_pair_state_transitions() {
        let mut scene = circles(&[(0.0, 0.0), (5.0, 0.0)]);
        assert_eq!(pair_state(&scene, 0, 1), PairState::Unresolved);

        resolve_proximity(&mut scene);
        assert!(matches!(pair_state(&scene, 0, 1), PairState::Separated { .. }));

        scene
            .obstacle_mut(1)
            .unwrap()
            .set_center_position(vec2(1.5, 0.0))
            .unwrap();
        resolve_proximity(&mut scene);
        assert_eq!(pair_state(&scene, 0, 1), PairState::Intersecting);

        scene
            .obstacle_mut(1)
            .unwrap()
            .set_center_position(vec2(6.0, 0.0))
            .unwrap();
        resolve_proximity(&mut scene);
        assert!(matches!(pair_state(&scene, 0, 1), PairState::Separated { .. }));
        assert!(scene.intersection(0, 1).is_none());
    }

    #[test]
    fn test_search_directions_against_boundary() {
        let solid = Obstacle::from_config(&ObstacleConfig::sphere(vec![1.0, 0.0], 0.5)).unwrap();
        let boundary =
            Obstacle::from_config(&ObstacleConfig::sphere(vec![0.0, 0.0], 5.0).with_boundary(true)).unwrap();

        let [to_boundary, from_boundary] = ProximityResolver::search_directions(&solid, &boundary);
        assert!((to_boundary - vec2(1.0, 0.0)).norm() < 1e-12);
        assert!((from_boundary - vec2(1.0, 0.0)).norm() < 1e-12);

        let [from_boundary, to_boundary] = ProximityResolver::search_directions(&boundary, &solid);
        assert!((from_boundary - vec2(1.0, 0.0)).norm() < 1e-12);
        assert!((to_boundary - vec2(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_coincident_centers_use_first_axis() {
        let a = Obstacle::from_config(&ObstacleConfig::sphere(vec![0.0, 0.0], 1.0)).unwrap();
        let b = Obstacle::from_config(&ObstacleConfig::sphere(vec![0.0, 0.0], 0.5)).unwrap();
        let [first, second] = ProximityResolver::search_directions(&a, &b);
        assert_eq!(first, vec2(1.0, 0.0));
        assert_eq!(second, vec2(-1.0, 0.0));
    }

    #[test]
    fn test_only_moved_pairs_are_updated() {
        let mut scene = circles(&[(0.0, 0.0), (5.0, 0.0), (0.0, 5.0)]);
        let report = resolve_proximity(&mut scene);
        assert_eq!(report.updated_pairs, vec![(0, 1), (0, 2), (1, 2)]);

        scene
            .obstacle_mut(2)
            .unwrap()
            .set_center_position(vec2(0.0, 6.0))
            .unwrap();
        let report = resolve_proximity(&mut scene);
        assert_eq!(report.updated_pairs, vec![(0, 2), (1, 2)]);
    }
}
