//! Proximity resolution between obstacles
//!
//! Obstacles that come close to each other need reference points that keep
//! the modulated flow from slipping between them. This crate finds, for each
//! pair of obstacles, either the closest points of their surfaces or a point
//! shared by both when they intersect, and relocates every reference point
//! toward its close neighbours. Intersecting obstacles are grouped into
//! clusters.
//!
//! # Example
//!
//! ```rust
//! use avoidance_obstacles::{ObstacleConfig, Scene};
//! use avoidance_proximity::resolve_proximity;
//!
//! # fn example() -> avoidance_common::Result<()> {
//! let mut scene = Scene::new();
//! scene.add_from_config(&ObstacleConfig::sphere(vec![0.0, 0.0], 1.0))?;
//! scene.add_from_config(&ObstacleConfig::sphere(vec![1.5, 0.0], 1.0))?;
//!
//! let report = resolve_proximity(&mut scene);
//! assert_eq!(report.intersecting_pairs, vec![(0, 1)]);
//! assert_eq!(report.clusters, vec![vec![0, 1]]);
//! # Ok(())
//! # }
//! ```

pub mod clusters;
pub mod config;
pub mod descent;
pub mod reference_weights;
pub mod resolver;

pub use clusters::intersection_clusters;
pub use config::ResolverParams;
pub use descent::{angle_descent, gamma_cost, gamma_descent, AngleDescent, GammaDescent};
pub use reference_weights::reference_weights;
pub use resolver::{
    pair_state, resolve_proximity, ConvergenceWarning, DescentKind, PairState, ProximityResolver, ResolutionReport,
};

#[cfg(test)]
mod resolver_scenario_tests;
