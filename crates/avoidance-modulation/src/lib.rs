//! Modulation-based obstacle avoidance
//!
//! A nominal velocity (for instance pointing to an attractor) is deformed
//! locally so that it never enters an obstacle. Each obstacle contributes a
//! modulation matrix built from its distance function Gamma, its surface
//! normal and its reference direction; the contributions are blended with
//! weights decreasing in Gamma.
//!
//! # Example
//!
//! ```rust
//! use avoidance_common::Vector;
//! use avoidance_modulation::evaluate_avoidance;
//! use avoidance_obstacles::{ObstacleConfig, Scene};
//!
//! # fn example() -> avoidance_common::Result<()> {
//! let mut scene = Scene::new();
//! scene.add_from_config(&ObstacleConfig::sphere(vec![0.0, 0.0], 1.0))?;
//!
//! let position = Vector::from_vec(vec![-2.0, 0.0]);
//! let velocity = evaluate_avoidance(&scene, &position, &Vector::from_vec(vec![1.0, 0.0]))?;
//! assert!(velocity[0] < 1.0);
//! # Ok(())
//! # }
//! ```

pub mod avoidance;
pub mod config;
pub mod modulation;
pub mod obstacle_velocity;
pub mod weights;

pub use avoidance::{evaluate_avoidance, evaluate_avoidance_batch, MultiObstacleBlender};
pub use config::{AvoidanceConfig, ModulationParams};
pub use modulation::{compute_decomposition_matrix, compute_diagonal_matrix, Decomposition, ModulationOperator};
pub use obstacle_velocity::{obstacle_velocity, relative_obstacle_velocity};
pub use weights::compute_weights;
