//! Obstacle geometry for modulation-based avoidance
//!
//! This crate provides the per-obstacle distance model used by the modulation
//! and proximity crates: the distance function Gamma, surface normals,
//! reference directions and ray/surface queries, plus the [`Scene`] container
//! that owns a set of obstacles together with their pairwise caches.
//!
//! # Example
//!
//! ```rust
//! use avoidance_obstacles::{ObstacleConfig, Scene};
//! use avoidance_common::Vector;
//!
//! # fn example() -> avoidance_common::Result<()> {
//! let mut scene = Scene::new();
//! let index = scene.add_from_config(&ObstacleConfig::ellipse(vec![0.0, 0.0], vec![2.0, 1.0]))?;
//!
//! let gamma = scene.obstacle(index).unwrap().gamma(&Vector::from_vec(vec![4.0, 0.0]));
//! assert!((gamma - 2.0).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod hull;
pub mod obstacle;
pub mod scene;
pub mod shapes;

pub use config::{ObstacleConfig, ShapeConfig};
pub use hull::ReferenceHull;
pub use obstacle::Obstacle;
pub use scene::{PairMatrix, Scene};
pub use shapes::{ObstacleGeometry, ObstacleShape, Polygon, Sphere, Superellipsoid};
