//! Common utilities and data structures shared by the avoidance crates
//!
//! Everything here is dimension generic (2D and 3D) unless it lives in the
//! [`planar`] module, which works on `glam` 2D vectors.

mod directional_space;
mod math;
pub mod planar;

pub use directional_space::*;
pub use math::*;

/// Column vector of arbitrary dimension used for positions, directions and velocities
pub type Vector = nalgebra::DVector<f64>;

/// Square matrix of arbitrary dimension used for bases and rotations
pub type Matrix = nalgebra::DMatrix<f64>;

/// Error types for the library
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Degenerate ray or tangent construction (negative discriminant)
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Invalid environment or parameter set for the requested evaluation
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid obstacle: {0}")]
    InvalidObstacle(String),

    #[error("obstacle index {index} out of range ({len} obstacles)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result type for avoidance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Returns an error unless `vector` has `expected` components.
pub fn ensure_dimension(vector: &Vector, expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            found: vector.len(),
        });
    }
    Ok(())
}
