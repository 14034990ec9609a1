//! Obstacle construction parameters

use avoidance_common::{Error, Result};
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::shapes::polygon::encloses_origin;

/// Shape parameters of an obstacle, expressed in its local frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeConfig {
    /// Axis-aligned superellipsoid; an empty curvature means 1 on every axis (ellipsoid)
    Superellipsoid {
        axes_length: Vec<f64>,
        #[serde(default)]
        curvature: Vec<f64>,
    },
    /// Sphere (circle in 2D)
    Sphere { radius: f64 },
    /// Planar outline around the local origin, possibly non-star-shaped
    Polygon { vertices: Vec<[f64; 2]> },
}

impl Default for ShapeConfig {
    fn default() -> Self {
        ShapeConfig::Superellipsoid {
            axes_length: vec![1.0, 1.0],
            curvature: Vec::new(),
        }
    }
}

/// Configuration record for a single obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Center of the obstacle in the global frame; its length sets the dimension
    pub center_position: Vec<f64>,
    /// 2D: one angle; 3D: Euler angles (x, y, z). Empty means unrotated
    pub orientation: Vec<f64>,
    pub shape: ShapeConfig,
    /// Distance added uniformly to the surface (removed for boundaries)
    pub margin: f64,
    /// The obstacle is an enclosing wall; its interior is the free space
    pub is_boundary: bool,
    pub is_deforming: bool,
    pub linear_velocity: Vec<f64>,
    /// 2D: one rate; 3D: angular velocity vector
    pub angular_velocity: Vec<f64>,
    /// Rate of change of the axes (or radius) of a deforming obstacle
    pub axes_velocity: Vec<f64>,
    /// Smoothing constant of the obstacle's own motion influence
    pub sigma: f64,
    pub repulsion_coeff: f64,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            center_position: vec![0.0, 0.0],
            orientation: Vec::new(),
            shape: ShapeConfig::default(),
            margin: 0.0,
            is_boundary: false,
            is_deforming: false,
            linear_velocity: Vec::new(),
            angular_velocity: Vec::new(),
            axes_velocity: Vec::new(),
            sigma: 1.0,
            repulsion_coeff: 1.0,
        }
    }
}

impl ObstacleConfig {
    /// Ellipse (ellipsoid in 3D) with curvature 1
    pub fn ellipse(center_position: Vec<f64>, axes_length: Vec<f64>) -> Self {
        Self {
            center_position,
            shape: ShapeConfig::Superellipsoid {
                axes_length,
                curvature: Vec::new(),
            },
            ..Default::default()
        }
    }

    pub fn superellipsoid(center_position: Vec<f64>, axes_length: Vec<f64>, curvature: Vec<f64>) -> Self {
        Self {
            center_position,
            shape: ShapeConfig::Superellipsoid { axes_length, curvature },
            ..Default::default()
        }
    }

    pub fn sphere(center_position: Vec<f64>, radius: f64) -> Self {
        Self {
            center_position,
            shape: ShapeConfig::Sphere { radius },
            ..Default::default()
        }
    }

    pub fn polygon(center_position: Vec<f64>, vertices: Vec<[f64; 2]>) -> Self {
        Self {
            center_position,
            shape: ShapeConfig::Polygon { vertices },
            ..Default::default()
        }
    }

    pub fn with_orientation(mut self, orientation: Vec<f64>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_boundary(mut self, is_boundary: bool) -> Self {
        self.is_boundary = is_boundary;
        self
    }

    pub fn with_linear_velocity(mut self, linear_velocity: Vec<f64>) -> Self {
        self.linear_velocity = linear_velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vec<f64>) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Marks the obstacle as deforming with the given axes (or radius) rate
    pub fn with_deformation(mut self, axes_velocity: Vec<f64>) -> Self {
        self.is_deforming = true;
        self.axes_velocity = axes_velocity;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_repulsion_coeff(mut self, repulsion_coeff: f64) -> Self {
        self.repulsion_coeff = repulsion_coeff;
        self
    }

    /// Spatial dimension of the obstacle
    pub fn dimension(&self) -> usize {
        self.center_position.len()
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        let dim = self.dimension();
        if !(2..=3).contains(&dim) {
            return Err(Error::InvalidObstacle(format!(
                "obstacles are defined in 2D or 3D, center has {dim} components"
            )));
        }

        let expected_orientation = if dim == 2 { 1 } else { 3 };
        check_optional_len("orientation", &self.orientation, expected_orientation)?;
        check_optional_len("linear_velocity", &self.linear_velocity, dim)?;
        check_optional_len("angular_velocity", &self.angular_velocity, expected_orientation)?;

        if !(self.margin >= 0.0) {
            return Err(Error::InvalidObstacle("margin must be non-negative".to_string()));
        }
        if !(self.sigma > 0.0) {
            return Err(Error::InvalidObstacle("sigma must be positive".to_string()));
        }
        if !(self.repulsion_coeff >= 0.0) {
            return Err(Error::InvalidObstacle(
                "repulsion coefficient must be non-negative".to_string(),
            ));
        }

        let min_extent = match &self.shape {
            ShapeConfig::Superellipsoid { axes_length, curvature } => {
                if axes_length.len() != dim {
                    return Err(Error::DimensionMismatch {
                        expected: dim,
                        found: axes_length.len(),
                    });
                }
                if axes_length.iter().any(|a| !(*a > 0.0)) {
                    return Err(Error::InvalidObstacle("axes must be positive".to_string()));
                }
                check_optional_len("curvature", curvature, dim)?;
                if curvature.iter().any(|p| !(*p > 0.0)) {
                    return Err(Error::InvalidObstacle("curvature must be positive".to_string()));
                }
                check_optional_len("axes_velocity", &self.axes_velocity, dim)?;
                axes_length.iter().copied().fold(f64::INFINITY, f64::min)
            }
            ShapeConfig::Sphere { radius } => {
                if !(*radius > 0.0) {
                    return Err(Error::InvalidObstacle("radius must be positive".to_string()));
                }
                check_optional_len("axes_velocity", &self.axes_velocity, 1)?;
                *radius
            }
            ShapeConfig::Polygon { vertices } => {
                if dim != 2 {
                    return Err(Error::InvalidObstacle("polygons are planar obstacles".to_string()));
                }
                if vertices.len() < 3 {
                    return Err(Error::InvalidObstacle(format!(
                        "a polygon needs at least 3 vertices, got {}",
                        vertices.len()
                    )));
                }
                if vertices.iter().flatten().any(|c| !c.is_finite()) {
                    return Err(Error::InvalidObstacle("polygon vertices must be finite".to_string()));
                }
                let outline: Vec<DVec2> = vertices.iter().map(|v| DVec2::new(v[0], v[1])).collect();
                if !encloses_origin(&outline) {
                    return Err(Error::InvalidObstacle(
                        "polygon vertices must surround the local origin".to_string(),
                    ));
                }
                vertices
                    .iter()
                    .map(|v| (v[0] * v[0] + v[1] * v[1]).sqrt())
                    .fold(f64::INFINITY, f64::min)
            }
        };

        if self.is_boundary && self.margin >= min_extent {
            return Err(Error::InvalidObstacle(
                "boundary margin must be smaller than the smallest extent".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_optional_len(name: &str, values: &[f64], expected: usize) -> Result<()> {
    if !values.is_empty() && values.len() != expected {
        return Err(Error::InvalidObstacle(format!(
            "{name} must have {expected} components, got {}",
            values.len()
        )));
    }
    Ok(())
}
