//! Shape variants and the geometry contract shared by all obstacles

pub mod polygon;
pub mod sphere;
pub mod superellipsoid;

use avoidance_common::{central_difference_gradient, normalize_or_zero, Result, Vector};
use glam::DVec2;

use crate::config::ShapeConfig;

pub use polygon::Polygon;
pub use sphere::Sphere;
pub use superellipsoid::Superellipsoid;

/// Geometry queries every obstacle shape answers.
///
/// All positions and directions are in the shape's local frame (unrotated and
/// centered at the local origin). The margin is already applied, so Gamma is 1
/// on the margin-inflated surface.
pub trait ObstacleGeometry {
    fn dimension(&self) -> usize;

    /// Distance function: 1 on the surface, > 1 outside, < 1 inside, 0 at the origin
    fn gamma(&self, position: &Vector) -> f64;

    /// Outward unit normal of the surface level set through `position`.
    ///
    /// Zero at the local origin where it is undefined.
    fn normal(&self, position: &Vector) -> Vector;

    /// Unit direction from `reference_point` toward `position`, zero if they coincide
    fn reference_direction(&self, position: &Vector, reference_point: &Vector) -> Vector {
        normalize_or_zero(&(position - reference_point))
    }

    /// Closest forward intersection of the ray `from_point + t * direction` with the surface
    fn surface_intersection(&self, direction: &Vector, from_point: &Vector) -> Result<Vector>;

    /// Distance from the local origin to the surface along `direction`
    fn local_radius(&self, direction: &Vector) -> f64;

    /// Gradient of [`ObstacleGeometry::local_radius`] with respect to the direction.
    ///
    /// Only the part tangential to the unit sphere is meaningful.
    fn local_radius_gradient(&self, direction: &Vector) -> Vector {
        let unit = normalize_or_zero(direction);
        central_difference_gradient(&unit, 1e-6, |d| self.local_radius(d))
    }

    /// Characteristic size used to scale proximity weights
    fn reference_length(&self) -> f64;

    /// Whether every surface point is visible from the local origin
    fn is_star_shaped(&self) -> bool {
        true
    }

    /// Surface velocity of a deforming shape at a local surface point
    fn deformation_velocity(&self, position: &Vector) -> Vector {
        Vector::zeros(position.len())
    }
}

/// Closed set of obstacle shapes
#[derive(Debug, Clone, PartialEq)]
pub enum ObstacleShape {
    Superellipsoid(Superellipsoid),
    Sphere(Sphere),
    Polygon(Polygon),
}

impl ObstacleShape {
    /// Builds the shape from its configuration; `margin` is the signed surface offset
    pub fn from_config(config: &ShapeConfig, dimension: usize, margin: f64, axes_velocity: &[f64]) -> Self {
        match config {
            ShapeConfig::Superellipsoid { axes_length, curvature } => {
                let curvature = if curvature.is_empty() {
                    vec![1.0; dimension]
                } else {
                    curvature.clone()
                };
                let axes_velocity = if axes_velocity.is_empty() {
                    vec![0.0; dimension]
                } else {
                    axes_velocity.to_vec()
                };
                ObstacleShape::Superellipsoid(Superellipsoid::new(
                    Vector::from_vec(axes_length.clone()),
                    Vector::from_vec(curvature),
                    margin,
                    Vector::from_vec(axes_velocity),
                ))
            }
            ShapeConfig::Sphere { radius } => ObstacleShape::Sphere(Sphere::new(
                dimension,
                *radius,
                margin,
                axes_velocity.first().copied().unwrap_or(0.0),
            )),
            ShapeConfig::Polygon { vertices } => ObstacleShape::Polygon(Polygon::new(
                vertices.iter().map(|v| DVec2::new(v[0], v[1])).collect(),
                margin,
            )),
        }
    }

    /// Semi-axes of the planar ellipse this shape is, if it is one.
    ///
    /// Used to build the reference hull, which needs exact tangent lines.
    pub fn planar_ellipse_axes(&self) -> Option<DVec2> {
        match self {
            ObstacleShape::Superellipsoid(shape) if shape.dimension() == 2 && shape.is_ellipse() => {
                let axes = shape.axes_with_margin();
                Some(DVec2::new(axes[0], axes[1]))
            }
            ObstacleShape::Sphere(shape) if shape.dimension() == 2 => {
                let radius = shape.radius_with_margin();
                Some(DVec2::splat(radius))
            }
            _ => None,
        }
    }

    /// Integrates the axes (or radius) rates of a deforming shape over `dt`
    pub fn deform(&mut self, dt: f64) {
        match self {
            ObstacleShape::Superellipsoid(shape) => shape.deform(dt),
            ObstacleShape::Sphere(shape) => shape.deform(dt),
            ObstacleShape::Polygon(_) => {}
        }
    }

    fn geometry(&self) -> &dyn ObstacleGeometry {
        match self {
            ObstacleShape::Superellipsoid(shape) => shape,
            ObstacleShape::Sphere(shape) => shape,
            ObstacleShape::Polygon(shape) => shape,
        }
    }
}

impl ObstacleGeometry for ObstacleShape {
    fn dimension(&self) -> usize {
        self.geometry().dimension()
    }

    fn gamma(&self, position: &Vector) -> f64 {
        self.geometry().gamma(position)
    }

    fn normal(&self, position: &Vector) -> Vector {
        self.geometry().normal(position)
    }

    fn reference_direction(&self, position: &Vector, reference_point: &Vector) -> Vector {
        self.geometry().reference_direction(position, reference_point)
    }

    fn surface_intersection(&self, direction: &Vector, from_point: &Vector) -> Result<Vector> {
        self.geometry().surface_intersection(direction, from_point)
    }

    fn local_radius(&self, direction: &Vector) -> f64 {
        self.geometry().local_radius(direction)
    }

    fn local_radius_gradient(&self, direction: &Vector) -> Vector {
        self.geometry().local_radius_gradient(direction)
    }

    fn reference_length(&self) -> f64 {
        self.geometry().reference_length()
    }

    fn is_star_shaped(&self) -> bool {
        self.geometry().is_star_shaped()
    }

    fn deformation_velocity(&self, position: &Vector) -> Vector {
        self.geometry().deformation_velocity(position)
    }
}
