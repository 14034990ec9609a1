//! Obstacle pose, motion and frame handling
//!
//! An [`Obstacle`] wraps an [`ObstacleShape`] with its global pose, its
//! velocities and a movable reference point. All geometry queries take global
//! coordinates and are answered by the shape in the local frame.

use avoidance_common::planar::{to_dvec2, EllipseTangents};
use avoidance_common::{
    angle_space_inverse, angle_space_inverse_jacobian, normalize_or_zero, rotation_matrix, Error, Matrix, Result,
    Vector,
};
use glam::DVec2;
use log::debug;

use crate::config::ObstacleConfig;
use crate::hull::{ReferenceHull, RELATIVE_HULL_MARGIN};
use crate::shapes::{ObstacleGeometry, ObstacleShape};

/// Fraction of the local radius a reference point is pulled back to when it
/// falls outside a shape without hull support
const REFERENCE_CLAMP_RATIO: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    shape: ObstacleShape,
    center_position: Vector,
    orientation: Vec<f64>,
    rotation: Matrix,
    is_boundary: bool,
    is_deforming: bool,
    linear_velocity: Vector,
    angular_velocity: Vec<f64>,
    margin: f64,
    sigma: f64,
    repulsion_coeff: f64,
    /// Reference point in the local frame
    reference_point: Vector,
    hull: Option<ReferenceHull>,
    has_moved: bool,
    cluster: Option<usize>,
}

impl Obstacle {
    /// Creates a static, solid obstacle with default parameters
    pub fn new(shape: ObstacleShape, center_position: Vector) -> Result<Self> {
        let dim = shape.dimension();
        if center_position.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: center_position.len(),
            });
        }
        let orientation_len = if dim == 2 { 1 } else { 3 };

        Ok(Self {
            shape,
            rotation: Matrix::identity(dim, dim),
            orientation: vec![0.0; orientation_len],
            is_boundary: false,
            is_deforming: false,
            linear_velocity: Vector::zeros(dim),
            angular_velocity: vec![0.0; orientation_len],
            margin: 0.0,
            sigma: 1.0,
            repulsion_coeff: 1.0,
            reference_point: Vector::zeros(dim),
            hull: None,
            has_moved: true,
            cluster: None,
            center_position,
        })
    }

    /// Creates an obstacle from a validated configuration
    pub fn from_config(config: &ObstacleConfig) -> Result<Self> {
        config.validate()?;

        let dim = config.dimension();
        let orientation_len = if dim == 2 { 1 } else { 3 };
        let or_zeros = |values: &[f64], len: usize| {
            if values.is_empty() {
                vec![0.0; len]
            } else {
                values.to_vec()
            }
        };

        let orientation = or_zeros(&config.orientation, orientation_len);
        let signed_margin = if config.is_boundary { -config.margin } else { config.margin };
        let shape = ObstacleShape::from_config(&config.shape, dim, signed_margin, &config.axes_velocity);

        Ok(Self {
            shape,
            center_position: Vector::from_vec(config.center_position.clone()),
            rotation: rotation_matrix(dim, &orientation)?,
            orientation,
            is_boundary: config.is_boundary,
            is_deforming: config.is_deforming,
            linear_velocity: Vector::from_vec(or_zeros(&config.linear_velocity, dim)),
            angular_velocity: or_zeros(&config.angular_velocity, orientation_len),
            margin: config.margin,
            sigma: config.sigma,
            repulsion_coeff: config.repulsion_coeff,
            reference_point: Vector::zeros(dim),
            hull: None,
            has_moved: true,
            cluster: None,
        })
    }

    // Accessors

    pub fn dimension(&self) -> usize {
        self.center_position.len()
    }

    pub fn shape(&self) -> &ObstacleShape {
        &self.shape
    }

    pub fn center_position(&self) -> &Vector {
        &self.center_position
    }

    pub fn orientation(&self) -> &[f64] {
        &self.orientation
    }

    pub fn rotation(&self) -> &Matrix {
        &self.rotation
    }

    pub fn is_boundary(&self) -> bool {
        self.is_boundary
    }

    pub fn is_deforming(&self) -> bool {
        self.is_deforming
    }

    pub fn linear_velocity(&self) -> &Vector {
        &self.linear_velocity
    }

    pub fn angular_velocity(&self) -> &[f64] {
        &self.angular_velocity
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn repulsion_coeff(&self) -> f64 {
        self.repulsion_coeff
    }

    pub fn hull(&self) -> Option<&ReferenceHull> {
        self.hull.as_ref()
    }

    pub fn is_star_shaped(&self) -> bool {
        self.shape.is_star_shaped()
    }

    pub fn reference_length(&self) -> f64 {
        self.shape.reference_length()
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// Clears the moved flag once pairwise caches are up to date
    pub fn mark_resolved(&mut self) {
        self.has_moved = false;
    }

    pub fn cluster(&self) -> Option<usize> {
        self.cluster
    }

    pub fn set_cluster(&mut self, cluster: Option<usize>) {
        self.cluster = cluster;
    }

    // Frames

    pub fn to_local(&self, position: &Vector) -> Vector {
        self.rotation.tr_mul(&(position - &self.center_position))
    }

    pub fn to_global(&self, position: &Vector) -> Vector {
        &self.rotation * position + &self.center_position
    }

    pub fn direction_to_local(&self, direction: &Vector) -> Vector {
        self.rotation.tr_mul(direction)
    }

    pub fn direction_to_global(&self, direction: &Vector) -> Vector {
        &self.rotation * direction
    }

    // Geometry

    /// Gamma of a global position
    pub fn gamma(&self, position: &Vector) -> f64 {
        self.gamma_local(&self.to_local(position))
    }

    /// Gamma of a local position; boundaries are inverted so their interior is free space
    pub fn gamma_local(&self, position: &Vector) -> f64 {
        let gamma = self
            .hull
            .as_ref()
            .and_then(|hull| hull.gamma(to_dvec2(position)))
            .unwrap_or_else(|| self.shape.gamma(position));

        if !self.is_boundary {
            gamma
        } else if gamma == 0.0 {
            f64::INFINITY
        } else {
            1.0 / gamma
        }
    }

    /// Unit normal at a global position, pointing into free space
    pub fn normal(&self, position: &Vector) -> Vector {
        let local = self.to_local(position);
        let normal = match self.hull.as_ref().and_then(|hull| hull.normal(to_dvec2(&local))) {
            Some(normal) => Vector::from_vec(vec![normal.x, normal.y]),
            None => self.shape.normal(&local),
        };

        let normal = self.direction_to_global(&normal);
        if self.is_boundary {
            -normal
        } else {
            normal
        }
    }

    /// Unit direction from the reference point toward a global position, pointing into free space
    pub fn reference_direction(&self, position: &Vector) -> Vector {
        let local = self.to_local(position);
        let direction = self.shape.reference_direction(&local, &self.reference_point);
        let direction = self.direction_to_global(&direction);
        if self.is_boundary {
            -direction
        } else {
            direction
        }
    }

    /// Closest forward intersection of a global ray with the surface
    pub fn surface_intersection(&self, direction: &Vector, from_point: &Vector) -> Result<Vector> {
        let local = self
            .shape
            .surface_intersection(&self.direction_to_local(direction), &self.to_local(from_point))?;
        Ok(self.to_global(&local))
    }

    /// Surface point seen from the center along a global direction
    pub fn local_radius_point(&self, direction: &Vector) -> Vector {
        let local_direction = normalize_or_zero(&self.direction_to_local(direction));
        let radius = self.shape.local_radius(&local_direction);
        self.to_global(&(local_direction * radius))
    }

    /// Surface point parametrized by an angle-space coordinate around `null_matrix`
    pub fn surface_point_angle(&self, angle: &Vector, null_matrix: &Matrix) -> Vector {
        self.local_radius_point(&angle_space_inverse(angle, null_matrix))
    }

    /// Jacobian of [`Obstacle::surface_point_angle`] with respect to the angle (global frame)
    pub fn surface_derivative_angle(&self, angle: &Vector, null_matrix: &Matrix) -> Matrix {
        let direction = angle_space_inverse(angle, null_matrix);
        let jacobian = angle_space_inverse_jacobian(angle, null_matrix);

        let local_direction = normalize_or_zero(&self.direction_to_local(&direction));
        let local_jacobian = self.rotation.tr_mul(&jacobian);

        let radius = self.shape.local_radius(&local_direction);
        let radius_gradient = self.shape.local_radius_gradient(&local_direction);

        // d(r(u) u) = r du + u (grad r . du)
        let local_derivative = &local_jacobian * radius + &local_direction * (radius_gradient.transpose() * &local_jacobian);
        &self.rotation * local_derivative
    }

    /// Double tangents from a global point to a planar ellipse, in the global frame
    pub fn tangent_lines(&self, external_point: &Vector) -> Result<EllipseTangents> {
        let axes = self
            .shape
            .planar_ellipse_axes()
            .ok_or_else(|| Error::Geometry("tangent lines are only defined for planar ellipses".to_string()))?;

        let local = avoidance_common::planar::tangents_to_ellipse(to_dvec2(&self.to_local(external_point)), axes)?;
        let rotate = |v: DVec2| to_dvec2(&self.direction_to_global(&Vector::from_vec(vec![v.x, v.y])));
        let center = to_dvec2(&self.center_position);

        Ok(EllipseTangents {
            directions: local.directions.map(rotate),
            points: local.points.map(|p| rotate(p) + center),
        })
    }

    pub fn deformation_velocity(&self, position: &Vector) -> Vector {
        if !self.is_deforming {
            return Vector::zeros(position.len());
        }
        self.direction_to_global(&self.shape.deformation_velocity(&self.to_local(position)))
    }

    // Reference point

    /// Reference point in the local frame
    pub fn reference_point(&self) -> &Vector {
        &self.reference_point
    }

    pub fn reference_point_global(&self) -> Vector {
        self.to_global(&self.reference_point)
    }

    /// Whether the reference point lies inside the (unextended) shape
    pub fn reference_point_is_inside(&self) -> bool {
        self.hull.is_none()
    }

    /// Moves the reference point (local frame).
    ///
    /// A point outside a planar ellipse extends the hull around it; for any
    /// other shape it is pulled back inside along its ray.
    pub fn set_reference_point(&mut self, reference_point: Vector) -> Result<()> {
        self.hull = None;
        self.reference_point = reference_point;

        if self.is_boundary || self.shape.gamma(&self.reference_point) < 1.0 {
            return Ok(());
        }

        if let Some(axes) = self.shape.planar_ellipse_axes() {
            self.hull = ReferenceHull::around(to_dvec2(&self.reference_point), axes, RELATIVE_HULL_MARGIN)?;
            if self.hull.is_some() {
                debug!("extended hull around reference point {:?}", self.reference_point.as_slice());
            }
            return Ok(());
        }

        let direction = normalize_or_zero(&self.reference_point);
        let radius = self.shape.local_radius(&direction);
        debug!(
            "reference point {:?} outside non-extensible shape, clamping to {} of the local radius",
            self.reference_point.as_slice(),
            REFERENCE_CLAMP_RATIO
        );
        self.reference_point = direction * (REFERENCE_CLAMP_RATIO * radius);
        Ok(())
    }

    pub fn set_reference_point_global(&mut self, reference_point: &Vector) -> Result<()> {
        let local = self.to_local(reference_point);
        self.set_reference_point(local)
    }

    // Motion

    pub fn set_center_position(&mut self, center_position: Vector) -> Result<()> {
        avoidance_common::ensure_dimension(&center_position, self.dimension())?;
        self.center_position = center_position;
        self.has_moved = true;
        Ok(())
    }

    pub fn set_orientation(&mut self, orientation: Vec<f64>) -> Result<()> {
        self.rotation = rotation_matrix(self.dimension(), &orientation)?;
        self.orientation = orientation;
        self.has_moved = true;
        Ok(())
    }

    pub fn set_linear_velocity(&mut self, linear_velocity: Vector) -> Result<()> {
        avoidance_common::ensure_dimension(&linear_velocity, self.dimension())?;
        self.linear_velocity = linear_velocity;
        Ok(())
    }

    /// Integrates pose (and axes of deforming obstacles) over `dt`
    pub fn move_by_velocity(&mut self, dt: f64) -> Result<()> {
        let is_static = self.linear_velocity.iter().all(|v| *v == 0.0)
            && self.angular_velocity.iter().all(|w| *w == 0.0)
            && !self.is_deforming;
        if is_static {
            return Ok(());
        }

        self.center_position += &self.linear_velocity * dt;
        if self.angular_velocity.iter().any(|w| *w != 0.0) {
            let orientation: Vec<f64> = self
                .orientation
                .iter()
                .zip(&self.angular_velocity)
                .map(|(angle, rate)| angle + rate * dt)
                .collect();
            self.rotation = rotation_matrix(self.dimension(), &orientation)?;
            self.orientation = orientation;
        }
        if self.is_deforming {
            self.shape.deform(dt);
        }

        self.has_moved = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn vec2(x: f64, y: f64) -> Vector {
        Vector::from_vec(vec![x, y])
    }

    fn ellipse_at(x: f64, y: f64) -> Obstacle {
        Obstacle::from_config(&ObstacleConfig::ellipse(vec![x, y], vec![2.0, 1.0])).unwrap()
    }

    #[test]
    fn test_gamma_in_global_frame() {
        let obstacle = ellipse_at(1.0, 1.0);
        assert!((obstacle.gamma(&vec2(5.0, 1.0)) - 2.0).abs() < 1e-12);
        assert!((obstacle.gamma(&vec2(3.0, 1.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotated_obstacle() {
        let obstacle =
            Obstacle::from_config(&ObstacleConfig::ellipse(vec![0.0, 0.0], vec![2.0, 1.0]).with_orientation(vec![FRAC_PI_2]))
                .unwrap();

        // Long axis now along y
        assert!((obstacle.gamma(&vec2(0.0, 2.0)) - 1.0).abs() < 1e-12);
        assert!((obstacle.gamma(&vec2(1.0, 0.0)) - 1.0).abs() < 1e-12);

        let normal = obstacle.normal(&vec2(0.0, 3.0));
        assert!((normal - vec2(0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_boundary_inverts_gamma_and_directions() {
        let obstacle = Obstacle::from_config(
            &ObstacleConfig::ellipse(vec![0.0, 0.0], vec![4.0, 4.0])
                .with_boundary(true)
                .with_margin(1.0),
        )
        .unwrap();

        // Margin deflates the boundary
        assert!((obstacle.gamma(&vec2(3.0, 0.0)) - 1.0).abs() < 1e-12);
        assert!((obstacle.gamma(&vec2(1.5, 0.0)) - 2.0).abs() < 1e-12);
        assert!(obstacle.gamma(&vec2(0.0, 0.0)).is_infinite());

        let normal = obstacle.normal(&vec2(2.0, 0.0));
        assert!((normal - vec2(-1.0, 0.0)).norm() < 1e-12);
        let reference = obstacle.reference_direction(&vec2(2.0, 0.0));
        assert!((reference - vec2(-1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_surface_intersection_global() {
        let obstacle = ellipse_at(1.0, 0.0);
        let hit = obstacle.surface_intersection(&vec2(-1.0, 0.0), &vec2(6.0, 0.0)).unwrap();
        assert!((hit - vec2(3.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_tangent_lines_require_outer_point() {
        let obstacle = ellipse_at(0.0, 0.0);
        assert!(matches!(obstacle.tangent_lines(&vec2(1.0, 0.0)), Err(Error::Geometry(_))));

        let tangents = obstacle.tangent_lines(&vec2(4.0, 0.0)).unwrap();
        for point in tangents.points {
            assert!((obstacle.gamma(&Vector::from_vec(vec![point.x, point.y])) - 1.0).abs() < 1e-9);
        }
        assert!(tangents.points[0].y < 0.0 && tangents.points[1].y > 0.0);
    }

    #[test]
    fn test_reference_point_outside_extends_hull() {
        let mut obstacle = Obstacle::from_config(&ObstacleConfig::sphere(vec![0.0, 0.0], 1.0)).unwrap();
        obstacle.set_reference_point(vec2(1.5, 0.0)).unwrap();

        assert!(!obstacle.reference_point_is_inside());
        assert!(obstacle.gamma(&vec2(1.5, 0.0)) < 1.0);
        assert!((obstacle.reference_direction(&vec2(3.0, 0.0)) - vec2(1.0, 0.0)).norm() < 1e-12);

        obstacle.set_reference_point(vec2(0.5, 0.0)).unwrap();
        assert!(obstacle.reference_point_is_inside());
    }

    #[test]
    fn test_reference_point_clamped_for_3d() {
        let mut obstacle = Obstacle::from_config(&ObstacleConfig::sphere(vec![0.0, 0.0, 0.0], 1.0)).unwrap();
        obstacle
            .set_reference_point(Vector::from_vec(vec![2.0, 0.0, 0.0]))
            .unwrap();
        assert!((obstacle.reference_point() - Vector::from_vec(vec![0.9, 0.0, 0.0])).norm() < 1e-12);
    }

    #[test]
    fn test_move_by_velocity_sets_moved() {
        let mut obstacle = Obstacle::from_config(
            &ObstacleConfig::ellipse(vec![0.0, 0.0], vec![1.0, 1.0]).with_linear_velocity(vec![1.0, 0.0]),
        )
        .unwrap();
        obstacle.mark_resolved();
        assert!(!obstacle.has_moved());

        obstacle.move_by_velocity(0.5).unwrap();
        assert!(obstacle.has_moved());
        assert!((obstacle.center_position() - vec2(0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_surface_derivative_matches_finite_difference() {
        let obstacle = Obstacle::from_config(
            &ObstacleConfig::ellipse(vec![1.0, 0.5], vec![2.0, 1.0]).with_orientation(vec![0.3]),
        )
        .unwrap();
        let null_matrix = avoidance_common::orthogonal_basis(&vec2(1.0, 0.0));
        let angle = Vector::from_vec(vec![0.4]);
        let step = 1e-6;

        let analytic = obstacle.surface_derivative_angle(&angle, &null_matrix);
        let high = obstacle.surface_point_angle(&Vector::from_vec(vec![0.4 + step]), &null_matrix);
        let low = obstacle.surface_point_angle(&Vector::from_vec(vec![0.4 - step]), &null_matrix);
        let numeric = (high - low) / (2.0 * step);

        assert!((analytic.column(0) - numeric).norm() < 1e-5);
    }
}
