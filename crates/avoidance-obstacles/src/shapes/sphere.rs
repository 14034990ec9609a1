//! Sphere (circle in 2D) shape

use super::ObstacleGeometry;
use avoidance_common::{normalize_or_zero, Error, Result, Vector};

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    dimension: usize,
    radius: f64,
    margin: f64,
    radius_velocity: f64,
}

impl Sphere {
    pub fn new(dimension: usize, radius: f64, margin: f64, radius_velocity: f64) -> Self {
        Self {
            dimension,
            radius,
            margin,
            radius_velocity,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub(crate) fn deform(&mut self, dt: f64) {
        self.radius += self.radius_velocity * dt;
    }

    pub fn radius_with_margin(&self) -> f64 {
        self.radius + self.margin
    }
}

impl ObstacleGeometry for Sphere {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn gamma(&self, position: &Vector) -> f64 {
        position.norm() / self.radius_with_margin()
    }

    fn normal(&self, position: &Vector) -> Vector {
        normalize_or_zero(position)
    }

    fn surface_intersection(&self, direction: &Vector, from_point: &Vector) -> Result<Vector> {
        let direction = normalize_or_zero(direction);
        if direction.norm() == 0.0 {
            return Err(Error::Geometry("zero ray direction".to_string()));
        }

        // |f + t u|^2 = R^2 with |u| = 1
        let radius = self.radius_with_margin();
        let b = from_point.dot(&direction);
        let c = from_point.norm_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return Err(Error::Geometry(format!(
                "ray misses the sphere (discriminant {discriminant})"
            )));
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t = if -b - sqrt_discriminant >= 0.0 {
            -b - sqrt_discriminant
        } else if -b + sqrt_discriminant >= 0.0 {
            -b + sqrt_discriminant
        } else {
            return Err(Error::Geometry("sphere lies behind the ray origin".to_string()));
        };
        Ok(from_point + direction * t)
    }

    fn local_radius(&self, _direction: &Vector) -> f64 {
        self.radius_with_margin()
    }

    fn local_radius_gradient(&self, direction: &Vector) -> Vector {
        Vector::zeros(direction.len())
    }

    fn reference_length(&self) -> f64 {
        self.radius * (self.dimension as f64).sqrt() + self.margin
    }

    fn deformation_velocity(&self, position: &Vector) -> Vector {
        position * (self.radius_velocity / self.radius_with_margin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3(x: f64, y: f64, z: f64) -> Vector {
        Vector::from_vec(vec![x, y, z])
    }

    #[test]
    fn test_gamma_and_normal() {
        let sphere = Sphere::new(3, 1.0, 0.5, 0.0);
        assert!((sphere.gamma(&vec3(3.0, 0.0, 0.0)) - 2.0).abs() < 1e-12);
        assert!((sphere.normal(&vec3(0.0, 0.0, -2.0)) - vec3(0.0, 0.0, -1.0)).norm() < 1e-12);
        assert_eq!(sphere.normal(&vec3(0.0, 0.0, 0.0)).norm(), 0.0);
    }

    #[test]
    fn test_surface_intersection() {
        let sphere = Sphere::new(3, 1.0, 0.0, 0.0);
        let hit = sphere
            .surface_intersection(&vec3(-1.0, 0.0, 0.0), &vec3(4.0, 0.0, 0.0))
            .unwrap();
        assert!((hit - vec3(1.0, 0.0, 0.0)).norm() < 1e-12);

        let hit = sphere
            .surface_intersection(&vec3(0.0, 1.0, 0.0), &vec3(0.0, 0.0, 0.0))
            .unwrap();
        assert!((hit - vec3(0.0, 1.0, 0.0)).norm() < 1e-12);

        let behind = sphere.surface_intersection(&vec3(1.0, 0.0, 0.0), &vec3(4.0, 0.0, 0.0));
        assert!(matches!(behind, Err(Error::Geometry(_))));
    }

    #[test]
    fn test_reference_length() {
        let sphere = Sphere::new(2, 1.0, 0.1, 0.0);
        assert!((sphere.reference_length() - (2.0_f64.sqrt() + 0.1)).abs() < 1e-12);
    }
}
