//! Superellipsoid shape
//!
//! `gamma(x) = sqrt( sum_d |x_d / a_d|^(2 p_d) )` with `a` the margin-inflated
//! axes and `p` the curvature exponents. Curvature 1 on every axis is the
//! ellipsoid, for which radius and ray queries have closed forms.

use super::ObstacleGeometry;
use avoidance_common::{central_difference_gradient, normalize_or_zero, signed_pow, sqr, Error, Result, Vector};

const BISECTION_STEPS: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct Superellipsoid {
    axes_length: Vector,
    curvature: Vector,
    margin: f64,
    axes_velocity: Vector,
}

impl Superellipsoid {
    /// `margin` is the signed surface offset (negative for boundaries)
    pub fn new(axes_length: Vector, curvature: Vector, margin: f64, axes_velocity: Vector) -> Self {
        Self {
            axes_length,
            curvature,
            margin,
            axes_velocity,
        }
    }

    pub fn axes_length(&self) -> &Vector {
        &self.axes_length
    }

    pub fn curvature(&self) -> &Vector {
        &self.curvature
    }

    pub fn axes_with_margin(&self) -> Vector {
        self.axes_length.add_scalar(self.margin)
    }

    pub(crate) fn deform(&mut self, dt: f64) {
        self.axes_length += &self.axes_velocity * dt;
    }

    /// Curvature 1 on every axis
    pub fn is_ellipse(&self) -> bool {
        self.curvature.iter().all(|p| *p == 1.0)
    }

    fn uniform_curvature(&self) -> Option<f64> {
        let first = self.curvature[0];
        self.curvature.iter().all(|p| *p == first).then_some(first)
    }

    fn gamma_with_axes(&self, position: &Vector, axes: &Vector) -> f64 {
        position
            .iter()
            .zip(axes.iter())
            .zip(self.curvature.iter())
            .map(|((x, a), p)| (x / a).abs().powf(2.0 * p))
            .sum::<f64>()
            .sqrt()
    }

    /// Largest ray parameter the surface can be reached at from `from_point`
    fn search_extent(&self, from_point: &Vector) -> f64 {
        from_point.norm() + self.axes_with_margin().norm()
    }

    fn bisect_crossing(&self, direction: &Vector, from_point: &Vector, mut inside: f64, mut outside: f64) -> f64 {
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (inside + outside);
            if self.gamma(&(from_point + direction * mid)) < 1.0 {
                inside = mid;
            } else {
                outside = mid;
            }
        }
        0.5 * (inside + outside)
    }

    fn ellipse_intersection(&self, direction: &Vector, from_point: &Vector) -> Result<f64> {
        let axes = self.axes_with_margin();
        let mut a = 0.0;
        let mut b = 0.0;
        let mut c = -1.0;
        for dd in 0..direction.len() {
            let inv_axis_sqr = 1.0 / sqr(axes[dd]);
            a += sqr(direction[dd]) * inv_axis_sqr;
            b += 2.0 * from_point[dd] * direction[dd] * inv_axis_sqr;
            c += sqr(from_point[dd]) * inv_axis_sqr;
        }

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return Err(Error::Geometry(format!(
                "ray misses the ellipsoid (discriminant {discriminant})"
            )));
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t_near = (-b - sqrt_discriminant) / (2.0 * a);
        let t_far = (-b + sqrt_discriminant) / (2.0 * a);
        if t_near >= 0.0 {
            Ok(t_near)
        } else if t_far >= 0.0 {
            Ok(t_far)
        } else {
            Err(Error::Geometry("ellipsoid lies behind the ray origin".to_string()))
        }
    }

    fn general_intersection(&self, direction: &Vector, from_point: &Vector) -> Result<f64> {
        let gamma_start = self.gamma(from_point);
        if (gamma_start - 1.0).abs() < 1e-12 {
            return Ok(0.0);
        }

        if gamma_start < 1.0 {
            let mut outside = self.axes_with_margin().max().max(1e-9);
            while self.gamma(&(from_point + direction * outside)) < 1.0 {
                outside *= 2.0;
            }
            return Ok(self.bisect_crossing(direction, from_point, 0.0, outside));
        }

        // March toward the shape and refine on the first sample found inside
        let extent = self.search_extent(from_point);
        let step = self.axes_with_margin().min() / 16.0;
        let mut previous = 0.0;
        let mut t = step;
        while t <= extent {
            if self.gamma(&(from_point + direction * t)) < 1.0 {
                return Ok(self.bisect_crossing(direction, from_point, t, previous));
            }
            previous = t;
            t += step;
        }

        Err(Error::Geometry("ray misses the superellipsoid".to_string()))
    }
}

impl ObstacleGeometry for Superellipsoid {
    fn dimension(&self) -> usize {
        self.axes_length.len()
    }

    fn gamma(&self, position: &Vector) -> f64 {
        self.gamma_with_axes(position, &self.axes_with_margin())
    }

    fn normal(&self, position: &Vector) -> Vector {
        let axes = self.axes_with_margin();
        let gradient = Vector::from_iterator(
            position.len(),
            (0..position.len()).map(|dd| {
                let p = self.curvature[dd];
                2.0 * p / axes[dd] * signed_pow(position[dd] / axes[dd], 2.0 * p - 1.0)
            }),
        );
        normalize_or_zero(&gradient)
    }

    fn surface_intersection(&self, direction: &Vector, from_point: &Vector) -> Result<Vector> {
        let direction = normalize_or_zero(direction);
        if direction.norm() == 0.0 {
            return Err(Error::Geometry("zero ray direction".to_string()));
        }

        let t = if self.is_ellipse() {
            self.ellipse_intersection(&direction, from_point)?
        } else {
            self.general_intersection(&direction, from_point)?
        };
        Ok(from_point + direction * t)
    }

    fn local_radius(&self, direction: &Vector) -> f64 {
        let unit = normalize_or_zero(direction);
        let gamma_unit = self.gamma(&unit);
        if gamma_unit == 0.0 {
            return 0.0;
        }

        match self.uniform_curvature() {
            // gamma(s * u) = s^p * gamma(u)
            Some(p) => gamma_unit.powf(-1.0 / p),
            None => {
                let origin = Vector::zeros(unit.len());
                let mut outside = self.axes_with_margin().max();
                while self.gamma(&(&unit * outside)) < 1.0 {
                    outside *= 2.0;
                }
                self.bisect_crossing(&unit, &origin, 0.0, outside)
            }
        }
    }

    fn local_radius_gradient(&self, direction: &Vector) -> Vector {
        let unit = normalize_or_zero(direction);
        let axes = self.axes_with_margin();

        let Some(p) = self.uniform_curvature() else {
            return central_difference_gradient(&unit, 1e-6, |d| self.local_radius(d));
        };

        let gamma_unit = self.gamma(&unit);
        if gamma_unit == 0.0 {
            return Vector::zeros(unit.len());
        }

        if p == 1.0 {
            let radius = 1.0 / gamma_unit;
            return Vector::from_iterator(
                unit.len(),
                (0..unit.len()).map(|dd| -radius.powi(3) * unit[dd] / sqr(axes[dd])),
            );
        }

        // r = G^(-1/p), dG = dS / (2 G), dS_d = 2p / a_d * (u_d / a_d)^(2p - 1)
        let factor = -(1.0 / p) * gamma_unit.powf(-1.0 / p - 1.0) / (2.0 * gamma_unit);
        Vector::from_iterator(
            unit.len(),
            (0..unit.len()).map(|dd| factor * 2.0 * p / axes[dd] * signed_pow(unit[dd] / axes[dd], 2.0 * p - 1.0)),
        )
    }

    fn reference_length(&self) -> f64 {
        self.axes_length.norm() + self.margin
    }

    fn deformation_velocity(&self, position: &Vector) -> Vector {
        let axes = self.axes_with_margin();
        position.component_mul(&self.axes_velocity).component_div(&axes)
    }
}
