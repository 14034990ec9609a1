//! Math utilities for avoidance computations

use crate::{Error, Matrix, Result, Vector};
use std::f64::consts::{PI, TAU};

/// Components below this magnitude are treated as zero when normalizing
pub const NORM_EPSILON: f64 = 1e-12;

/// Square a value (x²)
#[inline]
pub fn sqr<T: std::ops::Mul<Output = T> + Copy>(x: T) -> T {
    x * x
}

/// Power that keeps the sign of the base: `sign(x) * |x|^p`
#[inline]
pub fn signed_pow(x: f64, p: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    x.signum() * x.abs().powf(p)
}

/// Returns the normalized vector, or the zero vector for (near) zero input
pub fn normalize_or_zero(v: &Vector) -> Vector {
    let norm = v.norm();
    if norm > NORM_EPSILON {
        v / norm
    } else {
        Vector::zeros(v.len())
    }
}

/// Unit vector along coordinate axis `axis`
pub fn unit_axis(dim: usize, axis: usize) -> Vector {
    let mut e = Vector::zeros(dim);
    if axis < dim {
        e[axis] = 1.0;
    }
    e
}

/// Wraps an angle into [-pi, pi)
#[inline]
pub fn angle_modulo(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Signed difference `angle1 - angle0` wrapped into [-pi, pi)
#[inline]
pub fn angle_difference_directional(angle1: f64, angle0: f64) -> f64 {
    angle_modulo(angle1 - angle0)
}

/// Difference `angle1 - angle0` wrapped into [0, 2 pi)
#[inline]
pub fn angle_difference_directional_2pi(angle1: f64, angle0: f64) -> f64 {
    (angle1 - angle0).rem_euclid(TAU)
}

/// Orthonormal basis whose first column is `direction` (normalized).
///
/// In 2D the second column is the counter-clockwise perpendicular. In higher
/// dimensions the basis is completed by Gram-Schmidt over the coordinate axes,
/// starting with the axis least aligned with `direction`. A zero direction
/// yields the identity.
pub fn orthogonal_basis(direction: &Vector) -> Matrix {
    let dim = direction.len();
    let norm = direction.norm();
    if norm <= NORM_EPSILON {
        return Matrix::identity(dim, dim);
    }
    let first = direction / norm;

    if dim == 2 {
        return Matrix::from_column_slice(2, 2, &[first[0], first[1], -first[1], first[0]]);
    }

    let mut axes: Vec<usize> = (0..dim).collect();
    axes.sort_by(|&a, &b| first[a].abs().total_cmp(&first[b].abs()));

    let mut columns = vec![first];
    for axis in axes {
        if columns.len() == dim {
            break;
        }
        let mut candidate = unit_axis(dim, axis);
        for column in &columns {
            let projection = column.dot(&candidate);
            candidate -= column * projection;
        }
        let candidate_norm = candidate.norm();
        if candidate_norm > 1e-6 {
            columns.push(candidate / candidate_norm);
        }
    }

    Matrix::from_columns(&columns)
}

/// Rotation matrix for an orientation.
///
/// 2D: one angle (counter-clockwise). 3D: three Euler angles, composed as
/// `Rx * Ry * Rz`. An empty orientation is the identity.
pub fn rotation_matrix(dim: usize, orientation: &[f64]) -> Result<Matrix> {
    if orientation.is_empty() || orientation.iter().all(|a| *a == 0.0) {
        return Ok(Matrix::identity(dim, dim));
    }

    match (dim, orientation.len()) {
        (2, 1) => {
            let (s, c) = orientation[0].sin_cos();
            Ok(Matrix::from_row_slice(2, 2, &[c, -s, s, c]))
        }
        (3, 3) => {
            let (sx, cx) = orientation[0].sin_cos();
            let (sy, cy) = orientation[1].sin_cos();
            let (sz, cz) = orientation[2].sin_cos();
            // Counter-clockwise about each axis, as in 2D
            let rx = Matrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx]);
            let ry = Matrix::from_row_slice(3, 3, &[cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy]);
            let rz = Matrix::from_row_slice(3, 3, &[cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0]);
            Ok(rx * ry * rz)
        }
        (2, found) | (3, found) => Err(Error::DimensionMismatch {
            expected: if dim == 2 { 1 } else { 3 },
            found,
        }),
        _ => Err(Error::Configuration(format!(
            "rotation is only defined in 2D and 3D (dimension {dim})"
        ))),
    }
}

/// Velocity of a point rigidly attached to a body rotating with `angular_velocity`.
///
/// 2D takes a scalar rate, 3D the angular velocity vector. Other dimensions
/// have no rotational term and return zero.
pub fn angular_velocity_term(angular_velocity: &[f64], relative_position: &Vector) -> Vector {
    let dim = relative_position.len();
    match (dim, angular_velocity.len()) {
        (2, 1) => {
            let w = angular_velocity[0];
            Vector::from_vec(vec![-w * relative_position[1], w * relative_position[0]])
        }
        (3, 3) => {
            let w = nalgebra::Vector3::new(angular_velocity[0], angular_velocity[1], angular_velocity[2]);
            let r = nalgebra::Vector3::new(relative_position[0], relative_position[1], relative_position[2]);
            let v = w.cross(&r);
            Vector::from_vec(vec![v.x, v.y, v.z])
        }
        _ => Vector::zeros(dim),
    }
}

/// Gradient of a scalar field by central finite differences.
pub fn central_difference_gradient<F>(position: &Vector, step: f64, mut field: F) -> Vector
where
    F: FnMut(&Vector) -> f64,
{
    let dim = position.len();
    let mut gradient = Vector::zeros(dim);
    for dd in 0..dim {
        let mut high = position.clone();
        let mut low = position.clone();
        high[dd] += step;
        low[dd] -= step;
        gradient[dd] = (field(&high) - field(&low)) / (2.0 * step);
    }
    gradient
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_wrapping() {
        assert!((angle_modulo(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((angle_difference_directional(0.1, -0.1) - 0.2).abs() < 1e-12);
        assert!((angle_difference_directional(-3.0, 3.0) - (TAU - 6.0)).abs() < 1e-12);
        assert!((angle_difference_directional_2pi(-0.5, 0.0) - (TAU - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_orthogonal_basis_2d() {
        let basis = orthogonal_basis(&Vector::from_vec(vec![0.0, 2.0]));
        assert!((basis[(0, 0)] - 0.0).abs() < 1e-12);
        assert!((basis[(1, 0)] - 1.0).abs() < 1e-12);
        assert!((basis[(0, 1)] + 1.0).abs() < 1e-12);
        assert!((basis[(1, 1)] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_orthogonal_basis_3d_is_orthonormal() {
        let direction = Vector::from_vec(vec![1.0, 2.0, -0.5]);
        let basis = orthogonal_basis(&direction);
        let gram = basis.transpose() * &basis;
        let identity = Matrix::identity(3, 3);
        assert!((gram - identity).norm() < 1e-10);

        let first = basis.column(0).into_owned();
        assert!((first - direction.normalize()).norm() < 1e-12);
    }

    #[test]
    fn test_rotation_matrix() {
        let rot = rotation_matrix(2, &[PI / 2.0]).unwrap();
        let v = &rot * Vector::from_vec(vec![1.0, 0.0]);
        assert!((v[0]).abs() < 1e-12);
        assert!((v[1] - 1.0).abs() < 1e-12);

        let rot3 = rotation_matrix(3, &[0.3, -0.2, 1.1]).unwrap();
        let gram = rot3.transpose() * &rot3;
        assert!((gram - Matrix::identity(3, 3)).norm() < 1e-10);

        assert!(rotation_matrix(2, &[0.1, 0.2]).is_err());
    }

    #[test]
    fn test_rotation_direction_matches_in_2d_and_3d() {
        let angle = 0.4;
        let planar = rotation_matrix(2, &[angle]).unwrap() * Vector::from_vec(vec![1.0, 0.0]);
        let about_z = rotation_matrix(3, &[0.0, 0.0, angle]).unwrap() * Vector::from_vec(vec![1.0, 0.0, 0.0]);
        assert!((about_z[0] - planar[0]).abs() < 1e-12);
        assert!((about_z[1] - planar[1]).abs() < 1e-12);
        assert!(about_z[2].abs() < 1e-12);

        // y -> z about x, z -> x about y
        let about_x = rotation_matrix(3, &[PI / 2.0, 0.0, 0.0]).unwrap() * Vector::from_vec(vec![0.0, 1.0, 0.0]);
        assert!((about_x - Vector::from_vec(vec![0.0, 0.0, 1.0])).norm() < 1e-12);
        let about_y = rotation_matrix(3, &[0.0, PI / 2.0, 0.0]).unwrap() * Vector::from_vec(vec![0.0, 0.0, 1.0]);
        assert!((about_y - Vector::from_vec(vec![1.0, 0.0, 0.0])).norm() < 1e-12);

        // Same sense as the angular velocity term
        let rate = angular_velocity_term(&[0.0, 0.0, 1.0], &Vector::from_vec(vec![1.0, 0.0, 0.0]));
        assert!(rate[1] > 0.0 && about_z[1] > 0.0);
    }

    #[test]
    fn test_angular_velocity_term() {
        let v = angular_velocity_term(&[2.0], &Vector::from_vec(vec![1.0, 0.0]));
        assert!((v[0]).abs() < 1e-12);
        assert!((v[1] - 2.0).abs() < 1e-12);

        let v3 = angular_velocity_term(&[0.0, 0.0, 1.0], &Vector::from_vec(vec![1.0, 0.0, 0.0]));
        assert!((v3 - Vector::from_vec(vec![0.0, 1.0, 0.0])).norm() < 1e-12);
    }

    #[test]
    fn test_central_difference_gradient() {
        let x = Vector::from_vec(vec![1.0, -2.0]);
        let gradient = central_difference_gradient(&x, 1e-6, |p| p[0] * p[0] + 3.0 * p[1]);
        assert!((gradient[0] - 2.0).abs() < 1e-6);
        assert!((gradient[1] - 3.0).abs() < 1e-6);
    }
}
