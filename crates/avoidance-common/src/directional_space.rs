//! Direction (angle) space
//!
//! A unit direction `u` is represented relative to a null direction (first
//! column of an orthonormal `null_matrix`) by a `dim - 1` vector whose
//! direction is the tangential direction of `u` and whose magnitude is the
//! angle between `u` and the null direction. The null direction maps to the
//! zero vector, so small perturbations of the angle vector trace the unit
//! sphere around it.

use crate::{orthogonal_basis, Matrix, Vector, NORM_EPSILON};

/// Maps a direction into the angle space spanned by `null_matrix`.
pub fn angle_space(direction: &Vector, null_matrix: &Matrix) -> Vector {
    let dim = direction.len();
    let norm = direction.norm();
    if norm <= NORM_EPSILON {
        return Vector::zeros(dim - 1);
    }

    let reference_frame = null_matrix.tr_mul(&(direction / norm));
    let cos_direction = reference_frame[0].clamp(-1.0, 1.0);

    let tangential = reference_frame.rows(1, dim - 1).into_owned();
    let tangential_norm = tangential.norm();
    if tangential_norm <= NORM_EPSILON {
        return Vector::zeros(dim - 1);
    }

    tangential * (cos_direction.acos() / tangential_norm)
}

/// Maps an angle-space vector back to a unit direction.
pub fn angle_space_inverse(angle: &Vector, null_matrix: &Matrix) -> Vector {
    let dim = angle.len() + 1;
    let magnitude = angle.norm();

    let mut local = Vector::zeros(dim);
    local[0] = magnitude.cos();
    let tangential = angle * sinc(magnitude);
    local.rows_mut(1, dim - 1).copy_from(&tangential);

    null_matrix * local
}

/// Jacobian (`dim x (dim - 1)`) of [`angle_space_inverse`] with respect to the angle.
pub fn angle_space_inverse_jacobian(angle: &Vector, null_matrix: &Matrix) -> Matrix {
    let n_angles = angle.len();
    let dim = n_angles + 1;
    let magnitude = angle.norm();
    let f = sinc(magnitude);
    let g = sinc_derivative_over_t(magnitude);

    let mut local = Matrix::zeros(dim, n_angles);
    for kk in 0..n_angles {
        local[(0, kk)] = -f * angle[kk];
        for ii in 0..n_angles {
            let delta = if ii == kk { f } else { 0.0 };
            local[(ii + 1, kk)] = delta + g * angle[ii] * angle[kk];
        }
    }

    null_matrix * local
}

/// Weighted mean of unit directions evaluated in the angle space around `null_direction`.
///
/// Weights that do not sum to one pull the result toward the null direction.
pub fn directional_weighted_sum(null_direction: &Vector, directions: &[Vector], weights: &[f64]) -> Vector {
    let dim = null_direction.len();
    let null_matrix = orthogonal_basis(null_direction);

    let mut weighted_angle = Vector::zeros(dim - 1);
    for (direction, weight) in directions.iter().zip(weights) {
        if *weight == 0.0 {
            continue;
        }
        weighted_angle += angle_space(direction, &null_matrix) * *weight;
    }

    angle_space_inverse(&weighted_angle, &null_matrix)
}

/// sin(t) / t, continuous at zero
fn sinc(t: f64) -> f64 {
    if t.abs() < 1e-4 {
        1.0 - t * t / 6.0
    } else {
        t.sin() / t
    }
}

/// (d/dt sinc(t)) / t, continuous at zero
fn sinc_derivative_over_t(t: f64) -> f64 {
    if t.abs() < 1e-3 {
        -1.0 / 3.0 + t * t / 30.0
    } else {
        (t * t.cos() - t.sin()) / (t * t * t)
    }
}
