//! Closest-point searches between two obstacles
//!
//! Separated obstacles are handled in the angle space of each obstacle: the
//! two surface points are parametrized by a direction around a fixed null
//! direction and moved along the analytic derivative of their distance.
//! Touching or overlapping obstacles are handled in position space by
//! descending a cost on both gamma values, which settles on a point lying
//! well inside both.

use std::f64::consts::PI;

use avoidance_common::{central_difference_gradient, Matrix, Vector};
use avoidance_obstacles::Obstacle;
use log::{debug, warn};

use crate::config::ResolverParams;

/// Result of the angle-space descent
#[derive(Debug, Clone, PartialEq)]
pub enum AngleDescent {
    /// Closest surface points and their distance
    Separated {
        distance: f64,
        points: [Vector; 2],
        iterations: usize,
        converged: bool,
    },
    /// The surface points met; continue with [`gamma_descent`]
    Contact { points: [Vector; 2], iterations: usize },
}

/// Result of the gamma-space descent
#[derive(Debug, Clone, PartialEq)]
pub struct GammaDescent {
    pub point: Vector,
    pub iterations: usize,
    pub converged: bool,
    /// Length of the last step
    pub residual: f64,
}

fn reset_if_wrapped(angle: &mut Vector) {
    if angle.norm() > PI {
        angle.fill(0.0);
    }
}

/// Minimizes the distance between the surfaces of two obstacles.
///
/// `angles[k]` is the starting direction of obstacle `k` in the angle space
/// around the first column of `null_matrices[k]`.
pub fn angle_descent(
    obstacles: [&Obstacle; 2],
    null_matrices: [&Matrix; 2],
    mut angles: [Vector; 2],
    params: &ResolverParams,
) -> AngleDescent {
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        let mut points = [Vector::zeros(0), Vector::zeros(0)];
        let mut derivatives = [Matrix::zeros(0, 0), Matrix::zeros(0, 0)];
        for kk in 0..2 {
            reset_if_wrapped(&mut angles[kk]);
            points[kk] = obstacles[kk].surface_point_angle(&angles[kk], null_matrices[kk]);
            derivatives[kk] = obstacles[kk].surface_derivative_angle(&angles[kk], null_matrices[kk]);
        }

        let difference = &points[1] - &points[0];
        let distance = difference.norm();
        if distance < params.contact_tolerance {
            debug!("surface points in contact after {iterations} iterations");
            let [first, second] = points;
            return AngleDescent::Contact {
                points: [first, second],
                iterations,
            };
        }

        // d|s1 - s0| / d(angle_0) = -(d . J0) / |d|, d / d(angle_1) = (d . J1) / |d|
        let scale = 0.5 / distance;
        let step_first = derivatives[0].tr_mul(&difference) * (-scale * params.angle_step_size);
        let step_second = derivatives[1].tr_mul(&difference) * (scale * params.angle_step_size);

        angles[0] -= &step_first;
        angles[1] -= &step_second;
        iterations += 1;

        let step_norm = (step_first.norm_squared() + step_second.norm_squared()).sqrt();
        if step_norm < params.convergence_tolerance {
            converged = true;
            break;
        }
    }

    let mut points = [Vector::zeros(0), Vector::zeros(0)];
    for kk in 0..2 {
        reset_if_wrapped(&mut angles[kk]);
        points[kk] = obstacles[kk].surface_point_angle(&angles[kk], null_matrices[kk]);
    }
    let distance = (&points[1] - &points[0]).norm();
    if distance < params.contact_tolerance {
        return AngleDescent::Contact { points, iterations };
    }

    debug!("angle descent finished after {iterations} iterations, distance {distance}");
    AngleDescent::Separated {
        distance,
        points,
        iterations,
        converged,
    }
}

/// Cost of a gamma value in the intersection search.
///
/// Solid obstacles pull toward their center; boundaries pull toward the level
/// set `gamma = 0.9`, just outside the free space.
pub fn gamma_cost(gamma: f64, is_boundary: bool) -> f64 {
    if is_boundary {
        10.0 * (gamma - 0.9).powi(2)
    } else {
        gamma.abs().powi(3)
    }
}

/// Finds a common point inside two intersecting obstacles, starting at `start`.
///
/// A non-finite result falls back to `start`.
pub fn gamma_descent(obstacles: [&Obstacle; 2], start: &Vector, params: &ResolverParams) -> GammaDescent {
    let cost = |position: &Vector| {
        obstacles
            .iter()
            .map(|obstacle| gamma_cost(obstacle.gamma(position), obstacle.is_boundary()))
            .sum::<f64>()
    };

    let mut point = start.clone();
    let mut iterations = 0;
    let mut residual = f64::INFINITY;
    let mut converged = false;

    while iterations < params.max_iterations {
        let gradient = central_difference_gradient(&point, params.finite_difference_step, cost);
        let step = gradient * params.gamma_step_size;
        point -= &step;
        iterations += 1;

        residual = step.norm();
        if residual < params.convergence_tolerance {
            converged = true;
            break;
        }
    }

    if point.iter().any(|value| !value.is_finite()) {
        warn!(
            "gamma descent diverged from {:?}, keeping the starting point",
            start.as_slice()
        );
        return GammaDescent {
            point: start.clone(),
            iterations,
            converged: false,
            residual,
        };
    }

    debug!("gamma descent finished after {iterations} iterations");
    GammaDescent {
        point,
        iterations,
        converged,
        residual,
    }
}
