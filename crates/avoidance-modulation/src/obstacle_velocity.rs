//! Velocity induced by moving, rotating and deforming obstacles

use avoidance_common::{angular_velocity_term, Vector};
use avoidance_obstacles::Obstacle;

/// Surface velocity of `obstacle` felt at `position`.
///
/// `normal` is the obstacle normal at `position` (pointing into free space).
/// Translation and deformation only contribute their normal component, and
/// only while the surface approaches the query point; boundaries always pass
/// the normal component on. Every term is damped by
/// `exp(-(max(gamma, 1) - 1) / sigma)`.
pub fn obstacle_velocity(obstacle: &Obstacle, position: &Vector, gamma: f64, normal: &Vector) -> Vector {
    let damping = (-(gamma.max(1.0) - 1.0) / obstacle.sigma()).exp();
    if damping == 0.0 {
        return Vector::zeros(position.len());
    }

    let approaching_normal_part = |velocity: &Vector| {
        let normal_speed = normal.dot(velocity);
        if normal_speed < 0.0 && !obstacle.is_boundary() {
            Vector::zeros(velocity.len())
        } else {
            normal * normal_speed
        }
    };

    let linear = approaching_normal_part(obstacle.linear_velocity());
    let angular = angular_velocity_term(obstacle.angular_velocity(), &(position - obstacle.center_position()));

    let mut velocity = (linear + angular) * damping;
    if obstacle.is_deforming() {
        velocity += approaching_normal_part(&obstacle.deformation_velocity(position)) * damping;
    }
    velocity
}

/// Weighted sum of the obstacle velocities at `position`
pub fn relative_obstacle_velocity(
    obstacles: &[Obstacle],
    position: &Vector,
    gammas: &[f64],
    normals: &[Vector],
    weights: &[f64],
) -> Vector {
    let mut velocity = Vector::zeros(position.len());
    for (((obstacle, gamma), normal), weight) in obstacles.iter().zip(gammas).zip(normals).zip(weights) {
        if *weight == 0.0 {
            continue;
        }
        velocity += obstacle_velocity(obstacle, position, *gamma, normal) * *weight;
    }
    velocity
}
