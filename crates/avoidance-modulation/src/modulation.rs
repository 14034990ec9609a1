//! Per-obstacle modulation matrix
//!
//! Around a single obstacle a velocity is expressed in the basis
//! `E = [r, e_1, .., e_{d-1}]` made of the reference direction `r` and the
//! tangents `e_i` of the surface level set through the query point. The
//! reference component is scaled down (and reversed inside the obstacle) while
//! the tangential components are amplified:
//!
//! ```text
//! M(x) = E(x) D(x) E(x)^-1,   D = diag(lambda_ref, lambda_tan, .., lambda_tan)
//! ```
//!
//! Far from the obstacle `D` tends to the identity and so does `M`.

use avoidance_common::{directional_weighted_sum, orthogonal_basis, Matrix, Vector, NORM_EPSILON};
use avoidance_obstacles::Obstacle;
use log::warn;

use crate::config::ModulationParams;

/// Eigenvalues of the modulation for a given gamma
pub fn compute_diagonal_matrix(gamma: f64, dim: usize, repulsion_coeff: f64, params: &ModulationParams) -> Matrix {
    let delta = if gamma <= 1.0 && params.treat_inside_as_full_repulsion {
        1.0
    } else {
        1.0 / gamma.abs().powf(1.0 / params.rho)
    };

    let eigenvalue_reference = 1.0 - delta * repulsion_coeff;
    let eigenvalue_tangent = if params.tangent_eigenvalue_isometric {
        1.0 + delta
    } else {
        1.0 - 1.0 / gamma.abs().powf(params.tangent_power)
    };

    let mut diagonal = Vector::from_element(dim, eigenvalue_tangent);
    diagonal[0] = eigenvalue_reference;
    Matrix::from_diagonal(&diagonal)
}

/// Bases of the modulation at one query point
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Unit normal (first column of `orthogonal_basis`)
    pub normal: Vector,
    /// Reference direction after the non-star-shaped correction (first column of `basis`)
    pub reference_direction: Vector,
    /// `E`: reference direction followed by the surface tangents
    pub basis: Matrix,
    /// `E_orth`: orthonormal basis aligned with the normal
    pub orthogonal_basis: Matrix,
}

/// Builds `E` and `E_orth` for `obstacle` at `position`.
///
/// Returns `None` at the reference point, where no direction is defined.
pub fn compute_decomposition_matrix(obstacle: &Obstacle, position: &Vector, params: &ModulationParams) -> Option<Decomposition> {
    let mut reference_direction = obstacle.reference_direction(position);
    if reference_direction.norm() <= NORM_EPSILON {
        return None;
    }

    let mut normal = obstacle.normal(position);
    if normal.norm() <= NORM_EPSILON {
        normal = reference_direction.clone();
    }

    let dot = normal.dot(&reference_direction);
    if !obstacle.is_star_shaped() && dot.abs() < params.dot_margin {
        // Pull the reference direction toward the normal near the singularity
        let weight = dot.abs() / params.dot_margin;
        let aligned_normal = &normal * dot.signum();
        reference_direction = directional_weighted_sum(
            &normal,
            &[reference_direction, aligned_normal],
            &[weight, 1.0 - weight],
        );
    }

    let orthogonal_basis = orthogonal_basis(&normal);
    let mut basis = orthogonal_basis.clone();
    basis.set_column(0, &reference_direction);

    Some(Decomposition {
        normal,
        reference_direction,
        basis,
        orthogonal_basis,
    })
}

/// Modulation around a single obstacle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModulationOperator {
    params: ModulationParams,
}

impl ModulationOperator {
    pub fn new(params: ModulationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ModulationParams {
        &self.params
    }

    /// `M(x) = E D E^-1`.
    ///
    /// The zero matrix at the reference point or when `E` is singular.
    pub fn modulation_matrix(&self, obstacle: &Obstacle, position: &Vector) -> Matrix {
        let dim = position.len();
        let gamma = obstacle.gamma(position);
        match self.factors(obstacle, position, gamma) {
            Some((basis, diagonal, inverse)) => basis * diagonal * inverse,
            None => Matrix::zeros(dim, dim),
        }
    }

    /// Applies the modulation of `obstacle` to `velocity` at `position`.
    ///
    /// Without tail effect, a velocity already leaving the obstacle keeps its
    /// reference component.
    pub fn modulate(&self, obstacle: &Obstacle, position: &Vector, velocity: &Vector, gamma: f64) -> Vector {
        let Some((basis, mut diagonal, inverse)) = self.factors(obstacle, position, gamma) else {
            return Vector::zeros(velocity.len());
        };

        let local_velocity = &inverse * velocity;
        if !self.params.tail_effect && local_velocity[0] > 0.0 {
            diagonal[(0, 0)] = 1.0;
        }
        basis * (diagonal * local_velocity)
    }

    fn factors(&self, obstacle: &Obstacle, position: &Vector, gamma: f64) -> Option<(Matrix, Matrix, Matrix)> {
        let decomposition = compute_decomposition_matrix(obstacle, position, &self.params)?;
        let diagonal = compute_diagonal_matrix(gamma, position.len(), obstacle.repulsion_coeff(), &self.params);

        let Some(inverse) = decomposition.basis.clone().try_inverse() else {
            warn!(
                "singular modulation basis at {:?} (reference direction tangent to the surface)",
                position.as_slice()
            );
            return None;
        };
        Some((decomposition.basis, diagonal, inverse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avoidance_obstacles::ObstacleConfig;

    fn vec2(x: f64, y: f64) -> Vector {
        Vector::from_vec(vec![x, y])
    }

    fn circle() -> Obstacle {
        Obstacle::from_config(&ObstacleConfig::sphere(vec![0.0, 0.0], 1.0)).unwrap()
    }

    #[test]
    fn test_diagonal_on_surface() {
        let params = ModulationParams::default();
        let diagonal = compute_diagonal_matrix(1.0, 2, 1.0, &params);
        assert_eq!(diagonal[(0, 0)], 0.0);
        assert_eq!(diagonal[(1, 1)], 2.0);

        let diagonal = compute_diagonal_matrix(4.0, 3, 1.0, &params);
        assert!((diagonal[(0, 0)] - 0.75).abs() < 1e-12);
        assert!((diagonal[(2, 2)] - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_diagonal_inside_and_non_isometric() {
        let params = ModulationParams::default();
        let inside = compute_diagonal_matrix(0.5, 2, 1.0, &params);
        assert_eq!(inside[(0, 0)], 0.0);

        let params = params.with_treat_inside_as_full_repulsion(false);
        let inside = compute_diagonal_matrix(0.5, 2, 1.0, &params);
        assert!((inside[(0, 0)] + 1.0).abs() < 1e-12);

        let params = ModulationParams::default().with_tangent_eigenvalue_isometric(false);
        let diagonal = compute_diagonal_matrix(2.0, 2, 1.0, &params);
        assert!((diagonal[(1, 1)] - (1.0 - 1.0 / 32.0)).abs() < 1e-12);
    }

    #[test]
    fn test_modulation_on_circle_surface_removes_radial_component() {
        let operator = ModulationOperator::default();
        let obstacle = circle();
        let position = vec2(1.0, 0.0);
        let velocity = vec2(-1.0, 0.3);

        let modulated = operator.modulate(&obstacle, &position, &velocity, obstacle.gamma(&position));
        assert!(modulated[0].abs() < 1e-12);
        assert!((modulated[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_modulation_matrix_vanishes_far_away() {
        let operator = ModulationOperator::default();
        let obstacle = Obstacle::from_config(&ObstacleConfig::ellipse(vec![0.0, 0.0], vec![3.0, 0.5])).unwrap();
        let matrix = operator.modulation_matrix(&obstacle, &vec2(1e7, 3e6));
        assert!((matrix - Matrix::identity(2, 2)).norm() < 1e-5);
    }

    #[test]
    fn test_reference_point_has_no_decomposition() {
        let obstacle = circle();
        let params = ModulationParams::default();
        assert!(compute_decomposition_matrix(&obstacle, &vec2(0.0, 0.0), &params).is_none());

        let matrix = ModulationOperator::default().modulation_matrix(&obstacle, &vec2(0.0, 0.0));
        assert_eq!(matrix, Matrix::zeros(2, 2));
    }

    #[test]
    fn test_tail_effect_disabled_keeps_leaving_velocity() {
        let obstacle = circle();
        let position = vec2(2.0, 0.0);
        let velocity = vec2(1.0, 0.0);

        let with_tail = ModulationOperator::default().modulate(&obstacle, &position, &velocity, 2.0);
        assert!((with_tail[0] - 0.5).abs() < 1e-12);

        let without_tail = ModulationOperator::new(ModulationParams::default().with_tail_effect(false))
            .modulate(&obstacle, &position, &velocity, 2.0);
        assert!((without_tail[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decomposition_basis_columns() {
        let obstacle = Obstacle::from_config(&ObstacleConfig::ellipse(vec![0.0, 0.0], vec![2.0, 1.0])).unwrap();
        let position = vec2(2.0, 1.0);
        let decomposition =
            compute_decomposition_matrix(&obstacle, &position, &ModulationParams::default()).unwrap();

        assert!((decomposition.basis.column(0) - position.normalize()).norm() < 1e-12);
        assert!(decomposition.normal.dot(&decomposition.orthogonal_basis.column(1)).abs() < 1e-12);
        assert!(decomposition.reference_direction.dot(&decomposition.normal) > 0.0);
    }
}
