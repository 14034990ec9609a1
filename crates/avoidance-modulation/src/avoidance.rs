//! Multi-obstacle evaluation of the avoidance velocity

use avoidance_common::{ensure_dimension, Error, Result, Vector};
use avoidance_obstacles::Scene;
use log::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::AvoidanceConfig;
use crate::modulation::ModulationOperator;
use crate::obstacle_velocity::relative_obstacle_velocity;
use crate::weights::compute_weights;

/// Blends the modulations of all obstacles of a scene
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MultiObstacleBlender {
    config: AvoidanceConfig,
    operator: ModulationOperator,
}

impl MultiObstacleBlender {
    pub fn new(config: AvoidanceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            operator: ModulationOperator::new(config.modulation),
            config,
        })
    }

    pub fn config(&self) -> &AvoidanceConfig {
        &self.config
    }

    pub fn operator(&self) -> &ModulationOperator {
        &self.operator
    }

    /// Blending weights of all obstacles at `position`
    pub fn weights(&self, scene: &Scene, position: &Vector) -> Result<Vec<f64>> {
        let gammas: Vec<f64> = scene.obstacles().iter().map(|obstacle| obstacle.gamma(position)).collect();
        compute_weights(&gammas, &self.config)
    }

    /// Modulated velocity at `position` for the desired `nominal_velocity`.
    ///
    /// The nominal velocity is modulated relative to the blended obstacle
    /// velocity, which is added back afterwards.
    pub fn evaluate(&self, scene: &Scene, position: &Vector, nominal_velocity: &Vector) -> Result<Vector> {
        let Some(dim) = scene.dimension() else {
            return Ok(nominal_velocity.clone());
        };
        ensure_dimension(position, dim)?;
        ensure_dimension(nominal_velocity, dim)?;

        let obstacles = scene.obstacles();
        let gammas: Vec<f64> = obstacles.iter().map(|obstacle| obstacle.gamma(position)).collect();
        let weights = compute_weights(&gammas, &self.config)?;
        if weights.iter().all(|weight| *weight == 0.0) {
            return Ok(nominal_velocity.clone());
        }

        let normals: Vec<Vector> = obstacles
            .iter()
            .zip(&weights)
            .map(|(obstacle, weight)| {
                if *weight > 0.0 {
                    obstacle.normal(position)
                } else {
                    Vector::zeros(dim)
                }
            })
            .collect();

        let obstacle_velocity = relative_obstacle_velocity(obstacles, position, &gammas, &normals, &weights);
        let relative_velocity = nominal_velocity - &obstacle_velocity;
        if relative_velocity.norm() == 0.0 {
            return Ok(obstacle_velocity);
        }

        let mut modulated = Vector::zeros(dim);
        for ((obstacle, gamma), weight) in obstacles.iter().zip(&gammas).zip(&weights) {
            if *weight == 0.0 {
                continue;
            }
            modulated += self.operator.modulate(obstacle, position, &relative_velocity, *gamma) * *weight;
        }

        debug!(
            "modulated {:?} -> {:?} at {:?}",
            nominal_velocity.as_slice(),
            modulated.as_slice(),
            position.as_slice()
        );
        Ok(modulated + obstacle_velocity)
    }

    /// Evaluates many query points; each one succeeds or fails on its own.
    ///
    /// With the `parallel` feature the points are evaluated concurrently.
    pub fn evaluate_batch(
        &self,
        scene: &Scene,
        positions: &[Vector],
        nominal_velocities: &[Vector],
    ) -> Result<Vec<Result<Vector>>> {
        if positions.len() != nominal_velocities.len() {
            return Err(Error::Configuration(format!(
                "{} query points but {} nominal velocities",
                positions.len(),
                nominal_velocities.len()
            )));
        }

        #[cfg(feature = "parallel")]
        let results = positions
            .par_iter()
            .zip(nominal_velocities.par_iter())
            .map(|(position, velocity)| self.evaluate(scene, position, velocity))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results = positions
            .iter()
            .zip(nominal_velocities)
            .map(|(position, velocity)| self.evaluate(scene, position, velocity))
            .collect();

        Ok(results)
    }
}

/// Modulated velocity at `position` with the default configuration
pub fn evaluate_avoidance(scene: &Scene, position: &Vector, nominal_velocity: &Vector) -> Result<Vector> {
    MultiObstacleBlender::default().evaluate(scene, position, nominal_velocity)
}

/// Batch version of [`evaluate_avoidance`]
pub fn evaluate_avoidance_batch(
    scene: &Scene,
    positions: &[Vector],
    nominal_velocities: &[Vector],
) -> Result<Vec<Result<Vector>>> {
    MultiObstacleBlender::default().evaluate_batch(scene, positions, nominal_velocities)
}
