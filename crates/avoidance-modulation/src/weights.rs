//! Gamma-based blending weights

use avoidance_common::{Error, Result};
use log::warn;

use crate::config::AvoidanceConfig;

/// Blending weight of each obstacle from its gamma at the query point.
///
/// Obstacles at or beyond the cutoff get no weight. A query point inside a
/// single obstacle is governed by that obstacle alone; inside several the
/// weight is split equally, or rejected with a configuration error in strict
/// mode. Otherwise the weights follow `(1 / (gamma - 1))^p`, normalized.
pub fn compute_weights(gammas: &[f64], config: &AvoidanceConfig) -> Result<Vec<f64>> {
    let inside: Vec<usize> = gammas
        .iter()
        .enumerate()
        .filter(|(_, gamma)| **gamma <= 1.0)
        .map(|(index, _)| index)
        .collect();

    match inside.len() {
        0 => {}
        1 => {
            let mut weights = vec![0.0; gammas.len()];
            weights[inside[0]] = 1.0;
            return Ok(weights);
        }
        count => {
            if config.strict_intersections {
                return Err(Error::Configuration(format!(
                    "query point lies inside {count} obstacles {inside:?}"
                )));
            }
            warn!("query point lies inside {count} obstacles {inside:?}, splitting weight equally");
            let mut weights = vec![0.0; gammas.len()];
            for index in inside {
                weights[index] = 1.0 / count as f64;
            }
            return Ok(weights);
        }
    }

    let mut weights: Vec<f64> = gammas
        .iter()
        .map(|gamma| {
            if *gamma >= config.gamma_cutoff {
                0.0
            } else {
                (1.0 / (gamma - 1.0)).powf(config.weight_power)
            }
        })
        .collect();

    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        weights.iter_mut().for_each(|weight| *weight /= sum);
    }
    Ok(weights)
}
