use avoidance_common::{Error, Result};

/// Parameters of the per-obstacle modulation matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationParams {
    /// Reactivity exponent of the eigenvalues (`delta = 1 / gamma^(1/rho)`)
    pub rho: f64,
    /// Tangent eigenvalue `1 + delta` (true) or `1 - 1/gamma^tangent_power` (false)
    pub tangent_eigenvalue_isometric: bool,
    pub tangent_power: f64,
    /// Inside an obstacle (gamma <= 1) use the full repulsion `delta = 1`
    pub treat_inside_as_full_repulsion: bool,
    /// Below this `|n . r|` the reference direction of a non-star-shaped obstacle is pulled toward the normal
    pub dot_margin: f64,
    /// Keep modulating velocities that already leave the obstacle
    pub tail_effect: bool,
}

impl Default for ModulationParams {
    fn default() -> Self {
        Self {
            rho: 1.0,
            tangent_eigenvalue_isometric: true,
            tangent_power: 5.0,
            treat_inside_as_full_repulsion: true,
            dot_margin: 0.02,
            tail_effect: true,
        }
    }
}

impl ModulationParams {
    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    pub fn with_tangent_eigenvalue_isometric(mut self, isometric: bool) -> Self {
        self.tangent_eigenvalue_isometric = isometric;
        self
    }

    pub fn with_tangent_power(mut self, tangent_power: f64) -> Self {
        self.tangent_power = tangent_power;
        self
    }

    pub fn with_treat_inside_as_full_repulsion(mut self, enabled: bool) -> Self {
        self.treat_inside_as_full_repulsion = enabled;
        self
    }

    pub fn with_dot_margin(mut self, dot_margin: f64) -> Self {
        self.dot_margin = dot_margin;
        self
    }

    pub fn with_tail_effect(mut self, tail_effect: bool) -> Self {
        self.tail_effect = tail_effect;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rho > 0.0) {
            return Err(Error::Configuration("rho must be positive".to_string()));
        }
        if !(self.tangent_power > 0.0) {
            return Err(Error::Configuration("tangent power must be positive".to_string()));
        }
        if !(self.dot_margin > 0.0 && self.dot_margin < 1.0) {
            return Err(Error::Configuration("dot margin must lie in (0, 1)".to_string()));
        }
        Ok(())
    }
}

/// Configuration of the multi-obstacle evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvoidanceConfig {
    pub modulation: ModulationParams,
    /// Exponent of the inverse-gamma blending weights
    pub weight_power: f64,
    /// Obstacles at or beyond this gamma are ignored
    pub gamma_cutoff: f64,
    /// Reject query points inside more than one obstacle instead of splitting the weight
    pub strict_intersections: bool,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            modulation: ModulationParams::default(),
            weight_power: 2.0,
            gamma_cutoff: 1e6,
            strict_intersections: false,
        }
    }
}

impl AvoidanceConfig {
    pub fn with_modulation(mut self, modulation: ModulationParams) -> Self {
        self.modulation = modulation;
        self
    }

    pub fn with_weight_power(mut self, weight_power: f64) -> Self {
        self.weight_power = weight_power;
        self
    }

    pub fn with_gamma_cutoff(mut self, gamma_cutoff: f64) -> Self {
        self.gamma_cutoff = gamma_cutoff;
        self
    }

    pub fn with_strict_intersections(mut self, strict: bool) -> Self {
        self.strict_intersections = strict;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.modulation.validate()?;
        if !(self.weight_power > 0.0) {
            return Err(Error::Configuration("weight power must be positive".to_string()));
        }
        if !(self.gamma_cutoff > 1.0) {
            return Err(Error::Configuration("gamma cutoff must be greater than 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AvoidanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weight_power, 2.0);
        assert_eq!(config.gamma_cutoff, 1e6);
        assert_eq!(config.modulation.dot_margin, 0.02);
        assert!(config.modulation.tail_effect);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let config = AvoidanceConfig::default().with_gamma_cutoff(0.5);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config = AvoidanceConfig::default().with_modulation(ModulationParams::default().with_rho(0.0));
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let params = ModulationParams::default().with_dot_margin(1.5);
        assert!(params.validate().is_err());
    }
}
