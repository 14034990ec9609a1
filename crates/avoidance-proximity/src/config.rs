use avoidance_common::{Error, Result};

/// Parameters of the proximity resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverParams {
    /// Step size of the angle-space descent
    pub angle_step_size: f64,
    /// Step size of the gamma-space descent
    pub gamma_step_size: f64,
    /// Both descents stop once a step is shorter than this
    pub convergence_tolerance: f64,
    /// Surface points closer than this are in contact
    pub contact_tolerance: f64,
    /// A surface point with gamma below `1 + entry_margin` w.r.t. the other obstacle counts as intersecting
    pub entry_margin: f64,
    pub max_iterations: usize,
    /// Central difference step of the gamma-space gradient
    pub finite_difference_step: f64,
    /// Neighbours farther than this do not move the reference point
    pub distance_max: f64,
    pub reference_weight_power: f64,
    /// Give all members of an intersection cluster one common reference point
    pub share_cluster_reference: bool,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            angle_step_size: 0.03,
            gamma_step_size: 0.09,
            convergence_tolerance: 1e-3,
            contact_tolerance: 1e-4,
            entry_margin: 1e-4,
            max_iterations: 100,
            finite_difference_step: 1e-6,
            distance_max: 3.0,
            reference_weight_power: 1.0,
            share_cluster_reference: false,
        }
    }
}

impl ResolverParams {
    pub fn with_step_sizes(mut self, angle_step_size: f64, gamma_step_size: f64) -> Self {
        self.angle_step_size = angle_step_size;
        self.gamma_step_size = gamma_step_size;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence_tolerance = tolerance;
        self
    }

    pub fn with_distance_max(mut self, distance_max: f64) -> Self {
        self.distance_max = distance_max;
        self
    }

    pub fn with_share_cluster_reference(mut self, enabled: bool) -> Self {
        self.share_cluster_reference = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("angle step size", self.angle_step_size),
            ("gamma step size", self.gamma_step_size),
            ("convergence tolerance", self.convergence_tolerance),
            ("contact tolerance", self.contact_tolerance),
            ("finite difference step", self.finite_difference_step),
            ("distance max", self.distance_max),
            ("reference weight power", self.reference_weight_power),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(Error::Configuration(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.entry_margin >= 0.0) {
            return Err(Error::Configuration("entry margin must be non-negative".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(Error::Configuration("at least one iteration is required".to_string()));
        }
        Ok(())
    }
}
