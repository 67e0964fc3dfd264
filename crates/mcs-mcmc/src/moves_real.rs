use mcs_core::errors::ErrorInfo;
use mcs_core::{Dependent, McsError, NodeRef, RngHandle};
use serde::{Deserialize, Serialize};

use crate::bactrian::{Bactrian, KernelDistribution};
use crate::operator::{
    calc_delta, scale_suggestion, AdaptationTransform, Operator, OperatorStats, Tunable,
};

/// Acceptance rate the random walk adapts towards.
pub const RANDOM_WALK_TARGET_ACCEPTANCE: f64 = 0.3;

/// Named options accepted by [`BactrianRandomWalkOperator::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomWalkSettings {
    /// Legacy name for the window size. Mutually exclusive with `window_size`.
    #[serde(default)]
    pub scale_factor: Option<f64>,
    /// Proposal scale; larger means bolder proposals.
    #[serde(default)]
    pub window_size: Option<f64>,
    /// Enables online adaptation of the window size.
    #[serde(default = "default_optimise")]
    pub optimise: bool,
    /// Damping of the adaptation step.
    #[serde(default)]
    pub transform: AdaptationTransform,
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_optimise() -> bool {
    true
}

pub(crate) fn default_weight() -> f64 {
    1.0
}

impl Default for RandomWalkSettings {
    fn default() -> Self {
        Self {
            scale_factor: None,
            window_size: None,
            optimise: default_optimise(),
            transform: AdaptationTransform::default(),
            weight: default_weight(),
        }
    }
}

impl RandomWalkSettings {
    /// Resolves the window size from whichever of the two options is set.
    ///
    /// Defaults to 1.0; setting both is a configuration error.
    pub fn resolve_window_size(&self) -> Result<f64, McsError> {
        let window = match (self.scale_factor, self.window_size) {
            (Some(scale), Some(window)) => {
                return Err(McsError::Config(
                    ErrorInfo::new(
                        "exclusive-window-options",
                        "specify at most one of windowSize and scaleFactor",
                    )
                    .with_context("scaleFactor", scale.to_string())
                    .with_context("windowSize", window.to_string())
                    .with_hint("scaleFactor is deprecated, use windowSize"),
                ))
            }
            (Some(value), None) | (None, Some(value)) => value,
            (None, None) => 1.0,
        };
        if !(window.is_finite() && window > 0.0) {
            return Err(McsError::Config(
                ErrorInfo::new("invalid-window-size", "window size must be positive and finite")
                    .with_context("windowSize", window.to_string()),
            ));
        }
        Ok(window)
    }
}

/// Random walk on one randomly chosen dimension of a real parameter, with
/// steps drawn from a Bactrian kernel.
pub struct BactrianRandomWalkOperator {
    id: String,
    parameter: NodeRef,
    kernel: Box<dyn KernelDistribution>,
    window_size: f64,
    optimise: bool,
    transform: AdaptationTransform,
    weight: f64,
    stats: OperatorStats,
}

impl BactrianRandomWalkOperator {
    /// Validates the settings and binds the operator to `parameter`.
    ///
    /// Fails if both window options are given, or if the reference is unbound
    /// or does not resolve to a real parameter.
    pub fn new(
        id: impl Into<String>,
        parameter: NodeRef,
        kernel: Box<dyn KernelDistribution>,
        settings: &RandomWalkSettings,
    ) -> Result<Self, McsError> {
        let id = id.into();
        let window_size = settings.resolve_window_size()?;
        let is_real = parameter.with(|node| node.as_real().is_some())?;
        if !is_real {
            return Err(McsError::Config(
                ErrorInfo::new("parameter-kind", "random walk requires a real parameter")
                    .with_context("operator", id),
            ));
        }
        if !(settings.weight.is_finite() && settings.weight >= 0.0) {
            return Err(McsError::Config(
                ErrorInfo::new("invalid-weight", "operator weight must be finite and non-negative")
                    .with_context("operator", id),
            ));
        }
        Ok(Self {
            id,
            parameter,
            kernel,
            window_size,
            optimise: settings.optimise,
            transform: settings.transform,
            weight: settings.weight,
            stats: OperatorStats::default(),
        })
    }

    /// Operator with the default Bactrian kernel.
    pub fn with_default_kernel(
        id: impl Into<String>,
        parameter: NodeRef,
        settings: &RandomWalkSettings,
    ) -> Result<Self, McsError> {
        Self::new(id, parameter, Box::new(Bactrian::default()), settings)
    }

    /// Current window size.
    pub fn window_size(&self) -> f64 {
        self.window_size
    }

    /// Reference point of the target parameter.
    pub fn parameter(&self) -> &NodeRef {
        &self.parameter
    }
}

impl Dependent for BactrianRandomWalkOperator {
    fn references(&self) -> Vec<NodeRef> {
        vec![self.parameter.clone()]
    }
}

impl Operator for BactrianRandomWalkOperator {
    fn id(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn proposal(&mut self, rng: &mut RngHandle) -> Result<f64, McsError> {
        let current = self.parameter.with(|node| {
            let param = node.as_real().filter(|p| p.dimension() > 0)?;
            let dim = rng.index(param.dimension());
            param
                .value(dim)
                .map(|value| (dim, value, param.lower(), param.upper()))
        })?;
        let Some((dim, value, lower, upper)) = current else {
            return Err(McsError::Kernel(
                ErrorInfo::new("empty-parameter", "target is not a non-empty real parameter")
                    .with_context("operator", self.id.clone()),
            ));
        };

        let new_value = value + self.kernel.random_delta(dim, value, self.window_size, rng);
        if new_value.is_nan() || new_value < lower || new_value > upper {
            return Ok(f64::NEG_INFINITY);
        }

        self.parameter.with_mut(|mut node| {
            if let Some(param) = node.real_mut() {
                param.set_value(dim, new_value);
            }
        })?;
        Ok(0.0)
    }

    fn stats(&self) -> &OperatorStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut OperatorStats {
        &mut self.stats
    }

    fn optimize(&mut self, log_alpha: f64) {
        if !self.optimise {
            return;
        }
        let target = self.target_acceptance_probability();
        let delta = calc_delta(&self.stats, log_alpha, target, self.transform) + self.window_size.ln();
        self.window_size = delta.exp();
    }

    fn target_acceptance_probability(&self) -> f64 {
        RANDOM_WALK_TARGET_ACCEPTANCE
    }

    fn performance_suggestion(&self) -> String {
        scale_suggestion(
            &self.stats,
            self.target_acceptance_probability(),
            self.window_size,
            "scale factor",
        )
    }

    fn tunable(&self) -> Option<&dyn Tunable> {
        Some(self)
    }

    fn tunable_mut(&mut self) -> Option<&mut dyn Tunable> {
        Some(self)
    }
}

impl Tunable for BactrianRandomWalkOperator {
    fn coercable_parameter_value(&self) -> f64 {
        self.window_size
    }

    fn set_coercable_parameter_value(&mut self, value: f64) {
        self.window_size = value;
    }
}
