use mcs_core::errors::ErrorInfo;
use mcs_core::{Dependent, McsError, NodeRef, RngHandle};
use rand::Rng;

use crate::operator::{Operator, OperatorStats};

/// Uniform integer random walk on one randomly chosen dimension.
///
/// Steps are drawn uniformly from `[-window, window]`; the move is symmetric
/// and not tuned.
pub struct IntRandomWalkOperator {
    id: String,
    parameter: NodeRef,
    window: i64,
    weight: f64,
    stats: OperatorStats,
}

impl IntRandomWalkOperator {
    /// Binds the operator to an integer parameter with a window of at least one.
    pub fn new(
        id: impl Into<String>,
        parameter: NodeRef,
        window: i64,
        weight: f64,
    ) -> Result<Self, McsError> {
        let id = id.into();
        if window < 1 {
            return Err(McsError::Config(
                ErrorInfo::new("invalid-window-size", "integer window must be at least 1")
                    .with_context("operator", id)
                    .with_context("windowSize", window.to_string()),
            ));
        }
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(McsError::Config(
                ErrorInfo::new("invalid-weight", "operator weight must be finite and non-negative")
                    .with_context("operator", id),
            ));
        }
        if !parameter.with(|node| node.as_integer().is_some())? {
            return Err(McsError::Config(
                ErrorInfo::new("parameter-kind", "integer walk requires an integer parameter")
                    .with_context("operator", id),
            ));
        }
        Ok(Self {
            id,
            parameter,
            window,
            weight,
            stats: OperatorStats::default(),
        })
    }

    /// Half width of the step distribution.
    pub fn window(&self) -> i64 {
        self.window
    }
}

impl Dependent for IntRandomWalkOperator {
    fn references(&self) -> Vec<NodeRef> {
        vec![self.parameter.clone()]
    }
}

impl Operator for IntRandomWalkOperator {
    fn id(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn proposal(&mut self, rng: &mut RngHandle) -> Result<f64, McsError> {
        let window = self.window;
        let current = self.parameter.with(|node| {
            let param = node.as_integer().filter(|p| p.dimension() > 0)?;
            let dim = rng.index(param.dimension());
            let step = rng.inner_mut().gen_range(-window..=window);
            let value = param.value(dim)?;
            Some((dim, value.checked_add(step), param.lower(), param.upper()))
        })?;
        let Some((dim, new_value, lower, upper)) = current else {
            return Err(McsError::Kernel(
                ErrorInfo::new("empty-parameter", "target is not a non-empty integer parameter")
                    .with_context("operator", self.id.clone()),
            ));
        };
        let Some(new_value) = new_value.filter(|v| (lower..=upper).contains(v)) else {
            return Ok(f64::NEG_INFINITY);
        };

        self.parameter.with_mut(|mut node| {
            if let Some(param) = node.integer_mut() {
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
}
