use mcs_core::{Dependent, McsError, RngHandle};
use serde::{Deserialize, Serialize};

/// Acceptance probability assumed by operators that do not override it.
pub const DEFAULT_TARGET_ACCEPTANCE: f64 = 0.234;

/// Accept/reject tallies maintained through the driver callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStats {
    /// Proposals the driver accepted.
    pub accepted: u64,
    /// Proposals the driver rejected, including out-of-bounds proposals.
    pub rejected: u64,
}

impl OperatorStats {
    /// Total number of decided proposals.
    pub fn total(&self) -> u64 {
        self.accepted + self.rejected
    }

    /// Observed acceptance rate, `None` before the first decision.
    pub fn acceptance_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.accepted as f64 / total as f64),
        }
    }
}

/// Damping applied to the iteration count in the adaptation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdaptationTransform {
    /// Step size `1 / n`.
    None,
    /// Step size `1 / ln(n + 1)`.
    Log,
    /// Step size `1 / sqrt(n)`.
    #[default]
    Sqrt,
}

/// Robbins-Monro step towards the target acceptance probability.
///
/// `log_alpha` is the log acceptance ratio of the proposal just decided. The
/// step is positive when the move was more acceptable than `target` and
/// shrinks with the number of decisions seen so far. Non-finite steps are
/// replaced by zero.
pub fn calc_delta(
    stats: &OperatorStats,
    log_alpha: f64,
    target: f64,
    transform: AdaptationTransform,
) -> f64 {
    let count = stats.total() as f64 + 1.0;
    let count = match transform {
        AdaptationTransform::None => count,
        AdaptationTransform::Log => (count + 1.0).ln(),
        AdaptationTransform::Sqrt => count.sqrt(),
    };
    let delta = (log_alpha.min(0.0).exp() - target) / count;
    if delta.is_finite() {
        delta
    } else {
        0.0
    }
}

/// Suggests a new value for a scale-like knob from the observed acceptance.
///
/// Returns an empty string when the acceptance rate lies within
/// `[0.10, 0.40]` or nothing has been decided yet.
pub fn scale_suggestion(stats: &OperatorStats, target: f64, current: f64, knob: &str) -> String {
    let Some(prob) = stats.acceptance_rate() else {
        return String::new();
    };
    let ratio = (prob / target).clamp(0.5, 2.0);
    if (0.10..=0.40).contains(&prob) {
        return String::new();
    }
    format!(
        "Try setting {knob} to about {}",
        format_decimal(current * ratio)
    )
}

/// Formats with at most three decimals and no trailing zeros.
pub fn format_decimal(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Single scalar knob exposed for generic adaptive-tuning drivers.
pub trait Tunable {
    /// Current value of the knob.
    fn coercable_parameter_value(&self) -> f64;

    /// Overwrites the knob.
    fn set_coercable_parameter_value(&mut self, value: f64);
}

/// Proposal mechanism operating on state nodes through reference points.
pub trait Operator: Dependent {
    /// Identifier used in summaries and logs.
    fn id(&self) -> &str;

    /// Relative selection weight.
    fn weight(&self) -> f64 {
        1.0
    }

    /// Perturbs the state and returns the log Hastings ratio.
    ///
    /// `f64::NEG_INFINITY` signals an impossible move; the driver must
    /// restore the state for any proposal it does not accept.
    fn proposal(&mut self, rng: &mut RngHandle) -> Result<f64, McsError>;

    /// Accept/reject tallies.
    fn stats(&self) -> &OperatorStats;

    /// Mutable tallies.
    fn stats_mut(&mut self) -> &mut OperatorStats;

    /// Driver callback after an accepted proposal.
    fn accept(&mut self) {
        self.stats_mut().accepted += 1;
    }

    /// Driver callback after a rejected proposal.
    fn reject(&mut self) {
        self.stats_mut().rejected += 1;
    }

    /// Adapts the proposal after every decision. No-op unless overridden.
    fn optimize(&mut self, _log_alpha: f64) {}

    /// Acceptance probability the adaptation aims for.
    fn target_acceptance_probability(&self) -> f64 {
        DEFAULT_TARGET_ACCEPTANCE
    }

    /// Human readable tuning advice, empty when none applies.
    fn performance_suggestion(&self) -> String {
        String::new()
    }

    /// Tunable knob, for operators that have one.
    fn tunable(&self) -> Option<&dyn Tunable> {
        None
    }

    /// Mutable tunable knob, for operators that have one.
    fn tunable_mut(&mut self) -> Option<&mut dyn Tunable> {
        None
    }
}
