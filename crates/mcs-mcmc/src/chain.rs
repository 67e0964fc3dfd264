use log::{debug, info, warn};
use mcs_core::errors::ErrorInfo;
use mcs_core::{Dependent, McsError, NodeRef, RngHandle, State};
use serde::{Deserialize, Serialize};

use crate::config::ChainConfig;
use crate::determinism;
use crate::metrics::{ChainSummary, OperatorSummary};
use crate::operator::Operator;

/// Opaque log-probability over the active state.
///
/// Implementations read nodes through their [`NodeRef`]s and may consult
/// [`State::is_dirty`] to skip unchanged terms.
pub trait ScoringFunction: Dependent {
    /// Log posterior (or any unnormalised log density) of the current state.
    fn log_probability(&mut self, state: &State) -> Result<f64, McsError>;
}

/// Outcome of a single [`Chain::step`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Index of the operator that proposed.
    pub operator: usize,
    /// Whether the proposal was kept.
    pub accepted: bool,
    /// Log acceptance ratio handed to the operator's adaptation.
    pub log_alpha: f64,
}

/// Independent starting point for another chain.
#[derive(Debug)]
pub struct ChainSeed {
    /// Deep copy of the parent's active state.
    pub state: State,
    /// Seed for the new chain's RNG.
    pub seed: u64,
}

struct OperatorEdge<'a>(&'a dyn Operator);

impl Dependent for OperatorEdge<'_> {
    fn references(&self) -> Vec<NodeRef> {
        self.0.references()
    }

    fn dependents(&self) -> Vec<&dyn Dependent> {
        self.0.dependents()
    }
}

/// Single Metropolis-Hastings chain driving a set of operators over a state.
///
/// Every iteration stores the state, lets one operator propose, scores the
/// proposal, restores on rejection and finally lets the operator adapt.
pub struct Chain<S: ScoringFunction> {
    state: State,
    operators: Vec<Box<dyn Operator>>,
    scorer: S,
    rng: RngHandle,
    seed: u64,
    log_probability: f64,
    iteration: u64,
    configured_iterations: Option<usize>,
}

impl<S: ScoringFunction> Chain<S> {
    /// Connects operators and scorer to `state` and scores the initial state.
    pub fn new(
        mut state: State,
        operators: Vec<Box<dyn Operator>>,
        mut scorer: S,
        seed: u64,
    ) -> Result<Self, McsError> {
        if operators.is_empty() {
            return Err(McsError::Config(ErrorInfo::new(
                "no-operators",
                "a chain needs at least one operator",
            )));
        }
        let total_weight: f64 = operators.iter().map(|op| op.weight()).sum();
        if !(total_weight.is_finite() && total_weight > 0.0) {
            return Err(McsError::Config(
                ErrorInfo::new("operator-weights", "operator weights must sum to a positive value")
                    .with_context("total", total_weight.to_string()),
            ));
        }

        let mut registered = state.connect(&scorer);
        for op in &operators {
            registered += state.connect(&OperatorEdge(op.as_ref()));
        }

        state.set_dirty(true);
        let log_probability = scorer.log_probability(&state)?;
        state.set_dirty(false);
        if log_probability.is_nan() || log_probability == f64::NEG_INFINITY {
            return Err(McsError::Config(
                ErrorInfo::new("impossible-start", "initial state has zero probability")
                    .with_context("log_probability", log_probability.to_string()),
            ));
        }
        info!(
            "chain initialised: {} nodes, {} operators, {} reference points, log p = {}",
            state.len(),
            operators.len(),
            registered,
            log_probability
        );

        Ok(Self {
            state,
            operators,
            scorer,
            rng: RngHandle::from_seed(seed),
            seed,
            log_probability,
            iteration: 0,
            configured_iterations: None,
        })
    }

    /// Builds state and operators from `config` and wires them to a scorer
    /// constructed from the freshly built state.
    pub fn from_config(
        config: &ChainConfig,
        scorer: impl FnOnce(&State) -> Result<S, McsError>,
    ) -> Result<Self, McsError> {
        let state = config.build_state()?;
        let operators = config.build_operators(&state)?;
        let scorer = scorer(&state)?;
        let mut chain = Self::new(state, operators, scorer, config.seed)?;
        chain.configured_iterations = Some(config.iterations);
        Ok(chain)
    }

    /// Performs one iteration of the driver contract.
    pub fn step(&mut self) -> Result<StepOutcome, McsError> {
        let index = self.select_operator();
        self.state.store()?;

        let op = &mut self.operators[index];
        let hastings = match op.proposal(&mut self.rng) {
            Ok(hastings) => hastings,
            Err(err) => {
                warn!("operator {} failed to propose: {err}", op.id());
                self.state.restore()?;
                self.state.set_dirty(false);
                return Err(err);
            }
        };

        let (accepted, log_alpha) = if hastings == f64::NEG_INFINITY {
            (false, f64::NEG_INFINITY)
        } else {
            let proposed = match self.scorer.log_probability(&self.state) {
                Ok(proposed) => proposed,
                Err(err) => {
                    warn!("scoring the proposal of {} failed: {err}", op.id());
                    self.state.restore()?;
                    self.state.set_dirty(false);
                    return Err(err);
                }
            };
            let log_alpha = proposed - self.log_probability + hastings;
            let accepted = log_alpha >= 0.0 || self.rng.uniform().ln() < log_alpha;
            if accepted {
                self.log_probability = proposed;
            }
            (accepted, log_alpha)
        };

        if accepted {
            op.accept();
        } else {
            self.state.restore()?;
            op.reject();
        }
        op.optimize(log_alpha);
        self.state.set_dirty(false);
        self.iteration += 1;

        debug!(
            "iteration {}: {} {} (log alpha {log_alpha})",
            self.iteration,
            op.id(),
            if accepted { "accepted" } else { "rejected" }
        );
        Ok(StepOutcome {
            operator: index,
            accepted,
            log_alpha,
        })
    }

    /// Runs `iterations` steps and summarises the operators.
    pub fn run(&mut self, iterations: usize) -> Result<ChainSummary, McsError> {
        for _ in 0..iterations {
            self.step()?;
        }
        let summary = self.summary();
        info!(
            "chain finished after {} iterations, log p = {}",
            summary.iterations, summary.log_probability
        );
        for (id, suggestion) in summary.suggestions() {
            warn!("{id}: {suggestion}");
        }
        Ok(summary)
    }

    /// Runs the iteration count of the configuration the chain was built from.
    pub fn run_configured(&mut self) -> Result<ChainSummary, McsError> {
        let iterations = self.configured_iterations.ok_or_else(|| {
            McsError::Config(
                ErrorInfo::new("no-configured-iterations", "chain was not built from a configuration")
                    .with_hint("use Chain::from_config or call run(iterations)"),
            )
        })?;
        self.run(iterations)
    }

    /// Current diagnostics.
    pub fn summary(&self) -> ChainSummary {
        let operators = self
            .operators
            .iter()
            .map(|op| {
                let stats = op.stats();
                (
                    op.id().to_string(),
                    OperatorSummary {
                        accepted: stats.accepted,
                        rejected: stats.rejected,
                        acceptance_rate: stats.acceptance_rate(),
                        tuned_value: op.tunable().map(|t| t.coercable_parameter_value()),
                        suggestion: op.performance_suggestion(),
                    },
                )
            })
            .collect();
        ChainSummary {
            iterations: self.iteration,
            log_probability: self.log_probability,
            operators,
        }
    }

    /// Deep copies of the current state with deterministic substream seeds.
    pub fn seed_chains(&self, count: usize) -> Result<Vec<ChainSeed>, McsError> {
        (0..count)
            .map(|index| {
                Ok(ChainSeed {
                    state: self.state.copy()?,
                    seed: determinism::chain_seed(self.seed, index, self.iteration),
                })
            })
            .collect()
    }

    /// The sampled state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The scoring function.
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Operators in selection order.
    pub fn operators(&self) -> &[Box<dyn Operator>] {
        &self.operators
    }

    /// Log probability of the current state.
    pub fn log_probability(&self) -> f64 {
        self.log_probability
    }

    /// Iterations performed so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    fn select_operator(&mut self) -> usize {
        let total: f64 = self.operators.iter().map(|op| op.weight()).sum();
        let mut draw = self.rng.uniform() * total;
        for (index, op) in self.operators.iter().enumerate() {
            draw -= op.weight();
            if draw < 0.0 {
                return index;
            }
        }
        self.operators.len() - 1
    }
}
