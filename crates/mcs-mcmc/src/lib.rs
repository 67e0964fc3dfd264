#![deny(missing_docs)]

//! Metropolis-Hastings driver and adaptive proposal operators for MCS states.

/// Bactrian proposal kernel and the kernel abstraction.
pub mod bactrian;
/// Chain driver: operator selection, accept/reject and adaptation.
pub mod chain;
/// YAML configuration schema and builders.
pub mod config;
/// Deterministic seed derivation for forked chains.
pub mod determinism;
/// Run summaries and their JSON export.
pub mod metrics;
/// Integer parameter proposals.
pub mod moves_integer;
/// Real parameter proposals.
pub mod moves_real;
/// Tree proposals.
pub mod moves_tree;
/// Operator trait, acceptance statistics and Robbins-Monro helpers.
pub mod operator;

pub use bactrian::{Bactrian, BactrianMode, KernelConfig, KernelDistribution};
pub use chain::{Chain, ChainSeed, ScoringFunction, StepOutcome};
pub use config::{ChainConfig, OperatorConfig, StateNodeConfig};
pub use metrics::{ChainSummary, OperatorSummary};
pub use moves_integer::IntRandomWalkOperator;
pub use moves_real::{BactrianRandomWalkOperator, RandomWalkSettings};
pub use moves_tree::UniformNodeHeightOperator;
pub use operator::{
    calc_delta, AdaptationTransform, Operator, OperatorStats, Tunable, DEFAULT_TARGET_ACCEPTANCE,
};
