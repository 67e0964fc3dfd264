use std::fs;
use std::path::Path;

use mcs_core::errors::ErrorInfo;
use mcs_core::{IntegerParameter, McsError, NodeRef, RealParameter, State, StateNode, Tree};
use serde::{Deserialize, Serialize};

use crate::bactrian::KernelConfig;
use crate::moves_integer::IntRandomWalkOperator;
use crate::moves_real::{default_weight, BactrianRandomWalkOperator, RandomWalkSettings};
use crate::moves_tree::UniformNodeHeightOperator;
use crate::operator::Operator;

/// YAML-configurable description of a chain: its state and its operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Master seed for the chain's RNG.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of iterations performed by [`crate::Chain::run_configured`].
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// State nodes in slot order.
    #[serde(default)]
    pub state: Vec<StateNodeConfig>,
    /// Proposal operators.
    #[serde(default)]
    pub operators: Vec<OperatorConfig>,
}

fn default_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

fn default_iterations() -> usize {
    10_000
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            iterations: default_iterations(),
            state: Vec::new(),
            operators: Vec::new(),
        }
    }
}

/// One state node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StateNodeConfig {
    /// Real vector with optional bounds.
    Real {
        /// Node identifier.
        id: String,
        /// Initial values.
        values: Vec<f64>,
        /// Inclusive lower bound.
        #[serde(default)]
        lower: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default)]
        upper: Option<f64>,
    },
    /// Integer vector with optional bounds.
    Integer {
        /// Node identifier.
        id: String,
        /// Initial values.
        values: Vec<i64>,
        /// Inclusive lower bound.
        #[serde(default)]
        lower: Option<i64>,
        /// Inclusive upper bound.
        #[serde(default)]
        upper: Option<i64>,
    },
    /// Rooted binary tree given as a parent table.
    Tree {
        /// Node identifier.
        id: String,
        /// Parent of every vertex, `null` for the root.
        parents: Vec<Option<usize>>,
        /// Height of every vertex.
        heights: Vec<f64>,
        /// Leaf labels, in vertex order.
        #[serde(default)]
        labels: Vec<String>,
    },
}

impl StateNodeConfig {
    /// Identifier of the configured node.
    pub fn id(&self) -> &str {
        match self {
            StateNodeConfig::Real { id, .. }
            | StateNodeConfig::Integer { id, .. }
            | StateNodeConfig::Tree { id, .. } => id,
        }
    }

    /// Builds the state node.
    pub fn build(&self) -> Result<StateNode, McsError> {
        let node = match self {
            StateNodeConfig::Real {
                id,
                values,
                lower,
                upper,
            } => StateNode::real(
                id.as_str(),
                RealParameter::with_bounds(
                    values.clone(),
                    lower.unwrap_or(f64::NEG_INFINITY),
                    upper.unwrap_or(f64::INFINITY),
                )?,
            ),
            StateNodeConfig::Integer {
                id,
                values,
                lower,
                upper,
            } => StateNode::integer(
                id.as_str(),
                IntegerParameter::with_bounds(
                    values.clone(),
                    lower.unwrap_or(i64::MIN),
                    upper.unwrap_or(i64::MAX),
                )?,
            ),
            StateNodeConfig::Tree {
                id,
                parents,
                heights,
                labels,
            } => {
                let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                StateNode::tree(id.as_str(), Tree::from_parents(parents, heights, &labels)?)
            }
        };
        Ok(node)
    }
}

/// Settings for a Bactrian random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkConfig {
    /// Operator identifier; derived from the parameter when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Identifier of the target real parameter (required).
    #[serde(default)]
    pub parameter: Option<String>,
    /// Window size options.
    #[serde(flatten)]
    pub settings: RandomWalkSettings,
    /// Kernel shape.
    #[serde(default)]
    pub kernel: KernelConfig,
}

/// Settings for an integer random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntRandomWalkConfig {
    /// Operator identifier; derived from the parameter when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Identifier of the target integer parameter (required).
    #[serde(default)]
    pub parameter: Option<String>,
    /// Half width of the step distribution.
    #[serde(default = "default_int_window")]
    pub window_size: i64,
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_int_window() -> i64 {
    1
}

/// Settings for the uniform node height move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHeightConfig {
    /// Operator identifier; derived from the tree when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Identifier of the target tree (required).
    #[serde(default)]
    pub tree: Option<String>,
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Operator definitions, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OperatorConfig {
    /// [`BactrianRandomWalkOperator`].
    BactrianRandomWalk(RandomWalkConfig),
    /// [`IntRandomWalkOperator`].
    IntRandomWalk(IntRandomWalkConfig),
    /// [`UniformNodeHeightOperator`].
    UniformNodeHeight(NodeHeightConfig),
}

impl OperatorConfig {
    fn type_name(&self) -> &'static str {
        match self {
            OperatorConfig::BactrianRandomWalk(_) => "bactrian-random-walk",
            OperatorConfig::IntRandomWalk(_) => "int-random-walk",
            OperatorConfig::UniformNodeHeight(_) => "uniform-node-height",
        }
    }

    /// Builds the operator, binding its input to a node of `state`.
    pub fn build(&self, state: &State) -> Result<Box<dyn Operator>, McsError> {
        let kind = self.type_name();
        match self {
            OperatorConfig::BactrianRandomWalk(cfg) => {
                let (id, parameter) = resolve(state, kind, "parameter", &cfg.id, &cfg.parameter)?;
                let kernel = cfg.kernel.build()?;
                let op = BactrianRandomWalkOperator::new(id, parameter, Box::new(kernel), &cfg.settings)?;
                Ok(Box::new(op))
            }
            OperatorConfig::IntRandomWalk(cfg) => {
                let (id, parameter) = resolve(state, kind, "parameter", &cfg.id, &cfg.parameter)?;
                let op = IntRandomWalkOperator::new(id, parameter, cfg.window_size, cfg.weight)?;
                Ok(Box::new(op))
            }
            OperatorConfig::UniformNodeHeight(cfg) => {
                let (id, tree) = resolve(state, kind, "tree", &cfg.id, &cfg.tree)?;
                let op = UniformNodeHeightOperator::new(id, tree, cfg.weight)?;
                Ok(Box::new(op))
            }
        }
    }
}

fn resolve(
    state: &State,
    kind: &str,
    input: &str,
    id: &Option<String>,
    target: &Option<String>,
) -> Result<(String, NodeRef), McsError> {
    let target = target.as_deref().ok_or_else(|| {
        McsError::Config(
            ErrorInfo::new("missing-input", "required input is not set")
                .with_context("operator", kind.to_string())
                .with_context("input", input.to_string()),
        )
    })?;
    let reference = state.node_ref(input, target).ok_or_else(|| {
        McsError::Config(
            ErrorInfo::new("unknown-node", "input refers to a node that is not in the state")
                .with_context("operator", kind.to_string())
                .with_context(input.to_string(), target.to_string()),
        )
    })?;
    let id = id.clone().unwrap_or_else(|| format!("{kind}({target})"));
    Ok((id, reference))
}

impl ChainConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, McsError> {
        serde_yaml::from_str(yaml)
            .map_err(|err| McsError::Serde(ErrorInfo::new("config-parse", err.to_string())))
    }

    /// Reads and parses a YAML file.
    pub fn load(path: &Path) -> Result<Self, McsError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            McsError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&contents).map_err(|err| {
            let mut info = err.info().clone();
            info.context.insert("path".into(), path.display().to_string());
            McsError::Serde(info)
        })
    }

    /// Renders the configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String, McsError> {
        serde_yaml::to_string(self)
            .map_err(|err| McsError::Serde(ErrorInfo::new("config-serialize", err.to_string())))
    }

    /// Builds and initialises the configured state.
    pub fn build_state(&self) -> Result<State, McsError> {
        let nodes = self
            .state
            .iter()
            .map(StateNodeConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        State::from_nodes(nodes)
    }

    /// Builds every configured operator against `state`.
    pub fn build_operators(&self, state: &State) -> Result<Vec<Box<dyn Operator>>, McsError> {
        self.operators.iter().map(|op| op.build(state)).collect()
    }
}
