use mcs_core::errors::ErrorInfo;
use mcs_core::{Dependent, McsError, NodeRef, RngHandle};

use crate::operator::{Operator, OperatorStats};

/// Redraws the height of a random non-root internal vertex uniformly between
/// its highest child and its parent.
pub struct UniformNodeHeightOperator {
    id: String,
    tree: NodeRef,
    weight: f64,
    stats: OperatorStats,
}

impl UniformNodeHeightOperator {
    /// Binds the operator to a tree node.
    pub fn new(id: impl Into<String>, tree: NodeRef, weight: f64) -> Result<Self, McsError> {
        let id = id.into();
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(McsError::Config(
                ErrorInfo::new("invalid-weight", "operator weight must be finite and non-negative")
                    .with_context("operator", id),
            ));
        }
        if !tree.with(|node| node.as_tree().is_some())? {
            return Err(McsError::Config(
                ErrorInfo::new("parameter-kind", "node height move requires a tree")
                    .with_context("operator", id),
            ));
        }
        Ok(Self {
            id,
            tree,
            weight,
            stats: OperatorStats::default(),
        })
    }
}

impl Dependent for UniformNodeHeightOperator {
    fn references(&self) -> Vec<NodeRef> {
        vec![self.tree.clone()]
    }
}

impl Operator for UniformNodeHeightOperator {
    fn id(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn proposal(&mut self, rng: &mut RngHandle) -> Result<f64, McsError> {
        let choice = self.tree.with(|node| {
            let tree = node.as_tree()?;
            let candidates = tree.non_root_internal_nodes();
            if candidates.is_empty() {
                return Some(None);
            }
            let vertex = candidates[rng.index(candidates.len())];
            let info = tree.node(vertex)?;
            let upper = tree.height(info.parent()?)?;
            let lower = info
                .children()
                .iter()
                .filter_map(|&child| tree.height(child))
                .fold(f64::NEG_INFINITY, f64::max);
            Some(Some((vertex, lower, upper)))
        })?;
        let Some(choice) = choice else {
            return Err(McsError::Kernel(
                ErrorInfo::new("parameter-kind", "target is not a tree")
                    .with_context("operator", self.id.clone()),
            ));
        };
        let Some((vertex, lower, upper)) = choice else {
            return Ok(f64::NEG_INFINITY);
        };

        let height = lower + rng.uniform() * (upper - lower);
        self.tree.with_mut(|mut node| {
            if let Some(tree) = node.tree_mut() {
                tree.set_height(vertex, height);
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
