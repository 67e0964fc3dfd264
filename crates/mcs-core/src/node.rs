//! State node types: the independently dirtyable pieces of a sampled state.

use std::fmt::{self, Display};

use crate::errors::{ErrorInfo, McsError};
use crate::tree::Tree;

/// Real-valued vector parameter with inclusive bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RealParameter {
    values: Vec<f64>,
    lower: f64,
    upper: f64,
}

impl RealParameter {
    /// Creates an unbounded parameter.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Creates a parameter restricted to `[lower, upper]`.
    pub fn with_bounds(values: Vec<f64>, lower: f64, upper: f64) -> Result<Self, McsError> {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(McsError::Config(
                ErrorInfo::new("invalid-bounds", "lower bound exceeds upper bound")
                    .with_context("lower", lower.to_string())
                    .with_context("upper", upper.to_string()),
            ));
        }
        if let Some((dim, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(lower..=upper).contains(*v))
        {
            return Err(McsError::Config(
                ErrorInfo::new("value-out-of-bounds", "initial value outside bounds")
                    .with_context("dimension", dim.to_string())
                    .with_context("value", value.to_string()),
            ));
        }
        Ok(Self {
            values,
            lower,
            upper,
        })
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Value at dimension `dim`, if present.
    pub fn value(&self, dim: usize) -> Option<f64> {
        self.values.get(dim).copied()
    }

    /// All values in dimension order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Overwrites the value at `dim`. Out of range dimensions are ignored.
    pub fn set_value(&mut self, dim: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(dim) {
            *slot = value;
        }
    }

    /// Inclusive lower bound.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Inclusive upper bound.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Returns true when `value` lies within the bounds.
    pub fn in_bounds(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Integer vector parameter with inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerParameter {
    values: Vec<i64>,
    lower: i64,
    upper: i64,
}

impl IntegerParameter {
    /// Creates an unbounded parameter.
    pub fn new(values: Vec<i64>) -> Self {
        Self {
            values,
            lower: i64::MIN,
            upper: i64::MAX,
        }
    }

    /// Creates a parameter restricted to `[lower, upper]`.
    pub fn with_bounds(values: Vec<i64>, lower: i64, upper: i64) -> Result<Self, McsError> {
        if lower > upper {
            return Err(McsError::Config(
                ErrorInfo::new("invalid-bounds", "lower bound exceeds upper bound")
                    .with_context("lower", lower.to_string())
                    .with_context("upper", upper.to_string()),
            ));
        }
        if let Some((dim, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(lower..=upper).contains(*v))
        {
            return Err(McsError::Config(
                ErrorInfo::new("value-out-of-bounds", "initial value outside bounds")
                    .with_context("dimension", dim.to_string())
                    .with_context("value", value.to_string()),
            ));
        }
        Ok(Self {
            values,
            lower,
            upper,
        })
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Value at dimension `dim`, if present.
    pub fn value(&self, dim: usize) -> Option<i64> {
        self.values.get(dim).copied()
    }

    /// All values in dimension order.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Overwrites the value at `dim`. Out of range dimensions are ignored.
    pub fn set_value(&mut self, dim: usize, value: i64) {
        if let Some(slot) = self.values.get_mut(dim) {
            *slot = value;
        }
    }

    /// Inclusive lower bound.
    pub fn lower(&self) -> i64 {
        self.lower
    }

    /// Inclusive upper bound.
    pub fn upper(&self) -> i64 {
        self.upper
    }
}

/// Payload carried by a [`StateNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// Real-valued vector.
    Real(RealParameter),
    /// Integer vector.
    Integer(IntegerParameter),
    /// Rooted binary tree.
    Tree(Tree),
}

impl NodeValue {
    fn kind(&self) -> &'static str {
        match self {
            NodeValue::Real(_) => "real",
            NodeValue::Integer(_) => "integer",
            NodeValue::Tree(_) => "tree",
        }
    }
}

/// One addressable component of the sampled state.
///
/// The slot index is assigned once by the owning [`crate::State`] and is
/// carried over by [`StateNode::copy`], so checkpoints keep their slot.
#[derive(Debug, Clone, PartialEq)]
pub struct StateNode {
    id: String,
    slot: Option<usize>,
    dirty: bool,
    value: NodeValue,
}

impl StateNode {
    /// Creates a node around an arbitrary payload.
    pub fn new(id: impl Into<String>, value: NodeValue) -> Self {
        Self {
            id: id.into(),
            slot: None,
            dirty: false,
            value,
        }
    }

    /// Convenience constructor for a real parameter node.
    pub fn real(id: impl Into<String>, parameter: RealParameter) -> Self {
        Self::new(id, NodeValue::Real(parameter))
    }

    /// Convenience constructor for an integer parameter node.
    pub fn integer(id: impl Into<String>, parameter: IntegerParameter) -> Self {
        Self::new(id, NodeValue::Integer(parameter))
    }

    /// Convenience constructor for a tree node.
    pub fn tree(id: impl Into<String>, tree: Tree) -> Self {
        Self::new(id, NodeValue::Tree(tree))
    }

    /// Stable identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Slot index within the owning state, once assigned.
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub(crate) fn assign_slot(&mut self, slot: usize) {
        self.slot = Some(slot);
    }

    /// Whether the node changed since dirtiness was last cleared.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sets the dirty flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Read-only payload.
    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    /// Real parameter view, if this node holds one.
    pub fn as_real(&self) -> Option<&RealParameter> {
        match &self.value {
            NodeValue::Real(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable real parameter view. Marks the node dirty.
    pub fn real_mut(&mut self) -> Option<&mut RealParameter> {
        match &mut self.value {
            NodeValue::Real(p) => {
                self.dirty = true;
                Some(p)
            }
            _ => None,
        }
    }

    /// Integer parameter view, if this node holds one.
    pub fn as_integer(&self) -> Option<&IntegerParameter> {
        match &self.value {
            NodeValue::Integer(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable integer parameter view. Marks the node dirty.
    pub fn integer_mut(&mut self) -> Option<&mut IntegerParameter> {
        match &mut self.value {
            NodeValue::Integer(p) => {
                self.dirty = true;
                Some(p)
            }
            _ => None,
        }
    }

    /// Tree view, if this node holds one.
    pub fn as_tree(&self) -> Option<&Tree> {
        match &self.value {
            NodeValue::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable tree view. Marks the node dirty.
    pub fn tree_mut(&mut self) -> Option<&mut Tree> {
        match &mut self.value {
            NodeValue::Tree(t) => {
                self.dirty = true;
                Some(t)
            }
            _ => None,
        }
    }

    /// Short payload kind label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        self.value.kind()
    }

    /// Deep copy with identical values and no shared mutable substructure.
    ///
    /// Trees are validated first; an inconsistent tree refuses to copy.
    pub fn copy(&self) -> Result<StateNode, McsError> {
        if let NodeValue::Tree(tree) = &self.value {
            tree.validate().map_err(|err| {
                let mut info = err.info().clone();
                info.context.insert("node".into(), self.id.clone());
                McsError::State(info)
            })?;
        }
        Ok(self.clone())
    }
}

impl Display for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.id)?;
        match &self.value {
            NodeValue::Real(p) => write!(f, "{:?}", p.values()),
            NodeValue::Integer(p) => write!(f, "{:?}", p.values()),
            NodeValue::Tree(t) => write!(f, "{}", t.to_newick()),
        }
    }
}
