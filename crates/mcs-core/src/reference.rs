//! Rebindable handles onto state nodes and the capability used to discover them.
//!
//! A [`crate::State`] replaces its active nodes wholesale on restore, so a
//! component that cached a node's identity would keep observing the rejected
//! proposal. Components therefore hold a [`NodeRef`] and resolve it on every
//! use; the state rebinds each registered `NodeRef` after every restore.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::errors::{ErrorInfo, McsError};
use crate::node::StateNode;

/// Shared, interior-mutable state node as stored in a state's slot arrays.
pub type SharedNode = Rc<RefCell<StateNode>>;

/// Wraps a node for insertion into a state.
pub fn share(node: StateNode) -> SharedNode {
    Rc::new(RefCell::new(node))
}

/// External reference point: a named, rebindable handle to a state node.
///
/// Clones share the same binding, so rebinding one clone is visible through
/// all of them.
#[derive(Clone)]
pub struct NodeRef {
    name: Rc<str>,
    target: Rc<RefCell<Option<SharedNode>>>,
}

impl NodeRef {
    /// Creates an unbound reference point.
    pub fn unbound(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            target: Rc::new(RefCell::new(None)),
        }
    }

    /// Creates a reference point bound to `node`.
    pub fn bound(name: &str, node: SharedNode) -> Self {
        let reference = Self::unbound(name);
        reference.bind(node);
        reference
    }

    /// Name of the input this reference fills.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Points the reference at `node`.
    pub fn bind(&self, node: SharedNode) {
        *self.target.borrow_mut() = Some(node);
    }

    /// Returns the currently bound node, if any.
    pub fn resolve(&self) -> Option<SharedNode> {
        self.target.borrow().clone()
    }

    /// Resolves or fails with a configuration error naming the input.
    pub fn require(&self) -> Result<SharedNode, McsError> {
        self.resolve().ok_or_else(|| {
            McsError::Config(
                ErrorInfo::new("unbound-reference", "reference point is not bound to a node")
                    .with_context("input", self.name.to_string()),
            )
        })
    }

    /// Whether the reference currently points at `node` (identity, not value).
    pub fn points_to(&self, node: &SharedNode) -> bool {
        self.target
            .borrow()
            .as_ref()
            .map(|current| Rc::ptr_eq(current, node))
            .unwrap_or(false)
    }

    /// Whether two handles share one binding.
    pub fn same_binding(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }

    pub(crate) fn binding_key(&self) -> *const RefCell<Option<SharedNode>> {
        Rc::as_ptr(&self.target)
    }

    /// Borrows the bound node immutably and applies `f`.
    pub fn with<T>(&self, f: impl FnOnce(Ref<'_, StateNode>) -> T) -> Result<T, McsError> {
        let node = self.require()?;
        let borrowed = node.try_borrow().map_err(|_| self.busy())?;
        Ok(f(borrowed))
    }

    /// Borrows the bound node mutably and applies `f`.
    pub fn with_mut<T>(&self, f: impl FnOnce(RefMut<'_, StateNode>) -> T) -> Result<T, McsError> {
        let node = self.require()?;
        let borrowed = node.try_borrow_mut().map_err(|_| self.busy())?;
        Ok(f(borrowed))
    }

    fn busy(&self) -> McsError {
        McsError::State(
            ErrorInfo::new("node-borrowed", "state node is already borrowed")
                .with_context("input", self.name.to_string()),
        )
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self
            .target
            .borrow()
            .as_ref()
            .and_then(|node| node.try_borrow().ok().map(|n| n.id().to_string()));
        f.debug_struct("NodeRef")
            .field("name", &self.name)
            .field("target", &target)
            .finish()
    }
}

/// Capability implemented by every component that reads state nodes.
///
/// `references` lists the component's own reference points and `dependents`
/// the sub-components it owns. [`crate::State::connect`] walks these declared
/// edges only.
pub trait Dependent {
    /// Reference points held directly by this component.
    fn references(&self) -> Vec<NodeRef>;

    /// Sub-components to visit recursively.
    fn dependents(&self) -> Vec<&dyn Dependent> {
        Vec::new()
    }
}

impl Dependent for NodeRef {
    fn references(&self) -> Vec<NodeRef> {
        vec![self.clone()]
    }
}
