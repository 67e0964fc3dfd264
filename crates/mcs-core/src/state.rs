//! Checkpointable collection of state nodes.

use std::collections::HashSet;
use std::fmt::{self, Display};
use std::rc::Rc;

use crate::errors::{ErrorInfo, McsError};
use crate::node::StateNode;
use crate::reference::{share, Dependent, NodeRef, SharedNode};

/// Registered reference point together with the slot it must track.
#[derive(Debug, Clone)]
struct Binding {
    reference: NodeRef,
    slot: usize,
}

/// The current point in state space plus its last checkpoint.
///
/// `active[i]` is the node visible to the model, `checkpoint[i]` the copy
/// taken by the last [`State::store`]. A stored checkpoint has the same
/// length as `active`, and `active[i]` always carries slot `i`.
#[derive(Default)]
pub struct State {
    active: Vec<SharedNode>,
    checkpoint: Option<Vec<SharedNode>>,
    bindings: Vec<Binding>,
    initialised: bool,
}

impl State {
    /// Empty state; populate with [`State::add_state_node`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and initialises a state from nodes in slot order.
    pub fn from_nodes(nodes: impl IntoIterator<Item = StateNode>) -> Result<Self, McsError> {
        let mut state = Self::new();
        for node in nodes {
            state.add_state_node(node)?;
        }
        state.init_and_validate()?;
        Ok(state)
    }

    /// Appends a node. Only valid before [`State::init_and_validate`].
    pub fn add_state_node(&mut self, node: StateNode) -> Result<(), McsError> {
        if self.initialised {
            return Err(McsError::Config(
                ErrorInfo::new("state-frozen", "cannot add nodes after initialisation")
                    .with_context("node", node.id().to_string()),
            ));
        }
        self.active.push(share(node));
        Ok(())
    }

    /// Assigns slot indices and freezes the node set.
    pub fn init_and_validate(&mut self) -> Result<(), McsError> {
        let mut seen = HashSet::new();
        for (slot, node) in self.active.iter().enumerate() {
            let mut node = node.borrow_mut();
            if !seen.insert(node.id().to_string()) {
                return Err(McsError::Config(
                    ErrorInfo::new("duplicate-id", "state node identifiers must be unique")
                        .with_context("node", node.id().to_string())
                        .with_context("slot", slot.to_string()),
                ));
            }
            node.assign_slot(slot);
        }
        self.checkpoint = None;
        self.initialised = true;
        Ok(())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns true when the state holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Whether a checkpoint is available for [`State::restore`].
    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Number of registered reference points.
    pub fn reference_count(&self) -> usize {
        self.bindings.len()
    }

    /// Active node at `slot`.
    pub fn node(&self, slot: usize) -> Option<SharedNode> {
        self.active.get(slot).cloned()
    }

    /// Active node with identifier `id`.
    pub fn node_by_id(&self, id: &str) -> Option<SharedNode> {
        self.state_node_index(id).and_then(|slot| self.node(slot))
    }

    /// Fresh reference point bound to the active node `id`.
    ///
    /// The handle is not registered until [`State::connect`] sees it.
    pub fn node_ref(&self, name: &str, id: &str) -> Option<NodeRef> {
        self.node_by_id(id).map(|node| NodeRef::bound(name, node))
    }

    /// Slot index for `id`, or `None` when no node carries it.
    pub fn state_node_index(&self, id: &str) -> Option<usize> {
        self.active.iter().position(|node| node.borrow().id() == id)
    }

    /// Dirty flag of the node in `slot`. Unknown slots report clean.
    pub fn is_dirty(&self, slot: usize) -> bool {
        self.active
            .get(slot)
            .map(|node| node.borrow().is_dirty())
            .unwrap_or(false)
    }

    /// Dirty flag of the node a reference point resolves to.
    pub fn is_dirty_ref(&self, reference: &NodeRef) -> bool {
        reference
            .resolve()
            .and_then(|node| node.borrow().slot())
            .map(|slot| self.is_dirty(slot))
            .unwrap_or(false)
    }

    /// Sets the dirty flag on every node.
    pub fn set_dirty(&mut self, dirty: bool) {
        for node in &self.active {
            node.borrow_mut().set_dirty(dirty);
        }
    }

    /// Scans `root` and everything it depends on, registering each reference
    /// point currently bound to one of this state's active nodes.
    ///
    /// Returns the number of newly registered reference points. Handles that
    /// share a binding are registered once.
    pub fn connect(&mut self, root: &dyn Dependent) -> usize {
        let mut visited = HashSet::new();
        let mut known: HashSet<_> = self
            .bindings
            .iter()
            .map(|binding| binding.reference.binding_key())
            .collect();
        let before = self.bindings.len();
        let mut stack: Vec<&dyn Dependent> = vec![root];
        while let Some(component) = stack.pop() {
            // Wide pointer: a wrapper and its first field share an address.
            let key: *const (dyn Dependent + '_) = component;
            if !visited.insert(key) {
                continue;
            }
            for reference in component.references() {
                let Some(slot) = self
                    .active
                    .iter()
                    .position(|node| reference.points_to(node))
                else {
                    continue;
                };
                if known.insert(reference.binding_key()) {
                    self.bindings.push(Binding { reference, slot });
                }
            }
            stack.extend(component.dependents());
        }
        self.bindings.len() - before
    }

    /// Snapshots every active node into the checkpoint array.
    ///
    /// A node that refuses to copy aborts the store with its slot and id in
    /// the error context; the previous checkpoint is left untouched.
    pub fn store(&mut self) -> Result<(), McsError> {
        self.ensure_initialised()?;
        let mut snapshot = Vec::with_capacity(self.active.len());
        for (slot, node) in self.active.iter().enumerate() {
            let node = node.borrow();
            let copy = node.copy().map_err(|err| copy_failure(err, slot, node.id()))?;
            snapshot.push(share(copy));
        }
        self.checkpoint = Some(snapshot);
        Ok(())
    }

    /// Swaps the checkpointed nodes back into the active array and rebinds
    /// every registered reference point.
    ///
    /// The checkpoint is consumed, so restoring twice requires a fresh
    /// [`State::store`] in between.
    pub fn restore(&mut self) -> Result<(), McsError> {
        self.ensure_initialised()?;
        let Some(stored) = self.checkpoint.take() else {
            return Err(McsError::State(
                ErrorInfo::new("no-checkpoint", "restore called without a stored checkpoint")
                    .with_hint("call store() before every proposal"),
            ));
        };
        debug_assert_eq!(self.active.len(), stored.len());
        self.active = stored;
        for binding in &self.bindings {
            binding.reference.bind(Rc::clone(&self.active[binding.slot]));
        }
        Ok(())
    }

    /// Independent state whose nodes are deep copies of the active nodes.
    ///
    /// The copy is initialised but has no registered reference points.
    pub fn copy(&self) -> Result<State, McsError> {
        let mut active = Vec::with_capacity(self.active.len());
        for (slot, node) in self.active.iter().enumerate() {
            let node = node.borrow();
            let copy = node.copy().map_err(|err| copy_failure(err, slot, node.id()))?;
            active.push(share(copy));
        }
        Ok(State {
            checkpoint: None,
            active,
            bindings: Vec::new(),
            initialised: self.initialised,
        })
    }

    /// Value snapshot of the active nodes, for comparisons.
    pub fn snapshot(&self) -> Vec<StateNode> {
        self.active.iter().map(|node| node.borrow().clone()).collect()
    }

    fn ensure_initialised(&self) -> Result<(), McsError> {
        if self.initialised {
            Ok(())
        } else {
            Err(McsError::Config(
                ErrorInfo::new("state-uninitialised", "state used before init_and_validate")
                    .with_hint("call init_and_validate() after adding nodes"),
            ))
        }
    }
}

fn copy_failure(err: McsError, slot: usize, id: &str) -> McsError {
    let mut info = err.info().clone();
    info.context.insert("slot".into(), slot.to_string());
    info.context.insert("node".into(), id.to_string());
    McsError::State(info)
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.active {
            writeln!(f, "{}", node.borrow())?;
        }
        Ok(())
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("nodes", &self.snapshot())
            .field("references", &self.bindings.len())
            .field("checkpointed", &self.has_checkpoint())
            .finish()
    }
}
