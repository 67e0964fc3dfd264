#![deny(missing_docs)]
#![doc = "Checkpointable sampler state for the MCS engine: state nodes, the state container and the reference points that track it across restores."]

pub mod errors;
pub mod node;
pub mod reference;
pub mod rng;
pub mod state;
pub mod tree;

pub use errors::{ErrorInfo, McsError};
pub use node::{IntegerParameter, NodeValue, RealParameter, StateNode};
pub use reference::{share, Dependent, NodeRef, SharedNode};
pub use rng::{derive_substream_seed, RngHandle};
pub use state::State;
pub use tree::{Tree, TreeNode};
