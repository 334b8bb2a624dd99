//! Dataflow analysis framework.

use crate::controlflow::{BlockId, ControlFlowGraph};
use crate::errors::DataflowResult;
use crate::lattice::AbstractState;
use crate::transfer::TransferFunction;
use std::collections::BTreeMap;
use std::marker::PhantomData;

mod solver;

pub use solver::IntraproceduralDataflow;

/// Dataflow analysis result object.
///
/// Contains the exit abstract state of every block that ends a chain of
/// the analyzed procedure, after reaching fixpoint. Blocks that were
/// never reached, and blocks walked through in the middle of a chain,
/// have no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataflow<B, S> {
    exits: Vec<Option<S>>,
    _blocks: PhantomData<fn() -> B>,
}

impl<B: BlockId, S> Dataflow<B, S> {
    pub(crate) fn new(exits: Vec<Option<S>>) -> Self {
        Self {
            exits,
            _blocks: PhantomData,
        }
    }

    #[must_use]
    pub fn exit_state(&self, block: B) -> Option<&S> {
        self.exits.get(block.index()).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn contains(&self, block: B) -> bool {
        self.exit_state(block).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (B, &S)> {
        self.exits
            .iter()
            .enumerate()
            .filter_map(|(idx, state)| state.as_ref().map(|state| (B::from_index(idx), state)))
    }

    /// Number of recorded exit states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exits.iter().filter(|state| state.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exits.iter().all(Option::is_none)
    }

    #[must_use]
    pub fn into_map(self) -> BTreeMap<B, S> {
        self.exits
            .into_iter()
            .enumerate()
            .filter_map(|(idx, state)| state.map(|state| (B::from_index(idx), state)))
            .collect()
    }
}

impl<B: BlockId, S: AbstractState> Dataflow<B, S> {
    /// Joins every recorded exit state.
    #[must_use]
    pub fn join(&self, bottom: &S) -> S {
        crate::lattice::join_all(bottom, self.iter().map(|(_, state)| state))
    }
}

/// Performs a forward dataflow analysis from the entry block of `cfg`
/// with default options.
///
/// # Errors
///
/// This function fails if the transfer function fails on any reachable
/// instruction.
pub fn forward<G, T>(
    cfg: &G,
    transfer: &T,
    bottom: T::State,
) -> DataflowResult<Dataflow<G::Block, T::State>>
where
    G: ControlFlowGraph,
    T: TransferFunction<G>,
{
    IntraproceduralDataflow::new(cfg, transfer, bottom).run(cfg.entry_block())
}
