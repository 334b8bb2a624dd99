//! Bounding the work of an analysis.
//!
//! The solver itself iterates until fixpoint. [`Budgeted`] wraps a
//! transfer function and fails the analysis once too many blocks have
//! been visited, which is how callers bound analyses over domains that
//! might not have finite height.

use crate::controlflow::ControlFlowGraph;
use crate::errors::{TransferFailure, TransferResult};
use crate::transfer::TransferFunction;
use std::cell::Cell;

#[derive(Debug)]
pub struct Budgeted<T> {
    inner: T,
    limit: usize,
    visits: Cell<usize>,
}

impl<T> Budgeted<T> {
    #[must_use]
    pub fn new(inner: T, limit: usize) -> Self {
        Self {
            inner,
            limit,
            visits: Cell::new(0),
        }
    }

    /// Number of blocks visited so far.
    #[must_use]
    pub fn visits(&self) -> usize {
        self.visits.get()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn reset(&self) {
        self.visits.set(0);
    }
}

impl<G, T> TransferFunction<G> for Budgeted<T>
where
    G: ControlFlowGraph,
    T: TransferFunction<G>,
{
    type State = T::State;

    fn apply(&self, instr: &G::Instr, state: Self::State) -> TransferResult<Self::State> {
        self.inner.apply(instr, state)
    }

    fn apply_block(&self, block: G::Block, state: Self::State) -> TransferResult<Self::State> {
        let visits = self.visits.get() + 1;
        self.visits.set(visits);
        if visits > self.limit {
            log::warn!("budget of {} block visits exhausted", self.limit);
            return Err(TransferFailure::BudgetExhausted(self.limit));
        }
        self.inner.apply_block(block, state)
    }

    fn initial_state(&self, entry: G::Block, bottom: &Self::State) -> Self::State {
        self.inner.initial_state(entry, bottom)
    }

    fn block_entry_state(
        &self,
        block: G::Block,
        predecessor: G::Block,
        predecessor_exit_state: &Self::State,
    ) -> Self::State {
        self.inner
            .block_entry_state(block, predecessor, predecessor_exit_state)
    }

    fn should_transfer_exceptional_control_flow(&self, block: G::Block, instr: &G::Instr) -> bool {
        self.inner
            .should_transfer_exceptional_control_flow(block, instr)
    }

    fn exceptional_block_entry_state(
        &self,
        handler: G::Block,
        guard: &G::Guard,
        throw_block: G::Block,
        throw_instr: &G::Instr,
        throw_state: &Self::State,
    ) -> Self::State {
        self.inner.exceptional_block_entry_state(
            handler,
            guard,
            throw_block,
            throw_instr,
            throw_state,
        )
    }
}
