//! Abstract semantics plugged into the solver.

use crate::controlflow::ControlFlowGraph;
use crate::errors::TransferResult;
use crate::lattice::AbstractState;

/// The transfer functions of an abstract domain over the procedures
/// described by `G`.
///
/// Only [`TransferFunction::apply`] is mandatory. Every other hook has a
/// default that leaves the state untouched, so a domain that does not
/// care about entry facts, branch conditions or exceptions does not have
/// to say anything about them.
///
/// Implementations must be pure with respect to the solver: calling a
/// method twice with the same arguments gives the same result.
pub trait TransferFunction<G: ControlFlowGraph> {
    type State: AbstractState;

    /// The instruction transfer function.
    ///
    /// # Errors
    ///
    /// Returns a `TransferFailure` if the instruction cannot be soundly
    /// modeled, which aborts the whole analysis.
    fn apply(&self, instr: &G::Instr, state: Self::State) -> TransferResult<Self::State>;

    /// Whole-block transfer, applied when a block is entered and before
    /// its instructions.
    ///
    /// # Errors
    ///
    /// Same as [`TransferFunction::apply`].
    fn apply_block(&self, _block: G::Block, state: Self::State) -> TransferResult<Self::State> {
        Ok(state)
    }

    /// The state on entry of a root block, before joining any incoming
    /// edge.
    fn initial_state(&self, _entry: G::Block, bottom: &Self::State) -> Self::State {
        bottom.clone()
    }

    /// The state flowing along the normal edge `predecessor -> block`.
    fn block_entry_state(
        &self,
        _block: G::Block,
        _predecessor: G::Block,
        predecessor_exit_state: &Self::State,
    ) -> Self::State {
        predecessor_exit_state.clone()
    }

    /// Whether the state before `instr` flows to the catch handlers of
    /// `block`.
    fn should_transfer_exceptional_control_flow(
        &self,
        _block: G::Block,
        _instr: &G::Instr,
    ) -> bool {
        true
    }

    /// The state flowing into `handler` when `throw_instr` raises an
    /// exception matched by `guard`. `throw_state` is the state before
    /// `throw_instr`.
    fn exceptional_block_entry_state(
        &self,
        _handler: G::Block,
        _guard: &G::Guard,
        _throw_block: G::Block,
        _throw_instr: &G::Instr,
        throw_state: &Self::State,
    ) -> Self::State {
        throw_state.clone()
    }
}

impl<G, T> TransferFunction<G> for &T
where
    G: ControlFlowGraph,
    T: TransferFunction<G> + ?Sized,
{
    type State = T::State;

    fn apply(&self, instr: &G::Instr, state: Self::State) -> TransferResult<Self::State> {
        (**self).apply(instr, state)
    }

    fn apply_block(&self, block: G::Block, state: Self::State) -> TransferResult<Self::State> {
        (**self).apply_block(block, state)
    }

    fn initial_state(&self, entry: G::Block, bottom: &Self::State) -> Self::State {
        (**self).initial_state(entry, bottom)
    }

    fn block_entry_state(
        &self,
        block: G::Block,
        predecessor: G::Block,
        predecessor_exit_state: &Self::State,
    ) -> Self::State {
        (**self).block_entry_state(block, predecessor, predecessor_exit_state)
    }

    fn should_transfer_exceptional_control_flow(&self, block: G::Block, instr: &G::Instr) -> bool {
        (**self).should_transfer_exceptional_control_flow(block, instr)
    }

    fn exceptional_block_entry_state(
        &self,
        handler: G::Block,
        guard: &G::Guard,
        throw_block: G::Block,
        throw_instr: &G::Instr,
        throw_state: &Self::State,
    ) -> Self::State {
        (**self).exceptional_block_entry_state(handler, guard, throw_block, throw_instr, throw_state)
    }
}
