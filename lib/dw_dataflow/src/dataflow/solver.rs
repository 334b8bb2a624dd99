use crate::controlflow::{completed, BlockId, ControlFlowGraph};
use crate::dataflow::Dataflow;
use crate::errors::{DataflowError, DataflowResult, TransferFailure};
use crate::lattice::AbstractState;
use crate::options::DataflowOptions;
use crate::transfer::TransferFunction;
use crate::worklist::Worklist;
use fixedbitset::FixedBitSet;
use std::convert::Infallible;
use std::ops::ControlFlow;

/// Worklist fixpoint solver for one procedure.
///
/// Every run starts from fresh tables. They are kept after the run so
/// that entry states and per-instruction states can be queried, until
/// the next run.
#[derive(Debug)]
pub struct IntraproceduralDataflow<'a, G, T>
where
    G: ControlFlowGraph,
    T: TransferFunction<G>,
{
    cfg: &'a G,
    transfer: &'a T,
    bottom: T::State,
    options: DataflowOptions,
    roots: FixedBitSet,
    block_exit_states: Vec<Option<T::State>>,
    block_entry_states_cache: Vec<Option<T::State>>,
}

impl<'a, G, T> IntraproceduralDataflow<'a, G, T>
where
    G: ControlFlowGraph,
    T: TransferFunction<G>,
{
    pub fn new(cfg: &'a G, transfer: &'a T, bottom: T::State) -> Self {
        Self::with_options(cfg, transfer, bottom, DataflowOptions::default())
    }

    pub fn with_options(
        cfg: &'a G,
        transfer: &'a T,
        bottom: T::State,
        options: DataflowOptions,
    ) -> Self {
        let nb_blocks = cfg.block_count();
        let mut roots = FixedBitSet::with_capacity(nb_blocks);
        let entry = cfg.entry_block().index();
        if entry < nb_blocks {
            roots.insert(entry);
        }
        Self {
            cfg,
            transfer,
            bottom,
            options,
            roots,
            block_exit_states: vec![None; nb_blocks],
            block_entry_states_cache: vec![None; nb_blocks],
        }
    }

    /// Runs the analysis from `root` until fixpoint.
    ///
    /// # Errors
    ///
    /// Fails as soon as the transfer function fails on a reachable
    /// instruction or block, or if `root` is not a block of the graph.
    pub fn run(&mut self, root: G::Block) -> DataflowResult<Dataflow<G::Block, T::State>> {
        self.run_from(std::iter::once(root))
    }

    /// Runs the analysis from several roots at once. Each root gets the
    /// initial state of the transfer function.
    ///
    /// On failure every table is cleared, so that no partial state can be
    /// queried afterwards.
    ///
    /// # Errors
    ///
    /// Same as [`IntraproceduralDataflow::run`].
    pub fn run_from<I>(&mut self, roots: I) -> DataflowResult<Dataflow<G::Block, T::State>>
    where
        I: IntoIterator<Item = G::Block>,
    {
        self.clear();
        let nb_blocks = self.cfg.block_count();
        let mut worklist = Worklist::with_capacity(nb_blocks);
        for root in roots {
            let idx = root.index();
            if idx >= nb_blocks {
                self.clear();
                return Err(DataflowError::UnknownBlock(idx));
            }
            self.roots.insert(idx);
            worklist.add_ignoring_seen_set(root);
        }

        if let Err(err) = self.solve(&mut worklist) {
            self.clear();
            return Err(err);
        }
        Ok(Dataflow::new(self.block_exit_states.clone()))
    }

    fn clear(&mut self) {
        let nb_blocks = self.cfg.block_count();
        self.roots = FixedBitSet::with_capacity(nb_blocks);
        self.block_exit_states = vec![None; nb_blocks];
        self.block_entry_states_cache = vec![None; nb_blocks];
    }

    fn solve(&mut self, worklist: &mut Worklist<G::Block>) -> DataflowResult<()> {
        let mut nb_visits = 0usize;
        while let Some(initial_block) = worklist.next() {
            nb_visits += 1;
            log::debug!("    ---- chain from {initial_block:?}");

            // entry = join of predecessors exits (or cached accumulation)
            let mut state = self.compute_block_entry_state(initial_block);
            log::debug!("    -- ENTRY STATE: {state:?}");

            // then apply transfer functions along the chain of blocks
            // starting at initial_block
            let mut block = initial_block;
            let end = loop {
                state = self.transfer_block(block, state, worklist)?;
                match self.intermediate_successor(block) {
                    Some(successor) => block = successor,
                    None => break block,
                }
            };
            log::debug!("    -- EXIT STATE of {end:?}: {state:?}");

            // successors are treated again only if the exit state grew
            if self.set_block_exit_state(end, state.clone()) {
                self.cfg.for_each_successor(end, |successor| {
                    worklist.add_ignoring_seen_set(successor);
                });
            }
            self.update_block_entry_state_cache_for_successors(end, &state);
        }
        log::debug!("fixpoint reached after {nb_visits} chain visits");
        Ok(())
    }

    #[inline]
    fn is_root(&self, block: G::Block) -> bool {
        self.roots.contains(block.index())
    }

    /// Blocks with many predecessors keep their entry state as an
    /// accumulator instead of joining every predecessor at each visit.
    /// Catch handlers always do: their exceptional inputs are mid-block
    /// states that no exit state records.
    #[must_use]
    pub fn should_cache_entry_state_for(&self, block: G::Block) -> bool {
        self.cfg.predecessor_count(block) > self.options.entry_cache_threshold
            || self.cfg.has_exceptional_predecessors(block)
    }

    fn intermediate_successor(&self, block: G::Block) -> Option<G::Block> {
        if !self.options.collapse_trivial_edges
            || !self.cfg.has_unique_successor_with_unique_predecessor(block)
        {
            return None;
        }
        let successor = self.cfg.unique_successor(block)?;
        debug_assert!(self.cfg.has_unique_successor(block));
        (!self.is_root(successor)).then_some(successor)
    }

    /// Returns true if the analysis walks from `block` straight into its
    /// unique successor.
    #[must_use]
    pub fn is_block_with_intermediate_successor(&self, block: G::Block) -> bool {
        self.intermediate_successor(block).is_some()
    }

    /// Returns true if `block` is only ever analyzed as part of the chain
    /// of its unique predecessor. Such blocks have no entry state of their
    /// own, and an exit state only when they end the chain.
    #[must_use]
    pub fn is_intermediate_block(&self, block: G::Block) -> bool {
        if !self.options.collapse_trivial_edges
            || self.is_root(block)
            || !self.cfg.has_unique_predecessor(block)
        {
            return false;
        }
        self.cfg
            .predecessors(block)
            .next()
            .map_or(false, |predecessor| self.cfg.has_unique_successor(predecessor))
    }

    /// Computes the state on entry of `block` from the current tables.
    ///
    /// After a successful run, this is the fixpoint entry state of any
    /// block that is not intermediate.
    #[must_use]
    pub fn compute_block_entry_state(&self, block: G::Block) -> T::State {
        let initial = if self.is_root(block) {
            self.transfer.initial_state(block, &self.bottom)
        } else {
            self.bottom.clone()
        };

        if self.should_cache_entry_state_for(block) {
            let cached = self
                .block_entry_states_cache
                .get(block.index())
                .and_then(Option::as_ref);
            return match cached {
                Some(cached) => initial.join(cached),
                None => initial,
            };
        }

        completed(self.cfg.traverse_predecessors(
            block,
            initial,
            |predecessor, entry| -> ControlFlow<Infallible, T::State> {
                let exit = self.block_exit_state(predecessor).unwrap_or(&self.bottom);
                let edge_state = self.transfer.block_entry_state(block, predecessor, exit);
                ControlFlow::Continue(entry.join(&edge_state))
            },
        ))
    }

    /// The exit state recorded for `block`, if any.
    #[must_use]
    pub fn block_exit_state(&self, block: G::Block) -> Option<&T::State> {
        self.block_exit_states
            .get(block.index())
            .and_then(Option::as_ref)
    }

    fn transfer_block(
        &mut self,
        block: G::Block,
        state: T::State,
        worklist: &mut Worklist<G::Block>,
    ) -> DataflowResult<T::State> {
        let cfg = self.cfg;
        let transfer = self.transfer;

        let state = transfer
            .apply_block(block, state)
            .map_err(|failure| transfer_error(block, failure))?;

        let has_handlers = cfg.has_exceptional_successors(block);
        let traversal = cfg.traverse_instructions(block, state, |instr, state| {
            if has_handlers
                && cfg.instruction_can_throw(instr)
                && transfer.should_transfer_exceptional_control_flow(block, instr)
            {
                self.propagate_exceptional_state(block, instr, &state, worklist);
            }
            log::trace!("transfer_instr( {instr:?} )");
            log::trace!("    before: {state:?}");
            match transfer.apply(instr, state) {
                Ok(next) => {
                    log::trace!("    after:  {next:?}");
                    ControlFlow::Continue(next)
                }
                Err(failure) => ControlFlow::Break(failure),
            }
        });

        match traversal {
            ControlFlow::Continue(state) => Ok(state),
            ControlFlow::Break(failure) => Err(transfer_error(block, failure)),
        }
    }

    fn propagate_exceptional_state(
        &mut self,
        throw_block: G::Block,
        throw_instr: &G::Instr,
        throw_state: &T::State,
        worklist: &mut Worklist<G::Block>,
    ) {
        let cfg = self.cfg;
        let transfer = self.transfer;
        for (handler, guard) in cfg.exceptional_successors(throw_block) {
            let edge_state = transfer.exceptional_block_entry_state(
                handler,
                guard,
                throw_block,
                throw_instr,
                throw_state,
            );
            if self.join_into_entry_cache(handler, &edge_state) {
                log::debug!("    exceptional edge {throw_block:?} -> {handler:?} ({guard:?})");
                worklist.add_ignoring_seen_set(handler);
            }
        }
    }

    /// Returns true if the exit state of `block` changed.
    fn set_block_exit_state(&mut self, block: G::Block, state: T::State) -> bool {
        debug_assert!(!self.is_block_with_intermediate_successor(block));
        let slot = &mut self.block_exit_states[block.index()];
        if let Some(previous) = slot {
            debug_assert!(
                state.is_greater_than_or_equal(previous),
                "non monotonic exit state for {block:?}: {previous:?} then {state:?}"
            );
            if *previous == state {
                return false;
            }
        }
        *slot = Some(state);
        true
    }

    fn update_block_entry_state_cache_for_successors(&mut self, block: G::Block, state: &T::State) {
        let cfg = self.cfg;
        let transfer = self.transfer;
        for successor in cfg.successors(block) {
            if self.should_cache_entry_state_for(successor) {
                let edge_state = transfer.block_entry_state(successor, block, state);
                self.join_into_entry_cache(successor, &edge_state);
            }
        }
    }

    /// Returns true if the cached entry state of `block` changed.
    fn join_into_entry_cache(&mut self, block: G::Block, edge_state: &T::State) -> bool {
        let slot = &mut self.block_entry_states_cache[block.index()];
        let joined = match slot {
            Some(previous) => previous.join(edge_state),
            None => self.bottom.join(edge_state),
        };
        if slot.as_ref() == Some(&joined) {
            return false;
        }
        *slot = Some(joined);
        true
    }

    /// Replays the transfer function over every analyzed chain and gives
    /// `visitor` each instruction with the state before it.
    ///
    /// # Errors
    ///
    /// Fails if the transfer function fails, which cannot happen after a
    /// successful run with a pure transfer function.
    pub fn visit_instruction_states<F>(&self, mut visitor: F) -> DataflowResult<()>
    where
        F: FnMut(G::Block, &G::Instr, &T::State),
    {
        for idx in 0..self.cfg.block_count() {
            let initial_block = G::Block::from_index(idx);
            if self.is_intermediate_block(initial_block) {
                continue;
            }
            let mut chain = vec![initial_block];
            while let Some(successor) = chain.last().and_then(|b| self.intermediate_successor(*b)) {
                chain.push(successor);
            }
            if chain.last().and_then(|b| self.block_exit_state(*b)).is_none() {
                // chain never reached
                continue;
            }

            let mut state = self.compute_block_entry_state(initial_block);
            for block in chain {
                state = self
                    .transfer
                    .apply_block(block, state)
                    .map_err(|failure| transfer_error(block, failure))?;
                for instr in self.cfg.instructions(block) {
                    visitor(block, instr, &state);
                    state = self
                        .transfer
                        .apply(instr, state)
                        .map_err(|failure| transfer_error(block, failure))?;
                }
            }
        }
        Ok(())
    }
}

fn transfer_error<B: BlockId>(block: B, failure: TransferFailure) -> DataflowError {
    log::debug!("transfer failure in {block:?}: {failure}");
    DataflowError::Transfer {
        block: block.index(),
        failure,
    }
}
