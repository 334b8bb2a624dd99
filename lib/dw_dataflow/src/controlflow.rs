//! Control flow graph representation.
//!
//! The solver only sees a procedure through the [`ControlFlowGraph`]
//! trait. [`Cfg`] is a ready-made implementation on top of `petgraph`,
//! built with a [`CfgBuilder`].

use crate::errors::{DataflowError, DataflowResult};
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::fmt::Write;
use std::hash::Hash;
use std::ops::ControlFlow;

pub use petgraph::graph::NodeIndex;

/// Dense block identifier.
///
/// Blocks of a graph with `n` blocks are numbered `0..n`, so that
/// per-block tables can be plain vectors.
pub trait BlockId: Copy + Eq + Ord + Hash + fmt::Debug {
    fn index(self) -> usize;

    fn from_index(index: usize) -> Self;
}

impl BlockId for NodeIndex {
    #[inline]
    fn index(self) -> usize {
        NodeIndex::index(self)
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        NodeIndex::new(index)
    }
}

/// Read-only view over the blocks and instructions of a procedure.
///
/// Predecessors and successors are the *normal* control flow edges.
/// Exceptional edges (from a block containing throwing instructions to a
/// catch handler) are queried separately.
pub trait ControlFlowGraph {
    type Block: BlockId;
    type Instr: fmt::Debug;
    type Guard: fmt::Debug;

    fn entry_block(&self) -> Self::Block;

    /// Number of blocks, block ids are `0..block_count()`.
    fn block_count(&self) -> usize;

    fn predecessors(&self, block: Self::Block) -> impl Iterator<Item = Self::Block> + '_;

    fn successors(&self, block: Self::Block) -> impl Iterator<Item = Self::Block> + '_;

    /// Blocks containing a throwing instruction guarded by `block`.
    fn exceptional_predecessors(&self, block: Self::Block)
        -> impl Iterator<Item = Self::Block> + '_;

    /// Catch handlers of `block`, with the guard of each handler.
    fn exceptional_successors(
        &self,
        block: Self::Block,
    ) -> impl Iterator<Item = (Self::Block, &Self::Guard)> + '_;

    fn instructions(&self, block: Self::Block) -> impl Iterator<Item = &Self::Instr> + '_;

    fn instruction_can_throw(&self, instr: &Self::Instr) -> bool;

    fn predecessor_count(&self, block: Self::Block) -> usize {
        self.predecessors(block).count()
    }

    fn successor_count(&self, block: Self::Block) -> usize {
        self.successors(block).count()
    }

    fn has_exceptional_predecessors(&self, block: Self::Block) -> bool {
        self.exceptional_predecessors(block).next().is_some()
    }

    fn has_exceptional_successors(&self, block: Self::Block) -> bool {
        self.exceptional_successors(block).next().is_some()
    }

    /// A catch handler never has a unique predecessor.
    fn has_unique_predecessor(&self, block: Self::Block) -> bool {
        self.predecessor_count(block) == 1 && !self.has_exceptional_predecessors(block)
    }

    fn has_unique_successor(&self, block: Self::Block) -> bool {
        self.successor_count(block) == 1
    }

    fn unique_successor(&self, block: Self::Block) -> Option<Self::Block> {
        let mut successors = self.successors(block);
        match (successors.next(), successors.next()) {
            (Some(successor), None) => Some(successor),
            _ => None,
        }
    }

    /// True iff the edge leaving `block` branches neither out of `block`
    /// nor into its successor.
    fn has_unique_successor_with_unique_predecessor(&self, block: Self::Block) -> bool {
        self.unique_successor(block)
            .map_or(false, |successor| self.has_unique_predecessor(successor))
    }

    /// Folds `visitor` over the instructions of `block` in order, stopping at
    /// the first `Break`.
    fn traverse_instructions<S, R, F>(
        &self,
        block: Self::Block,
        initial: S,
        mut visitor: F,
    ) -> ControlFlow<R, S>
    where
        F: FnMut(&Self::Instr, S) -> ControlFlow<R, S>,
    {
        let mut acc = initial;
        for instr in self.instructions(block) {
            match visitor(instr, acc) {
                ControlFlow::Continue(next) => acc = next,
                ControlFlow::Break(res) => return ControlFlow::Break(res),
            }
        }
        ControlFlow::Continue(acc)
    }

    /// Folds `visitor` over the normal predecessors of `block`, stopping at
    /// the first `Break`.
    fn traverse_predecessors<T, R, F>(
        &self,
        block: Self::Block,
        initial: T,
        mut visitor: F,
    ) -> ControlFlow<R, T>
    where
        F: FnMut(Self::Block, T) -> ControlFlow<R, T>,
    {
        let mut acc = initial;
        for predecessor in self.predecessors(block) {
            match visitor(predecessor, acc) {
                ControlFlow::Continue(next) => acc = next,
                ControlFlow::Break(res) => return ControlFlow::Break(res),
            }
        }
        ControlFlow::Continue(acc)
    }

    fn for_each_successor<F>(&self, block: Self::Block, action: F)
    where
        F: FnMut(Self::Block),
    {
        self.successors(block).for_each(action);
    }
}

/// Unwraps a traversal that cannot break.
pub(crate) fn completed<T>(traversal: ControlFlow<Infallible, T>) -> T {
    match traversal {
        ControlFlow::Continue(acc) => acc,
        ControlFlow::Break(never) => match never {},
    }
}

/// Instructions stored in a [`Cfg`].
pub trait Instruction {
    /// Returns true if executing the instruction may raise an exception
    /// that a catch handler of its block can observe.
    fn can_throw(&self) -> bool;
}

#[derive(Debug)]
pub struct Block<I> {
    instrs: Vec<I>,
    can_throw: bool,
}

impl<I: fmt::Display> fmt::Display for Block<I> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.instrs.is_empty() {
            write!(f, "<END>")?;
            return Ok(());
        }
        for (i, instr) in self.instrs.iter().enumerate() {
            writeln!(f, "{i:5}: {instr}")?;
        }
        Ok(())
    }
}

impl<I: Instruction> Block<I> {
    fn new(instrs: Vec<I>) -> Self {
        let can_throw = instrs.iter().any(Instruction::can_throw);
        Self { instrs, can_throw }
    }
}

impl<I> Block<I> {
    #[inline]
    pub fn instructions(&self) -> impl Iterator<Item = &I> {
        self.instrs.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    #[inline]
    pub fn can_throw(&self) -> bool {
        self.can_throw
    }
}

/// Exception class a catch handler accepts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Guard {
    Class(String),
    Any,
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Class(name) => write!(f, "{name}"),
            Self::Any => write!(f, "*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    IfTrue,
    IfFalse,
    Switch(i32),
    SwitchDefault,
    Jmp,
    Sequence,
    Catch(Guard),
}

impl Branch {
    #[inline]
    #[must_use]
    pub fn is_exceptional(&self) -> bool {
        matches!(self, Self::Catch(_))
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::IfTrue => write!(f, "<true>"),
            Self::IfFalse => write!(f, "<false>"),
            Self::Switch(key) => write!(f, "<switch {key}>"),
            Self::SwitchDefault => write!(f, "<switch _>"),
            Self::Jmp => write!(f, "<jmp>"),
            Self::Sequence => write!(f, "<seq>"),
            Self::Catch(guard) => write!(f, "<catch {guard}>"),
        }
    }
}

/// Normal neighbours of a block, without duplicates, in index order.
#[derive(Debug)]
struct Neighbors {
    predecessors: Vec<NodeIndex>,
    successors: Vec<NodeIndex>,
}

#[derive(Debug)]
pub struct Cfg<I> {
    inner: DiGraph<Block<I>, Branch>,
    entry: NodeIndex,
    neighbors: Vec<Neighbors>,
}

impl<I> Cfg<I> {
    #[must_use]
    pub fn block(&self, id: NodeIndex) -> Option<&Block<I>> {
        self.inner.node_weight(id)
    }

    pub fn iter_blocks(&self) -> impl Iterator<Item = (NodeIndex, &Block<I>)> {
        self.inner
            .node_indices()
            .map(move |id| (id, &self.inner[id]))
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &Branch)> {
        self.inner
            .edge_references()
            .map(|edge| (edge.source(), edge.target(), edge.weight()))
    }
}

// parallel edges (e.g. several switch keys to the same target) count once
fn normal_neighbors<I>(
    cfgraph: &DiGraph<Block<I>, Branch>,
    block: NodeIndex,
    dir: Direction,
) -> Vec<NodeIndex> {
    let set: BTreeSet<NodeIndex> = cfgraph
        .edges_directed(block, dir)
        .filter(|edge| !edge.weight().is_exceptional())
        .map(|edge| match dir {
            Direction::Incoming => edge.source(),
            Direction::Outgoing => edge.target(),
        })
        .collect();
    set.into_iter().collect()
}

impl<I: fmt::Display> Cfg<I> {
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut res = String::new();
        res.push_str("digraph {\n");
        res.push_str("  splines=ortho;\n");
        res.push_str("  nodesep=2;\n");
        // writing into a String cannot fail
        let _ = write!(
            res,
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::GraphContentOnly, Config::EdgeNoLabel],
                &|_, edge| {
                    let color = match edge.weight() {
                        Branch::IfTrue => "green",
                        Branch::IfFalse => "red",
                        Branch::Switch(_) | Branch::SwitchDefault => "purple",
                        Branch::Jmp => "blue",
                        Branch::Catch(_) => "orchid",
                        Branch::Sequence => "black",
                    };
                    format!("color={},xlabel=\"{}\"", color, edge.weight())
                },
                &|_, (id, block)| if id == self.entry {
                    String::from("shape=box,style=bold")
                } else if block.can_throw() {
                    String::from("shape=box,color=blue")
                } else {
                    String::from("shape=box,color=black")
                }
            )
        );
        res.push('}');
        res
    }
}

impl<I: Instruction + fmt::Debug> ControlFlowGraph for Cfg<I> {
    type Block = NodeIndex;
    type Instr = I;
    type Guard = Guard;

    fn entry_block(&self) -> NodeIndex {
        self.entry
    }

    fn block_count(&self) -> usize {
        self.inner.node_count()
    }

    fn predecessors(&self, block: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.neighbors[block.index()].predecessors.iter().copied()
    }

    fn successors(&self, block: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.neighbors[block.index()].successors.iter().copied()
    }

    fn predecessor_count(&self, block: NodeIndex) -> usize {
        self.neighbors[block.index()].predecessors.len()
    }

    fn successor_count(&self, block: NodeIndex) -> usize {
        self.neighbors[block.index()].successors.len()
    }

    fn exceptional_predecessors(&self, block: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner
            .edges_directed(block, Direction::Incoming)
            .filter(|edge| edge.weight().is_exceptional())
            .map(|edge| edge.source())
    }

    fn exceptional_successors(
        &self,
        block: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, &Guard)> + '_ {
        self.inner
            .edges_directed(block, Direction::Outgoing)
            .filter_map(|edge| match edge.weight() {
                Branch::Catch(guard) => Some((edge.target(), guard)),
                _ => None,
            })
    }

    fn instructions(&self, block: NodeIndex) -> impl Iterator<Item = &I> + '_ {
        self.inner[block].instructions()
    }

    fn instruction_can_throw(&self, instr: &I) -> bool {
        instr.can_throw()
    }
}

/// Incremental [`Cfg`] construction.
///
/// The first block added is the entry block unless another one is chosen
/// with [`CfgBuilder::set_entry`]. Edges are checked when the graph is
/// built.
#[derive(Debug)]
pub struct CfgBuilder<I> {
    blocks: Vec<Block<I>>,
    edges: Vec<(usize, usize, Branch)>,
    entry: Option<usize>,
}

impl<I: Instruction> Default for CfgBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Instruction> CfgBuilder<I> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            edges: Vec::new(),
            entry: None,
        }
    }

    pub fn add_block(&mut self, instrs: Vec<I>) -> NodeIndex {
        self.blocks.push(Block::new(instrs));
        NodeIndex::new(self.blocks.len() - 1)
    }

    pub fn set_entry(&mut self, block: NodeIndex) -> &mut Self {
        self.entry = Some(block.index());
        self
    }

    pub fn add_edge(&mut self, src: NodeIndex, dst: NodeIndex, branch: Branch) -> &mut Self {
        self.edges.push((src.index(), dst.index(), branch));
        self
    }

    /// Builds the graph.
    ///
    /// # Errors
    ///
    /// Fails if there is no block, if an edge or the entry refer to an
    /// unknown block, or if a catch edge leaves a block without any
    /// throwing instruction.
    pub fn build(self) -> DataflowResult<Cfg<I>> {
        if self.blocks.is_empty() {
            return Err(DataflowError::EmptyCfg);
        }
        let nb_blocks = self.blocks.len();
        let entry = self.entry.unwrap_or(0);
        if entry >= nb_blocks {
            return Err(DataflowError::UnknownBlock(entry));
        }
        for (src, dst, branch) in &self.edges {
            if let Some(unknown) = [*src, *dst].into_iter().find(|id| *id >= nb_blocks) {
                return Err(DataflowError::UnknownBlock(unknown));
            }
            if branch.is_exceptional() && !self.blocks[*src].can_throw() {
                return Err(DataflowError::CatchWithoutThrow(*src));
            }
        }

        let mut cfgraph = DiGraph::with_capacity(nb_blocks, self.edges.len());
        for block in self.blocks {
            cfgraph.add_node(block);
        }
        for (src, dst, branch) in self.edges {
            cfgraph.add_edge(NodeIndex::new(src), NodeIndex::new(dst), branch);
        }
        let neighbors = cfgraph
            .node_indices()
            .map(|block| Neighbors {
                predecessors: normal_neighbors(&cfgraph, block, Direction::Incoming),
                successors: normal_neighbors(&cfgraph, block, Direction::Outgoing),
            })
            .collect();
        log::debug!(
            "built cfg: {} blocks, {} edges",
            cfgraph.node_count(),
            cfgraph.edge_count()
        );

        Ok(Cfg {
            inner: cfgraph,
            entry: NodeIndex::new(entry),
            neighbors,
        })
    }
}
