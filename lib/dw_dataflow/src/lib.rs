//! This crate provides the intraprocedural dataflow engine of the
//! `dwflow` project: a worklist fixpoint solver, generic over the control
//! flow graph of a procedure and over the abstract domain computed on it.
//!
//! A domain is an [`AbstractState`] join-semilattice and a
//! [`TransferFunction`] giving its abstract semantics. Procedures are seen
//! through the [`ControlFlowGraph`] trait, [`controlflow::Cfg`] being a
//! ready-made `petgraph` implementation.

pub mod budget;
pub mod controlflow;
pub mod dataflow;
pub mod errors;
pub mod lattice;
pub mod options;
pub mod transfer;
pub mod worklist;

#[cfg(test)]
mod testing;

pub use crate::controlflow::ControlFlowGraph;
pub use crate::dataflow::{forward, Dataflow, IntraproceduralDataflow};
pub use crate::lattice::AbstractState;
pub use crate::options::DataflowOptions;
pub use crate::transfer::TransferFunction;
