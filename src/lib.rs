//! # `dwflow`
//!
//! `dwflow` is the main crate of the `dwflow` dataflow analysis project. The
//! fixpoint engine itself lives in the [`dw_dataflow`] sub-crate, reexported
//! here as [`dataflow`]. This crate adds what a host needs around it:
//! unified error handling, logger initialization and parallel analysis of
//! many procedures ([`batch`]). Most of the reexport are done within the
//! `dwflow::prelude` namespace.
//!
//! ## Library basics
//!
//! An analysis is a lattice of abstract states plus a transfer function
//! over the instructions of a control flow graph:
//!
//! ```rust
//! use dwflow::prelude::*;
//! use dwflow::dataflow::controlflow::{Branch, Instruction};
//! use dwflow::dataflow::errors::TransferResult;
//! use std::collections::BTreeSet;
//!
//! #[derive(Debug)]
//! enum Instr {
//!     Def(&'static str),
//!     Nop,
//! }
//!
//! impl Instruction for Instr {
//!     fn can_throw(&self) -> bool {
//!         false
//!     }
//! }
//!
//! // variables that may have been defined
//! struct Defined;
//!
//! impl TransferFunction<Cfg<Instr>> for Defined {
//!     type State = BTreeSet<&'static str>;
//!
//!     fn apply(&self, instr: &Instr, mut state: Self::State) -> TransferResult<Self::State> {
//!         if let Instr::Def(var) = instr {
//!             state.insert(*var);
//!         }
//!         Ok(state)
//!     }
//! }
//!
//! let mut builder = CfgBuilder::new();
//! let entry = builder.add_block(vec![Instr::Def("x")]);
//! let then = builder.add_block(vec![Instr::Def("y")]);
//! let exit = builder.add_block(vec![Instr::Nop]);
//! builder
//!     .add_edge(entry, then, Branch::IfTrue)
//!     .add_edge(entry, exit, Branch::IfFalse)
//!     .add_edge(then, exit, Branch::Jmp);
//! let cfg = builder.build()?;
//!
//! let res = dwflow::dataflow::forward(&cfg, &Defined, BTreeSet::new())?;
//! assert_eq!(res.exit_state(exit).map(BTreeSet::len), Some(2));
//! # Ok::<(), DwfError>(())
//! ```
//!
//! ## Sub-crates
//!
//!  - [`dw_dataflow`] contains the abstractions (lattice, control flow
//!    graph, transfer function) and the worklist solver.

mod errors;

pub mod batch;

pub use dw_dataflow as dataflow;

/// Reexport module of commonly used structures and functions from `dwflow`
/// project sub-crates:
///
/// ```rust
/// use dwflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::batch::{analyze_all, BatchOptions, Outcome, Procedure};
    pub use crate::errors::{DwfError, DwfResult};

    pub use dw_dataflow::controlflow::{Cfg, CfgBuilder, ControlFlowGraph};
    pub use dw_dataflow::errors::{DataflowError, TransferFailure};
    pub use dw_dataflow::{
        AbstractState, Dataflow, DataflowOptions, IntraproceduralDataflow, TransferFunction,
    };

    use serde::{Deserialize, Serialize};

    /// Logger settings, usually filled from a host command line.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct LoggerOptions {
        pub debug: bool,
        pub verbose: bool,
        pub ecs: bool,
    }

    /// Installs the global logger.
    ///
    /// The level filter is read from `DWF_LOG` (`info` by default) and the
    /// style from `DWF_LOG_STYLE`. `verbose` forces the trace level, which
    /// logs abstract states around every transferred instruction, and
    /// `debug` forces the debug level.
    ///
    /// # Errors
    ///
    /// Fails if a global logger is already installed.
    pub fn init_logger(options: &LoggerOptions) -> DwfResult<()> {
        let env = env_logger::Env::new()
            .filter_or("DWF_LOG", "info")
            .write_style("DWF_LOG_STYLE");

        let mut builder = env_logger::Builder::from_env(env);
        if options.verbose {
            builder.filter_level(log::LevelFilter::Trace);
        } else if options.debug {
            builder.filter_level(log::LevelFilter::Debug);
        }
        if options.ecs {
            builder.format(ecs_logger::format);
        }
        builder.try_init()?;
        Ok(())
    }
}
