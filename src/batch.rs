//! Parallel analysis of many procedures.
//!
//! Each procedure gets its own solver, procedures are spread over the
//! `rayon` thread pool (the global one, or a dedicated one when a number
//! of threads is requested).

use crate::errors::DwfResult;
use dw_dataflow::budget::Budgeted;
use dw_dataflow::controlflow::ControlFlowGraph;
use dw_dataflow::errors::DataflowResult;
use dw_dataflow::options::DataflowOptions;
use dw_dataflow::transfer::TransferFunction;
use dw_dataflow::{Dataflow, IntraproceduralDataflow};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A procedure to analyze, together with the domain to analyze it with.
pub trait Procedure: Sync {
    type Cfg: ControlFlowGraph;
    type Transfer: TransferFunction<Self::Cfg>;

    fn name(&self) -> String;

    fn cfg(&self) -> &Self::Cfg;

    fn transfer(&self) -> &Self::Transfer;

    fn bottom(&self) -> StateOf<Self>;
}

pub type StateOf<P> =
    <<P as Procedure>::Transfer as TransferFunction<<P as Procedure>::Cfg>>::State;

pub type BlockOf<P> = <<P as Procedure>::Cfg as ControlFlowGraph>::Block;

/// Analysis result of one procedure.
#[derive(Debug)]
pub struct Outcome<P: Procedure> {
    pub name: String,
    pub result: DataflowResult<Dataflow<BlockOf<P>, StateOf<P>>>,
}

impl<P: Procedure> Outcome<P> {
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    pub dataflow: DataflowOptions,

    /// Maximum number of block visits per procedure, unbounded if unset.
    pub block_budget: Option<usize>,

    /// Size of a dedicated thread pool, the global pool is used if unset.
    pub threads: Option<usize>,
}

/// Analyzes every procedure from its entry block.
///
/// A failing procedure does not stop the others: its error is reported
/// in its [`Outcome`]. Outcomes are in the order of `procedures`.
///
/// # Errors
///
/// Fails only if the dedicated thread pool cannot be built.
pub fn analyze_all<P>(procedures: &[P], options: &BatchOptions) -> DwfResult<Vec<Outcome<P>>>
where
    P: Procedure,
    StateOf<P>: Send,
{
    let outcomes = match options.threads {
        Some(nb_threads) => {
            log::debug!("building a pool of {nb_threads} analysis threads");
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(nb_threads)
                .build()?;
            pool.install(|| analyze_par(procedures, options))
        }
        None => analyze_par(procedures, options),
    };

    let nb_success = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    log::info!("analyzed procedures: {} / {}", nb_success, outcomes.len());

    Ok(outcomes)
}

fn analyze_par<P>(procedures: &[P], options: &BatchOptions) -> Vec<Outcome<P>>
where
    P: Procedure,
    StateOf<P>: Send,
{
    procedures
        .par_iter()
        .map(|procedure| analyze(procedure, options))
        .collect()
}

fn analyze<P: Procedure>(procedure: &P, options: &BatchOptions) -> Outcome<P> {
    let name = procedure.name();
    log::info!("analyze {name}");

    let cfg = procedure.cfg();
    let result = match options.block_budget {
        Some(limit) => {
            let transfer = Budgeted::new(procedure.transfer(), limit);
            IntraproceduralDataflow::with_options(
                cfg,
                &transfer,
                procedure.bottom(),
                options.dataflow,
            )
            .run(cfg.entry_block())
        }
        None => IntraproceduralDataflow::with_options(
            cfg,
            procedure.transfer(),
            procedure.bottom(),
            options.dataflow,
        )
        .run(cfg.entry_block()),
    };

    match &result {
        Ok(res) => log::debug!("{name}: {} exit states", res.len()),
        Err(err) => log::error!("{name}: {err}"),
    }
    Outcome { name, result }
}
