//! Dataflow errors definitions.

use thiserror::Error;

/// An alias for result that can be a [`DataflowError`].
pub type DataflowResult<T> = Result<T, DataflowError>;

/// An alias for the result of a transfer function: either the next
/// abstract state, or a [`TransferFailure`].
pub type TransferResult<S> = Result<S, TransferFailure>;

/// The failure marker a transfer function returns when the abstract
/// semantics cannot soundly model what it is given.
///
/// The carried reasons are for diagnostics only, the engine never
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferFailure {
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("analysis budget exhausted after {0} block visits")]
    BudgetExhausted(usize),
}

/// The dataflow error type.
#[derive(Debug, Error)]
pub enum DataflowError {
    /// The analysis was aborted by the transfer function. Partial results
    /// are discarded.
    #[error("transfer failure in block {block}: {failure}")]
    Transfer {
        block: usize,
        #[source]
        failure: TransferFailure,
    },

    #[error("control flow graph has no block")]
    EmptyCfg,

    #[error("unknown block: {0}")]
    UnknownBlock(usize),

    #[error("block {0} has a catch edge but no throwing instruction")]
    CatchWithoutThrow(usize),
}

impl DataflowError {
    /// Returns true if the error aborted an analysis run (as opposed to
    /// an error at control flow graph construction).
    #[must_use]
    pub fn is_transfer_failure(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }
}
