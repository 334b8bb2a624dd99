//! Global error handling.
//!
//! The engine crate defines its own error type. It is unified here with
//! the errors of the ambient layers (logger, thread pool), so that a host
//! can wind every result at its top-level.
//!
//! ```rust
//! use dwflow::prelude::*;
//!
//! fn main() -> DwfResult<()> { // can return a DwfError
//!     init_logger(&LoggerOptions::default())?; // can return a SetLoggerError
//!     Ok(())
//! }
//! ```

use dw_dataflow::errors::DataflowError;
use thiserror::Error;

/// An alias for result that can be a [`DwfError`].
pub type DwfResult<T> = Result<T, DwfError>;

/// The main error type for error winding at the top-level.
/// It mainly consists of transparent wrapper over error types that
/// are defined in dependencies.
#[derive(Debug, Error)]
pub enum DwfError {
    /// Error that can be returned from [`dw_dataflow`] functions.
    #[error(transparent)]
    Dataflow(#[from] DataflowError),

    /// Error returned when a global logger is already installed.
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),

    /// Error that can be returned when building a dedicated analysis
    /// thread pool.
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
