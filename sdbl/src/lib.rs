//! Environment preparation for local Spark sessions.
//!
//! Two tools share this crate: the `sdbl` bootstrapper (validates the run
//! environment and load date, then opens a session) and the `doctor`
//! diagnostic (cleans up PATH, provisions working directories, gates on the
//! installed engine version and runs a short self-test).
//!
//! - **[`core`]**: Pure, deterministic preparation logic. No I/O, no global
//!   environment mutation.
//! - **[`io`]**: Config files, directories, child processes, prompts.
//! - **[`engine`]**: The session contract the tools hand their configuration
//!   to, plus a local in-process implementation.
//!
//! [`bootstrap`] coordinates the pieces for the `sdbl` binary.

pub mod bootstrap;
pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
