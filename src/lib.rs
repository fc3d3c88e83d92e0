//! # fanout
//!
//! Bounded parallel execution of independent work items.
//!
//! Hand the executor a keyed collection or a sequence of jobs plus a
//! parallelism bound; it runs every item exactly once, never more than the
//! bound at a time, waits for all of them and reports every failure in a
//! single aggregated error.

pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod model;
pub mod shell;
pub mod telemetry;

pub use error::{Error, Result};
pub use executor::{Executor, run_all, run_keyed, run_tasks};
