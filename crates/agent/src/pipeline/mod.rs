//! The reasoning and dispatch pipeline.
//!
//! [`Reasoner`] classifies a task, [`Dispatcher`] routes the decision to one
//! capability agent, and [`PipelineRunner`] chains both under a timeout and
//! records the run in memory.

pub mod dispatcher;
pub mod reasoner;
pub mod runner;

pub use dispatcher::Dispatcher;
pub use reasoner::{DEFAULT_CONTEXT_K, Reasoner};
pub use runner::{DEFAULT_TIMEOUT, PipelineRun, PipelineRunner};
