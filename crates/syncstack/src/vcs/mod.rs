//! Version-control subprocess boundary and output parsing.

pub mod parse;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use runner::{GitProcessRunner, ProcessOutput, RunOutcome, SpawnFailure, VcsRunner};
