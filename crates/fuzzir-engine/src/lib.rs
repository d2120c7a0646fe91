//! Mutation engine driving the fuzzir mutators.
//!
//! The engine owns the random source and the weighted mutator table, prepends
//! the shared prefix to seeds, and checks every mutated program before
//! handing it out. Lifting to source text and running programs are left to
//! implementations of [`Lifter`] and [`Executor`].

pub mod engine;
pub mod interfaces;
pub mod telemetry;

pub use engine::{FuzzOutcome, MutationEngine, MutationOutcome};
pub use interfaces::{Execution, ExecutionOutcome, Executor, Lifter};
