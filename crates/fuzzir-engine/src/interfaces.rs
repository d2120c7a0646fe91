//! Contracts with the lifter and the execution backend.

use fuzzir_core::Result;
use fuzzir_ir::{Program, Type, VariableMap};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turns a program into a script for the target runtime
pub trait Lifter {
    fn lift(&self, program: &Program) -> Result<String>;
}

/// Runs scripts against the target runtime
pub trait Executor {
    fn execute(&mut self, script: &str) -> Result<Execution>;
}

/// How an execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Succeeded,
    /// Exited normally with a non-zero status
    Failed(i32),
    /// Terminated by the given signal
    Crashed(i32),
    TimedOut,
}

impl ExecutionOutcome {
    pub fn is_crash(&self) -> bool {
        matches!(self, ExecutionOutcome::Crashed(_))
    }
}

/// Result of running one script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub outcome: ExecutionOutcome,
    /// Types the runtime helper observed for the program's variables
    pub runtime_types: VariableMap<Type>,
    pub execution_time: Duration,
}
