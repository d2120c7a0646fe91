//! Instructions of the IR.

use crate::operation::Operation;
use crate::variable::Variable;
use fuzzir_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single immutable instruction: an operation applied to input variables,
/// defining output variables.
///
/// Inner outputs are the variables a block-begin binds for its body only,
/// such as a loop counter or function parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    operation: Operation,
    inputs: Vec<Variable>,
    outputs: Vec<Variable>,
    inner_outputs: Vec<Variable>,
    index: usize,
}

impl Instruction {
    /// Create an instruction, checking that the variable counts match the operation
    pub fn new(
        operation: Operation,
        inputs: Vec<Variable>,
        outputs: Vec<Variable>,
        inner_outputs: Vec<Variable>,
        index: usize,
    ) -> Result<Self> {
        if inputs.len() != operation.num_inputs() {
            return Err(Error::ArityMismatch {
                operation: operation.name().to_string(),
                expected: operation.num_inputs(),
                actual: inputs.len(),
            });
        }
        if outputs.len() != operation.num_outputs()
            || inner_outputs.len() != operation.num_inner_outputs()
        {
            return Err(Error::Validation(format!(
                "{} at {} defines {} outputs and {} inner outputs, expected {} and {}",
                operation.name(),
                index,
                outputs.len(),
                inner_outputs.len(),
                operation.num_outputs(),
                operation.num_inner_outputs()
            )));
        }
        Ok(Self {
            operation,
            inputs,
            outputs,
            inner_outputs,
            index,
        })
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Position of this instruction within its program
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn inputs(&self) -> &[Variable] {
        &self.inputs
    }

    pub fn input(&self, i: usize) -> Variable {
        self.inputs[i]
    }

    pub fn outputs(&self) -> &[Variable] {
        &self.outputs
    }

    /// The single output of this instruction, if it has exactly one
    pub fn output(&self) -> Option<Variable> {
        match self.outputs.as_slice() {
            [v] => Some(*v),
            _ => None,
        }
    }

    pub fn inner_outputs(&self) -> &[Variable] {
        &self.inner_outputs
    }

    /// Outputs followed by inner outputs
    pub fn all_outputs(&self) -> impl Iterator<Item = Variable> + '_ {
        self.outputs.iter().chain(self.inner_outputs.iter()).copied()
    }

    pub fn has_outputs(&self) -> bool {
        !self.outputs.is_empty() || !self.inner_outputs.is_empty()
    }

    pub fn is_block_begin(&self) -> bool {
        self.operation.is_block_begin()
    }

    pub fn is_block_end(&self) -> bool {
        self.operation.is_block_end()
    }

    pub fn is_block(&self) -> bool {
        self.operation.is_block()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.outputs.is_empty() {
            let outs: Vec<String> = self.outputs.iter().map(|v| v.to_string()).collect();
            write!(f, "{} = ", outs.join(", "))?;
        }
        write!(f, "{}", self.operation)?;
        if !self.inputs.is_empty() {
            let ins: Vec<String> = self.inputs.iter().map(|v| v.to_string()).collect();
            write!(f, " {}", ins.join(", "))?;
        }
        if !self.inner_outputs.is_empty() {
            let inner: Vec<String> = self.inner_outputs.iter().map(|v| v.to_string()).collect();
            write!(f, " -> {}", inner.join(", "))?;
        }
        Ok(())
    }
}
