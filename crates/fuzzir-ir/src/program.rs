//! Finalized, immutable programs.

use crate::inference::infer_program_types;
use crate::instruction::Instruction;
use crate::types::Type;
use crate::validation::validate_program;
use crate::variable::{Variable, VariableMap};
use fuzzir_core::{ProgramId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable, ordered sequence of instructions.
///
/// Programs are produced by [`crate::ProgramBuilder::finalize`] and never
/// edited afterwards; mutation always yields a new program with a new id.
/// The only thing that may be attached after finalization is the table of
/// runtime types observed by the execution backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    id: ProgramId,
    instructions: Vec<Instruction>,
    runtime_types: VariableMap<Type>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            id: ProgramId::new(),
            instructions: Vec::new(),
            runtime_types: VariableMap::new(),
        }
    }

    pub(crate) fn from_parts(instructions: Vec<Instruction>, runtime_types: VariableMap<Type>) -> Self {
        Self {
            id: ProgramId::new(),
            instructions,
            runtime_types,
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn size(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Number of variables defined by this program
    pub fn num_variables(&self) -> usize {
        self.instructions
            .iter()
            .flat_map(|inst| inst.all_outputs())
            .map(|v| v.index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Types observed for this program's variables at runtime, if any were attached
    pub fn runtime_types(&self) -> &VariableMap<Type> {
        &self.runtime_types
    }

    pub fn runtime_type(&self, variable: Variable) -> Option<Type> {
        self.runtime_types.get(variable).copied()
    }

    /// Attach runtime types reported by the execution backend
    pub fn set_runtime_types(&mut self, types: VariableMap<Type>) {
        self.runtime_types = types;
    }

    pub fn clear_runtime_types(&mut self) {
        self.runtime_types = VariableMap::new();
    }

    /// Statically inferred types of every variable
    pub fn inferred_types(&self) -> VariableMap<Type> {
        infer_program_types(self)
    }

    /// True if both programs consist of the same instructions, ignoring ids and types
    pub fn same_code(&self, other: &Program) -> bool {
        self.instructions == other.instructions
    }

    /// For a block begin at `index`, find the index of the instruction closing
    /// the whole block group (the `EndIf` of an if/else).
    pub fn block_group_end(&self, index: usize) -> Option<usize> {
        let begin = self.instructions.get(index)?;
        if !begin.is_block_begin() || begin.is_block_end() {
            return None;
        }
        let mut depth = 1usize;
        for inst in &self.instructions[index + 1..] {
            let op = inst.operation();
            if op.is_block_begin() && op.is_block_end() {
                continue;
            }
            if op.is_block_end() {
                depth -= 1;
                if depth == 0 {
                    return Some(inst.index());
                }
            } else if op.is_block_begin() {
                depth += 1;
            }
        }
        None
    }

    /// Block nesting depth in front of each instruction
    pub fn block_depths(&self) -> Vec<usize> {
        let mut depths = Vec::with_capacity(self.instructions.len());
        let mut depth = 0usize;
        for inst in &self.instructions {
            let op = inst.operation();
            if op.is_block_end() {
                depth = depth.saturating_sub(1);
            }
            depths.push(depth);
            if op.is_block_begin() {
                depth += 1;
            }
        }
        depths
    }

    /// Serialize the program to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize a program from bytes, rejecting structurally invalid ones
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let program: Program = bincode::deserialize(bytes)?;
        validate_program(&program)?;
        Ok(program)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (inst, depth) in self.instructions.iter().zip(self.block_depths()) {
            writeln!(f, "{:indent$}{}", "", inst, indent = depth * 4)?;
        }
        Ok(())
    }
}
