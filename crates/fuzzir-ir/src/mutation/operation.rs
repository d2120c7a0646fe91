use super::{replay, InstructionMutator, Mutator};
use crate::builder::ProgramBuilder;
use crate::codegen;
use crate::environment::{BUILTINS, METHOD_NAMES, PROPERTY_NAMES};
use crate::instruction::Instruction;
use crate::operation::Operation;
use crate::program::Program;
use crate::variable::Variable;
use fuzzir_core::{Error, MutationConfig, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::mem::discriminant;

/// Changes the parameters of an operation while keeping its inputs.
///
/// Operators, comparators, property and method names and builtin names are
/// swapped for different ones, which discards the runtime types of the
/// outputs. Literal values are replaced by other values of the same kind,
/// which keeps them.
#[derive(Debug, Clone)]
pub struct OperationMutator {
    max_simultaneous_mutations: usize,
}

impl OperationMutator {
    pub fn new(config: &MutationConfig) -> Self {
        Self {
            max_simultaneous_mutations: config.max_simultaneous_mutations,
        }
    }

    /// Replace the operation of the instruction at `index` with `operation`,
    /// keeping its inputs
    pub fn replace_operation(&self, program: &Program, index: usize, operation: Operation) -> Result<Program> {
        if program.get(index).is_none() {
            return Err(Error::Validation(format!("no instruction at index {}", index)));
        }
        replay(program, |inst, b| {
            if inst.index() == index {
                emit_replacement(inst, operation.clone(), b)
            } else {
                b.adopt(inst, true)
            }
        })
    }
}

impl Default for OperationMutator {
    fn default() -> Self {
        Self::new(&MutationConfig::default())
    }
}

/// Whether the outputs of `old` keep their runtime types once replaced by `new`
fn keeps_types(old: &Operation, new: &Operation) -> bool {
    old.is_literal() && discriminant(old) == discriminant(new)
}

fn emit_replacement(inst: &Instruction, operation: Operation, b: &mut ProgramBuilder) -> Result<()> {
    let inputs = inst
        .inputs()
        .iter()
        .map(|v| b.adopted(*v))
        .collect::<Result<Vec<Variable>>>()?;
    let keep = keeps_types(inst.operation(), &operation);
    b.adopt_as(inst, operation, &inputs, keep)?;
    Ok(())
}

fn other<T: Copy + PartialEq>(all: &[T], current: T, rng: &mut ChaCha8Rng) -> T {
    let others: Vec<T> = all.iter().copied().filter(|x| *x != current).collect();
    others.choose(rng).copied().unwrap_or(current)
}

fn other_name(names: &[&str], current: &str, rng: &mut ChaCha8Rng) -> String {
    let others: Vec<&str> = names.iter().copied().filter(|n| *n != current).collect();
    others.choose(rng).copied().unwrap_or(current).to_string()
}

/// A different operation of the same shape as `operation`
fn mutated_operation(operation: &Operation, rng: &mut ChaCha8Rng) -> Operation {
    use crate::operation::{BinaryOperator, Comparator, UnaryOperator};

    match operation {
        Operation::LoadInteger(v) => {
            let value = if rng.gen_bool(0.5) {
                codegen::random_integer(rng)
            } else {
                v.wrapping_add(rng.gen_range(-16..=16))
            };
            Operation::LoadInteger(value)
        }
        Operation::LoadFloat(v) => {
            let value = if rng.gen_bool(0.5) {
                codegen::random_float(rng)
            } else {
                v * rng.gen_range(-2.0..2.0)
            };
            Operation::LoadFloat(value)
        }
        Operation::LoadString(_) => Operation::LoadString(codegen::random_string(rng)),
        Operation::LoadBoolean(v) => Operation::LoadBoolean(!v),
        Operation::LoadBigInt(v) => Operation::LoadBigInt(v.wrapping_add(rng.gen_range(-16..=16))),
        Operation::LoadRegExp { .. } => {
            let (pattern, flags) = codegen::random_regexp(rng);
            Operation::LoadRegExp {
                pattern: pattern.to_string(),
                flags: flags.to_string(),
            }
        }
        Operation::LoadBuiltin(name) => {
            let names: Vec<&str> = BUILTINS.iter().map(|(n, _)| *n).collect();
            Operation::LoadBuiltin(other_name(&names, name, rng))
        }
        Operation::CreateObject { property_names } => {
            let mut property_names = property_names.clone();
            let slot = rng.gen_range(0..property_names.len().max(1));
            if let Some(name) = property_names.get_mut(slot) {
                *name = other_name(PROPERTY_NAMES, name, rng);
            }
            Operation::CreateObject { property_names }
        }
        Operation::LoadProperty(name) => Operation::LoadProperty(other_name(PROPERTY_NAMES, name, rng)),
        Operation::StoreProperty(name) => Operation::StoreProperty(other_name(PROPERTY_NAMES, name, rng)),
        Operation::CallMethod { name, num_arguments } => Operation::CallMethod {
            name: other_name(METHOD_NAMES, name, rng),
            num_arguments: *num_arguments,
        },
        Operation::UnaryOperation(op) => Operation::UnaryOperation(other(&UnaryOperator::ALL, *op, rng)),
        Operation::BinaryOperation(op) => Operation::BinaryOperation(other(&BinaryOperator::ALL, *op, rng)),
        Operation::Compare(op) => Operation::Compare(other(&Comparator::ALL, *op, rng)),
        Operation::BeginWhile(op) => Operation::BeginWhile(other(&Comparator::ALL, *op, rng)),
        Operation::BeginFor { comparator, op } => {
            if rng.gen_bool(0.5) {
                Operation::BeginFor {
                    comparator: other(&Comparator::ALL, *comparator, rng),
                    op: *op,
                }
            } else {
                Operation::BeginFor {
                    comparator: *comparator,
                    op: other(&BinaryOperator::ALL, *op, rng),
                }
            }
        }
        unchanged => unchanged.clone(),
    }
}

impl InstructionMutator for OperationMutator {
    fn name(&self) -> &'static str {
        "OperationMutator"
    }

    fn max_simultaneous_mutations(&self) -> usize {
        self.max_simultaneous_mutations
    }

    fn can_mutate(&self, instruction: &Instruction) -> bool {
        match instruction.operation() {
            Operation::CreateObject { property_names } => !property_names.is_empty(),
            op => op.is_mutable(),
        }
    }

    fn mutate_instruction(
        &self,
        instruction: &Instruction,
        b: &mut ProgramBuilder,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        let operation = mutated_operation(instruction.operation(), rng);
        emit_replacement(instruction, operation, b)
    }
}

impl Mutator for OperationMutator {
    fn name(&self) -> &'static str {
        InstructionMutator::name(self)
    }

    fn mutate(&self, program: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
        self.mutate_random(program, rng)
    }
}
