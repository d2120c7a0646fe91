//! Lightweight abstract type inference.
//!
//! [`output_types`] is the per-operation transfer function. [`TypeAnalyzer`]
//! threads it through a program instruction by instruction, tracking the
//! branch states of conditionals so that a phi redefined in divergent
//! branches ends up with the union of the types assigned in each branch.
//!
//! Inferred types are loose approximations of the target's coercion rules.
//! Being wrong is never an error.

use crate::environment::builtin_type;
use crate::instruction::Instruction;
use crate::operation::{BinaryOperator, BlockKind, Operation, UnaryOperator};
use crate::program::Program;
use crate::types::{ObjectGroup, Type};
use crate::variable::{Variable, VariableMap};
use tracing::trace;

/// Infer the types of an operation's outputs followed by its inner outputs.
pub fn output_types(operation: &Operation, inputs: &[Type]) -> Vec<Type> {
    let input = |i: usize| inputs.get(i).copied().unwrap_or(Type::UNKNOWN);

    let outer = match operation {
        Operation::LoadInteger(_) => Type::INTEGER,
        Operation::LoadFloat(_) => Type::FLOAT,
        Operation::LoadString(_) => Type::STRING,
        Operation::LoadBoolean(_) => Type::BOOLEAN,
        Operation::LoadUndefined => Type::UNDEFINED,
        Operation::LoadBigInt(_) => Type::BIGINT,
        Operation::LoadRegExp { .. } => Type::REGEXP,
        Operation::LoadBuiltin(name) => builtin_type(name),
        Operation::CreateObject { .. } => Type::OBJECT,
        Operation::CreateArray { .. } => Type::object_of_group(ObjectGroup::Array),
        Operation::Construct { .. } => {
            if input(0).may_be(Type::CONSTRUCTOR) {
                Type::OBJECT
            } else {
                Type::UNKNOWN
            }
        }
        Operation::UnaryOperation(op) => unary_type(*op, input(0)),
        Operation::BinaryOperation(op) => binary_type(*op, input(0), input(1)),
        Operation::Compare(_) => Type::BOOLEAN,
        Operation::TypeOf => Type::STRING,
        Operation::Phi => input(0),
        Operation::BeginFunction { .. } => Type::FUNCTION | Type::CONSTRUCTOR,
        _ => Type::UNKNOWN,
    };

    let mut types = vec![outer; operation.num_outputs()];
    match operation {
        Operation::BeginFor { .. } => {
            let (start, step) = (input(0), input(2));
            let counter = if start.is(Type::INTEGER) && step.is(Type::INTEGER) {
                Type::INTEGER
            } else if start.is_numeric() && step.is_numeric() {
                Type::NUMBER
            } else {
                Type::UNKNOWN
            };
            types.push(counter);
        }
        _ => types.extend(std::iter::repeat(Type::UNKNOWN).take(operation.num_inner_outputs())),
    }
    types
}

/// True if `ty` is known and contained in `category`.
fn is_definitely(ty: Type, category: Type) -> bool {
    !ty.is_nothing() && ty.is(category)
}

fn unary_type(op: UnaryOperator, operand: Type) -> Type {
    match op {
        UnaryOperator::LogicalNot => Type::BOOLEAN,
        UnaryOperator::Plus => Type::NUMBER,
        UnaryOperator::BitwiseNot => {
            if is_definitely(operand, Type::BIGINT) {
                Type::BIGINT
            } else if operand.is_numeric() {
                Type::INTEGER
            } else {
                Type::INTEGER | Type::BIGINT
            }
        }
        _ => {
            if is_definitely(operand, Type::BIGINT) {
                Type::BIGINT
            } else if operand.is_numeric() {
                Type::NUMBER
            } else {
                Type::NUMBER | Type::BIGINT
            }
        }
    }
}

fn binary_type(op: BinaryOperator, lhs: Type, rhs: Type) -> Type {
    let both_bigint = is_definitely(lhs, Type::BIGINT) && is_definitely(rhs, Type::BIGINT);
    let both_numeric = lhs.is_numeric() && rhs.is_numeric();

    if op.is_logical() {
        return lhs | rhs;
    }
    if op == BinaryOperator::Add
        && (is_definitely(lhs, Type::STRING) || is_definitely(rhs, Type::STRING))
    {
        return Type::STRING;
    }
    if op.is_bitwise() {
        return if both_bigint && op != BinaryOperator::UnRShift {
            Type::BIGINT
        } else if both_numeric {
            Type::INTEGER
        } else {
            Type::INTEGER | Type::BIGINT
        };
    }
    if both_numeric {
        Type::NUMBER
    } else if both_bigint {
        Type::BIGINT
    } else if op == BinaryOperator::Add {
        Type::PRIMITIVE
    } else {
        Type::NUMBER | Type::BIGINT
    }
}

/// Types of all variables before the block and the states at the end of
/// each already completed branch.
#[derive(Debug, Clone)]
struct Frame {
    kind: BlockKind,
    parent: Vec<Option<Type>>,
    branches: Vec<Vec<Option<Type>>>,
}

/// Incremental type analysis over a stream of instructions.
#[derive(Debug, Clone, Default)]
pub struct TypeAnalyzer {
    types: Vec<Option<Type>>,
    frames: Vec<Frame>,
}

impl TypeAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current type of `variable`; `unknown` if nothing is known about it
    pub fn type_of(&self, variable: Variable) -> Type {
        self.types
            .get(variable.index())
            .copied()
            .flatten()
            .unwrap_or(Type::UNKNOWN)
    }

    /// Override the type of `variable` in the current branch state
    pub fn set_type(&mut self, variable: Variable, ty: Type) {
        let index = variable.index();
        if index >= self.types.len() {
            self.types.resize(index + 1, None);
        }
        self.types[index] = Some(ty);
    }

    /// Snapshot of the current state
    pub fn types(&self) -> VariableMap<Type> {
        VariableMap::from(self.types.clone())
    }

    /// Feed the next instruction of the program
    pub fn analyze(&mut self, instruction: &Instruction) {
        let operation = instruction.operation();

        if operation.is_block_end() {
            self.close_block(operation);
        }

        let input_types: Vec<Type> = instruction.inputs().iter().map(|v| self.type_of(*v)).collect();
        let mut types = output_types(operation, &input_types).into_iter();

        for output in instruction.outputs() {
            let ty = types.next().unwrap_or(Type::UNKNOWN);
            self.set_type(*output, ty);
        }

        if let Operation::UnaryOperation(op) = operation {
            if op.is_update() {
                let operand = instruction.input(0);
                let ty = unary_type(*op, input_types.first().copied().unwrap_or(Type::UNKNOWN));
                self.set_type(operand, ty);
            }
        }

        if let Operation::Copy = operation {
            let (target, value) = (instruction.input(0), instruction.input(1));
            let ty = self.type_of(value);
            trace!(%target, %ty, "phi redefined");
            self.set_type(target, ty);
        }

        if let Some(kind) = operation.opened_block() {
            if kind != BlockKind::Else {
                self.frames.push(Frame {
                    kind,
                    parent: self.types.clone(),
                    branches: Vec::new(),
                });
            }
        }

        for inner in instruction.inner_outputs() {
            let ty = types.next().unwrap_or(Type::UNKNOWN);
            self.set_type(*inner, ty);
        }
    }

    fn close_block(&mut self, operation: &Operation) {
        if let Operation::BeginElse = operation {
            if let Some(frame) = self.frames.last_mut() {
                let finished = std::mem::replace(&mut self.types, frame.parent.clone());
                frame.branches.push(finished);
                frame.kind = BlockKind::Else;
            }
            return;
        }

        let Some(mut frame) = self.frames.pop() else {
            return;
        };
        let current = std::mem::take(&mut self.types);
        frame.branches.push(current);
        // Without an else branch, or for blocks that may run zero times, the
        // state from before the block is one of the possible outcomes.
        if frame.kind != BlockKind::Else {
            frame.branches.push(frame.parent.clone());
        }
        self.types = merge(&frame.parent, &frame.branches);
    }
}

/// Union the branch states for every variable that existed before the block.
/// Variables defined inside the block keep the type from the last branch
/// that defined them.
fn merge(parent: &[Option<Type>], branches: &[Vec<Option<Type>>]) -> Vec<Option<Type>> {
    let len = branches.iter().map(|b| b.len()).max().unwrap_or(0).max(parent.len());
    let mut merged = vec![None; len];
    for (i, slot) in merged.iter_mut().enumerate() {
        if i < parent.len() {
            *slot = branches
                .iter()
                .filter_map(|b| b.get(i).copied().flatten())
                .reduce(|a, b| a | b);
        } else {
            *slot = branches.iter().rev().find_map(|b| b.get(i).copied().flatten());
        }
    }
    merged
}

/// Run the analysis over a whole program, returning the final type of every variable.
///
/// Runtime types attached to the program take precedence over inferred ones.
pub fn infer_program_types(program: &Program) -> VariableMap<Type> {
    let mut analyzer = TypeAnalyzer::new();
    for instruction in program {
        analyzer.analyze(instruction);
        for output in instruction.all_outputs() {
            if let Some(ty) = program.runtime_type(output) {
                analyzer.set_type(output, ty);
            }
        }
    }
    analyzer.types()
}
