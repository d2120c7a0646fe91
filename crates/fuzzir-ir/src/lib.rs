//! Intermediate representation for generated test programs.
//!
//! Programs are flat sequences of instructions over numbered variables, with
//! structured control flow expressed as begin/end instruction pairs. The IR is
//! designed to be:
//! - Mutation-friendly: every program is built through a [`ProgramBuilder`],
//!   which refuses to produce an invalid one
//! - Typed: an abstract [`Type`] lattice tracks what each variable may hold
//! - Immutable: mutation always yields a new [`Program`]

pub mod builder;
pub mod codegen;
pub mod environment;
pub mod inference;
pub mod instruction;
pub mod minimizer;
pub mod mutation;
pub mod operation;
pub mod program;
pub mod runtime_helpers;
pub mod types;
pub mod validation;
pub mod variable;

pub use builder::ProgramBuilder;
pub use codegen::CodeGenerator;
pub use inference::{infer_program_types, TypeAnalyzer};
pub use instruction::Instruction;
pub use minimizer::Minimizer;
pub use mutation::{
    AnyMutator, CodeGenMutator, InputMutator, InstructionMutator, Mutator, MutatorKind,
    OperationMutator, SpliceMutator,
};
pub use operation::{BinaryOperator, BlockKind, Comparator, Operation, UnaryOperator};
pub use program::Program;
pub use types::{ObjectGroup, Type};
pub use validation::validate_program;
pub use variable::{Variable, VariableMap};
