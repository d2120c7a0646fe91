//! Mutation operators for programs.
//!
//! Every mutator turns one valid program into a new one (or declines) by
//! replaying the seed through a [`ProgramBuilder`] and intervening at chosen
//! positions. Seed programs are never modified.

mod codegen;
mod input;
mod operation;
mod splice;

pub use self::codegen::CodeGenMutator;
pub use self::input::InputMutator;
pub use self::operation::OperationMutator;
pub use self::splice::SpliceMutator;

use crate::builder::ProgramBuilder;
use crate::instruction::Instruction;
use crate::program::Program;
use fuzzir_core::{MutationConfig, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// A strategy transforming one program into another.
///
/// `Ok(None)` means the mutator found no applicable site in the seed. That
/// is a normal outcome; errors are reserved for broken invariants.
pub trait Mutator {
    fn name(&self) -> &'static str;

    fn mutate(&self, program: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>>;
}

/// A mutator that rewrites individual instructions in place.
pub trait InstructionMutator {
    fn name(&self) -> &'static str;

    /// Upper bound on the number of instructions changed per mutation
    fn max_simultaneous_mutations(&self) -> usize;

    fn can_mutate(&self, instruction: &Instruction) -> bool;

    /// Emit a replacement for `instruction` into `b`, which is adopting
    /// from the seed and positioned right before the instruction.
    fn mutate_instruction(
        &self,
        instruction: &Instruction,
        b: &mut ProgramBuilder,
        rng: &mut ChaCha8Rng,
    ) -> Result<()>;

    /// Mutate exactly the instruction at `index`
    fn mutate_at(&self, program: &Program, index: usize, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
        match program.get(index) {
            Some(inst) if self.can_mutate(inst) => {
                let targets = BTreeSet::from([index]);
                replay(program, |inst, b| {
                    if targets.contains(&inst.index()) {
                        self.mutate_instruction(inst, b, rng)
                    } else {
                        b.adopt(inst, true)
                    }
                })
                .map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Mutate up to [`Self::max_simultaneous_mutations`] random eligible instructions
    fn mutate_random(&self, program: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
        let candidates: Vec<usize> = program
            .iter()
            .filter(|inst| self.can_mutate(inst))
            .map(|inst| inst.index())
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let max = self.max_simultaneous_mutations().clamp(1, candidates.len());
        let count = rng.gen_range(1..=max);
        let targets: BTreeSet<usize> = candidates.choose_multiple(rng, count).copied().collect();
        debug!(mutator = self.name(), ?targets, "mutating instructions");

        replay(program, |inst, b| {
            if targets.contains(&inst.index()) {
                self.mutate_instruction(inst, b, rng)
            } else {
                b.adopt(inst, true)
            }
        })
        .map(Some)
    }
}

/// Replay `program` through a fresh builder, calling `step` for every
/// instruction inside an adoption session
pub(crate) fn replay(
    program: &Program,
    mut step: impl FnMut(&Instruction, &mut ProgramBuilder) -> Result<()>,
) -> Result<Program> {
    let mut b = ProgramBuilder::new();
    b.adopting(program, |b| {
        for inst in program {
            step(inst, b)?;
        }
        Ok(())
    })?;
    b.finalize()
}

/// Names of the available mutators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutatorKind {
    Input,
    Operation,
    CodeGen,
    Splice,
}

impl MutatorKind {
    pub const ALL: [MutatorKind; 4] = [
        MutatorKind::Input,
        MutatorKind::Operation,
        MutatorKind::CodeGen,
        MutatorKind::Splice,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MutatorKind::Input => "InputMutator",
            MutatorKind::Operation => "OperationMutator",
            MutatorKind::CodeGen => "CodeGenMutator",
            MutatorKind::Splice => "SpliceMutator",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for MutatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Any of the available mutators
#[derive(Debug, Clone)]
pub enum AnyMutator {
    Input(InputMutator),
    Operation(OperationMutator),
    CodeGen(CodeGenMutator),
    Splice(SpliceMutator),
}

impl AnyMutator {
    pub fn new(kind: MutatorKind, config: &MutationConfig) -> Self {
        match kind {
            MutatorKind::Input => AnyMutator::Input(InputMutator::new(config)),
            MutatorKind::Operation => AnyMutator::Operation(OperationMutator::new(config)),
            MutatorKind::CodeGen => AnyMutator::CodeGen(CodeGenMutator::new(config)),
            MutatorKind::Splice => AnyMutator::Splice(SpliceMutator::new(config)),
        }
    }

    pub fn kind(&self) -> MutatorKind {
        match self {
            AnyMutator::Input(_) => MutatorKind::Input,
            AnyMutator::Operation(_) => MutatorKind::Operation,
            AnyMutator::CodeGen(_) => MutatorKind::CodeGen,
            AnyMutator::Splice(_) => MutatorKind::Splice,
        }
    }
}

impl Mutator for AnyMutator {
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn mutate(&self, program: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
        match self {
            AnyMutator::Input(m) => m.mutate(program, rng),
            AnyMutator::Operation(m) => m.mutate(program, rng),
            AnyMutator::CodeGen(m) => m.mutate(program, rng),
            AnyMutator::Splice(m) => m.mutate(program, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutator_kind_names() {
        for kind in MutatorKind::ALL {
            assert_eq!(MutatorKind::from_name(kind.name()), Some(kind));
            let mutator = AnyMutator::new(kind, &MutationConfig::default());
            assert_eq!(mutator.kind(), kind);
            assert_eq!(Mutator::name(&mutator), kind.name());
        }
        assert_eq!(MutatorKind::from_name("NopMutator"), None);
    }

    #[test]
    fn test_replay_reproduces_program() {
        let mut b = ProgramBuilder::new();
        let v = b.load_int(1).unwrap();
        b.unary(v, crate::operation::UnaryOperator::Minus).unwrap();
        let program = b.finalize().unwrap();

        let copy = replay(&program, |inst, b| b.adopt(inst, true)).unwrap();
        assert!(copy.same_code(&program));
    }
}
