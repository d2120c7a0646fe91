use super::Mutator;
use crate::builder::ProgramBuilder;
use crate::codegen::CodeGenerator;
use crate::program::Program;
use fuzzir_core::{MutationConfig, Result};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Inserts freshly generated code at a random position.
///
/// Existing variables keep their runtime types; generated ones get none.
#[derive(Debug, Clone)]
pub struct CodeGenMutator {
    generator: CodeGenerator,
    max_program_size: usize,
}

impl CodeGenMutator {
    pub fn new(config: &MutationConfig) -> Self {
        Self {
            generator: CodeGenerator::new(config),
            max_program_size: config.max_program_size,
        }
    }

    /// Generate code right before the instruction at `position`, or at the
    /// end of the program when `position` equals its size
    pub fn insert_at(&self, program: &Program, position: usize, rng: &mut ChaCha8Rng) -> Result<Program> {
        let mut b = ProgramBuilder::new();
        b.adopting(program, |b| {
            for inst in program {
                if inst.index() == position {
                    self.generator.generate(b, rng)?;
                }
                b.adopt(inst, true)?;
            }
            if position >= program.size() {
                self.generator.generate(b, rng)?;
            }
            Ok(())
        })?;
        b.finalize()
    }
}

impl Default for CodeGenMutator {
    fn default() -> Self {
        Self::new(&MutationConfig::default())
    }
}

impl Mutator for CodeGenMutator {
    fn name(&self) -> &'static str {
        "CodeGenMutator"
    }

    fn mutate(&self, program: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
        if program.size() >= self.max_program_size {
            return Ok(None);
        }
        let position = rng.gen_range(0..=program.size());
        debug!(mutator = "CodeGenMutator", position, "generating code");
        self.insert_at(program, position, rng).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::BinaryOperator;
    use crate::types::Type;
    use crate::validation::validate_program;
    use crate::variable::{Variable, VariableMap};
    use rand::SeedableRng;

    fn seed() -> Program {
        let mut b = ProgramBuilder::new();
        let v0 = b.load_int(1).unwrap();
        let v1 = b.load_int(2).unwrap();
        b.binary(v0, v1, BinaryOperator::Add).unwrap();
        let mut program = b.finalize().unwrap();
        program.set_runtime_types(VariableMap::from_values(vec![Type::INTEGER, Type::INTEGER, Type::FLOAT]));
        program
    }

    #[test]
    fn test_inserted_code_carries_no_types() {
        let program = seed();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mutated = CodeGenMutator::default().insert_at(&program, 0, &mut rng).unwrap();
        validate_program(&mutated).unwrap();

        let added = mutated.size() - program.size();
        assert!(added >= 1);
        let tail = &mutated.instructions()[added..];
        let seed_ops: Vec<_> = program.iter().map(|i| i.operation().clone()).collect();
        let tail_ops: Vec<_> = tail.iter().map(|i| i.operation().clone()).collect();
        assert_eq!(tail_ops, seed_ops);

        let types: Vec<Option<Type>> = tail
            .iter()
            .map(|inst| mutated.runtime_type(inst.output().unwrap()))
            .collect();
        assert_eq!(types, vec![Some(Type::INTEGER), Some(Type::INTEGER), Some(Type::FLOAT)]);
        for inst in &mutated.instructions()[..added] {
            for v in inst.all_outputs() {
                assert_eq!(mutated.runtime_type(v), None);
            }
        }
    }

    #[test]
    fn test_insert_at_end() {
        let program = seed();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mutated = CodeGenMutator::default().insert_at(&program, 3, &mut rng).unwrap();
        validate_program(&mutated).unwrap();
        assert!(mutated.size() > program.size());
        assert_eq!(mutated.runtime_type(Variable(2)), Some(Type::FLOAT));
    }

    #[test]
    fn test_declines_oversized_program() {
        let config = MutationConfig {
            max_program_size: 3,
            ..MutationConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(CodeGenMutator::new(&config).mutate(&seed(), &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_mutations_stay_valid() {
        let program = seed();
        for s in 0..40 {
            let mut rng = ChaCha8Rng::seed_from_u64(s);
            let mutated = CodeGenMutator::default().mutate(&program, &mut rng).unwrap().unwrap();
            validate_program(&mutated).unwrap();
        }
    }
}
