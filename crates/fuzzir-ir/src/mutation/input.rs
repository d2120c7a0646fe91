use super::{replay, InstructionMutator, Mutator};
use crate::builder::ProgramBuilder;
use crate::instruction::Instruction;
use crate::operation::Operation;
use crate::program::Program;
use crate::variable::Variable;
use fuzzir_core::{Error, MutationConfig, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Replaces one input of an instruction with another visible variable of a
/// compatible type, or with a freshly loaded constant.
///
/// The mutated instruction's outputs lose their runtime types.
#[derive(Debug, Clone)]
pub struct InputMutator {
    max_simultaneous_mutations: usize,
    fresh_constant_probability: f64,
}

impl InputMutator {
    pub fn new(config: &MutationConfig) -> Self {
        Self {
            max_simultaneous_mutations: config.max_simultaneous_mutations,
            fresh_constant_probability: config.fresh_constant_probability,
        }
    }

    /// Replace input `slot` of the instruction at `index` with `replacement`,
    /// a variable of `program` that must be visible at that position
    pub fn replace_input(
        &self,
        program: &Program,
        index: usize,
        slot: usize,
        replacement: Variable,
    ) -> Result<Program> {
        let target = program
            .get(index)
            .ok_or_else(|| Error::Validation(format!("no instruction at index {}", index)))?;
        if slot >= target.inputs().len() {
            return Err(Error::Validation(format!(
                "{} at {} has no input slot {}",
                target.operation().name(),
                index,
                slot
            )));
        }

        replay(program, |inst, b| {
            if inst.index() != index {
                return b.adopt(inst, true);
            }
            let mut inputs = adopted_inputs(inst, b)?;
            inputs[slot] = b.adopted(replacement)?;
            b.adopt_as(inst, inst.operation().clone(), &inputs, false)?;
            Ok(())
        })
    }
}

impl Default for InputMutator {
    fn default() -> Self {
        Self::new(&MutationConfig::default())
    }
}

fn adopted_inputs(inst: &Instruction, b: &ProgramBuilder) -> Result<Vec<Variable>> {
    inst.inputs().iter().map(|v| b.adopted(*v)).collect()
}

/// Visible variables other than `current` that satisfy `filter`
fn other_visible(b: &ProgramBuilder, current: Variable, filter: impl Fn(Variable) -> bool) -> Vec<Variable> {
    b.visible_variables()
        .into_iter()
        .filter(|v| *v != current && filter(*v))
        .collect()
}

impl InstructionMutator for InputMutator {
    fn name(&self) -> &'static str {
        "InputMutator"
    }

    fn max_simultaneous_mutations(&self) -> usize {
        self.max_simultaneous_mutations
    }

    fn can_mutate(&self, instruction: &Instruction) -> bool {
        !instruction.inputs().is_empty()
    }

    fn mutate_instruction(
        &self,
        instruction: &Instruction,
        b: &mut ProgramBuilder,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        let mut inputs = adopted_inputs(instruction, b)?;
        let mut slot = rng.gen_range(0..inputs.len());
        let is_copy = matches!(instruction.operation(), Operation::Copy);

        if is_copy && slot == 0 {
            let target = inputs[0];
            let phis = other_visible(b, target, |v| b.is_phi(v));
            match phis.choose(rng) {
                Some(phi) => {
                    inputs[0] = *phi;
                    b.adopt_as(instruction, instruction.operation().clone(), &inputs, false)?;
                    return Ok(());
                }
                // The target can only be another phi; change the value instead
                None => slot = 1,
            }
        }

        let current = inputs[slot];
        let wanted = b.type_of(current);
        let candidates = other_visible(b, current, |v| b.type_of(v).is_compatible_with(wanted));
        let replacement = match candidates.choose(rng) {
            Some(v) if !rng.gen_bool(self.fresh_constant_probability) => *v,
            _ => b.load_value_of_type(wanted, rng)?,
        };
        inputs[slot] = replacement;

        b.adopt_as(instruction, instruction.operation().clone(), &inputs, false)?;
        Ok(())
    }
}

impl Mutator for InputMutator {
    fn name(&self) -> &'static str {
        InstructionMutator::name(self)
    }

    fn mutate(&self, program: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
        self.mutate_random(program, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::BinaryOperator;
    use crate::types::Type;
    use crate::validation::validate_program;
    use crate::variable::VariableMap;
    use rand::SeedableRng;

    fn seed() -> Program {
        let mut b = ProgramBuilder::new();
        b.load_string("test").unwrap();
        let v1 = b.load_int(1).unwrap();
        let v2 = b.load_int(2).unwrap();
        let x = b.binary(v1, v2, BinaryOperator::Add).unwrap();
        b.phi(x).unwrap();
        let mut program = b.finalize().unwrap();
        program.set_runtime_types(VariableMap::from_values(vec![Type::STRING, Type::INTEGER, Type::INTEGER, Type::INTEGER, Type::INTEGER]));
        program
    }

    #[test]
    fn test_mutated_output_loses_runtime_type() {
        let program = seed();
        for s in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(s);
            let mutated = InputMutator::default().mutate_at(&program, 3, &mut rng).unwrap().unwrap();
            validate_program(&mutated).unwrap();

            let added = mutated.size() - program.size();
            let binary = &mutated.instructions()[3 + added];
            assert!(matches!(binary.operation(), Operation::BinaryOperation(BinaryOperator::Add)));
            let out = binary.output().unwrap();
            assert_eq!(mutated.runtime_type(out), None);
            // The phi depends on the mutated value but keeps its stale annotation
            let phi = mutated.instructions()[4 + added].output().unwrap();
            assert_eq!(mutated.runtime_type(phi), Some(Type::INTEGER));
            assert_eq!(mutated.runtime_type(Variable(0)), Some(Type::STRING));
        }
    }

    #[test]
    fn test_mutated_input_always_changes() {
        let mut b = ProgramBuilder::new();
        let v0 = b.load_int(1).unwrap();
        let v1 = b.load_int(2).unwrap();
        b.binary(v0, v1, BinaryOperator::Add).unwrap();
        let program = b.finalize().unwrap();

        for s in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(s);
            let mutated = InputMutator::default().mutate_at(&program, 2, &mut rng).unwrap().unwrap();
            assert!(!mutated.same_code(&program), "seed {} left the program unchanged", s);
        }
    }

    #[test]
    fn test_replace_input() {
        let program = seed();
        let mutated = InputMutator::default()
            .replace_input(&program, 3, 0, Variable(2))
            .unwrap();
        assert_eq!(mutated.instructions()[3].inputs(), &[Variable(2), Variable(2)]);
        assert_eq!(mutated.runtime_type(Variable(3)), None);
        assert_eq!(mutated.runtime_type(Variable(4)), Some(Type::INTEGER));

        assert!(InputMutator::default().replace_input(&program, 3, 2, Variable(0)).is_err());
        assert!(matches!(
            InputMutator::default().replace_input(&program, 1, 0, Variable(0)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_declines_without_inputs() {
        let mut b = ProgramBuilder::new();
        b.load_int(1).unwrap();
        b.load_float(2.0).unwrap();
        let program = b.finalize().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(InputMutator::default().mutate(&program, &mut rng).unwrap().is_none());
        assert!(InputMutator::default().mutate_at(&program, 0, &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_copy_target_stays_a_phi() {
        let mut b = ProgramBuilder::new();
        let a = b.load_int(1).unwrap();
        let p = b.phi(a).unwrap();
        let q = b.phi(a).unwrap();
        let f = b.load_float(1.5).unwrap();
        b.copy(f, p).unwrap();
        b.copy(f, q).unwrap();
        let program = b.finalize().unwrap();

        for s in 0..30 {
            let mut rng = ChaCha8Rng::seed_from_u64(s);
            let mutated = InputMutator::default().mutate(&program, &mut rng).unwrap().unwrap();
            validate_program(&mutated).unwrap();
            assert!(!mutated.same_code(&program));
        }

        // A lone phi cannot be retargeted, so the copied value changes instead
        let mut b = ProgramBuilder::new();
        let a = b.load_int(1).unwrap();
        let p = b.phi(a).unwrap();
        let f = b.load_float(1.5).unwrap();
        b.copy(f, p).unwrap();
        let program = b.finalize().unwrap();
        for s in 0..30 {
            let mut rng = ChaCha8Rng::seed_from_u64(s);
            let mutated = InputMutator::default().mutate_at(&program, 3, &mut rng).unwrap().unwrap();
            let copy = mutated.instructions().last().unwrap();
            assert!(matches!(copy.operation(), Operation::Copy));
            assert_eq!(copy.input(0), p);
            assert!(!mutated.same_code(&program));
        }
    }
}
