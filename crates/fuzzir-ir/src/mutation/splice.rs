use super::Mutator;
use crate::builder::ProgramBuilder;
use crate::operation::Operation;
use crate::program::Program;
use crate::variable::Variable;
use fuzzir_core::{MutationConfig, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Copies a self-contained slice of a donor program into the seed.
///
/// A slice is an instruction together with every instruction its inputs
/// transitively depend on. Instructions inside or defining blocks, and
/// anything depending on block-bound variables, cannot be sliced out.
#[derive(Debug, Clone)]
pub struct SpliceMutator {
    max_splice_size: usize,
    max_program_size: usize,
}

impl SpliceMutator {
    pub fn new(config: &MutationConfig) -> Self {
        Self {
            max_splice_size: config.max_splice_size,
            max_program_size: config.max_program_size,
        }
    }

    /// Indices of the slice of `donor` rooted at `index`, in program order,
    /// or `None` if the instruction cannot be sliced out
    pub fn slice(&self, donor: &Program, index: usize) -> Option<Vec<usize>> {
        let depths = donor.block_depths();
        let mut definitions: HashMap<Variable, usize> = HashMap::new();
        for inst in donor {
            for v in inst.all_outputs() {
                definitions.insert(v, inst.index());
            }
        }

        let mut slice = BTreeSet::new();
        let mut pending = vec![index];
        while let Some(i) = pending.pop() {
            if !slice.insert(i) {
                continue;
            }
            let inst = donor.get(i)?;
            if depths[i] != 0 || inst.is_block() || is_context_bound(inst.operation()) {
                return None;
            }
            if slice.len() > self.max_splice_size {
                return None;
            }
            for input in inst.inputs() {
                pending.push(*definitions.get(input)?);
            }
        }
        Some(slice.into_iter().collect())
    }

    /// Splice a random slice of `donor` into `program` at a random position
    pub fn splice_from(&self, program: &Program, donor: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
        if program.size() >= self.max_program_size {
            return Ok(None);
        }
        let mut roots: Vec<usize> = donor.iter().map(|inst| inst.index()).collect();
        roots.shuffle(rng);
        let Some(slice) = roots.into_iter().find_map(|root| self.slice(donor, root)) else {
            return Ok(None);
        };

        let position = rng.gen_range(0..=program.size());
        debug!(mutator = "SpliceMutator", position, size = slice.len(), "splicing");

        let mut b = ProgramBuilder::new();
        b.adopting(program, |b| {
            for inst in program {
                if inst.index() == position {
                    b.splice(donor, &slice)?;
                }
                b.adopt(inst, true)?;
            }
            if position >= program.size() {
                b.splice(donor, &slice)?;
            }
            Ok(())
        })?;
        b.finalize().map(Some)
    }
}

impl Default for SpliceMutator {
    fn default() -> Self {
        Self::new(&MutationConfig::default())
    }
}

/// Operations whose meaning depends on the surrounding blocks or on phi identity
fn is_context_bound(operation: &Operation) -> bool {
    operation.requires_loop() || operation.requires_function() || matches!(operation, Operation::Copy)
}

impl Mutator for SpliceMutator {
    fn name(&self) -> &'static str {
        "SpliceMutator"
    }

    fn mutate(&self, program: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
        self.splice_from(program, program, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{BinaryOperator, Comparator};
    use crate::validation::validate_program;
    use rand::SeedableRng;

    fn donor() -> Program {
        let mut b = ProgramBuilder::new();
        let v0 = b.load_int(1).unwrap();
        let v1 = b.load_string("a").unwrap();
        let v2 = b.binary(v0, v1, BinaryOperator::Add).unwrap();
        let s = b.load_int(0).unwrap();
        b.begin_for(s, v0, v0, Comparator::LessThan, BinaryOperator::Add).unwrap();
        b.load_int(9).unwrap();
        b.end_for().unwrap();
        b.type_of_value(v2).unwrap();
        b.finalize().unwrap()
    }

    #[test]
    fn test_slice_collects_dependencies() {
        let splice = SpliceMutator::default();
        let program = donor();
        assert_eq!(splice.slice(&program, 2), Some(vec![0, 1, 2]));
        assert_eq!(splice.slice(&program, 7), Some(vec![0, 1, 2, 7]));
        assert_eq!(splice.slice(&program, 4), None);
        assert_eq!(splice.slice(&program, 5), None);
    }

    #[test]
    fn test_slice_respects_size_limit() {
        let config = MutationConfig {
            max_splice_size: 2,
            ..MutationConfig::default()
        };
        assert_eq!(SpliceMutator::new(&config).slice(&donor(), 2), None);
    }

    #[test]
    fn test_splice_from_donor() {
        let mut b = ProgramBuilder::new();
        b.load_bool(true).unwrap();
        let program = b.finalize().unwrap();

        for s in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(s);
            let mutated = SpliceMutator::default()
                .splice_from(&program, &donor(), &mut rng)
                .unwrap()
                .unwrap();
            validate_program(&mutated).unwrap();
            assert!(mutated.size() > program.size());
        }
    }

    #[test]
    fn test_declines_without_sliceable_instruction() {
        let mut b = ProgramBuilder::new();
        b.begin_function(1).unwrap();
        b.end_function().unwrap();
        let program = b.finalize().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(SpliceMutator::default().mutate(&program, &mut rng).unwrap().is_none());
    }
}
