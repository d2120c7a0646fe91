//! The mutation engine.

use crate::interfaces::{Execution, Executor, Lifter};
use fuzzir_core::{EngineConfig, Error, Result};
use fuzzir_ir::{
    validate_program, AnyMutator, Mutator, MutatorKind, Program, ProgramBuilder, Type, VariableMap,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};

/// A mutated program and the mutator that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub program: Program,
    pub mutator: MutatorKind,
}

impl MutationOutcome {
    /// Best known type of every variable: carried runtime types where
    /// present, inferred types elsewhere
    pub fn types(&self) -> VariableMap<Type> {
        self.program.inferred_types()
    }

    pub fn runtime_types(&self) -> &VariableMap<Type> {
        self.program.runtime_types()
    }
}

/// A mutated program after it has been executed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzOutcome {
    /// The mutated program with the observed runtime types attached
    pub program: Program,
    pub mutator: MutatorKind,
    pub execution: Execution,
}

pub struct MutationEngine {
    config: EngineConfig,
    rng: ChaCha8Rng,
    prefix: Option<Program>,
    mutators: Vec<(AnyMutator, u32)>,
}

impl MutationEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let weights = &config.weights;
        let mutators: Vec<(AnyMutator, u32)> = MutatorKind::ALL
            .into_iter()
            .map(|kind| {
                let weight = match kind {
                    MutatorKind::Input => weights.input,
                    MutatorKind::Operation => weights.operation,
                    MutatorKind::CodeGen => weights.codegen,
                    MutatorKind::Splice => weights.splice,
                };
                (AnyMutator::new(kind, &config.mutation), weight)
            })
            .filter(|(_, weight)| *weight > 0)
            .collect();

        info!(seed = config.seed, mutators = mutators.len(), "Mutation engine created");
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            prefix: None,
            mutators,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Set the program every seed is prefixed with before mutation
    pub fn set_prefix(&mut self, prefix: Program) {
        debug!(size = prefix.size(), "Prefix set");
        self.prefix = Some(prefix);
    }

    pub fn prefix(&self) -> Option<&Program> {
        self.prefix.as_ref()
    }

    /// Prepend the prefix to `program`.
    ///
    /// Prefix variables carry no runtime types; the program's own runtime
    /// types follow its variables to their new numbers.
    pub fn prepare_for_mutation(&self, program: &Program) -> Result<Program> {
        let mut b = ProgramBuilder::new();
        if let Some(prefix) = &self.prefix {
            b.adopting(prefix, |b| {
                for inst in prefix {
                    b.adopt(inst, false)?;
                }
                Ok(())
            })?;
        }
        b.adopting(program, |b| {
            for inst in program {
                b.adopt(inst, true)?;
            }
            Ok(())
        })?;
        b.finalize()
    }

    /// Mutate `seed` with randomly chosen mutators.
    ///
    /// Mutators that decline are retried with a fresh choice, up to the
    /// configured number of attempts. `Ok(None)` means every attempt declined.
    #[instrument(skip(self, seed), fields(seed_size = seed.size()))]
    pub fn mutate(&mut self, seed: &Program) -> Result<Option<MutationOutcome>> {
        for attempt in 0..self.config.max_mutation_attempts {
            let (mutator, _) = self
                .mutators
                .choose_weighted(&mut self.rng, |(_, weight)| *weight)
                .map_err(|e| Error::Config(e.to_string()))?;

            match run_mutator(mutator, seed, &mut self.rng)? {
                Some(program) => {
                    self.verify(mutator.name(), &program)?;
                    debug!(attempt, mutator = mutator.name(), size = program.size(), "Mutation succeeded");
                    return Ok(Some(MutationOutcome {
                        program,
                        mutator: mutator.kind(),
                    }));
                }
                None => trace!(attempt, mutator = mutator.name(), "Mutator declined"),
            }
        }
        debug!(attempts = self.config.max_mutation_attempts, "No mutator applied");
        Ok(None)
    }

    /// Mutate `seed` with the mutator named by `kind`, once
    pub fn mutate_with(&mut self, kind: MutatorKind, seed: &Program) -> Result<Option<MutationOutcome>> {
        let mutator = AnyMutator::new(kind, &self.config.mutation);
        let Some(program) = run_mutator(&mutator, seed, &mut self.rng)? else {
            return Ok(None);
        };
        self.verify(mutator.name(), &program)?;
        Ok(Some(MutationOutcome { program, mutator: kind }))
    }

    /// Post-mutation validity check. An invalid program is a mutator bug and
    /// fuzzing must not continue with it.
    pub fn verify(&self, mutator: &str, program: &Program) -> Result<()> {
        if !self.config.validate_mutations {
            return Ok(());
        }
        validate_program(program).map_err(|e| {
            error!(mutator, error = %e, "Mutator produced an invalid program");
            Error::MutatorDefect {
                mutator: mutator.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Prepare `seed`, mutate it, then lift and execute the result.
    ///
    /// The returned program carries the runtime types the executor observed.
    #[instrument(skip_all, fields(seed_size = seed.size()))]
    pub fn fuzz_one<L, E>(&mut self, seed: &Program, lifter: &L, executor: &mut E) -> Result<Option<FuzzOutcome>>
    where
        L: Lifter + ?Sized,
        E: Executor + ?Sized,
    {
        let prepared = self.prepare_for_mutation(seed)?;
        let Some(MutationOutcome { mut program, mutator }) = self.mutate(&prepared)? else {
            return Ok(None);
        };

        let script = lifter.lift(&program)?;
        let execution = executor.execute(&script)?;
        if execution.outcome.is_crash() {
            warn!(mutator = mutator.name(), outcome = ?execution.outcome, program = %program.id(), "Crash found");
        } else {
            trace!(outcome = ?execution.outcome, "Execution finished");
        }

        program.set_runtime_types(execution.runtime_types.clone());
        Ok(Some(FuzzOutcome {
            program,
            mutator,
            execution,
        }))
    }
}

fn run_mutator(mutator: &AnyMutator, seed: &Program, rng: &mut ChaCha8Rng) -> Result<Option<Program>> {
    mutator.mutate(seed, rng).map_err(|e| {
        error!(mutator = mutator.name(), error = %e, "Mutator failed");
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_weights_are_dropped() {
        let mut config = EngineConfig::default();
        config.weights.splice = 0;
        let engine = MutationEngine::new(config).unwrap();
        assert_eq!(engine.mutators.len(), 3);
        assert!(engine.mutators.iter().all(|(m, _)| m.kind() != MutatorKind::Splice));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.max_mutation_attempts = 0;
        assert!(matches!(MutationEngine::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_prepare_without_prefix_copies_program() {
        let engine = MutationEngine::new(EngineConfig::default()).unwrap();
        let mut b = ProgramBuilder::new();
        b.load_int(3).unwrap();
        let mut program = b.finalize().unwrap();
        program.set_runtime_types(VariableMap::from_values(vec![Type::INTEGER]));

        let prepared = engine.prepare_for_mutation(&program).unwrap();
        assert!(prepared.same_code(&program));
        assert_eq!(prepared.runtime_types(), program.runtime_types());
        assert_ne!(prepared.id(), program.id());
    }
}
