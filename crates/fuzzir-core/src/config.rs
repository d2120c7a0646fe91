//! Configuration types for the mutation engine.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters shared by all mutators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Upper bound on how many instructions a single instruction mutator touches
    pub max_simultaneous_mutations: usize,
    /// Minimum number of instructions emitted by one code generation round
    pub codegen_min_instructions: usize,
    /// Maximum number of instructions emitted by one code generation round
    pub codegen_max_instructions: usize,
    /// Maximum block nesting depth the code generators may open
    pub max_block_depth: usize,
    /// Probability of replacing an input with a fresh constant rather than an existing variable
    pub fresh_constant_probability: f64,
    /// Maximum number of instructions copied by a single splice
    pub max_splice_size: usize,
    /// Programs at or above this size are not grown any further
    pub max_program_size: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            max_simultaneous_mutations: 3,
            codegen_min_instructions: 1,
            codegen_max_instructions: 5,
            max_block_depth: 3,
            fresh_constant_probability: 0.1,
            max_splice_size: 16,
            max_program_size: 1000,
        }
    }
}

/// Relative selection weight of each mutator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutatorWeights {
    pub input: u32,
    pub operation: u32,
    pub codegen: u32,
    pub splice: u32,
}

impl Default for MutatorWeights {
    fn default() -> Self {
        Self {
            input: 4,
            operation: 2,
            codegen: 3,
            splice: 1,
        }
    }
}

impl MutatorWeights {
    pub fn total(&self) -> u32 {
        self.input + self.operation + self.codegen + self.splice
    }
}

/// Mutation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// How many mutators to try before giving up on a seed
    pub max_mutation_attempts: usize,
    /// Run the structural validator on every mutated program
    pub validate_mutations: bool,
    pub mutation: MutationConfig,
    pub weights: MutatorWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_mutation_attempts: 10,
            validate_mutations: true,
            mutation: MutationConfig::default(),
            weights: MutatorWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.weights.total() == 0 {
            return Err(Error::Config("all mutator weights are zero".to_string()));
        }
        if self.max_mutation_attempts == 0 {
            return Err(Error::Config("max_mutation_attempts must be positive".to_string()));
        }
        let m = &self.mutation;
        if m.max_simultaneous_mutations == 0 {
            return Err(Error::Config(
                "max_simultaneous_mutations must be positive".to_string(),
            ));
        }
        if m.codegen_min_instructions == 0 || m.codegen_min_instructions > m.codegen_max_instructions {
            return Err(Error::Config(format!(
                "invalid code generation bounds {}..={}",
                m.codegen_min_instructions, m.codegen_max_instructions
            )));
        }
        if !(0.0..=1.0).contains(&m.fresh_constant_probability) {
            return Err(Error::Config(format!(
                "fresh_constant_probability {} is not a probability",
                m.fresh_constant_probability
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = EngineConfig::default();
        assert_eq!(config.max_mutation_attempts, 10);
        assert!(config.validate_mutations);
        assert_eq!(config.mutation.max_simultaneous_mutations, 3);
        assert_eq!(config.weights.total(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"seed": 42, "weights": {"splice": 0}}"#).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.weights.splice, 0);
        assert_eq!(config.weights.input, 4);
        assert_eq!(config.mutation.max_block_depth, 3);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let json = r#"{"weights": {"input": 0, "operation": 0, "codegen": 0, "splice": 0}}"#;
        assert!(matches!(EngineConfig::from_json(json), Err(Error::Config(_))));

        let json = r#"{"mutation": {"codegen_min_instructions": 9, "codegen_max_instructions": 2}}"#;
        assert!(matches!(EngineConfig::from_json(json), Err(Error::Config(_))));

        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(Error::Serialization(_))
        ));
    }
}
