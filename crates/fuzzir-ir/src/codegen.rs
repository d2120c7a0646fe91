//! Random code generation.
//!
//! A fixed, weighted table of small generators. Each generator emits a few
//! instructions through a [`ProgramBuilder`] using only variables that are
//! visible at the current position. Block generators recurse into their
//! bodies and stop opening new blocks at the configured depth.

use crate::builder::ProgramBuilder;
use crate::environment::{
    BUILTINS, INTERESTING_FLOATS, INTERESTING_INTEGERS, INTERESTING_STRINGS, METHOD_NAMES,
    PROPERTY_NAMES, REGEXP_FLAGS, REGEXP_PATTERNS,
};
use crate::operation::{BinaryOperator, Comparator, Operation, UnaryOperator};
use crate::types::Type;
use fuzzir_core::{MutationConfig, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generator {
    Integer,
    Float,
    String,
    Boolean,
    BigInt,
    RegExp,
    Builtin,
    ObjectLiteral,
    ArrayLiteral,
    PropertyLoad,
    PropertyStore,
    FunctionCall,
    MethodCall,
    Construct,
    Unary,
    Binary,
    Comparison,
    TypeOf,
    Phi,
    Copy,
    IfElse,
    While,
    For,
    Function,
    LoopJump,
    Return,
}

impl Generator {
    /// Every generator with its selection weight
    pub const TABLE: &'static [(Generator, u32)] = &[
        (Generator::Integer, 4),
        (Generator::Float, 2),
        (Generator::String, 2),
        (Generator::Boolean, 1),
        (Generator::BigInt, 1),
        (Generator::RegExp, 1),
        (Generator::Builtin, 2),
        (Generator::ObjectLiteral, 2),
        (Generator::ArrayLiteral, 2),
        (Generator::PropertyLoad, 3),
        (Generator::PropertyStore, 3),
        (Generator::FunctionCall, 3),
        (Generator::MethodCall, 3),
        (Generator::Construct, 2),
        (Generator::Unary, 2),
        (Generator::Binary, 4),
        (Generator::Comparison, 2),
        (Generator::TypeOf, 1),
        (Generator::Phi, 2),
        (Generator::Copy, 2),
        (Generator::IfElse, 2),
        (Generator::While, 1),
        (Generator::For, 1),
        (Generator::Function, 1),
        (Generator::LoopJump, 1),
        (Generator::Return, 1),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Generator::Integer => "IntegerGenerator",
            Generator::Float => "FloatGenerator",
            Generator::String => "StringGenerator",
            Generator::Boolean => "BooleanGenerator",
            Generator::BigInt => "BigIntGenerator",
            Generator::RegExp => "RegExpGenerator",
            Generator::Builtin => "BuiltinGenerator",
            Generator::ObjectLiteral => "ObjectLiteralGenerator",
            Generator::ArrayLiteral => "ArrayLiteralGenerator",
            Generator::PropertyLoad => "PropertyLoadGenerator",
            Generator::PropertyStore => "PropertyStoreGenerator",
            Generator::FunctionCall => "FunctionCallGenerator",
            Generator::MethodCall => "MethodCallGenerator",
            Generator::Construct => "ConstructGenerator",
            Generator::Unary => "UnaryOperationGenerator",
            Generator::Binary => "BinaryOperationGenerator",
            Generator::Comparison => "ComparisonGenerator",
            Generator::TypeOf => "TypeOfGenerator",
            Generator::Phi => "PhiGenerator",
            Generator::Copy => "CopyGenerator",
            Generator::IfElse => "IfElseGenerator",
            Generator::While => "WhileLoopGenerator",
            Generator::For => "ForLoopGenerator",
            Generator::Function => "FunctionDefinitionGenerator",
            Generator::LoopJump => "LoopJumpGenerator",
            Generator::Return => "ReturnGenerator",
        }
    }

    fn opens_block(&self) -> bool {
        matches!(
            self,
            Generator::IfElse | Generator::While | Generator::For | Generator::Function
        )
    }

    fn needs_inputs(&self) -> bool {
        !matches!(
            self,
            Generator::Integer
                | Generator::Float
                | Generator::String
                | Generator::Boolean
                | Generator::BigInt
                | Generator::RegExp
                | Generator::Builtin
                | Generator::ObjectLiteral
                | Generator::ArrayLiteral
                | Generator::While
                | Generator::For
                | Generator::Function
                | Generator::LoopJump
        )
    }

    /// Whether this generator can run at the builder's current position
    pub fn is_applicable(&self, builder: &ProgramBuilder, max_depth: usize) -> bool {
        if self.opens_block() && builder.block_depth() >= max_depth {
            return false;
        }
        if self.needs_inputs() && !builder.has_visible_variables() {
            return false;
        }
        match self {
            Generator::LoopJump => builder.in_loop(),
            Generator::Return => builder.in_function(),
            Generator::Copy => builder.visible_variables().iter().any(|v| builder.is_phi(*v)),
            _ => true,
        }
    }
}

/// Emits random code into a builder
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    min_instructions: usize,
    max_instructions: usize,
    max_depth: usize,
}

impl CodeGenerator {
    pub fn new(config: &MutationConfig) -> Self {
        Self {
            min_instructions: config.codegen_min_instructions,
            max_instructions: config.codegen_max_instructions.max(config.codegen_min_instructions),
            max_depth: config.max_block_depth,
        }
    }

    /// Emit at least the configured minimum number of instructions at the
    /// builder's current position
    pub fn generate(&self, b: &mut ProgramBuilder, rng: &mut ChaCha8Rng) -> Result<()> {
        let target = rng.gen_range(self.min_instructions..=self.max_instructions);
        let start = b.size();
        while b.size() - start < target {
            self.run_one(b, rng)?;
        }
        Ok(())
    }

    /// Pick one applicable generator and run it
    pub fn run_one(&self, b: &mut ProgramBuilder, rng: &mut ChaCha8Rng) -> Result<()> {
        let applicable: Vec<(Generator, u32)> = Generator::TABLE
            .iter()
            .copied()
            .filter(|(g, _)| g.is_applicable(b, self.max_depth))
            .collect();
        // Literal generators are always applicable, so the list is never empty
        let generator = applicable
            .choose_weighted(rng, |(_, weight)| *weight)
            .map(|(g, _)| *g)
            .unwrap_or(Generator::Integer);
        self.run(generator, b, rng)
    }

    /// Run `generator`; the caller is responsible for checking applicability
    pub fn run(&self, generator: Generator, b: &mut ProgramBuilder, rng: &mut ChaCha8Rng) -> Result<()> {
        trace!(generator = generator.name(), depth = b.block_depth(), "running generator");
        match generator {
            Generator::Integer => {
                b.load_int(random_integer(rng))?;
            }
            Generator::Float => {
                b.load_float(random_float(rng))?;
            }
            Generator::String => {
                b.load_string(&random_string(rng))?;
            }
            Generator::Boolean => {
                b.load_bool(rng.gen())?;
            }
            Generator::BigInt => {
                b.load_bigint(random_integer(rng))?;
            }
            Generator::RegExp => {
                let (pattern, flags) = random_regexp(rng);
                b.load_regexp(pattern, flags)?;
            }
            Generator::Builtin => {
                b.load_builtin(random_builtin(rng))?;
            }
            Generator::ObjectLiteral => {
                let values = random_variables(b, rng, 3);
                let mut names: Vec<&str> = PROPERTY_NAMES.choose_multiple(rng, values.len()).copied().collect();
                names.truncate(values.len());
                let properties: Vec<(&str, _)> = names.into_iter().zip(values).collect();
                b.create_object(&properties)?;
            }
            Generator::ArrayLiteral => {
                let elements = random_variables(b, rng, 4);
                b.create_array(&elements)?;
            }
            Generator::PropertyLoad => {
                if let Some(object) = b.random_variable_compatible_with(Type::OBJECT, rng) {
                    b.load_property(object, random_property_name(rng))?;
                }
            }
            Generator::PropertyStore => {
                let object = b.random_variable_compatible_with(Type::OBJECT, rng);
                let value = b.random_variable(rng);
                if let (Some(object), Some(value)) = (object, value) {
                    b.store_property(object, random_property_name(rng), value)?;
                }
            }
            Generator::FunctionCall => {
                if let Some(function) = b.random_variable_compatible_with(Type::FUNCTION, rng) {
                    let arguments = random_variables(b, rng, 3);
                    b.call_function(function, &arguments)?;
                }
            }
            Generator::MethodCall => {
                if let Some(object) = b.random_variable(rng) {
                    let arguments = random_variables(b, rng, 3);
                    b.call_method(object, random_method_name(rng), &arguments)?;
                }
            }
            Generator::Construct => {
                if let Some(constructor) = b.random_variable_compatible_with(Type::CONSTRUCTOR, rng) {
                    let arguments = random_variables(b, rng, 3);
                    b.construct(constructor, &arguments)?;
                }
            }
            Generator::Unary => {
                if let Some(input) = b.random_variable(rng) {
                    b.unary(input, random_unary_operator(rng))?;
                }
            }
            Generator::Binary => {
                if let (Some(lhs), Some(rhs)) = (b.random_variable(rng), b.random_variable(rng)) {
                    b.binary(lhs, rhs, random_binary_operator(rng))?;
                }
            }
            Generator::Comparison => {
                if let (Some(lhs), Some(rhs)) = (b.random_variable(rng), b.random_variable(rng)) {
                    b.compare(lhs, rhs, random_comparator(rng))?;
                }
            }
            Generator::TypeOf => {
                if let Some(input) = b.random_variable(rng) {
                    b.type_of_value(input)?;
                }
            }
            Generator::Phi => {
                if let Some(initial) = b.random_variable(rng) {
                    b.phi(initial)?;
                }
            }
            Generator::Copy => {
                if let (Some(target), Some(value)) = (b.random_phi(rng), b.random_variable(rng)) {
                    b.copy(value, target)?;
                }
            }
            Generator::IfElse => {
                let condition = match b.random_variable_compatible_with(Type::BOOLEAN, rng) {
                    Some(v) => v,
                    None => b.load_bool(rng.gen())?,
                };
                b.begin_if(condition)?;
                self.generate_body(b, rng)?;
                if rng.gen_bool(0.5) {
                    b.begin_else()?;
                    self.generate_body(b, rng)?;
                }
                b.end_if()?;
            }
            Generator::While => {
                let start = b.load_int(0)?;
                let counter = b.phi(start)?;
                let limit = b.load_int(rng.gen_range(1..16))?;
                b.begin_while(counter, limit, Comparator::LessThan)?;
                // Bumped first so a `continue` in the body cannot skip it
                let one = b.load_int(1)?;
                let next = b.binary(counter, one, BinaryOperator::Add)?;
                b.copy(next, counter)?;
                self.generate_body(b, rng)?;
                b.end_while()?;
            }
            Generator::For => {
                let start = b.load_int(0)?;
                let end = b.load_int(rng.gen_range(1..16))?;
                let step = b.load_int(1)?;
                b.begin_for(start, end, step, Comparator::LessThan, BinaryOperator::Add)?;
                self.generate_body(b, rng)?;
                b.end_for()?;
            }
            Generator::Function => {
                let (function, _) = b.begin_function(rng.gen_range(0..4))?;
                self.generate_body(b, rng)?;
                if let Some(value) = b.random_variable(rng) {
                    b.do_return(value)?;
                }
                b.end_function()?;
                if rng.gen_bool(0.5) {
                    let arguments = random_variables(b, rng, 3);
                    b.call_function(function, &arguments)?;
                }
            }
            Generator::LoopJump => {
                if rng.gen_bool(0.5) {
                    b.loop_break()?;
                } else {
                    b.loop_continue()?;
                }
            }
            Generator::Return => {
                if let Some(value) = b.random_variable(rng) {
                    b.do_return(value)?;
                }
            }
        }
        Ok(())
    }

    fn generate_body(&self, b: &mut ProgramBuilder, rng: &mut ChaCha8Rng) -> Result<()> {
        let count = rng.gen_range(1..=3);
        for _ in 0..count {
            self.run_one(b, rng)?;
        }
        Ok(())
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(&MutationConfig::default())
    }
}

fn random_variables(b: &ProgramBuilder, rng: &mut ChaCha8Rng, max: usize) -> Vec<crate::variable::Variable> {
    if !b.has_visible_variables() {
        return Vec::new();
    }
    let count = rng.gen_range(0..=max);
    (0..count).filter_map(|_| b.random_variable(rng)).collect()
}

pub fn random_integer(rng: &mut ChaCha8Rng) -> i64 {
    if rng.gen_bool(0.7) {
        INTERESTING_INTEGERS.choose(rng).copied().unwrap_or(0)
    } else {
        rng.gen_range(-256..256)
    }
}

pub fn random_float(rng: &mut ChaCha8Rng) -> f64 {
    if rng.gen_bool(0.7) {
        INTERESTING_FLOATS.choose(rng).copied().unwrap_or(0.0)
    } else {
        rng.gen_range(-1e6..1e6)
    }
}

pub fn random_string(rng: &mut ChaCha8Rng) -> String {
    if rng.gen_bool(0.8) {
        INTERESTING_STRINGS.choose(rng).copied().unwrap_or_default().to_string()
    } else {
        let len = rng.gen_range(1..8);
        (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
    }
}

pub fn random_regexp(rng: &mut ChaCha8Rng) -> (&'static str, &'static str) {
    let pattern = REGEXP_PATTERNS.choose(rng).copied().unwrap_or("a");
    let flags = REGEXP_FLAGS.choose(rng).copied().unwrap_or("");
    (pattern, flags)
}

pub fn random_builtin(rng: &mut ChaCha8Rng) -> &'static str {
    BUILTINS.choose(rng).map(|(name, _)| *name).unwrap_or("Object")
}

pub fn random_property_name(rng: &mut ChaCha8Rng) -> &'static str {
    PROPERTY_NAMES.choose(rng).copied().unwrap_or("a")
}

pub fn random_method_name(rng: &mut ChaCha8Rng) -> &'static str {
    METHOD_NAMES.choose(rng).copied().unwrap_or("toString")
}

pub fn random_unary_operator(rng: &mut ChaCha8Rng) -> UnaryOperator {
    UnaryOperator::ALL.choose(rng).copied().unwrap_or(UnaryOperator::Minus)
}

pub fn random_binary_operator(rng: &mut ChaCha8Rng) -> BinaryOperator {
    BinaryOperator::ALL.choose(rng).copied().unwrap_or(BinaryOperator::Add)
}

pub fn random_comparator(rng: &mut ChaCha8Rng) -> Comparator {
    Comparator::ALL.choose(rng).copied().unwrap_or(Comparator::Equal)
}

/// An input-free operation producing a value of a type compatible with `wanted`.
///
/// `unknown` (or a type no literal can produce) yields a random literal.
pub fn literal_of_type(wanted: Type, rng: &mut ChaCha8Rng) -> Operation {
    let wants = |ty: Type| !wanted.is_unknown() && wanted.may_be(ty);
    let mut candidates: Vec<Type> = [
        Type::INTEGER,
        Type::FLOAT,
        Type::STRING,
        Type::BOOLEAN,
        Type::BIGINT,
        Type::REGEXP,
        Type::UNDEFINED,
        Type::OBJECT,
        Type::FUNCTION,
        Type::CONSTRUCTOR,
    ]
    .into_iter()
    .filter(|ty| wants(*ty))
    .collect();
    if candidates.is_empty() {
        candidates = vec![Type::INTEGER, Type::FLOAT, Type::STRING, Type::BOOLEAN];
    }

    let ty = candidates.choose(rng).copied().unwrap_or(Type::INTEGER);
    if ty == Type::INTEGER {
        Operation::LoadInteger(random_integer(rng))
    } else if ty == Type::FLOAT {
        Operation::LoadFloat(random_float(rng))
    } else if ty == Type::STRING {
        Operation::LoadString(random_string(rng))
    } else if ty == Type::BOOLEAN {
        Operation::LoadBoolean(rng.gen())
    } else if ty == Type::BIGINT {
        Operation::LoadBigInt(random_integer(rng))
    } else if ty == Type::REGEXP {
        let (pattern, flags) = random_regexp(rng);
        Operation::LoadRegExp {
            pattern: pattern.to_string(),
            flags: flags.to_string(),
        }
    } else if ty == Type::UNDEFINED {
        Operation::LoadUndefined
    } else if ty == Type::OBJECT {
        Operation::CreateObject {
            property_names: Vec::new(),
        }
    } else {
        let builtins: Vec<&str> = BUILTINS
            .iter()
            .filter(|(_, t)| t.may_be(ty))
            .map(|(name, _)| *name)
            .collect();
        Operation::LoadBuiltin(builtins.choose(rng).copied().unwrap_or("Object").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_program;
    use rand::SeedableRng;

    #[test]
    fn test_literal_of_type_is_compatible() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for (_, ty) in crate::types::BASE_TYPES.iter().filter(|(_, t)| !t.is_nothing()) {
            for _ in 0..10 {
                let op = literal_of_type(*ty, &mut rng);
                let produced = crate::inference::output_types(&op, &[])[0];
                assert!(produced.is_compatible_with(*ty), "{} for {}", op, ty);
            }
        }
    }

    #[test]
    fn test_generate_produces_valid_programs() {
        let generator = CodeGenerator::default();
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut b = ProgramBuilder::new();
            for _ in 0..4 {
                generator.generate(&mut b, &mut rng).unwrap();
            }
            let program = b.finalize().unwrap();
            assert!(program.size() >= 4);
            validate_program(&program).unwrap();
        }
    }

    #[test]
    fn test_block_generators_respect_depth() {
        let config = MutationConfig {
            max_block_depth: 0,
            ..MutationConfig::default()
        };
        let generator = CodeGenerator::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut b = ProgramBuilder::new();
        for _ in 0..20 {
            generator.generate(&mut b, &mut rng).unwrap();
        }
        let program = b.finalize().unwrap();
        assert!(program.iter().all(|inst| !inst.is_block()));
    }

    #[test]
    fn test_while_counter_is_bumped_before_the_body() {
        let generator = CodeGenerator::default();
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut b = ProgramBuilder::new();
            generator.run(Generator::While, &mut b, &mut rng).unwrap();
            let program = b.finalize().unwrap();
            let insts = program.instructions();

            let begin = insts
                .iter()
                .position(|i| matches!(i.operation(), Operation::BeginWhile(_)))
                .unwrap();
            let counter = insts[begin].input(0);
            assert_eq!(insts[begin + 1].operation(), &Operation::LoadInteger(1));
            assert_eq!(
                insts[begin + 2].operation(),
                &Operation::BinaryOperation(BinaryOperator::Add)
            );
            assert!(matches!(insts[begin + 3].operation(), Operation::Copy));
            assert_eq!(insts[begin + 3].input(0), counter);
        }
    }

    #[test]
    fn test_context_generators_need_context() {
        let b = ProgramBuilder::new();
        assert!(!Generator::LoopJump.is_applicable(&b, 3));
        assert!(!Generator::Return.is_applicable(&b, 3));
        assert!(!Generator::Binary.is_applicable(&b, 3));
        assert!(Generator::Integer.is_applicable(&b, 3));
        assert!(Generator::For.is_applicable(&b, 3));
        assert!(!Generator::For.is_applicable(&b, 0));
    }
}
