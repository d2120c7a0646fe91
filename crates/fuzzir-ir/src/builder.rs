//! Incremental construction of valid programs.
//!
//! A [`ProgramBuilder`] appends instructions one at a time and refuses any
//! instruction that would make the program invalid: inputs must be visible,
//! blocks must nest, jumps and returns must sit inside a loop or function.
//! It also runs the type analysis as it goes, so generators and mutators can
//! ask what variables and types are available at the current position.
//!
//! Mutators replay a seed program through a builder with [`ProgramBuilder::adopt`],
//! which remaps the seed's variables into the builder's namespace.

use crate::codegen;
use crate::inference::TypeAnalyzer;
use crate::instruction::Instruction;
use crate::operation::{BinaryOperator, BlockKind, Comparator, Operation, UnaryOperator};
use crate::program::Program;
use crate::types::Type;
use crate::variable::{Variable, VariableMap};
use fuzzir_core::{Error, Result};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// State of an in-progress adoption from a source program
#[derive(Debug, Default)]
struct Adoption {
    mapping: HashMap<Variable, Variable>,
    source_types: VariableMap<Type>,
}

#[derive(Debug)]
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
    next_variable: u32,
    /// Variables defined in each open scope, outermost first
    scopes: Vec<Vec<Variable>>,
    blocks: Vec<BlockKind>,
    phis: HashSet<Variable>,
    analyzer: TypeAnalyzer,
    runtime_types: VariableMap<Type>,
    adoption: Option<Adoption>,
    finalized: bool,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            next_variable: 0,
            scopes: vec![Vec::new()],
            blocks: Vec::new(),
            phis: HashSet::new(),
            analyzer: TypeAnalyzer::new(),
            runtime_types: VariableMap::new(),
            adoption: None,
            finalized: false,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.finalized {
            return Err(Error::UseAfterFinalize);
        }
        Ok(())
    }

    fn fresh_variable(&mut self) -> Variable {
        let v = Variable(self.next_variable);
        self.next_variable += 1;
        v
    }

    fn is_visible(&self, variable: Variable) -> bool {
        self.scopes.iter().any(|scope| scope.contains(&variable))
    }

    /// Append an instruction, returning its outputs followed by its inner outputs.
    pub fn append(&mut self, operation: Operation, inputs: &[Variable]) -> Result<Vec<Variable>> {
        self.ensure_active()?;
        let index = self.instructions.len();

        if inputs.len() != operation.num_inputs() {
            return Err(Error::ArityMismatch {
                operation: operation.name().to_string(),
                expected: operation.num_inputs(),
                actual: inputs.len(),
            });
        }
        for input in inputs {
            if !self.is_visible(*input) {
                return Err(Error::InvalidReference {
                    variable: input.number(),
                    index,
                });
            }
        }
        if let Operation::Copy = operation {
            if !self.phis.contains(&inputs[0]) {
                return Err(Error::Validation(format!(
                    "copy target {} at {} is not a phi",
                    inputs[0], index
                )));
            }
        }
        if operation.requires_loop() && !self.in_loop() {
            return Err(Error::MalformedNesting(format!(
                "{} at {} outside of a loop",
                operation.name(),
                index
            )));
        }
        if operation.requires_function() && !self.in_function() {
            return Err(Error::MalformedNesting(format!(
                "{} at {} outside of a function",
                operation.name(),
                index
            )));
        }

        if operation.is_block_end() {
            match self.blocks.last() {
                Some(open) if operation.closed_blocks().contains(open) => {
                    self.blocks.pop();
                    self.scopes.pop();
                }
                open => {
                    return Err(Error::MalformedNesting(format!(
                        "{} at {} cannot close {:?}",
                        operation.name(),
                        index,
                        open
                    )));
                }
            }
        }

        let outputs: Vec<Variable> = (0..operation.num_outputs()).map(|_| self.fresh_variable()).collect();
        if let Some(scope) = self.scopes.last_mut() {
            scope.extend(outputs.iter().copied());
        }

        if let Some(kind) = operation.opened_block() {
            self.blocks.push(kind);
            self.scopes.push(Vec::new());
        }

        let inner_outputs: Vec<Variable> =
            (0..operation.num_inner_outputs()).map(|_| self.fresh_variable()).collect();
        if let Some(scope) = self.scopes.last_mut() {
            scope.extend(inner_outputs.iter().copied());
        }

        let is_phi = matches!(operation, Operation::Phi);
        let instruction = Instruction::new(operation, inputs.to_vec(), outputs, inner_outputs, index)?;
        self.analyzer.analyze(&instruction);
        if is_phi {
            self.phis.extend(instruction.outputs().iter().copied());
        }
        trace!(%instruction, "appended");

        let result = instruction.all_outputs().collect();
        self.instructions.push(instruction);
        Ok(result)
    }

    fn emit(&mut self, operation: Operation, inputs: &[Variable]) -> Result<Variable> {
        let outputs = self.append(operation, inputs)?;
        outputs
            .first()
            .copied()
            .ok_or_else(|| Error::Validation("operation defines no output".to_string()))
    }

    fn emit_void(&mut self, operation: Operation, inputs: &[Variable]) -> Result<()> {
        self.append(operation, inputs).map(|_| ())
    }

    // Adoption

    /// Start adopting instructions from `source`
    pub fn begin_adoption(&mut self, source: &Program) -> Result<()> {
        self.ensure_active()?;
        if self.adoption.is_some() {
            return Err(Error::Validation("adoption already in progress".to_string()));
        }
        self.adoption = Some(Adoption {
            mapping: HashMap::new(),
            source_types: source.runtime_types().clone(),
        });
        Ok(())
    }

    pub fn end_adoption(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.adoption = None;
        Ok(())
    }

    /// Run `f` inside an adoption session for `source`
    pub fn adopting<T>(
        &mut self,
        source: &Program,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.begin_adoption(source)?;
        let result = f(self);
        self.adoption = None;
        result
    }

    /// The builder variable a source variable was adopted as
    pub fn adopted(&self, variable: Variable) -> Result<Variable> {
        self.ensure_active()?;
        let adoption = self
            .adoption
            .as_ref()
            .ok_or_else(|| Error::Validation("no adoption in progress".to_string()))?;
        adoption
            .mapping
            .get(&variable)
            .copied()
            .ok_or(Error::InvalidReference {
                variable: variable.number(),
                index: self.instructions.len(),
            })
    }

    /// Copy `instruction` from the adoption source into this builder.
    ///
    /// With `keep_types`, runtime types the source recorded for the outputs
    /// are carried over; otherwise the outputs only get inferred types.
    pub fn adopt(&mut self, instruction: &Instruction, keep_types: bool) -> Result<()> {
        let inputs = instruction
            .inputs()
            .iter()
            .map(|v| self.adopted(*v))
            .collect::<Result<Vec<_>>>()?;
        self.adopt_as(instruction, instruction.operation().clone(), &inputs, keep_types)?;
        Ok(())
    }

    /// Emit `operation` with builder-side `inputs` in place of `instruction`,
    /// mapping the source outputs onto the new outputs.
    pub fn adopt_as(
        &mut self,
        instruction: &Instruction,
        operation: Operation,
        inputs: &[Variable],
        keep_types: bool,
    ) -> Result<Vec<Variable>> {
        self.ensure_active()?;
        if self.adoption.is_none() {
            return Err(Error::Validation("no adoption in progress".to_string()));
        }
        if !operation.is_arity_compatible(instruction.operation()) {
            return Err(Error::Validation(format!(
                "{} cannot stand in for {}",
                operation.name(),
                instruction.operation().name()
            )));
        }

        let outputs = self.append(operation, inputs)?;
        let Some(adoption) = self.adoption.as_mut() else {
            return Err(Error::Validation("no adoption in progress".to_string()));
        };
        for (source, new) in instruction.all_outputs().zip(outputs.iter().copied()) {
            adoption.mapping.insert(source, new);
            if keep_types {
                if let Some(ty) = adoption.source_types.get(source).copied() {
                    self.runtime_types.set(new, ty);
                    self.analyzer.set_type(new, ty);
                }
            }
        }
        Ok(outputs)
    }

    /// Re-emit the instructions of `program` at `indices` with fresh variables.
    ///
    /// The slice must be self-contained: every input has to be defined by an
    /// instruction that is part of the slice.
    pub fn splice(&mut self, program: &Program, indices: &[usize]) -> Result<()> {
        self.ensure_active()?;
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut mapping: HashMap<Variable, Variable> = HashMap::new();
        for index in sorted {
            let instruction = program
                .get(index)
                .ok_or_else(|| Error::Validation(format!("splice index {} out of range", index)))?;
            let inputs = instruction
                .inputs()
                .iter()
                .map(|v| {
                    mapping.get(v).copied().ok_or(Error::InvalidReference {
                        variable: v.number(),
                        index: self.instructions.len(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let outputs = self.append(instruction.operation().clone(), &inputs)?;
            mapping.extend(instruction.all_outputs().zip(outputs));
        }
        Ok(())
    }

    /// Freeze the builder into a program. The builder cannot be used afterwards.
    pub fn finalize(&mut self) -> Result<Program> {
        self.ensure_active()?;
        if !self.blocks.is_empty() {
            return Err(Error::MalformedNesting(format!(
                "{} unclosed blocks at end of program: {:?}",
                self.blocks.len(),
                self.blocks
            )));
        }
        self.finalized = true;
        self.adoption = None;
        // A spent builder has nothing left to hand out
        self.scopes.clear();
        self.phis.clear();
        self.analyzer = TypeAnalyzer::new();
        self.next_variable = 0;
        let instructions = std::mem::take(&mut self.instructions);
        let runtime_types = std::mem::take(&mut self.runtime_types);
        debug!(instructions = instructions.len(), "program finalized");
        Ok(Program::from_parts(instructions, runtime_types))
    }

    // Queries

    /// Number of instructions emitted so far
    pub fn size(&self) -> usize {
        self.instructions.len()
    }

    pub fn num_variables(&self) -> usize {
        self.next_variable as usize
    }

    pub fn block_depth(&self) -> usize {
        self.blocks.len()
    }

    /// True if the innermost enclosing function (or the top level) is inside a loop
    pub fn in_loop(&self) -> bool {
        for block in self.blocks.iter().rev() {
            match block {
                BlockKind::Function => return false,
                kind if kind.is_loop() => return true,
                _ => {}
            }
        }
        false
    }

    pub fn in_function(&self) -> bool {
        self.blocks.contains(&BlockKind::Function)
    }

    /// Variables usable as inputs at the current position, in definition order
    pub fn visible_variables(&self) -> Vec<Variable> {
        self.scopes.iter().flatten().copied().collect()
    }

    pub fn has_visible_variables(&self) -> bool {
        self.scopes.iter().any(|scope| !scope.is_empty())
    }

    pub fn is_phi(&self, variable: Variable) -> bool {
        self.phis.contains(&variable)
    }

    /// Current type of `variable`: the carried runtime type if there is one,
    /// the inferred type otherwise
    pub fn type_of(&self, variable: Variable) -> Type {
        self.runtime_types
            .get(variable)
            .copied()
            .unwrap_or_else(|| self.analyzer.type_of(variable))
    }

    /// Runtime types carried over so far
    pub fn runtime_types(&self) -> &VariableMap<Type> {
        &self.runtime_types
    }

    pub fn random_variable(&self, rng: &mut ChaCha8Rng) -> Option<Variable> {
        self.visible_variables().choose(rng).copied()
    }

    /// A visible variable that could plausibly stand in for a value of `wanted`
    pub fn random_variable_compatible_with(&self, wanted: Type, rng: &mut ChaCha8Rng) -> Option<Variable> {
        let candidates: Vec<Variable> = self
            .visible_variables()
            .into_iter()
            .filter(|v| self.type_of(*v).is_compatible_with(wanted))
            .collect();
        candidates.choose(rng).copied()
    }

    /// A visible variable whose type is contained in `ty`
    pub fn random_variable_of_type(&self, ty: Type, rng: &mut ChaCha8Rng) -> Option<Variable> {
        let candidates: Vec<Variable> = self
            .visible_variables()
            .into_iter()
            .filter(|v| self.type_of(*v).is(ty))
            .collect();
        candidates.choose(rng).copied()
    }

    pub fn random_phi(&self, rng: &mut ChaCha8Rng) -> Option<Variable> {
        let phis: Vec<Variable> = self
            .visible_variables()
            .into_iter()
            .filter(|v| self.phis.contains(v))
            .collect();
        phis.choose(rng).copied()
    }

    /// Emit a fresh literal of a type compatible with `wanted`
    pub fn load_value_of_type(&mut self, wanted: Type, rng: &mut ChaCha8Rng) -> Result<Variable> {
        let operation = codegen::literal_of_type(wanted, rng);
        self.emit(operation, &[])
    }

    // Literals

    pub fn load_int(&mut self, value: i64) -> Result<Variable> {
        self.emit(Operation::LoadInteger(value), &[])
    }

    pub fn load_float(&mut self, value: f64) -> Result<Variable> {
        self.emit(Operation::LoadFloat(value), &[])
    }

    pub fn load_string(&mut self, value: &str) -> Result<Variable> {
        self.emit(Operation::LoadString(value.to_string()), &[])
    }

    pub fn load_bool(&mut self, value: bool) -> Result<Variable> {
        self.emit(Operation::LoadBoolean(value), &[])
    }

    pub fn load_undefined(&mut self) -> Result<Variable> {
        self.emit(Operation::LoadUndefined, &[])
    }

    pub fn load_bigint(&mut self, value: i64) -> Result<Variable> {
        self.emit(Operation::LoadBigInt(value), &[])
    }

    pub fn load_regexp(&mut self, pattern: &str, flags: &str) -> Result<Variable> {
        self.emit(
            Operation::LoadRegExp {
                pattern: pattern.to_string(),
                flags: flags.to_string(),
            },
            &[],
        )
    }

    pub fn load_builtin(&mut self, name: &str) -> Result<Variable> {
        self.emit(Operation::LoadBuiltin(name.to_string()), &[])
    }

    // Objects and calls

    pub fn create_object(&mut self, properties: &[(&str, Variable)]) -> Result<Variable> {
        let property_names = properties.iter().map(|(name, _)| name.to_string()).collect();
        let values: Vec<Variable> = properties.iter().map(|(_, v)| *v).collect();
        self.emit(Operation::CreateObject { property_names }, &values)
    }

    pub fn create_array(&mut self, elements: &[Variable]) -> Result<Variable> {
        self.emit(
            Operation::CreateArray {
                num_elements: elements.len(),
            },
            elements,
        )
    }

    pub fn load_property(&mut self, object: Variable, name: &str) -> Result<Variable> {
        self.emit(Operation::LoadProperty(name.to_string()), &[object])
    }

    pub fn store_property(&mut self, object: Variable, name: &str, value: Variable) -> Result<()> {
        self.emit_void(Operation::StoreProperty(name.to_string()), &[object, value])
    }

    pub fn call_function(&mut self, function: Variable, arguments: &[Variable]) -> Result<Variable> {
        let mut inputs = vec![function];
        inputs.extend_from_slice(arguments);
        self.emit(
            Operation::CallFunction {
                num_arguments: arguments.len(),
            },
            &inputs,
        )
    }

    pub fn call_method(&mut self, object: Variable, name: &str, arguments: &[Variable]) -> Result<Variable> {
        let mut inputs = vec![object];
        inputs.extend_from_slice(arguments);
        self.emit(
            Operation::CallMethod {
                name: name.to_string(),
                num_arguments: arguments.len(),
            },
            &inputs,
        )
    }

    pub fn construct(&mut self, constructor: Variable, arguments: &[Variable]) -> Result<Variable> {
        let mut inputs = vec![constructor];
        inputs.extend_from_slice(arguments);
        self.emit(
            Operation::Construct {
                num_arguments: arguments.len(),
            },
            &inputs,
        )
    }

    // Expressions

    pub fn unary(&mut self, input: Variable, op: UnaryOperator) -> Result<Variable> {
        self.emit(Operation::UnaryOperation(op), &[input])
    }

    pub fn binary(&mut self, lhs: Variable, rhs: Variable, op: BinaryOperator) -> Result<Variable> {
        self.emit(Operation::BinaryOperation(op), &[lhs, rhs])
    }

    pub fn compare(&mut self, lhs: Variable, rhs: Variable, op: Comparator) -> Result<Variable> {
        self.emit(Operation::Compare(op), &[lhs, rhs])
    }

    pub fn type_of_value(&mut self, input: Variable) -> Result<Variable> {
        self.emit(Operation::TypeOf, &[input])
    }

    /// Define a variable that can later be redefined with [`Self::copy`]
    pub fn phi(&mut self, initial: Variable) -> Result<Variable> {
        self.emit(Operation::Phi, &[initial])
    }

    /// Redefine the phi `target` with `value`
    pub fn copy(&mut self, value: Variable, target: Variable) -> Result<()> {
        self.emit_void(Operation::Copy, &[target, value])
    }

    pub fn nop(&mut self) -> Result<()> {
        self.emit_void(Operation::Nop, &[])
    }

    // Control flow

    pub fn begin_if(&mut self, condition: Variable) -> Result<()> {
        self.emit_void(Operation::BeginIf, &[condition])
    }

    pub fn begin_else(&mut self) -> Result<()> {
        self.emit_void(Operation::BeginElse, &[])
    }

    pub fn end_if(&mut self) -> Result<()> {
        self.emit_void(Operation::EndIf, &[])
    }

    pub fn begin_while(&mut self, lhs: Variable, rhs: Variable, comparator: Comparator) -> Result<()> {
        self.emit_void(Operation::BeginWhile(comparator), &[lhs, rhs])
    }

    pub fn end_while(&mut self) -> Result<()> {
        self.emit_void(Operation::EndWhile, &[])
    }

    /// Open a counting loop and return the loop variable
    pub fn begin_for(
        &mut self,
        start: Variable,
        end: Variable,
        step: Variable,
        comparator: Comparator,
        op: BinaryOperator,
    ) -> Result<Variable> {
        self.emit(Operation::BeginFor { comparator, op }, &[start, end, step])
    }

    pub fn end_for(&mut self) -> Result<()> {
        self.emit_void(Operation::EndFor, &[])
    }

    pub fn loop_break(&mut self) -> Result<()> {
        self.emit_void(Operation::LoopBreak, &[])
    }

    pub fn loop_continue(&mut self) -> Result<()> {
        self.emit_void(Operation::LoopContinue, &[])
    }

    /// Open a function definition, returning the function and its parameters
    pub fn begin_function(&mut self, num_parameters: usize) -> Result<(Variable, Vec<Variable>)> {
        let mut outputs = self.append(Operation::BeginFunction { num_parameters }, &[])?;
        let parameters = outputs.split_off(1);
        let function = outputs
            .pop()
            .ok_or_else(|| Error::Validation("function definition without output".to_string()))?;
        Ok((function, parameters))
    }

    pub fn do_return(&mut self, value: Variable) -> Result<()> {
        self.emit_void(Operation::Return, &[value])
    }

    pub fn end_function(&mut self) -> Result<()> {
        self.emit_void(Operation::EndFunction, &[])
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_append_rejects_undefined_input() {
        let mut b = ProgramBuilder::new();
        b.load_int(1).unwrap();
        let err = b.binary(Variable(0), Variable(7), BinaryOperator::Add).unwrap_err();
        assert_eq!(err, Error::InvalidReference { variable: 7, index: 1 });
    }

    #[test]
    fn test_block_scoping_hides_inner_variables() {
        let mut b = ProgramBuilder::new();
        let cond = b.load_bool(true).unwrap();
        b.begin_if(cond).unwrap();
        let inner = b.load_int(1).unwrap();
        assert!(b.visible_variables().contains(&inner));
        b.end_if().unwrap();
        assert!(!b.visible_variables().contains(&inner));

        let err = b.unary(inner, UnaryOperator::Minus).unwrap_err();
        assert!(matches!(err, Error::InvalidReference { variable: 1, .. }));
    }

    #[test]
    fn test_else_branch_cannot_see_if_branch() {
        let mut b = ProgramBuilder::new();
        let cond = b.load_bool(false).unwrap();
        b.begin_if(cond).unwrap();
        let x = b.load_int(1).unwrap();
        b.begin_else().unwrap();
        assert!(matches!(
            b.type_of_value(x),
            Err(Error::InvalidReference { .. })
        ));
        assert!(b.type_of_value(cond).is_ok());
        b.end_if().unwrap();
    }

    #[test]
    fn test_malformed_nesting() {
        let mut b = ProgramBuilder::new();
        assert!(matches!(b.end_if(), Err(Error::MalformedNesting(_))));
        assert!(matches!(b.loop_break(), Err(Error::MalformedNesting(_))));
        let v = b.load_int(0).unwrap();
        assert!(matches!(b.do_return(v), Err(Error::MalformedNesting(_))));

        b.begin_while(v, v, Comparator::LessThan).unwrap();
        assert!(matches!(b.end_for(), Err(Error::MalformedNesting(_))));
        b.loop_break().unwrap();
        let (_, _) = b.begin_function(0).unwrap();
        // A function body does not inherit the loop context
        assert!(matches!(b.loop_continue(), Err(Error::MalformedNesting(_))));
        b.end_function().unwrap();
        b.end_while().unwrap();
    }

    #[test]
    fn test_unclosed_block_cannot_finalize() {
        let mut b = ProgramBuilder::new();
        let cond = b.load_bool(true).unwrap();
        b.begin_if(cond).unwrap();
        assert!(matches!(b.finalize(), Err(Error::MalformedNesting(_))));
        b.end_if().unwrap();
        assert!(b.finalize().is_ok());
    }

    #[test]
    fn test_use_after_finalize() {
        let mut b = ProgramBuilder::new();
        b.load_int(1).unwrap();
        let program = b.finalize().unwrap();
        assert_eq!(program.size(), 1);
        assert_eq!(b.load_int(2).unwrap_err(), Error::UseAfterFinalize);
        assert_eq!(b.finalize().unwrap_err(), Error::UseAfterFinalize);
        assert_eq!(b.begin_adoption(&program).unwrap_err(), Error::UseAfterFinalize);
    }

    #[test]
    fn test_finalized_builder_hands_out_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut b = ProgramBuilder::new();
        let i = b.load_int(1).unwrap();
        let s = b.load_string("x").unwrap();
        b.phi(i).unwrap();
        b.finalize().unwrap();

        assert!(b.visible_variables().is_empty());
        assert!(!b.has_visible_variables());
        assert_eq!(b.random_variable(&mut rng), None);
        assert_eq!(b.random_variable_compatible_with(Type::STRING, &mut rng), None);
        assert_eq!(b.random_phi(&mut rng), None);
        assert_eq!(b.type_of(s), Type::UNKNOWN);
        assert_eq!((b.size(), b.num_variables(), b.block_depth()), (0, 0, 0));
        assert_eq!(b.load_value_of_type(Type::STRING, &mut rng).unwrap_err(), Error::UseAfterFinalize);
    }

    #[test]
    fn test_copy_requires_phi_target() {
        let mut b = ProgramBuilder::new();
        let a = b.load_int(1).unwrap();
        let c = b.load_int(2).unwrap();
        assert!(matches!(b.copy(c, a), Err(Error::Validation(_))));
        let p = b.phi(a).unwrap();
        assert!(b.copy(c, p).is_ok());
        assert!(b.is_phi(p));
    }

    #[test]
    fn test_function_scoping() {
        let mut b = ProgramBuilder::new();
        let (f, params) = b.begin_function(2).unwrap();
        assert_eq!(f, Variable(0));
        assert_eq!(params, vec![Variable(1), Variable(2)]);
        assert!(b.visible_variables().contains(&f));
        b.do_return(params[1]).unwrap();
        b.end_function().unwrap();
        assert_eq!(b.visible_variables(), vec![f]);
        assert!(b.call_function(f, &[]).is_ok());
    }

    #[test]
    fn test_adopt_round_trip_keeps_types() {
        let mut b = ProgramBuilder::new();
        let v0 = b.load_int(1).unwrap();
        let v1 = b.load_int(2).unwrap();
        b.binary(v0, v1, BinaryOperator::Add).unwrap();
        let mut program = b.finalize().unwrap();
        program.set_runtime_types(VariableMap::from_values(vec![Type::INTEGER; 3]));

        let mut b = ProgramBuilder::new();
        b.adopting(&program, |b| {
            for inst in &program {
                b.adopt(inst, true)?;
            }
            Ok(())
        })
        .unwrap();
        let copy = b.finalize().unwrap();
        assert!(copy.same_code(&program));
        assert_eq!(copy.runtime_types(), program.runtime_types());
        assert_ne!(copy.id(), program.id());
    }

    #[test]
    fn test_adopt_without_keep_types_drops_annotations() {
        let mut b = ProgramBuilder::new();
        b.load_int(1).unwrap();
        let mut program = b.finalize().unwrap();
        program.set_runtime_types(VariableMap::from_values(vec![Type::FLOAT]));

        let mut b = ProgramBuilder::new();
        b.begin_adoption(&program).unwrap();
        b.adopt(&program.instructions()[0], false).unwrap();
        assert_eq!(b.type_of(Variable(0)), Type::INTEGER);
        b.end_adoption().unwrap();
        assert!(b.finalize().unwrap().runtime_types().is_empty());
    }

    #[test]
    fn test_adopt_outside_session_fails() {
        let mut b = ProgramBuilder::new();
        b.load_int(1).unwrap();
        let program = b.finalize().unwrap();
        let mut b = ProgramBuilder::new();
        assert!(matches!(
            b.adopt(&program.instructions()[0], true),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_splice_uses_fresh_variables() {
        let mut b = ProgramBuilder::new();
        let v0 = b.load_int(1).unwrap();
        b.unary(v0, UnaryOperator::Minus).unwrap();
        let donor = b.finalize().unwrap();

        let mut b = ProgramBuilder::new();
        b.load_string("x").unwrap();
        b.splice(&donor, &[0, 1]).unwrap();
        let program = b.finalize().unwrap();
        assert_eq!(program.size(), 3);
        assert_eq!(program.instructions()[2].inputs(), &[Variable(1)]);

        let mut b = ProgramBuilder::new();
        assert!(matches!(
            b.splice(&donor, &[1]),
            Err(Error::InvalidReference { variable: 0, .. })
        ));
    }

    #[test]
    fn test_random_variable_queries() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut b = ProgramBuilder::new();
        assert_eq!(b.random_variable(&mut rng), None);
        let s = b.load_string("a").unwrap();
        let i = b.load_int(3).unwrap();
        assert_eq!(b.random_variable_compatible_with(Type::STRING, &mut rng), Some(s));
        assert_eq!(b.random_variable_of_type(Type::NUMBER, &mut rng), Some(i));
        assert_eq!(b.random_variable_of_type(Type::OBJECT, &mut rng), None);
        assert_eq!(b.random_phi(&mut rng), None);

        let v = b.load_value_of_type(Type::BOOLEAN, &mut rng).unwrap();
        assert_eq!(b.type_of(v), Type::BOOLEAN);
    }
}
