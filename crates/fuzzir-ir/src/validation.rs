//! Structural validation for programs.

use crate::builder::ProgramBuilder;
use crate::program::Program;
use fuzzir_core::{Error, Result};

/// Validate that a program is well-formed.
///
/// The program is replayed through a fresh builder, which enforces
/// def-before-use, visibility, arity, block nesting, the loop and function
/// context of jumps and returns, and phi-only copy targets. On top of that
/// the replay must reproduce the program's own variable numbering, which
/// makes sure variables are numbered densely in definition order.
pub fn validate_program(program: &Program) -> Result<()> {
    let mut builder = ProgramBuilder::new();

    for (position, inst) in program.iter().enumerate() {
        if inst.index() != position {
            return Err(Error::Validation(format!(
                "instruction at position {} carries index {}",
                position,
                inst.index()
            )));
        }

        let outputs = builder.append(inst.operation().clone(), inst.inputs())?;
        if !outputs.iter().copied().eq(inst.all_outputs()) {
            return Err(Error::Validation(format!(
                "instruction {} defines {:?}, expected {:?}",
                position,
                inst.all_outputs().collect::<Vec<_>>(),
                outputs
            )));
        }
    }

    let num_variables = builder.num_variables();
    builder.finalize()?;

    if let Some((variable, _)) = program
        .runtime_types()
        .iter()
        .find(|(v, _)| v.index() >= num_variables)
    {
        return Err(Error::Validation(format!(
            "runtime type attached to undefined variable {}",
            variable
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;
    use crate::operation::{BinaryOperator, Operation};
    use crate::types::Type;
    use crate::variable::{Variable, VariableMap};

    fn instructions(program: &Program) -> Vec<Instruction> {
        program.instructions().to_vec()
    }

    #[test]
    fn test_validate_empty_program() {
        assert!(validate_program(&Program::new()).is_ok());
    }

    #[test]
    fn test_validate_built_program() {
        let mut b = ProgramBuilder::new();
        let v0 = b.load_int(1).unwrap();
        let p = b.phi(v0).unwrap();
        let cond = b.load_bool(true).unwrap();
        b.begin_if(cond).unwrap();
        let f = b.load_float(1.5).unwrap();
        b.copy(f, p).unwrap();
        b.end_if().unwrap();
        let program = b.finalize().unwrap();
        assert!(validate_program(&program).is_ok());
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let insts = vec![
            Instruction::new(
                Operation::BinaryOperation(BinaryOperator::Add),
                vec![Variable(0), Variable(1)],
                vec![Variable(0)],
                vec![],
                0,
            )
            .unwrap(),
        ];
        let program = Program::from_parts(insts, VariableMap::new());
        assert_eq!(
            validate_program(&program).unwrap_err(),
            Error::InvalidReference { variable: 0, index: 0 }
        );
    }

    #[test]
    fn test_validate_rejects_sparse_numbering() {
        let insts = vec![Instruction::new(Operation::LoadInteger(3), vec![], vec![Variable(5)], vec![], 0).unwrap()];
        let program = Program::from_parts(insts, VariableMap::new());
        assert!(matches!(validate_program(&program), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_unclosed_block() {
        let mut b = ProgramBuilder::new();
        let cond = b.load_bool(true).unwrap();
        b.begin_if(cond).unwrap();
        b.end_if().unwrap();
        let program = b.finalize().unwrap();

        let mut insts = instructions(&program);
        insts.pop();
        let program = Program::from_parts(insts, VariableMap::new());
        assert!(matches!(validate_program(&program), Err(Error::MalformedNesting(_))));
    }

    #[test]
    fn test_validate_rejects_misplaced_index() {
        let insts = vec![Instruction::new(Operation::LoadInteger(3), vec![], vec![Variable(0)], vec![], 4).unwrap()];
        let program = Program::from_parts(insts, VariableMap::new());
        assert!(matches!(validate_program(&program), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_dangling_runtime_type() {
        let mut b = ProgramBuilder::new();
        b.load_int(1).unwrap();
        let mut program = b.finalize().unwrap();
        program.set_runtime_types(VariableMap::from_values(vec![Type::INTEGER, Type::STRING]));
        assert!(matches!(validate_program(&program), Err(Error::Validation(_))));
    }
}
