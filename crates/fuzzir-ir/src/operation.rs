//! Operation kinds of the IR.
//!
//! The set of operations is closed: every kind is a variant of [`Operation`]
//! and carries its own parameters. Input and output counts are a pure
//! function of the variant and its parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    LogicalNot,
    BitwiseNot,
    Plus,
    Minus,
}

impl UnaryOperator {
    pub const ALL: [UnaryOperator; 8] = [
        UnaryOperator::PreInc,
        UnaryOperator::PreDec,
        UnaryOperator::PostInc,
        UnaryOperator::PostDec,
        UnaryOperator::LogicalNot,
        UnaryOperator::BitwiseNot,
        UnaryOperator::Plus,
        UnaryOperator::Minus,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            UnaryOperator::PreInc | UnaryOperator::PostInc => "++",
            UnaryOperator::PreDec | UnaryOperator::PostDec => "--",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
        }
    }

    pub fn is_postfix(&self) -> bool {
        matches!(self, UnaryOperator::PostInc | UnaryOperator::PostDec)
    }

    /// Increments and decrements write the result back to their operand
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            UnaryOperator::PreInc | UnaryOperator::PostInc | UnaryOperator::PreDec | UnaryOperator::PostDec
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    BitAnd,
    BitOr,
    Xor,
    LShift,
    RShift,
    UnRShift,
    LogicAnd,
    LogicOr,
}

impl BinaryOperator {
    pub const ALL: [BinaryOperator; 14] = [
        BinaryOperator::Add,
        BinaryOperator::Sub,
        BinaryOperator::Mul,
        BinaryOperator::Div,
        BinaryOperator::Mod,
        BinaryOperator::Exp,
        BinaryOperator::BitAnd,
        BinaryOperator::BitOr,
        BinaryOperator::Xor,
        BinaryOperator::LShift,
        BinaryOperator::RShift,
        BinaryOperator::UnRShift,
        BinaryOperator::LogicAnd,
        BinaryOperator::LogicOr,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Exp => "**",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::Xor => "^",
            BinaryOperator::LShift => "<<",
            BinaryOperator::RShift => ">>",
            BinaryOperator::UnRShift => ">>>",
            BinaryOperator::LogicAnd => "&&",
            BinaryOperator::LogicOr => "||",
        }
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            BinaryOperator::BitAnd
                | BinaryOperator::BitOr
                | BinaryOperator::Xor
                | BinaryOperator::LShift
                | BinaryOperator::RShift
                | BinaryOperator::UnRShift
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::LogicAnd | BinaryOperator::LogicOr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Equal,
    StrictEqual,
    NotEqual,
    StrictNotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Comparator {
    pub const ALL: [Comparator; 8] = [
        Comparator::Equal,
        Comparator::StrictEqual,
        Comparator::NotEqual,
        Comparator::StrictNotEqual,
        Comparator::LessThan,
        Comparator::LessThanOrEqual,
        Comparator::GreaterThan,
        Comparator::GreaterThanOrEqual,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Comparator::Equal => "==",
            Comparator::StrictEqual => "===",
            Comparator::NotEqual => "!=",
            Comparator::StrictNotEqual => "!==",
            Comparator::LessThan => "<",
            Comparator::LessThanOrEqual => "<=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanOrEqual => ">=",
        }
    }
}

/// The kind of block a block-begin operation opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    If,
    Else,
    While,
    For,
    Function,
}

impl BlockKind {
    pub fn is_loop(&self) -> bool {
        matches!(self, BlockKind::While | BlockKind::For)
    }
}

/// IR operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    // Literals
    LoadInteger(i64),
    LoadFloat(f64),
    LoadString(String),
    LoadBoolean(bool),
    LoadUndefined,
    LoadBigInt(i64),
    LoadRegExp { pattern: String, flags: String },
    LoadBuiltin(String),

    // Objects
    CreateObject { property_names: Vec<String> },
    CreateArray { num_elements: usize },
    LoadProperty(String),
    StoreProperty(String),

    // Calls
    CallFunction { num_arguments: usize },
    CallMethod { name: String, num_arguments: usize },
    Construct { num_arguments: usize },

    // Expressions
    UnaryOperation(UnaryOperator),
    BinaryOperation(BinaryOperator),
    Compare(Comparator),
    TypeOf,

    // SSA merge points
    Phi,
    Copy,

    // Control flow
    BeginIf,
    BeginElse,
    EndIf,
    BeginWhile(Comparator),
    EndWhile,
    BeginFor { comparator: Comparator, op: BinaryOperator },
    EndFor,
    LoopBreak,
    LoopContinue,
    BeginFunction { num_parameters: usize },
    Return,
    EndFunction,

    Nop,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::LoadInteger(_) => "LoadInteger",
            Operation::LoadFloat(_) => "LoadFloat",
            Operation::LoadString(_) => "LoadString",
            Operation::LoadBoolean(_) => "LoadBoolean",
            Operation::LoadUndefined => "LoadUndefined",
            Operation::LoadBigInt(_) => "LoadBigInt",
            Operation::LoadRegExp { .. } => "LoadRegExp",
            Operation::LoadBuiltin(_) => "LoadBuiltin",
            Operation::CreateObject { .. } => "CreateObject",
            Operation::CreateArray { .. } => "CreateArray",
            Operation::LoadProperty(_) => "LoadProperty",
            Operation::StoreProperty(_) => "StoreProperty",
            Operation::CallFunction { .. } => "CallFunction",
            Operation::CallMethod { .. } => "CallMethod",
            Operation::Construct { .. } => "Construct",
            Operation::UnaryOperation(_) => "UnaryOperation",
            Operation::BinaryOperation(_) => "BinaryOperation",
            Operation::Compare(_) => "Compare",
            Operation::TypeOf => "TypeOf",
            Operation::Phi => "Phi",
            Operation::Copy => "Copy",
            Operation::BeginIf => "BeginIf",
            Operation::BeginElse => "BeginElse",
            Operation::EndIf => "EndIf",
            Operation::BeginWhile(_) => "BeginWhile",
            Operation::EndWhile => "EndWhile",
            Operation::BeginFor { .. } => "BeginFor",
            Operation::EndFor => "EndFor",
            Operation::LoopBreak => "LoopBreak",
            Operation::LoopContinue => "LoopContinue",
            Operation::BeginFunction { .. } => "BeginFunction",
            Operation::Return => "Return",
            Operation::EndFunction => "EndFunction",
            Operation::Nop => "Nop",
        }
    }

    /// Number of input variables this operation expects
    pub fn num_inputs(&self) -> usize {
        match self {
            Operation::LoadInteger(_)
            | Operation::LoadFloat(_)
            | Operation::LoadString(_)
            | Operation::LoadBoolean(_)
            | Operation::LoadUndefined
            | Operation::LoadBigInt(_)
            | Operation::LoadRegExp { .. }
            | Operation::LoadBuiltin(_) => 0,
            Operation::CreateObject { property_names } => property_names.len(),
            Operation::CreateArray { num_elements } => *num_elements,
            Operation::LoadProperty(_) => 1,
            Operation::StoreProperty(_) => 2,
            Operation::CallFunction { num_arguments }
            | Operation::CallMethod { num_arguments, .. }
            | Operation::Construct { num_arguments } => 1 + num_arguments,
            Operation::UnaryOperation(_) => 1,
            Operation::BinaryOperation(_) | Operation::Compare(_) => 2,
            Operation::TypeOf | Operation::Phi => 1,
            // target, value
            Operation::Copy => 2,
            Operation::BeginIf => 1,
            Operation::BeginWhile(_) => 2,
            // start, end, step
            Operation::BeginFor { .. } => 3,
            Operation::Return => 1,
            Operation::BeginElse
            | Operation::EndIf
            | Operation::EndWhile
            | Operation::EndFor
            | Operation::LoopBreak
            | Operation::LoopContinue
            | Operation::BeginFunction { .. }
            | Operation::EndFunction
            | Operation::Nop => 0,
        }
    }

    /// Number of variables defined in the enclosing scope
    pub fn num_outputs(&self) -> usize {
        match self {
            Operation::LoadInteger(_)
            | Operation::LoadFloat(_)
            | Operation::LoadString(_)
            | Operation::LoadBoolean(_)
            | Operation::LoadUndefined
            | Operation::LoadBigInt(_)
            | Operation::LoadRegExp { .. }
            | Operation::LoadBuiltin(_)
            | Operation::CreateObject { .. }
            | Operation::CreateArray { .. }
            | Operation::LoadProperty(_)
            | Operation::CallFunction { .. }
            | Operation::CallMethod { .. }
            | Operation::Construct { .. }
            | Operation::UnaryOperation(_)
            | Operation::BinaryOperation(_)
            | Operation::Compare(_)
            | Operation::TypeOf
            | Operation::Phi
            | Operation::BeginFunction { .. } => 1,
            _ => 0,
        }
    }

    /// Number of variables defined inside the block this operation opens
    pub fn num_inner_outputs(&self) -> usize {
        match self {
            Operation::BeginFor { .. } => 1,
            Operation::BeginFunction { num_parameters } => *num_parameters,
            _ => 0,
        }
    }

    /// The block this operation opens, if any
    pub fn opened_block(&self) -> Option<BlockKind> {
        match self {
            Operation::BeginIf => Some(BlockKind::If),
            Operation::BeginElse => Some(BlockKind::Else),
            Operation::BeginWhile(_) => Some(BlockKind::While),
            Operation::BeginFor { .. } => Some(BlockKind::For),
            Operation::BeginFunction { .. } => Some(BlockKind::Function),
            _ => None,
        }
    }

    /// The blocks this operation may close
    pub fn closed_blocks(&self) -> &'static [BlockKind] {
        match self {
            Operation::BeginElse => &[BlockKind::If],
            Operation::EndIf => &[BlockKind::If, BlockKind::Else],
            Operation::EndWhile => &[BlockKind::While],
            Operation::EndFor => &[BlockKind::For],
            Operation::EndFunction => &[BlockKind::Function],
            _ => &[],
        }
    }

    pub fn is_block_begin(&self) -> bool {
        self.opened_block().is_some()
    }

    pub fn is_block_end(&self) -> bool {
        !self.closed_blocks().is_empty()
    }

    pub fn is_block(&self) -> bool {
        self.is_block_begin() || self.is_block_end()
    }

    /// Jumps are only valid inside a loop
    pub fn requires_loop(&self) -> bool {
        matches!(self, Operation::LoopBreak | Operation::LoopContinue)
    }

    pub fn requires_function(&self) -> bool {
        matches!(self, Operation::Return)
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Operation::LoadInteger(_)
                | Operation::LoadFloat(_)
                | Operation::LoadString(_)
                | Operation::LoadBoolean(_)
                | Operation::LoadBigInt(_)
                | Operation::LoadRegExp { .. }
        )
    }

    /// Returns true if this operation has parameters that can be changed
    /// without touching its inputs or outputs
    pub fn is_mutable(&self) -> bool {
        matches!(
            self,
            Operation::LoadInteger(_)
                | Operation::LoadFloat(_)
                | Operation::LoadString(_)
                | Operation::LoadBoolean(_)
                | Operation::LoadBigInt(_)
                | Operation::LoadRegExp { .. }
                | Operation::LoadBuiltin(_)
                | Operation::CreateObject { .. }
                | Operation::LoadProperty(_)
                | Operation::StoreProperty(_)
                | Operation::CallMethod { .. }
                | Operation::UnaryOperation(_)
                | Operation::BinaryOperation(_)
                | Operation::Compare(_)
                | Operation::BeginWhile(_)
                | Operation::BeginFor { .. }
        )
    }

    /// Two operations are arity compatible if one can replace the other
    /// without changing the shape of the instruction
    pub fn is_arity_compatible(&self, other: &Operation) -> bool {
        self.num_inputs() == other.num_inputs()
            && self.num_outputs() == other.num_outputs()
            && self.num_inner_outputs() == other.num_inner_outputs()
            && self.opened_block() == other.opened_block()
            && self.closed_blocks() == other.closed_blocks()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::LoadInteger(v) => write!(f, "LoadInteger({})", v),
            Operation::LoadFloat(v) => write!(f, "LoadFloat({:?})", v),
            Operation::LoadString(v) => write!(f, "LoadString({:?})", v),
            Operation::LoadBoolean(v) => write!(f, "LoadBoolean({})", v),
            Operation::LoadBigInt(v) => write!(f, "LoadBigInt({}n)", v),
            Operation::LoadRegExp { pattern, flags } => write!(f, "LoadRegExp(/{}/{})", pattern, flags),
            Operation::LoadBuiltin(name) => write!(f, "LoadBuiltin({})", name),
            Operation::CreateObject { property_names } => {
                write!(f, "CreateObject({})", property_names.join(", "))
            }
            Operation::LoadProperty(name) => write!(f, "LoadProperty(.{})", name),
            Operation::StoreProperty(name) => write!(f, "StoreProperty(.{})", name),
            Operation::CallMethod { name, .. } => write!(f, "CallMethod(.{})", name),
            Operation::UnaryOperation(op) if op.is_postfix() => write!(f, "UnaryOperation(x{})", op.token()),
            Operation::UnaryOperation(op) => write!(f, "UnaryOperation({}x)", op.token()),
            Operation::BinaryOperation(op) => write!(f, "BinaryOperation({})", op.token()),
            Operation::Compare(op) => write!(f, "Compare({})", op.token()),
            Operation::BeginWhile(op) => write!(f, "BeginWhile({})", op.token()),
            Operation::BeginFor { comparator, op } => {
                write!(f, "BeginFor({}, {})", comparator.token(), op.token())
            }
            other => write!(f, "{}", other.name()),
        }
    }
}
