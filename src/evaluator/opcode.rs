//! Opcode table shared by the compiler and both interpreters.
//!
//! The numeric values are stable: they identify operations in instruction
//! dumps and must not be reordered.

use crate::EvalError;
use crate::tree::Symbol;
use std::fmt;

/// Operation performed by one compiled instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum OpCode {
    Add = 1,
    Sub = 2,
    Mul = 3,
    Div = 4,
    Sin = 5,
    Cos = 6,
    Tan = 7,
    Log = 8,
    Exp = 9,
    IfThenElse = 10,
    GreaterThan = 11,
    LessThan = 12,
    And = 13,
    Or = 14,
    Not = 15,
    Average = 16,
    Call = 17,
    Variable = 18,
    LagVariable = 19,
    Constant = 20,
    Arg = 21,
    Power = 22,
    Root = 23,
    TimeLag = 24,
    Integral = 25,
    Derivative = 26,
    VariableCondition = 27,
    Square = 28,
    SquareRoot = 29,
    Gamma = 30,
    Psi = 31,
    Dawson = 32,
    ExponentialIntegralEi = 33,
    CosineIntegral = 34,
    SineIntegral = 35,
    HyperbolicCosineIntegral = 36,
    HyperbolicSineIntegral = 37,
    FresnelCosineIntegral = 38,
    FresnelSineIntegral = 39,
    AiryA = 40,
    AiryB = 41,
    Norm = 42,
    Erf = 43,
    Bessel = 44,
    Xor = 45,
    FactorVariable = 46,
    BinaryFactorVariable = 47,
    Absolute = 48,
    AnalyticQuotient = 49,
    Cube = 50,
    CubeRoot = 51,
    Tanh = 52,
    SubFunction = 53,
}

/// Accepted child counts for an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl OpCode {
    /// Every opcode, in numeric order
    pub const ALL: [OpCode; 53] = [
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Sin,
        OpCode::Cos,
        OpCode::Tan,
        OpCode::Log,
        OpCode::Exp,
        OpCode::IfThenElse,
        OpCode::GreaterThan,
        OpCode::LessThan,
        OpCode::And,
        OpCode::Or,
        OpCode::Not,
        OpCode::Average,
        OpCode::Call,
        OpCode::Variable,
        OpCode::LagVariable,
        OpCode::Constant,
        OpCode::Arg,
        OpCode::Power,
        OpCode::Root,
        OpCode::TimeLag,
        OpCode::Integral,
        OpCode::Derivative,
        OpCode::VariableCondition,
        OpCode::Square,
        OpCode::SquareRoot,
        OpCode::Gamma,
        OpCode::Psi,
        OpCode::Dawson,
        OpCode::ExponentialIntegralEi,
        OpCode::CosineIntegral,
        OpCode::SineIntegral,
        OpCode::HyperbolicCosineIntegral,
        OpCode::HyperbolicSineIntegral,
        OpCode::FresnelCosineIntegral,
        OpCode::FresnelSineIntegral,
        OpCode::AiryA,
        OpCode::AiryB,
        OpCode::Norm,
        OpCode::Erf,
        OpCode::Bessel,
        OpCode::Xor,
        OpCode::FactorVariable,
        OpCode::BinaryFactorVariable,
        OpCode::Absolute,
        OpCode::AnalyticQuotient,
        OpCode::Cube,
        OpCode::CubeRoot,
        OpCode::Tanh,
        OpCode::SubFunction,
    ];

    /// Map a tree symbol to its opcode.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedSymbol` for structural symbols (`ProgramRoot`,
    /// `Start`, `Defun`) and for [`Symbol::Custom`].
    pub fn from_symbol(symbol: &Symbol) -> Result<Self, EvalError> {
        let opcode = match symbol {
            Symbol::Addition => OpCode::Add,
            Symbol::Subtraction => OpCode::Sub,
            Symbol::Multiplication => OpCode::Mul,
            Symbol::Division => OpCode::Div,
            Symbol::Average => OpCode::Average,
            Symbol::Power => OpCode::Power,
            Symbol::Root => OpCode::Root,
            Symbol::Square => OpCode::Square,
            Symbol::SquareRoot => OpCode::SquareRoot,
            Symbol::Cube => OpCode::Cube,
            Symbol::CubeRoot => OpCode::CubeRoot,
            Symbol::Absolute => OpCode::Absolute,
            Symbol::AnalyticQuotient => OpCode::AnalyticQuotient,
            Symbol::Sine => OpCode::Sin,
            Symbol::Cosine => OpCode::Cos,
            Symbol::Tangent => OpCode::Tan,
            Symbol::HyperbolicTangent => OpCode::Tanh,
            Symbol::Logarithm => OpCode::Log,
            Symbol::Exponential => OpCode::Exp,
            Symbol::Gamma => OpCode::Gamma,
            Symbol::Psi => OpCode::Psi,
            Symbol::Dawson => OpCode::Dawson,
            Symbol::ExponentialIntegralEi => OpCode::ExponentialIntegralEi,
            Symbol::CosineIntegral => OpCode::CosineIntegral,
            Symbol::SineIntegral => OpCode::SineIntegral,
            Symbol::HyperbolicCosineIntegral => OpCode::HyperbolicCosineIntegral,
            Symbol::HyperbolicSineIntegral => OpCode::HyperbolicSineIntegral,
            Symbol::FresnelCosineIntegral => OpCode::FresnelCosineIntegral,
            Symbol::FresnelSineIntegral => OpCode::FresnelSineIntegral,
            Symbol::AiryA => OpCode::AiryA,
            Symbol::AiryB => OpCode::AiryB,
            Symbol::Norm => OpCode::Norm,
            Symbol::Erf => OpCode::Erf,
            Symbol::Bessel => OpCode::Bessel,
            Symbol::IfThenElse => OpCode::IfThenElse,
            Symbol::GreaterThan => OpCode::GreaterThan,
            Symbol::LessThan => OpCode::LessThan,
            Symbol::And => OpCode::And,
            Symbol::Or => OpCode::Or,
            Symbol::Not => OpCode::Not,
            Symbol::Xor => OpCode::Xor,
            Symbol::Constant { .. } => OpCode::Constant,
            Symbol::Variable { .. } => OpCode::Variable,
            Symbol::LaggedVariable { .. } => OpCode::LagVariable,
            Symbol::FactorVariable { .. } => OpCode::FactorVariable,
            Symbol::BinaryFactorVariable { .. } => OpCode::BinaryFactorVariable,
            Symbol::VariableCondition { .. } => OpCode::VariableCondition,
            Symbol::TimeLag { .. } => OpCode::TimeLag,
            Symbol::Integral { .. } => OpCode::Integral,
            Symbol::Derivative => OpCode::Derivative,
            Symbol::Call { .. } => OpCode::Call,
            Symbol::Argument { .. } => OpCode::Arg,
            Symbol::SubFunction { .. } => OpCode::SubFunction,
            Symbol::ProgramRoot
            | Symbol::Start
            | Symbol::Defun { .. }
            | Symbol::Custom { .. } => {
                return Err(EvalError::unsupported_symbol(symbol.name()));
            }
        };
        Ok(opcode)
    }

    /// Recover an opcode from its numeric value
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL
            .get(usize::from(value).checked_sub(1)?)
            .copied()
    }

    /// Child counts a node with this opcode may have
    pub fn arity(self) -> Arity {
        match self {
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Average => {
                Arity::AtLeast(1)
            }
            OpCode::And | OpCode::Or | OpCode::Xor => Arity::AtLeast(1),
            // Calls take any number of arguments, including none
            OpCode::Call => Arity::AtLeast(0),
            OpCode::IfThenElse => Arity::Exactly(3),
            OpCode::GreaterThan
            | OpCode::LessThan
            | OpCode::Power
            | OpCode::Root
            | OpCode::AnalyticQuotient
            | OpCode::VariableCondition => Arity::Exactly(2),
            OpCode::Variable
            | OpCode::LagVariable
            | OpCode::Constant
            | OpCode::Arg
            | OpCode::FactorVariable
            | OpCode::BinaryFactorVariable => Arity::Exactly(0),
            OpCode::Sin
            | OpCode::Cos
            | OpCode::Tan
            | OpCode::Log
            | OpCode::Exp
            | OpCode::Not
            | OpCode::TimeLag
            | OpCode::Integral
            | OpCode::Derivative
            | OpCode::Square
            | OpCode::SquareRoot
            | OpCode::Gamma
            | OpCode::Psi
            | OpCode::Dawson
            | OpCode::ExponentialIntegralEi
            | OpCode::CosineIntegral
            | OpCode::SineIntegral
            | OpCode::HyperbolicCosineIntegral
            | OpCode::HyperbolicSineIntegral
            | OpCode::FresnelCosineIntegral
            | OpCode::FresnelSineIntegral
            | OpCode::AiryA
            | OpCode::AiryB
            | OpCode::Norm
            | OpCode::Erf
            | OpCode::Bessel
            | OpCode::Absolute
            | OpCode::Cube
            | OpCode::CubeRoot
            | OpCode::Tanh
            | OpCode::SubFunction => Arity::Exactly(1),
        }
    }

    /// Whether the batch interpreter can execute this opcode
    pub fn is_batch_supported(self) -> bool {
        matches!(
            self,
            OpCode::Constant
                | OpCode::Variable
                | OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Square
                | OpCode::Root
                | OpCode::Power
                | OpCode::SquareRoot
                | OpCode::Cube
                | OpCode::CubeRoot
                | OpCode::Exp
                | OpCode::Log
                | OpCode::Sin
                | OpCode::Cos
                | OpCode::Tan
                | OpCode::Tanh
                | OpCode::Absolute
                | OpCode::AnalyticQuotient
                | OpCode::SubFunction
        )
    }

    /// Whether the instruction reads a dataset column and needs binding
    pub fn reads_column(self) -> bool {
        matches!(
            self,
            OpCode::Variable
                | OpCode::LagVariable
                | OpCode::VariableCondition
                | OpCode::FactorVariable
                | OpCode::BinaryFactorVariable
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Add => "Add",
            OpCode::Sub => "Sub",
            OpCode::Mul => "Mul",
            OpCode::Div => "Div",
            OpCode::Sin => "Sin",
            OpCode::Cos => "Cos",
            OpCode::Tan => "Tan",
            OpCode::Log => "Log",
            OpCode::Exp => "Exp",
            OpCode::IfThenElse => "IfThenElse",
            OpCode::GreaterThan => "GreaterThan",
            OpCode::LessThan => "LessThan",
            OpCode::And => "And",
            OpCode::Or => "Or",
            OpCode::Not => "Not",
            OpCode::Average => "Average",
            OpCode::Call => "Call",
            OpCode::Variable => "Variable",
            OpCode::LagVariable => "LagVariable",
            OpCode::Constant => "Constant",
            OpCode::Arg => "Arg",
            OpCode::Power => "Power",
            OpCode::Root => "Root",
            OpCode::TimeLag => "TimeLag",
            OpCode::Integral => "Integral",
            OpCode::Derivative => "Derivative",
            OpCode::VariableCondition => "VariableCondition",
            OpCode::Square => "Square",
            OpCode::SquareRoot => "SquareRoot",
            OpCode::Gamma => "Gamma",
            OpCode::Psi => "Psi",
            OpCode::Dawson => "Dawson",
            OpCode::ExponentialIntegralEi => "ExponentialIntegralEi",
            OpCode::CosineIntegral => "CosineIntegral",
            OpCode::SineIntegral => "SineIntegral",
            OpCode::HyperbolicCosineIntegral => "HyperbolicCosineIntegral",
            OpCode::HyperbolicSineIntegral => "HyperbolicSineIntegral",
            OpCode::FresnelCosineIntegral => "FresnelCosineIntegral",
            OpCode::FresnelSineIntegral => "FresnelSineIntegral",
            OpCode::AiryA => "AiryA",
            OpCode::AiryB => "AiryB",
            OpCode::Norm => "Norm",
            OpCode::Erf => "Erf",
            OpCode::Bessel => "Bessel",
            OpCode::Xor => "Xor",
            OpCode::FactorVariable => "FactorVariable",
            OpCode::BinaryFactorVariable => "BinaryFactorVariable",
            OpCode::Absolute => "Absolute",
            OpCode::AnalyticQuotient => "AnalyticQuotient",
            OpCode::Cube => "Cube",
            OpCode::CubeRoot => "CubeRoot",
            OpCode::Tanh => "Tanh",
            OpCode::SubFunction => "SubFunction",
        }
    }
}

impl TryFrom<&Symbol> for OpCode {
    type Error = EvalError;

    fn try_from(symbol: &Symbol) -> Result<Self, Self::Error> {
        OpCode::from_symbol(symbol)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
