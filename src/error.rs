use crate::evaluator::OpCode;

/// Errors that can occur while compiling or evaluating expression trees.
///
/// Row-level numeric problems (out-of-range rows, missing variables,
/// invalid intermediate results) are never reported here; they surface as
/// `NaN` in the produced values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    // Compile-time classification errors
    #[error("Symbol '{symbol}' has no opcode and cannot be compiled")]
    UnsupportedSymbol { symbol: String },

    #[error("Call to undefined function '{name}'")]
    UnresolvedFunction { name: String },

    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    // Capacity limits of the 16-bit addressing scheme
    #[error("Node '{symbol}' has {count} children, more than the limit of {limit}")]
    TooManyChildren {
        symbol: String,
        count: usize,
        limit: usize,
    },

    #[error("Program needs {length} instructions, more than the limit of {limit}")]
    ProgramTooLong { length: usize, limit: usize },

    // Batch interpreter capability
    #[error("Opcode '{opcode}' is not supported by the batch interpreter")]
    UnsupportedBatchOpcode { opcode: OpCode },

    // Dataset construction
    #[error("Column '{name}' has {got} rows, expected {expected}")]
    ColumnLengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Variable '{name}' is defined more than once")]
    DuplicateVariable { name: String },

    #[error("Variable '{name}' does not exist in the dataset")]
    UnknownVariable { name: String },

    #[error("Variable '{name}' is not a numeric variable and cannot be replaced")]
    VariableNotMutable { name: String },
}

impl EvalError {
    /// Create `MalformedTree` from any message
    pub fn malformed(msg: impl Into<String>) -> Self {
        EvalError::MalformedTree(msg.into())
    }

    /// Create `UnsupportedSymbol` from a symbol name
    pub fn unsupported_symbol(symbol: impl Into<String>) -> Self {
        EvalError::UnsupportedSymbol {
            symbol: symbol.into(),
        }
    }

    /// Whether this error is one of the capacity limits
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            EvalError::TooManyChildren { .. } | EvalError::ProgramTooLong { .. }
        )
    }
}
