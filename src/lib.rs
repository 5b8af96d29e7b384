//! Evaluation engine for genetic-programming expression trees
//!
//! Compiles symbolic regression/classification trees into flat instruction
//! sequences once and interprets them over many rows of tabular or
//! time-series data.
//!
//! # Features
//! - Pre-order bytecode with 16-bit addressing and late dataset binding
//! - Scalar interpreter covering every symbol: short-circuit booleans,
//!   conditionals, time lags, integrals, derivatives and function calls
//! - Batch interpreter over `f64x4` lanes for the arithmetic subset, agreeing
//!   bit for bit with the scalar path
//! - Per-worker column cache keyed by dataset identity
//! - **Parallel population evaluation** with rayon (feature `parallel`)
//!
//! # Usage Example
//! ```
//! use symreg_eval::{Node, ScalarInterpreter, Symbol, SymbolicExpressionTree, Table};
//!
//! let table = Table::from_numeric([("x", vec![0.0, 1.0, 2.0])]).expect("valid table");
//! // if x > 0.5 then x * 10 else -1
//! let tree = SymbolicExpressionTree::from_body(Node::new(
//!     Symbol::IfThenElse,
//!     vec![
//!         Node::binary(Symbol::GreaterThan, Node::variable("x", 1.0), Node::constant(0.5)),
//!         Node::variable("x", 10.0),
//!         Node::constant(-1.0),
//!     ],
//! ));
//!
//! let values: Vec<f64> = ScalarInterpreter::new()
//!     .evaluate(&tree, &table, 0..3)
//!     .expect("Should compile")
//!     .collect();
//! assert_eq!(values, [-1.0, 10.0, 20.0]);
//! ```

pub mod dataset;
mod error;
pub mod evaluator;
pub mod math;
pub mod tree;

#[cfg(feature = "parallel")]
pub mod parallel;

#[cfg(test)]
mod tests;

// Re-export key types for easier usage
pub use dataset::{Dataset, DatasetId, ModifiableTable, Table, TableBuilder, VariableKind};
pub use error::EvalError;
pub use evaluator::{
    BatchInterpreter, BoundProgram, ColumnCache, Compiler, Instruction, InstructionHook,
    InterpreterState, OpCode, Program, Rows, ScalarEvaluation, ScalarInterpreter,
    TreeInterpreter, bind,
};
pub use tree::{Node, Symbol, SymbolicExpressionTree};

/// Default rows per chunk of the batch interpreter
pub const DEFAULT_BATCH_SIZE: usize = 64;
/// Default nesting limit for function calls in the scalar interpreter
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;
/// Maximum children of a single node (16-bit argument count)
pub const MAX_ARGUMENTS: usize = u16::MAX as usize;
/// Maximum instructions in a compiled program (16-bit jump addresses)
pub const MAX_PROGRAM_LENGTH: usize = u16::MAX as usize;
