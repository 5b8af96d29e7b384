//! Compilation and interpretation of expression trees.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌────────────┐    ┌───────────┐    ┌──────────────┐
//! │ SymbolicExpr-   │ -> │  Compiler  │ -> │  Program  │ -> │ BoundProgram │
//! │ essionTree      │    │ (pre-order)│    │ (pure)    │    │ (+ dataset)  │
//! └─────────────────┘    └────────────┘    └───────────┘    └──────────────┘
//!          │                                                       │
//!          │ breadth-first layout                                  ▼
//!          ▼                                              ┌──────────────────┐
//! ┌──────────────────┐                                    │ ScalarInterpreter│
//! │ BatchInterpreter │  (arithmetic subset, f64x4 lanes)  │ (all opcodes)    │
//! └──────────────────┘                                    └──────────────────┘
//! ```
//!
//! Both interpreters implement [`TreeInterpreter`], so callers can pick one
//! per tree: [`BatchInterpreter::is_batch_eligible`] tells whether the fast
//! path applies.
//!
//! # Modules
//!
//! - [`opcode`]: opcode table and symbol mapping
//! - [`instruction`]: compiled instructions and programs
//! - [`compiler`]: tree-to-program compilation
//! - [`binding`]: late binding of programs to dataset columns
//! - [`state`]: scalar interpreter state and call frames
//! - [`execution`]: scalar interpreter
//! - [`batch`]: batch interpreter and column cache
//! - [`rows`]: row selections

pub mod batch;
pub mod binding;
pub mod compiler;
pub mod execution;
pub mod instruction;
pub mod opcode;
pub mod rows;
pub mod state;

pub use batch::{BatchInterpreter, ColumnCache};
pub use binding::{BoundProgram, bind};
pub use compiler::{Compiler, InstructionHook};
pub use execution::{ScalarEvaluation, ScalarInterpreter};
pub use instruction::{Instruction, Program};
pub use opcode::OpCode;
pub use rows::Rows;
pub use state::InterpreterState;

use crate::EvalError;
use crate::dataset::Dataset;
use crate::tree::SymbolicExpressionTree;

/// Common interface of the scalar and batch interpreters.
///
/// # Example
///
/// ```
/// use symreg_eval::{
///     BatchInterpreter, Node, Rows, ScalarInterpreter, Symbol, SymbolicExpressionTree, Table,
///     TreeInterpreter,
/// };
///
/// let table = Table::from_numeric([("x", vec![1.0, 2.0])]).expect("valid table");
/// let tree = SymbolicExpressionTree::from_body(Node::unary(
///     Symbol::Exponential,
///     Node::variable("x", 1.0),
/// ));
///
/// let mut interpreters: Vec<Box<dyn TreeInterpreter>> = vec![
///     Box::new(ScalarInterpreter::new()),
///     Box::new(BatchInterpreter::new()),
/// ];
/// for interpreter in &mut interpreters {
///     let values: Vec<f64> = interpreter
///         .tree_values(&tree, &table, Rows::from(0..2))
///         .expect("Should evaluate")
///         .collect();
///     assert_eq!(values, [1.0_f64.exp(), 2.0_f64.exp()]);
/// }
/// ```
pub trait TreeInterpreter {
    /// Values of `tree` at each of `rows`, in order
    ///
    /// # Errors
    ///
    /// Compilation errors, or `UnsupportedBatchOpcode` from the batch
    /// interpreter.
    fn tree_values<'a>(
        &'a mut self,
        tree: &'a SymbolicExpressionTree,
        dataset: &'a dyn Dataset,
        rows: Rows<'a>,
    ) -> Result<Box<dyn Iterator<Item = f64> + 'a>, EvalError>;

    /// Number of evaluations performed so far
    fn evaluated_solutions(&self) -> u64;
}
