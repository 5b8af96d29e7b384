//! Tree-to-program compiler.
//!
//! # Compilation Process
//!
//! 1. **Body emission**: the main body is emitted in pre-order, one
//!    instruction per node
//! 2. **Function emission**: every `Defun` body is appended in declaration
//!    order and its first index recorded as the function's entry point
//! 3. **Call resolution**: a second pass sets the target of every `Call`
//!    instruction to the entry point of the function it names
//!
//! Hooks registered with [`Compiler::with_hook`] see each instruction right
//! before it is appended and may rewrite it.
//!
//! Compilation is pure: it reads the tree and nothing else. Dataset columns
//! are attached later by binding.

use super::OpCode;
use super::instruction::{Instruction, Program};
use crate::tree::{Node, Symbol, SymbolicExpressionTree};
use crate::{EvalError, MAX_ARGUMENTS, MAX_PROGRAM_LENGTH};
use std::fmt;

/// Post-processing step applied to every emitted instruction
pub type InstructionHook = Box<dyn for<'t> Fn(Instruction<'t>) -> Instruction<'t> + Send + Sync>;

/// Compiles [`SymbolicExpressionTree`]s into linear [`Program`]s.
///
/// # Example
///
/// ```
/// use symreg_eval::{Compiler, Node, Symbol, SymbolicExpressionTree};
///
/// let tree = SymbolicExpressionTree::from_body(Node::binary(
///     Symbol::Addition,
///     Node::variable("x", 1.0),
///     Node::constant(2.0),
/// ));
/// let program = Compiler::new().compile(&tree).expect("Should compile");
/// assert_eq!(program.len(), 3);
/// ```
#[derive(Default)]
pub struct Compiler {
    hooks: Vec<InstructionHook>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook run on every instruction before it is appended.
    ///
    /// Hooks run in registration order.
    #[must_use]
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: for<'t> Fn(Instruction<'t>) -> Instruction<'t> + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Compile a tree into a program.
    ///
    /// # Errors
    ///
    /// - `MalformedTree` if the tree has no main body, a function has no body
    ///   or is defined twice, or a node has a child count its symbol rejects
    /// - `UnsupportedSymbol` if a node's symbol has no opcode
    /// - `TooManyChildren` if a node has more than [`MAX_ARGUMENTS`] children
    /// - `ProgramTooLong` if the program needs more than
    ///   [`MAX_PROGRAM_LENGTH`] instructions
    /// - `UnresolvedFunction` if a call names a function the tree does not
    ///   define
    pub fn compile<'t>(&self, tree: &'t SymbolicExpressionTree) -> Result<Program<'t>, EvalError> {
        let body = tree
            .body()
            .ok_or_else(|| EvalError::malformed("tree has no main body"))?;

        let mut functions: Vec<(&'t str, &'t Node)> = Vec::new();
        for (name, function_body) in tree.functions() {
            let Some(function_body) = function_body else {
                let message = format!("function '{name}' has no body");
                return Err(EvalError::malformed(message));
            };
            if functions.iter().any(|(existing, _)| *existing == name) {
                return Err(EvalError::malformed(format!(
                    "function '{name}' is defined more than once"
                )));
            }
            functions.push((name, function_body));
        }

        let required = body.node_count()
            + functions
                .iter()
                .map(|(_, function_body)| function_body.node_count())
                .sum::<usize>();
        let mut emitter = Emitter {
            hooks: &self.hooks,
            code: Vec::with_capacity(required.min(MAX_PROGRAM_LENGTH)),
            required,
            call_stack_size: 0,
        };

        emitter.emit(body)?;
        let body_len = emitter.code.len();

        let mut entry_points = Vec::with_capacity(functions.len());
        for (name, function_body) in functions {
            // emit() keeps the length within MAX_PROGRAM_LENGTH, which fits in u16
            let address = u16::try_from(emitter.code.len()).map_err(|_| {
                EvalError::ProgramTooLong {
                    length: required,
                    limit: MAX_PROGRAM_LENGTH,
                }
            })?;
            entry_points.push((name, address));
            emitter.emit(function_body)?;
        }

        emitter.resolve_calls(&entry_points)?;

        let Emitter {
            code,
            call_stack_size,
            ..
        } = emitter;
        tracing::debug!(
            instructions = code.len(),
            functions = entry_points.len(),
            call_stack_size,
            "compiled expression tree"
        );
        Ok(Program::new(code, entry_points, body_len, call_stack_size))
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Emission state for one compilation
struct Emitter<'c, 't> {
    hooks: &'c [InstructionHook],
    code: Vec<Instruction<'t>>,
    /// Instructions the whole tree needs, reported on overflow
    required: usize,
    call_stack_size: usize,
}

impl<'t> Emitter<'_, 't> {
    /// Append the subtree rooted at `root` in pre-order
    fn emit(&mut self, root: &'t Node) -> Result<(), EvalError> {
        for node in root.iter_prefix() {
            let opcode = OpCode::from_symbol(&node.symbol)?;
            let count = node.children.len();
            let arg_count = u16::try_from(count).map_err(|_| EvalError::TooManyChildren {
                symbol: node.symbol.name().to_owned(),
                count,
                limit: MAX_ARGUMENTS,
            })?;
            if !opcode.arity().accepts(count) {
                return Err(EvalError::malformed(format!(
                    "'{}' cannot have {count} children",
                    node.symbol.name()
                )));
            }
            if self.code.len() >= MAX_PROGRAM_LENGTH {
                return Err(EvalError::ProgramTooLong {
                    length: self.required,
                    limit: MAX_PROGRAM_LENGTH,
                });
            }
            if opcode == OpCode::Call {
                self.call_stack_size += count + 1;
            }

            let instr = self
                .hooks
                .iter()
                .fold(Instruction::new(node, opcode, arg_count), |instr, hook| {
                    hook(instr)
                });
            self.code.push(instr);
        }
        Ok(())
    }

    /// Point every call at its function's entry point
    fn resolve_calls(&mut self, entry_points: &[(&str, u16)]) -> Result<(), EvalError> {
        for instr in self
            .code
            .iter_mut()
            .filter(|instr| instr.opcode == OpCode::Call)
        {
            let Symbol::Call { function } = &instr.node.symbol else {
                return Err(EvalError::malformed(format!(
                    "Call instruction compiled from a '{}' node",
                    instr.node.symbol.name()
                )));
            };
            let address = entry_points
                .iter()
                .find(|(name, _)| *name == function.as_str())
                .map(|&(_, address)| address)
                .ok_or_else(|| EvalError::UnresolvedFunction {
                    name: function.clone(),
                })?;
            instr.target = Some(address);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcodes(program: &Program<'_>) -> Vec<OpCode> {
        program.instructions().iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn test_pre_order_emission() {
        // Sub(Mul(x, 2), Sin(y))
        let tree = SymbolicExpressionTree::from_body(Node::binary(
            Symbol::Subtraction,
            Node::binary(
                Symbol::Multiplication,
                Node::variable("x", 1.0),
                Node::constant(2.0),
            ),
            Node::unary(Symbol::Sine, Node::variable("y", 1.0)),
        ));
        let program = Compiler::new().compile(&tree).unwrap();

        assert_eq!(
            opcodes(&program),
            [
                OpCode::Sub,
                OpCode::Mul,
                OpCode::Variable,
                OpCode::Constant,
                OpCode::Sin,
                OpCode::Variable
            ]
        );
        let arg_counts: Vec<u16> = program.instructions().iter().map(|i| i.arg_count).collect();
        assert_eq!(arg_counts, [2, 2, 0, 0, 1, 0]);
        assert_eq!(program.body_len(), 6);
        assert_eq!(program.call_stack_size(), 0);
        assert!(program.instructions().iter().all(|i| i.target.is_none()));
    }

    #[test]
    fn test_function_layout_and_call_targets() {
        let tree = SymbolicExpressionTree::with_functions(
            Node::binary(
                Symbol::Addition,
                Node::call("ADF0", vec![Node::variable("x", 1.0)]),
                Node::call("ADF1", vec![Node::constant(1.0), Node::constant(2.0)]),
            ),
            vec![
                (
                    "ADF0".to_owned(),
                    Node::binary(Symbol::Multiplication, Node::argument(0), Node::argument(0)),
                ),
                ("ADF1".to_owned(), Node::argument(1)),
            ],
        );
        let program = Compiler::new().compile(&tree).unwrap();

        assert_eq!(program.body_len(), 6);
        assert_eq!(program.entry_point("ADF0"), Some(6));
        assert_eq!(program.entry_point("ADF1"), Some(9));
        assert_eq!(program.entry_point("ADF2"), None);
        assert_eq!(program.len(), 10);
        assert_eq!(program.instructions()[1].target, Some(6));
        assert_eq!(program.instructions()[3].target, Some(9));
        // (1 + 1) + (2 + 1)
        assert_eq!(program.call_stack_size(), 5);
    }

    #[test]
    fn test_unresolved_call() {
        let tree = SymbolicExpressionTree::from_body(Node::call("missing", Vec::new()));
        let err = Compiler::new().compile(&tree).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnresolvedFunction {
                name: "missing".to_owned()
            }
        );
    }

    #[test]
    fn test_unsupported_symbol() {
        let tree = SymbolicExpressionTree::from_body(Node::unary(
            Symbol::Custom {
                name: "Logistic".into(),
            },
            Node::constant(1.0),
        ));
        assert!(matches!(
            Compiler::new().compile(&tree),
            Err(EvalError::UnsupportedSymbol { .. })
        ));
    }

    #[test]
    fn test_malformed_trees() {
        let empty = SymbolicExpressionTree::new(Node::leaf(Symbol::ProgramRoot));
        assert!(matches!(
            Compiler::new().compile(&empty),
            Err(EvalError::MalformedTree(_))
        ));

        let wrong_arity = SymbolicExpressionTree::from_body(Node::binary(
            Symbol::Sine,
            Node::constant(1.0),
            Node::constant(2.0),
        ));
        assert!(matches!(
            Compiler::new().compile(&wrong_arity),
            Err(EvalError::MalformedTree(_))
        ));

        let duplicate = SymbolicExpressionTree::with_functions(
            Node::constant(1.0),
            vec![
                ("F".to_owned(), Node::constant(1.0)),
                ("F".to_owned(), Node::constant(2.0)),
            ],
        );
        assert!(matches!(
            Compiler::new().compile(&duplicate),
            Err(EvalError::MalformedTree(_))
        ));
    }

    #[test]
    fn test_too_many_children() {
        let children = vec![Node::constant(1.0); 70_000];
        let tree = SymbolicExpressionTree::from_body(Node::new(Symbol::Addition, children));
        let err = Compiler::new().compile(&tree).unwrap_err();
        assert!(err.is_capacity_error());
        assert_eq!(
            err,
            EvalError::TooManyChildren {
                symbol: "Addition".to_owned(),
                count: 70_000,
                limit: MAX_ARGUMENTS,
            }
        );
    }

    #[test]
    fn test_program_too_long() {
        // 1 + 40_000 * 2 nodes, each node within the child limit
        let children = vec![Node::unary(Symbol::Sine, Node::variable("x", 1.0)); 40_000];
        let tree = SymbolicExpressionTree::from_body(Node::new(Symbol::Addition, children));
        let err = Compiler::new().compile(&tree).unwrap_err();
        assert_eq!(
            err,
            EvalError::ProgramTooLong {
                length: 80_001,
                limit: MAX_PROGRAM_LENGTH,
            }
        );
    }

    #[test]
    fn test_hooks_rewrite_instructions() {
        let body = Node::unary(Symbol::Sine, Node::constant(0.0));
        let tree = SymbolicExpressionTree::from_body(body);
        let compiler = Compiler::new().with_hook(|mut instr| {
            if instr.opcode == OpCode::Sin {
                instr.opcode = OpCode::Cos;
            }
            instr
        });
        let program = compiler.compile(&tree).unwrap();
        assert_eq!(opcodes(&program), [OpCode::Cos, OpCode::Constant]);
        assert!(format!("{compiler:?}").contains("hooks: 1"));
    }
}
