//! Late binding of compiled programs to a dataset.
//!
//! A [`Program`] knows variable names only. Binding resolves each
//! column-reading instruction to the dataset's dense column once per
//! evaluation, so the interpreters never look up names per row.

use super::OpCode;
use super::instruction::{Program, subtree_len};
use crate::dataset::{Dataset, VariableKind};
use crate::tree::Node;
use std::fmt;

/// Per-instruction payload resolved at bind time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Data<'a> {
    /// The instruction needs nothing beyond its node
    None,
    Numeric(&'a [f64]),
    Categorical(&'a [String]),
    /// Entry point of the called function
    Jump(u16),
    /// The variable (or call target) does not exist; evaluates to NaN
    Missing,
}

/// An [`Instruction`](super::Instruction) with its data attached
#[derive(Clone, Copy)]
pub struct BoundInstruction<'a> {
    pub node: &'a Node,
    pub opcode: OpCode,
    pub arg_count: u16,
    pub data: Data<'a>,
}

impl fmt::Debug for BoundInstruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundInstruction")
            .field("opcode", &self.opcode)
            .field("arg_count", &self.arg_count)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// A program ready to run against one dataset
#[derive(Debug, Clone)]
pub struct BoundProgram<'a> {
    code: Box<[BoundInstruction<'a>]>,
    rows: usize,
    call_stack_size: usize,
}

impl<'a> BoundProgram<'a> {
    #[inline]
    pub fn code(&self) -> &[BoundInstruction<'a>] {
        &self.code
    }

    /// Row count of the dataset the program is bound to
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn call_stack_size(&self) -> usize {
        self.call_stack_size
    }

    /// Length of the contiguous subtree rooted at instruction `index`
    pub fn subtree_len(&self, index: usize) -> usize {
        subtree_len(&self.code, index, |instr| instr.arg_count)
    }
}

/// Attach dataset columns and call targets to every instruction.
///
/// Unknown variables are not an error: their instructions bind to
/// [`Data::Missing`] and produce NaN when evaluated.
pub fn bind<'a, D>(program: &Program<'a>, dataset: &'a D) -> BoundProgram<'a>
where
    D: Dataset + ?Sized,
{
    let code = program
        .instructions()
        .iter()
        .map(|instr| BoundInstruction {
            node: instr.node,
            opcode: instr.opcode,
            arg_count: instr.arg_count,
            data: resolve(instr.node, instr.opcode, instr.target, dataset),
        })
        .collect();

    BoundProgram {
        code,
        rows: dataset.rows(),
        call_stack_size: program.call_stack_size(),
    }
}

fn resolve<'a, D>(node: &'a Node, opcode: OpCode, target: Option<u16>, dataset: &'a D) -> Data<'a>
where
    D: Dataset + ?Sized,
{
    match opcode {
        OpCode::Call => target.map_or(Data::Missing, Data::Jump),
        _ if opcode.reads_column() => {
            let Some(name) = node.symbol.variable_name() else {
                return Data::Missing;
            };
            let categorical = matches!(
                opcode,
                OpCode::FactorVariable | OpCode::BinaryFactorVariable
            );
            let data = match dataset.variable_kind(name) {
                Some(VariableKind::Numeric) if !categorical => {
                    dataset.double_values(name).map(Data::Numeric)
                }
                Some(VariableKind::Categorical) if categorical => {
                    dataset.string_values(name).map(Data::Categorical)
                }
                _ => None,
            };
            data.unwrap_or_else(|| {
                tracing::trace!(
                    variable = name,
                    %opcode,
                    "variable missing or of the wrong kind"
                );
                Data::Missing
            })
        }
        _ => Data::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Compiler;
    use crate::dataset::Table;
    use crate::tree::{Symbol, SymbolicExpressionTree};

    #[test]
    fn test_bind_columns_and_jumps() {
        let table = Table::builder()
            .numeric("x", vec![1.0, 2.0])
            .categorical("c", vec!["a".into(), "b".into()])
            .build()
            .unwrap();
        let tree = SymbolicExpressionTree::with_functions(
            Node::new(
                Symbol::Addition,
                vec![
                    Node::variable("x", 1.0),
                    Node::variable("nope", 1.0),
                    Node::leaf(Symbol::BinaryFactorVariable {
                        name: "c".into(),
                        value: "a".into(),
                        weight: 1.0,
                    }),
                    Node::call("F", Vec::new()),
                ],
            ),
            vec![("F".to_owned(), Node::constant(1.0))],
        );
        let program = Compiler::new().compile(&tree).unwrap();
        let bound = bind(&program, &table);

        assert_eq!(bound.rows(), 2);
        let code = bound.code();
        assert!(matches!(code[0].data, Data::None));
        assert_eq!(code[1].data, Data::Numeric(&[1.0, 2.0]));
        assert!(matches!(code[2].data, Data::Missing));
        let Data::Categorical(levels) = code[3].data else {
            panic!("expected a categorical column");
        };
        assert_eq!(levels.len(), 2);
        assert!(matches!(code[4].data, Data::Jump(5)));
        assert_eq!(bound.subtree_len(0), 5);
    }

    #[test]
    fn test_bind_checks_variable_kind() {
        let table = Table::builder()
            .numeric("x", vec![1.0, 2.0])
            .categorical("c", vec!["a".into(), "b".into()])
            .build()
            .unwrap();
        // Numeric reader on a categorical column and the other way round
        let tree = SymbolicExpressionTree::from_body(Node::binary(
            Symbol::Addition,
            Node::variable("c", 1.0),
            Node::leaf(Symbol::BinaryFactorVariable {
                name: "x".into(),
                value: "a".into(),
                weight: 1.0,
            }),
        ));
        let program = Compiler::new().compile(&tree).unwrap();
        let bound = bind(&program, &table);

        let code = bound.code();
        assert!(!code[0].opcode.reads_column());
        assert!(code[1].opcode.reads_column());
        assert!(code[2].opcode.reads_column());
        assert!(matches!(code[1].data, Data::Missing));
        assert!(matches!(code[2].data, Data::Missing));
    }
}
