#![allow(
    clippy::unwrap_used,
    clippy::print_stdout,
    clippy::use_debug,
    reason = "Essential for examples: unwrap for simplicity, stdout for demonstration"
)]
//! Instruction Sequence Dumper
//!
//! Compiles a handful of representative trees and prints their instruction
//! sequences, entry points and call stack requirements.
//!
//! Run with: cargo run --example `instruction_dump`

use symreg_eval::{Compiler, Node, ScalarInterpreter, Symbol, SymbolicExpressionTree, Table};

fn showcase() -> Vec<(&'static str, SymbolicExpressionTree)> {
    let x = || Node::variable("x", 1.0);
    vec![
        (
            "Polynomial",
            SymbolicExpressionTree::from_body(Node::new(
                Symbol::Addition,
                vec![
                    Node::unary(Symbol::Cube, x()),
                    Node::variable("x", -2.0),
                    Node::constant(0.5),
                ],
            )),
        ),
        (
            "Conditional",
            SymbolicExpressionTree::from_body(Node::new(
                Symbol::IfThenElse,
                vec![
                    Node::new(
                        Symbol::And,
                        vec![
                            Node::binary(Symbol::GreaterThan, x(), Node::constant(1.0)),
                            Node::binary(Symbol::LessThan, x(), Node::constant(3.0)),
                        ],
                    ),
                    Node::unary(Symbol::Sine, x()),
                    Node::constant(0.0),
                ],
            )),
        ),
        (
            "Moving Sum",
            SymbolicExpressionTree::from_body(Node::unary(Symbol::Integral { lag: -2 }, x())),
        ),
        (
            "Defined Function",
            SymbolicExpressionTree::with_functions(
                Node::call(
                    "HYPOT",
                    vec![x(), Node::call("HYPOT", vec![x(), Node::constant(1.0)])],
                ),
                vec![(
                    "HYPOT".to_owned(),
                    Node::unary(
                        Symbol::SquareRoot,
                        Node::binary(
                            Symbol::Addition,
                            Node::unary(Symbol::Square, Node::argument(0)),
                            Node::unary(Symbol::Square, Node::argument(1)),
                        ),
                    ),
                )],
            ),
        ),
    ]
}

fn main() {
    let table = Table::from_numeric([("x", vec![0.0, 1.0, 2.0, 3.0])]).unwrap();
    let compiler = Compiler::new();
    let interpreter = ScalarInterpreter::new();

    for (name, tree) in showcase() {
        let program = compiler.compile(&tree).unwrap();
        println!("=== {name} ===");
        println!(
            "{} instructions ({} in body), call stack {}",
            program.len(),
            program.body_len(),
            program.call_stack_size()
        );
        print!("{program}");

        let values: Vec<f64> = interpreter.evaluate(&tree, &table, 0..4).unwrap().collect();
        println!("values: {values:?}\n");
    }
}
