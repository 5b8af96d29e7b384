//! Interpreter Benchmark
//!
//! Compares the scalar and batch interpreters on trees of growing size.
//! Also measures compilation alone and the column cache hit path.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use symreg_eval::{
    BatchInterpreter, Compiler, Node, ScalarInterpreter, Symbol, SymbolicExpressionTree, Table,
};

const ROWS: usize = 10_000;

// =============================================================================
// Tree Generator
// =============================================================================

/// Sum of `n` mixed terms over x and y, all inside the batch subset
fn generate_mixed(n: usize) -> SymbolicExpressionTree {
    let terms = (1..=n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss, reason = "Small term indices")]
            let k = i as f64;
            match i % 5 {
                // k*x^2
                0 => Node::binary(
                    Symbol::Multiplication,
                    Node::constant(k),
                    Node::unary(Symbol::Square, Node::variable("x", 1.0)),
                ),
                // sin(k*x) * cos(y)
                1 => Node::binary(
                    Symbol::Multiplication,
                    Node::unary(Symbol::Sine, Node::variable("x", k)),
                    Node::unary(Symbol::Cosine, Node::variable("y", 1.0)),
                ),
                // exp(x/k) + log(y + k)
                2 => Node::binary(
                    Symbol::Addition,
                    Node::unary(Symbol::Exponential, Node::variable("x", 1.0 / k)),
                    Node::unary(
                        Symbol::Logarithm,
                        Node::binary(
                            Symbol::Addition,
                            Node::variable("y", 1.0),
                            Node::constant(k),
                        ),
                    ),
                ),
                // aq(x^2 + k, y)
                3 => Node::binary(
                    Symbol::AnalyticQuotient,
                    Node::binary(
                        Symbol::Addition,
                        Node::unary(Symbol::Square, Node::variable("x", 1.0)),
                        Node::constant(k),
                    ),
                    Node::variable("y", 1.0),
                ),
                // sqrt(abs(x * y - k))
                _ => Node::unary(
                    Symbol::SquareRoot,
                    Node::unary(
                        Symbol::Absolute,
                        Node::binary(
                            Symbol::Subtraction,
                            Node::binary(
                                Symbol::Multiplication,
                                Node::variable("x", 1.0),
                                Node::variable("y", 1.0),
                            ),
                            Node::constant(k),
                        ),
                    ),
                ),
            }
        })
        .collect();
    SymbolicExpressionTree::from_body(Node::new(Symbol::Addition, terms))
}

fn dataset() -> Table {
    #[allow(clippy::cast_precision_loss, reason = "Benchmark row counts")]
    let x: Vec<f64> = (0..ROWS).map(|i| (i as f64).mul_add(1e-3, 0.1)).collect();
    let y: Vec<f64> = x.iter().map(|v| v.cos() + 2.0).collect();
    Table::from_numeric([("x", x), ("y", y)]).unwrap()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for n in [10, 100, 1_000] {
        let tree = generate_mixed(n);
        let compiler = Compiler::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), &tree, |b, tree| {
            b.iter(|| compiler.compile(black_box(tree)).unwrap().len());
        });
    }
    group.finish();
}

fn bench_interpreters(c: &mut Criterion) {
    let table = dataset();
    let mut group = c.benchmark_group("evaluate");
    group.throughput(Throughput::Elements(ROWS as u64));
    group.sample_size(20);

    for n in [10, 100] {
        let tree = generate_mixed(n);

        // -------------------------------------------------------------------------
        // Scalar
        // -------------------------------------------------------------------------

        let scalar = ScalarInterpreter::new();
        group.bench_with_input(BenchmarkId::new("scalar", n), &tree, |b, tree| {
            b.iter(|| {
                scalar
                    .evaluate(black_box(tree), &table, 0..ROWS)
                    .unwrap()
                    .sum::<f64>()
            });
        });

        // -------------------------------------------------------------------------
        // Batch (warm column cache)
        // -------------------------------------------------------------------------

        for batch_size in [64, 256] {
            let mut batch = BatchInterpreter::new().batch_size(batch_size);
            group.bench_with_input(
                BenchmarkId::new(format!("batch_{batch_size}"), n),
                &tree,
                |b, tree| {
                    b.iter(|| batch.evaluate(black_box(tree), &table, 0..ROWS).unwrap());
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_interpreters);

criterion_main!(benches);
