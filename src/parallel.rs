//! Parallel population evaluation using Rayon
//!
//! Evaluates a whole population of trees against one dataset, one tree per
//! task. Each worker owns its own [`BatchInterpreter`] (and so its own
//! column cache); trees outside the batch subset fall back to a shared
//! [`ScalarInterpreter`], which holds no mutable state.
//!
//! Enable with the `parallel` feature:
//! ```toml
//! symreg_eval = { version = "0.1", features = ["parallel"] }
//! ```

use crate::EvalError;
use crate::dataset::Dataset;
use crate::evaluator::{BatchInterpreter, Rows, ScalarInterpreter};
use crate::tree::SymbolicExpressionTree;
use rayon::prelude::*;

/// Evaluate every tree over `rows` in parallel.
///
/// Results are returned in population order. A tree that fails to compile
/// yields its error without affecting the others.
///
/// # Example
/// ```
/// use symreg_eval::parallel::evaluate_population;
/// use symreg_eval::{Node, Rows, Symbol, SymbolicExpressionTree, Table};
///
/// let table = Table::from_numeric([("x", vec![1.0, 2.0])]).expect("valid table");
/// let population = vec![
///     SymbolicExpressionTree::from_body(Node::variable("x", 3.0)),
///     SymbolicExpressionTree::from_body(Node::unary(Symbol::Not, Node::variable("x", 1.0))),
/// ];
/// let results = evaluate_population(&population, &table, Rows::from(0..2));
/// assert_eq!(results[0], Ok(vec![3.0, 6.0]));
/// assert_eq!(results[1], Ok(vec![-1.0, -1.0]));
/// ```
pub fn evaluate_population<D>(
    trees: &[SymbolicExpressionTree],
    dataset: &D,
    rows: Rows<'_>,
) -> Vec<Result<Vec<f64>, EvalError>>
where
    D: Dataset + Sync + ?Sized,
{
    let scalar = ScalarInterpreter::new();
    evaluate_population_with(trees, dataset, rows, &scalar, BatchInterpreter::new)
}

/// [`evaluate_population`] with a caller-configured scalar interpreter and
/// batch interpreter factory (called once per worker)
pub fn evaluate_population_with<D, F>(
    trees: &[SymbolicExpressionTree],
    dataset: &D,
    rows: Rows<'_>,
    scalar: &ScalarInterpreter,
    make_batch: F,
) -> Vec<Result<Vec<f64>, EvalError>>
where
    D: Dataset + Sync + ?Sized,
    F: Fn() -> BatchInterpreter + Sync + Send,
{
    tracing::debug!(
        trees = trees.len(),
        rows = rows.len(),
        "evaluating population"
    );
    trees
        .par_iter()
        .map_init(make_batch, |batch, tree| {
            if BatchInterpreter::is_batch_eligible(tree) {
                batch.evaluate(tree, dataset, rows.clone())
            } else {
                scalar
                    .evaluate(tree, dataset, rows.clone())
                    .map(Iterator::collect)
            }
        })
        .collect()
}
