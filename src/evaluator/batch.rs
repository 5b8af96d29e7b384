//! Batch interpreter for the arithmetic subset.
//!
//! Evaluates many rows at once without recursion. The tree is laid out
//! breadth-first so that every instruction's children form a contiguous
//! run; each instruction owns a buffer of `batch_size` values.
//!
//! ```text
//! index:     0          1         2       3      4
//!         [ Add ]   [ Mul ]    [ 2.0 ]  [ x ]  [ y ]
//!    child_index=1  child_index=3
//!
//! per chunk: 4 -> 3 -> 2 -> 1 -> 0   (children before parents)
//! ```
//!
//! Constant buffers are filled once at layout time; variable buffers are
//! loaded from the [`ColumnCache`] per chunk. Combining opcodes fold their
//! children's buffers into their own, four lanes at a time with
//! [`wide::f64x4`] for the IEEE-exact operations (`+ - * / sqrt abs`) and
//! lane by lane for transcendental functions. Both paths compute each value
//! with the same operation sequence as the scalar interpreter, so the two
//! agree bit for bit.
//!
//! Rows are processed in chunks of `batch_size`, then one remainder chunk
//! restricted to fewer lanes.

use super::rows::Rows;
use super::{OpCode, TreeInterpreter};
use crate::dataset::{Dataset, DatasetId};
use crate::tree::{Node, Symbol, SymbolicExpressionTree};
use crate::{DEFAULT_BATCH_SIZE, EvalError, MAX_ARGUMENTS, MAX_PROGRAM_LENGTH};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use wide::f64x4;

// =============================================================================
// Column cache
// =============================================================================

/// Dense copies of a dataset's numeric columns.
///
/// Owned by one worker and reused across evaluations. The cache is keyed by
/// [`DatasetId`]: it reloads when a different dataset is bound, and on every
/// bind of a mutable dataset.
#[derive(Debug, Default)]
pub struct ColumnCache {
    dataset: Option<DatasetId>,
    columns: FxHashMap<String, Box<[f64]>>,
    reloads: u64,
}

impl ColumnCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the cache hold `dataset`'s columns; returns whether it reloaded
    pub fn refresh<D>(&mut self, dataset: &D) -> bool
    where
        D: Dataset + ?Sized,
    {
        let id = dataset.id();
        let mutable = dataset.is_mutable();
        if !mutable && self.dataset == Some(id) {
            return false;
        }

        self.columns.clear();
        for name in dataset.numeric_variables() {
            if let Some(values) = dataset.double_values(name) {
                self.columns.insert(name.to_owned(), values.into());
            }
        }
        // Mutable datasets are never remembered
        self.dataset = if mutable { None } else { Some(id) };
        self.reloads += 1;
        tracing::trace!(
            ?id,
            mutable,
            columns = self.columns.len(),
            "reloaded column cache"
        );
        true
    }

    /// Cached column for `name`
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(AsRef::as_ref)
    }

    /// Number of times the cache has (re)loaded a dataset
    pub fn reloads(&self) -> u64 {
        self.reloads
    }

    /// Dataset currently cached, if any
    pub fn dataset(&self) -> Option<DatasetId> {
        self.dataset
    }

    /// Drop all cached columns
    pub fn clear(&mut self) {
        self.columns.clear();
        self.dataset = None;
    }
}

// =============================================================================
// Layout
// =============================================================================

/// One breadth-first laid out node with its lane buffer
#[derive(Debug)]
pub struct BatchInstruction<'c> {
    pub opcode: OpCode,
    pub arg_count: u16,
    /// Index of the first child; children are contiguous
    pub child_index: usize,
    /// Variable weight
    pub weight: f64,
    /// Variable column, `None` if the variable is missing
    pub column: Option<&'c [f64]>,
    buffer: Box<[f64]>,
}

impl BatchInstruction<'_> {
    pub fn buffer(&self) -> &[f64] {
        &self.buffer
    }
}

/// Lay `body` out breadth-first with buffers of `batch_size` lanes.
///
/// # Errors
///
/// - `UnsupportedBatchOpcode` for any opcode outside the batch subset
/// - `UnsupportedSymbol`, `MalformedTree` or a capacity error, as for
///   [`Compiler::compile`](super::Compiler::compile)
pub fn layout<'c>(
    body: &Node,
    cache: &'c ColumnCache,
    batch_size: usize,
) -> Result<Vec<BatchInstruction<'c>>, EvalError> {
    let mut code: Vec<BatchInstruction<'c>> = Vec::new();
    let mut next_child = 1;

    for node in body.iter_breadth() {
        let opcode = OpCode::from_symbol(&node.symbol)?;
        if !opcode.is_batch_supported() {
            return Err(EvalError::UnsupportedBatchOpcode { opcode });
        }
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
        if code.len() >= MAX_PROGRAM_LENGTH {
            return Err(EvalError::ProgramTooLong {
                length: body.node_count(),
                limit: MAX_PROGRAM_LENGTH,
            });
        }

        let mut instr = BatchInstruction {
            opcode,
            arg_count,
            child_index: if count > 0 { next_child } else { 0 },
            weight: 1.0,
            column: None,
            buffer: vec![0.0; batch_size].into_boxed_slice(),
        };
        next_child += count;

        match &node.symbol {
            Symbol::Constant { value } => instr.buffer.fill(*value),
            Symbol::Variable { name, weight } => {
                instr.weight = *weight;
                instr.column = cache.get(name);
            }
            _ => {}
        }
        code.push(instr);
    }

    Ok(code)
}

// =============================================================================
// Lane kernels
// =============================================================================

#[inline]
fn load(chunk: &[f64]) -> f64x4 {
    f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]])
}

/// Apply `simd` to full groups of four lanes and `scalar` to the rest
#[inline]
fn unary_lanes(dst: &mut [f64], simd: impl Fn(f64x4) -> f64x4, scalar: impl Fn(f64) -> f64) {
    let mut chunks = dst.chunks_exact_mut(4);
    for chunk in &mut chunks {
        chunk.copy_from_slice(&simd(load(chunk)).to_array());
    }
    for value in chunks.into_remainder() {
        *value = scalar(*value);
    }
}

/// `dst[i] = op(dst[i], src[i])` four lanes at a time
#[inline]
fn binary_lanes(
    dst: &mut [f64],
    src: &[f64],
    simd: impl Fn(f64x4, f64x4) -> f64x4,
    scalar: impl Fn(f64, f64) -> f64,
) {
    let mut dst_chunks = dst.chunks_exact_mut(4);
    let mut src_chunks = src.chunks_exact(4);
    for (d, s) in (&mut dst_chunks).zip(&mut src_chunks) {
        d.copy_from_slice(&simd(load(d), load(s)).to_array());
    }
    for (d, s) in dst_chunks
        .into_remainder()
        .iter_mut()
        .zip(src_chunks.remainder())
    {
        *d = scalar(*d, *s);
    }
}

/// Lane-by-lane fallback for operations without a vector form
#[inline]
fn map_lanes(dst: &mut [f64], f: impl Fn(f64) -> f64) {
    for value in dst {
        *value = f(*value);
    }
}

fn load_variable(
    dst: &mut [f64],
    column: Option<&[f64]>,
    weight: f64,
    rows: &Rows<'_>,
    offset: usize,
) {
    let Some(column) = column else {
        dst.fill(f64::NAN);
        return;
    };
    for (position, value) in dst.iter_mut().enumerate() {
        *value = column
            .get(rows.get(offset + position))
            .map_or(f64::NAN, |v| v * weight);
    }
}

/// Evaluate `len` rows starting at output position `offset`
fn evaluate_chunk(code: &mut [BatchInstruction<'_>], rows: &Rows<'_>, offset: usize, len: usize) {
    for i in (0..code.len()).rev() {
        let (head, tail) = code.split_at_mut(i + 1);
        let instr = &mut head[i];
        let children: &[BatchInstruction<'_>] = if instr.arg_count == 0 {
            &[]
        } else {
            let first = instr.child_index - (i + 1);
            &tail[first..first + usize::from(instr.arg_count)]
        };
        let child = move |k: usize| &children[k].buffer[..len];
        let dst = &mut instr.buffer[..len];

        match instr.opcode {
            // Filled at layout time
            OpCode::Constant => {}
            OpCode::Variable => load_variable(dst, instr.column, instr.weight, rows, offset),

            OpCode::Add => {
                dst.copy_from_slice(child(0));
                for k in 1..children.len() {
                    binary_lanes(dst, child(k), |a, b| a + b, |a, b| a + b);
                }
            }
            OpCode::Sub => {
                dst.copy_from_slice(child(0));
                if children.len() == 1 {
                    map_lanes(dst, |a| -a);
                }
                for k in 1..children.len() {
                    binary_lanes(dst, child(k), |a, b| a - b, |a, b| a - b);
                }
            }
            OpCode::Mul => {
                dst.copy_from_slice(child(0));
                for k in 1..children.len() {
                    binary_lanes(dst, child(k), |a, b| a * b, |a, b| a * b);
                }
            }
            OpCode::Div => {
                dst.copy_from_slice(child(0));
                if children.len() == 1 {
                    unary_lanes(dst, |a| f64x4::splat(1.0) / a, |a| 1.0 / a);
                }
                for k in 1..children.len() {
                    binary_lanes(dst, child(k), |a, b| a / b, |a, b| a / b);
                }
            }
            OpCode::AnalyticQuotient => {
                dst.copy_from_slice(child(0));
                binary_lanes(
                    dst,
                    child(1),
                    |a, b| a / (f64x4::splat(1.0) + b * b).sqrt(),
                    |a, b| a / (1.0 + b * b).sqrt(),
                );
            }
            OpCode::Power => {
                dst.copy_from_slice(child(0));
                for (x, exponent) in dst.iter_mut().zip(child(1)) {
                    *x = x.powf(exponent.round_ties_even());
                }
            }
            OpCode::Root => {
                dst.copy_from_slice(child(0));
                for (x, degree) in dst.iter_mut().zip(child(1)) {
                    *x = x.powf(1.0 / degree.round_ties_even());
                }
            }

            // Unary
            OpCode::Square => {
                dst.copy_from_slice(child(0));
                unary_lanes(dst, |a| a * a, |a| a * a);
            }
            OpCode::Cube => {
                dst.copy_from_slice(child(0));
                unary_lanes(dst, |a| a * a * a, |a| a * a * a);
            }
            OpCode::SquareRoot => {
                dst.copy_from_slice(child(0));
                unary_lanes(dst, f64x4::sqrt, f64::sqrt);
            }
            OpCode::Absolute => {
                dst.copy_from_slice(child(0));
                unary_lanes(dst, f64x4::abs, f64::abs);
            }
            OpCode::CubeRoot => {
                dst.copy_from_slice(child(0));
                map_lanes(dst, f64::cbrt);
            }
            OpCode::Exp => {
                dst.copy_from_slice(child(0));
                map_lanes(dst, f64::exp);
            }
            OpCode::Log => {
                dst.copy_from_slice(child(0));
                map_lanes(dst, f64::ln);
            }
            OpCode::Sin => {
                dst.copy_from_slice(child(0));
                map_lanes(dst, f64::sin);
            }
            OpCode::Cos => {
                dst.copy_from_slice(child(0));
                map_lanes(dst, f64::cos);
            }
            OpCode::Tan => {
                dst.copy_from_slice(child(0));
                map_lanes(dst, f64::tan);
            }
            OpCode::Tanh => {
                dst.copy_from_slice(child(0));
                map_lanes(dst, f64::tanh);
            }
            OpCode::SubFunction => dst.copy_from_slice(child(0)),

            other => unreachable!("opcode {other} passed the batch layout check"),
        }
    }
}

// =============================================================================
// Interpreter
// =============================================================================

fn is_batch_node(node: &Node) -> bool {
    OpCode::from_symbol(&node.symbol).is_ok_and(OpCode::is_batch_supported)
}

/// Vectorized interpreter for batch-eligible trees.
///
/// Holds the worker's [`ColumnCache`]; use one interpreter per worker thread.
///
/// # Example
///
/// ```
/// use symreg_eval::{BatchInterpreter, Node, Symbol, SymbolicExpressionTree, Table};
///
/// let table = Table::from_numeric([("x", vec![1.0, 2.0, 3.0])]).expect("valid table");
/// let tree = SymbolicExpressionTree::from_body(Node::unary(
///     Symbol::Square,
///     Node::variable("x", 1.0),
/// ));
/// assert!(BatchInterpreter::is_batch_eligible(&tree));
///
/// let mut interpreter = BatchInterpreter::new();
/// let values = interpreter.evaluate(&tree, &table, 0..3).expect("Should evaluate");
/// assert_eq!(values, [1.0, 4.0, 9.0]);
/// ```
#[derive(Debug)]
pub struct BatchInterpreter {
    cache: ColumnCache,
    batch_size: usize,
    evaluated_solutions: AtomicU64,
}

impl Default for BatchInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchInterpreter {
    pub fn new() -> Self {
        Self::with_cache(ColumnCache::new())
    }

    /// Start from an existing cache, e.g. one handed over between workers
    pub fn with_cache(cache: ColumnCache) -> Self {
        BatchInterpreter {
            cache,
            batch_size: DEFAULT_BATCH_SIZE,
            evaluated_solutions: AtomicU64::new(0),
        }
    }

    /// Rows per chunk (at least 1)
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Whether every node of the main body is in the batch subset
    pub fn is_batch_eligible(tree: &SymbolicExpressionTree) -> bool {
        let Some(body) = tree.body() else {
            return false;
        };
        body.iter_prefix().all(is_batch_node)
    }

    pub fn cache(&self) -> &ColumnCache {
        &self.cache
    }

    pub fn into_cache(self) -> ColumnCache {
        self.cache
    }

    pub fn evaluated_solutions(&self) -> u64 {
        self.evaluated_solutions.load(Ordering::Relaxed)
    }

    pub fn reset_evaluated_solutions(&self) {
        self.evaluated_solutions.store(0, Ordering::Relaxed);
    }

    /// Evaluate `tree` over `rows`, returning one value per row.
    ///
    /// Rows outside the dataset evaluate to NaN, as with the scalar
    /// interpreter.
    ///
    /// # Errors
    ///
    /// - `UnsupportedBatchOpcode` if the tree is not batch eligible
    /// - `MalformedTree` if the tree has no main body or a node has a child
    ///   count its symbol rejects
    /// - `UnsupportedSymbol` or a capacity error, as for compilation
    pub fn evaluate<'r, D>(
        &mut self,
        tree: &SymbolicExpressionTree,
        dataset: &D,
        rows: impl Into<Rows<'r>>,
    ) -> Result<Vec<f64>, EvalError>
    where
        D: Dataset + ?Sized,
    {
        let rows = rows.into();
        let body = tree
            .body()
            .ok_or_else(|| EvalError::malformed("tree has no main body"))?;

        self.cache.refresh(dataset);
        let batch_size = self.batch_size;
        let mut code = layout(body, &self.cache, batch_size)?;
        self.evaluated_solutions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            instructions = code.len(),
            rows = rows.len(),
            batch_size,
            "laid out batch program"
        );

        let total = rows.len();
        let mut output = Vec::with_capacity(total);
        #[allow(
            clippy::integer_division,
            reason = "Intentional integer division for chunking"
        )]
        let full_chunks = total / batch_size;

        for chunk in 0..full_chunks {
            let offset = chunk * batch_size;
            evaluate_chunk(&mut code, &rows, offset, batch_size);
            output.extend_from_slice(&code[0].buffer[..batch_size]);
        }
        let remainder = total - full_chunks * batch_size;
        if remainder > 0 {
            evaluate_chunk(&mut code, &rows, full_chunks * batch_size, remainder);
            output.extend_from_slice(&code[0].buffer[..remainder]);
        }

        let dataset_rows = dataset.rows();
        for (value, row) in output.iter_mut().zip(rows.iter()) {
            if row >= dataset_rows {
                *value = f64::NAN;
            }
        }
        Ok(output)
    }
}

impl TreeInterpreter for BatchInterpreter {
    fn tree_values<'a>(
        &'a mut self,
        tree: &'a SymbolicExpressionTree,
        dataset: &'a dyn Dataset,
        rows: Rows<'a>,
    ) -> Result<Box<dyn Iterator<Item = f64> + 'a>, EvalError> {
        Ok(Box::new(self.evaluate(tree, dataset, rows)?.into_iter()))
    }

    fn evaluated_solutions(&self) -> u64 {
        self.evaluated_solutions.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Table;
    use crate::evaluator::ScalarInterpreter;

    fn table(rows: usize) -> Table {
        #[allow(clippy::cast_precision_loss, reason = "Small test row counts")]
        let x: Vec<f64> = (0..rows).map(|i| i as f64 * 0.25 - 3.0).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v - 1.0).collect();
        Table::from_numeric([("x", x), ("y", y)]).unwrap()
    }

    fn x() -> Node {
        Node::variable("x", 1.0)
    }

    fn y() -> Node {
        Node::variable("y", 0.5)
    }

    fn same(a: f64, b: f64) -> bool {
        a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
    }

    #[test]
    fn test_layout_is_breadth_first() {
        let body = Node::binary(
            Symbol::Addition,
            Node::binary(Symbol::Multiplication, x(), Node::constant(2.0)),
            Node::unary(Symbol::Sine, y()),
        );
        let cache = ColumnCache::new();
        let code = layout(&body, &cache, 8).unwrap();
        let opcodes: Vec<OpCode> = code.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            [
                OpCode::Add,
                OpCode::Mul,
                OpCode::Sin,
                OpCode::Variable,
                OpCode::Constant,
                OpCode::Variable
            ]
        );
        assert_eq!(code[0].child_index, 1);
        assert_eq!(code[1].child_index, 3);
        assert_eq!(code[2].child_index, 5);
        assert_eq!(code[4].buffer(), [2.0; 8]);
        // Empty cache: variables are unbound
        assert!(code[3].column.is_none());
    }

    #[test]
    fn test_chunks_with_remainder() {
        let table = table(130);
        // x * 2 + y
        let tree = SymbolicExpressionTree::from_body(Node::binary(
            Symbol::Addition,
            Node::binary(Symbol::Multiplication, x(), Node::constant(2.0)),
            y(),
        ));
        let values = BatchInterpreter::new()
            .evaluate(&tree, &table, 0..130)
            .unwrap();
        assert_eq!(values.len(), 130);

        let xs = table.double_values("x").unwrap();
        let ys = table.double_values("y").unwrap();
        for (i, value) in values.iter().enumerate() {
            assert!(same(*value, xs[i] * 2.0 + ys[i] * 0.5), "row {i}");
        }
    }

    #[test]
    fn test_agrees_with_scalar() {
        let table = table(37);
        let body = Node::new(
            Symbol::Addition,
            vec![
                Node::binary(Symbol::AnalyticQuotient, x(), y()),
                Node::unary(Symbol::Sine, Node::unary(Symbol::Exponential, x())),
                Node::unary(Symbol::Subtraction, Node::unary(Symbol::Cube, y())),
                Node::unary(Symbol::Division, Node::unary(Symbol::Absolute, x())),
                Node::binary(Symbol::Power, y(), Node::constant(2.3)),
                Node::binary(
                    Symbol::Root,
                    Node::unary(Symbol::Square, x()),
                    Node::constant(3.0),
                ),
                Node::unary(Symbol::SquareRoot, y()),
                Node::unary(Symbol::Logarithm, Node::unary(Symbol::CubeRoot, x())),
                Node::unary(
                    Symbol::SubFunction {
                        name: "S".into(),
                    },
                    Node::unary(Symbol::HyperbolicTangent, Node::unary(Symbol::Tangent, x())),
                ),
                Node::unary(Symbol::Cosine, y()),
            ],
        );
        let tree = SymbolicExpressionTree::from_body(body);
        assert!(BatchInterpreter::is_batch_eligible(&tree));

        let scalar: Vec<f64> = ScalarInterpreter::new()
            .evaluate(&tree, &table, 0..37)
            .unwrap()
            .collect();
        let batch = BatchInterpreter::new()
            .batch_size(8)
            .evaluate(&tree, &table, 0..37)
            .unwrap();
        assert_eq!(scalar.len(), batch.len());
        for (i, (s, b)) in scalar.iter().zip(&batch).enumerate() {
            assert!(same(*s, *b), "row {i}: scalar {s} batch {b}");
        }
    }

    #[test]
    fn test_unsupported_opcode() {
        let table = table(4);
        let tree = SymbolicExpressionTree::from_body(Node::new(
            Symbol::IfThenElse,
            vec![x(), Node::constant(1.0), Node::constant(2.0)],
        ));
        assert!(!BatchInterpreter::is_batch_eligible(&tree));
        let mut interpreter = BatchInterpreter::new();
        let err = interpreter.evaluate(&tree, &table, 0..4).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnsupportedBatchOpcode {
                opcode: OpCode::IfThenElse
            }
        );
        // Rejected trees are not counted as evaluated
        assert_eq!(interpreter.evaluated_solutions(), 0);
        let supported = SymbolicExpressionTree::from_body(x());
        assert!(interpreter.evaluate(&supported, &table, 0..4).is_ok());
        assert_eq!(interpreter.evaluated_solutions(), 1);

        let lagged = SymbolicExpressionTree::from_body(Node::lagged_variable("x", 1.0, -1));
        assert!(!BatchInterpreter::is_batch_eligible(&lagged));
    }

    #[test]
    fn test_missing_variable_and_rows() {
        let table = table(4);
        let tree = SymbolicExpressionTree::from_body(Node::binary(
            Symbol::Addition,
            Node::variable("nope", 1.0),
            Node::constant(1.0),
        ));
        let values = BatchInterpreter::new()
            .evaluate(&tree, &table, 0..4)
            .unwrap();
        assert!(values.iter().all(|v| v.is_nan()));

        // Out-of-range rows are NaN even for constant trees
        let constant = SymbolicExpressionTree::from_body(Node::constant(3.0));
        let rows = [1, 99, 2];
        let values = BatchInterpreter::new()
            .evaluate(&constant, &table, &rows)
            .unwrap();
        assert_eq!(values[0], 3.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 3.0);

        let empty = BatchInterpreter::new()
            .evaluate(&constant, &table, 0..0)
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_cache_keyed_by_dataset() {
        let first = table(5);
        let second = table(5);
        let tree = SymbolicExpressionTree::from_body(x());
        let mut interpreter = BatchInterpreter::new();

        interpreter.evaluate(&tree, &first, 0..5).unwrap();
        interpreter.evaluate(&tree, &first, 0..5).unwrap();
        assert_eq!(interpreter.cache().reloads(), 1);
        assert_eq!(interpreter.cache().dataset(), Some(first.id()));

        interpreter.evaluate(&tree, &second, 0..5).unwrap();
        assert_eq!(interpreter.cache().reloads(), 2);
        assert_eq!(interpreter.evaluated_solutions(), 3);
    }

    #[test]
    fn test_mutable_dataset_never_cached() {
        let tree = SymbolicExpressionTree::from_body(x());
        let mut modifiable = table(3).to_modifiable();
        let mut interpreter = BatchInterpreter::new();

        let before = interpreter.evaluate(&tree, &modifiable, 0..3).unwrap();
        assert_eq!(before, [-3.0, -2.75, -2.5]);

        modifiable
            .replace_variable("x", vec![7.0, 8.0, 9.0])
            .unwrap();
        let after = interpreter.evaluate(&tree, &modifiable, 0..3).unwrap();
        assert_eq!(after, [7.0, 8.0, 9.0]);
        assert_eq!(interpreter.cache().reloads(), 2);
        assert_eq!(interpreter.cache().dataset(), None);
    }

    #[test]
    fn test_lane_kernels_handle_remainder() {
        let mut dst = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        binary_lanes(&mut dst, &[1.0; 6], |a, b| a + b, |a, b| a + b);
        assert_eq!(dst, [2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        unary_lanes(&mut dst, |a| a * a, |a| a * a);
        assert_eq!(dst, [4.0, 9.0, 16.0, 25.0, 36.0, 49.0]);
    }
}
