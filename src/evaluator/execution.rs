//! Scalar stack-machine interpreter.
//!
//! Evaluates a bound program one row at a time by recursive descent over
//! the linear instruction sequence. Every opcode is supported, including
//! control flow (`IfThenElse`, `And`, `Or`), function calls and the
//! row-shifting time-series operators.
//!
//! # Row Semantics
//!
//! - A requested row outside the dataset yields NaN without evaluating
//! - `TimeLag`, `Integral` and `Derivative` move the row cursor while their
//!   child is evaluated and restore it afterwards; reads under them are
//!   bounds checked and yield NaN outside the dataset
//! - `LagVariable` always bounds checks its shifted row
//! - Everywhere else the cursor is the validated requested row and columns
//!   are indexed directly
//!
//! # Control Flow
//!
//! Branches that are not taken are skipped by advancing the program counter
//! over their subtree, so they cost no evaluation. Booleans are encoded as
//! `1.0` (true) and `-1.0` (false); any value `> 0` counts as true.

use super::binding::{BoundInstruction, BoundProgram, Data, bind};
use super::instruction::Program;
use super::rows::{Rows, RowsIter};
use super::state::InterpreterState;
use super::{Compiler, OpCode, TreeInterpreter};
use crate::dataset::Dataset;
use crate::tree::{Symbol, SymbolicExpressionTree};
use crate::{DEFAULT_MAX_CALL_DEPTH, EvalError, math};
use std::sync::atomic::{AtomicU64, Ordering};

/// Scalar interpreter for arbitrary expression trees.
///
/// Shareable across threads; every evaluation owns its own state.
///
/// # Example
///
/// ```
/// use symreg_eval::{Node, ScalarInterpreter, Symbol, SymbolicExpressionTree, Table};
///
/// let table = Table::from_numeric([("x", vec![1.0, 2.0, 3.0])]).expect("valid table");
/// let tree = SymbolicExpressionTree::from_body(Node::binary(
///     Symbol::Multiplication,
///     Node::variable("x", 1.0),
///     Node::constant(2.0),
/// ));
///
/// let interpreter = ScalarInterpreter::new();
/// let values: Vec<f64> = interpreter
///     .evaluate(&tree, &table, 0..3)
///     .expect("Should compile")
///     .collect();
/// assert_eq!(values, [2.0, 4.0, 6.0]);
/// ```
#[derive(Debug)]
pub struct ScalarInterpreter {
    compiler: Compiler,
    max_call_depth: usize,
    evaluated_solutions: AtomicU64,
}

impl Default for ScalarInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarInterpreter {
    pub fn new() -> Self {
        ScalarInterpreter {
            compiler: Compiler::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            evaluated_solutions: AtomicU64::new(0),
        }
    }

    /// Use `compiler` (and its hooks) for every evaluation
    #[must_use]
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Nesting limit for function calls.
    ///
    /// A call that would exceed the limit still evaluates its arguments but
    /// returns NaN instead of entering the function.
    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Number of evaluations started since creation or the last reset
    pub fn evaluated_solutions(&self) -> u64 {
        self.evaluated_solutions.load(Ordering::Relaxed)
    }

    pub fn reset_evaluated_solutions(&self) {
        self.evaluated_solutions.store(0, Ordering::Relaxed);
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Compile `tree` and evaluate it lazily over `rows`.
    ///
    /// Values are produced one row at a time as the returned iterator is
    /// advanced; dropping it early abandons the remaining rows.
    ///
    /// # Errors
    ///
    /// Any compilation error, see [`Compiler::compile`].
    pub fn evaluate<'a, D>(
        &self,
        tree: &'a SymbolicExpressionTree,
        dataset: &'a D,
        rows: impl Into<Rows<'a>>,
    ) -> Result<ScalarEvaluation<'a>, EvalError>
    where
        D: Dataset + ?Sized,
    {
        let program = self.compiler.compile(tree)?;
        Ok(self.evaluate_program(&program, dataset, rows))
    }

    /// Evaluate an already compiled program lazily over `rows`
    pub fn evaluate_program<'a, D>(
        &self,
        program: &Program<'a>,
        dataset: &'a D,
        rows: impl Into<Rows<'a>>,
    ) -> ScalarEvaluation<'a>
    where
        D: Dataset + ?Sized,
    {
        self.evaluated_solutions.fetch_add(1, Ordering::Relaxed);
        let program = bind(program, dataset);
        let state = InterpreterState::new(program.call_stack_size());
        ScalarEvaluation {
            program,
            state,
            rows: rows.into().iter(),
            max_call_depth: self.max_call_depth,
        }
    }
}

impl TreeInterpreter for ScalarInterpreter {
    fn tree_values<'a>(
        &'a mut self,
        tree: &'a SymbolicExpressionTree,
        dataset: &'a dyn Dataset,
        rows: Rows<'a>,
    ) -> Result<Box<dyn Iterator<Item = f64> + 'a>, EvalError> {
        Ok(Box::new(self.evaluate(tree, dataset, rows)?))
    }

    fn evaluated_solutions(&self) -> u64 {
        self.evaluated_solutions.load(Ordering::Relaxed)
    }
}

/// Lazy sequence of row values produced by [`ScalarInterpreter::evaluate`]
#[derive(Debug)]
pub struct ScalarEvaluation<'a> {
    program: BoundProgram<'a>,
    state: InterpreterState,
    rows: RowsIter<'a>,
    max_call_depth: usize,
}

impl ScalarEvaluation<'_> {
    /// Evaluate the program at a single row, independent of the iterator
    pub fn evaluate_row(&mut self, row: usize) -> f64 {
        self.state.reset();
        let (Ok(mut row), Ok(rows)) = (i64::try_from(row), i64::try_from(self.program.rows()))
        else {
            return f64::NAN;
        };
        if row >= rows {
            return f64::NAN;
        }
        let machine = Machine {
            code: self.program.code(),
            rows,
            max_call_depth: self.max_call_depth,
        };
        machine.evaluate(&mut self.state, &mut row)
    }

    /// State left behind by the most recent row
    pub fn state(&self) -> &InterpreterState {
        &self.state
    }
}

impl Iterator for ScalarEvaluation<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let row = self.rows.next()?;
        Some(self.evaluate_row(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for ScalarEvaluation<'_> {}

/// Read-only view of a bound program for one row
struct Machine<'p, 'a> {
    code: &'p [BoundInstruction<'a>],
    rows: i64,
    max_call_depth: usize,
}

#[inline]
fn truth(value: bool) -> f64 {
    if value { 1.0 } else { -1.0 }
}

#[cold]
#[inline(never)]
fn payload_mismatch(instr: &BoundInstruction<'_>) -> ! {
    panic!(
        "opcode {} cannot read the payload of a '{}' node",
        instr.opcode,
        instr.node.symbol.name()
    )
}

impl<'a> Machine<'_, 'a> {
    /// Column value at `row`; bounds checked only in lagged contexts
    #[inline]
    fn read<T>(&self, state: &InterpreterState, column: &'a [T], row: i64) -> Option<&'a T> {
        if state.in_lagged_context {
            self.checked(column, row)
        } else {
            // Outside lagged contexts the cursor is the validated requested row
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "The requested row was checked against the dataset size"
            )]
            let index = row as usize;
            Some(&column[index])
        }
    }

    #[inline]
    fn checked<T>(&self, column: &'a [T], row: i64) -> Option<&'a T> {
        if row < 0 || row >= self.rows {
            return None;
        }
        column.get(usize::try_from(row).ok()?)
    }

    /// Evaluate the subtree at the program counter under a lagged context
    fn lagged(&self, state: &mut InterpreterState, row: &mut i64) -> f64 {
        let saved = state.in_lagged_context;
        state.in_lagged_context = true;
        let value = self.evaluate(state, row);
        state.in_lagged_context = saved;
        value
    }

    /// Evaluate the subtree at the program counter.
    ///
    /// # Panics
    ///
    /// Panics if an instruction's opcode does not match its node's symbol,
    /// which only a compiler hook can cause.
    #[allow(
        clippy::too_many_lines,
        reason = "Single dispatch over the full opcode table"
    )]
    fn evaluate(&self, state: &mut InterpreterState, row: &mut i64) -> f64 {
        let instr = state.next_instruction(self.code);
        let arg_count = instr.arg_count;

        match instr.opcode {
            // Arithmetic, folded left to right
            OpCode::Add => {
                let mut sum = self.evaluate(state, row);
                for _ in 1..arg_count {
                    sum += self.evaluate(state, row);
                }
                sum
            }
            OpCode::Sub => {
                let mut diff = self.evaluate(state, row);
                if arg_count == 1 {
                    return -diff;
                }
                for _ in 1..arg_count {
                    diff -= self.evaluate(state, row);
                }
                diff
            }
            OpCode::Mul => {
                let mut product = self.evaluate(state, row);
                for _ in 1..arg_count {
                    product *= self.evaluate(state, row);
                }
                product
            }
            OpCode::Div => {
                let mut quotient = self.evaluate(state, row);
                if arg_count == 1 {
                    return 1.0 / quotient;
                }
                for _ in 1..arg_count {
                    quotient /= self.evaluate(state, row);
                }
                quotient
            }
            OpCode::Average => {
                let mut sum = self.evaluate(state, row);
                for _ in 1..arg_count {
                    sum += self.evaluate(state, row);
                }
                sum / f64::from(arg_count)
            }
            OpCode::Absolute => self.evaluate(state, row).abs(),
            OpCode::Square => {
                let x = self.evaluate(state, row);
                x * x
            }
            OpCode::Cube => {
                let x = self.evaluate(state, row);
                x * x * x
            }
            OpCode::SquareRoot => self.evaluate(state, row).sqrt(),
            OpCode::CubeRoot => self.evaluate(state, row).cbrt(),
            OpCode::Power => {
                let x = self.evaluate(state, row);
                let exponent = self.evaluate(state, row).round_ties_even();
                x.powf(exponent)
            }
            OpCode::Root => {
                let x = self.evaluate(state, row);
                let degree = self.evaluate(state, row).round_ties_even();
                x.powf(1.0 / degree)
            }
            OpCode::AnalyticQuotient => {
                let x = self.evaluate(state, row);
                let y = self.evaluate(state, row);
                x / (1.0 + y * y).sqrt()
            }

            // Transcendental
            OpCode::Sin => self.evaluate(state, row).sin(),
            OpCode::Cos => self.evaluate(state, row).cos(),
            OpCode::Tan => self.evaluate(state, row).tan(),
            OpCode::Tanh => self.evaluate(state, row).tanh(),
            OpCode::Log => self.evaluate(state, row).ln(),
            OpCode::Exp => self.evaluate(state, row).exp(),

            // Special functions
            OpCode::Gamma => math::gamma(self.evaluate(state, row)),
            OpCode::Psi => math::psi(self.evaluate(state, row)),
            OpCode::Dawson => math::dawson(self.evaluate(state, row)),
            OpCode::ExponentialIntegralEi => {
                math::exponential_integral_ei(self.evaluate(state, row))
            }
            OpCode::CosineIntegral => math::cosine_integral(self.evaluate(state, row)),
            OpCode::SineIntegral => math::sine_integral(self.evaluate(state, row)),
            OpCode::HyperbolicCosineIntegral => {
                math::hyperbolic_cosine_integral(self.evaluate(state, row))
            }
            OpCode::HyperbolicSineIntegral => {
                math::hyperbolic_sine_integral(self.evaluate(state, row))
            }
            OpCode::FresnelCosineIntegral => {
                math::fresnel_cosine_integral(self.evaluate(state, row))
            }
            OpCode::FresnelSineIntegral => math::fresnel_sine_integral(self.evaluate(state, row)),
            OpCode::AiryA => math::airy_a(self.evaluate(state, row)),
            OpCode::AiryB => math::airy_b(self.evaluate(state, row)),
            OpCode::Norm => math::norm(self.evaluate(state, row)),
            OpCode::Erf => math::erf(self.evaluate(state, row)),
            OpCode::Bessel => math::bessel_i0(self.evaluate(state, row)),

            // Boolean and control flow
            OpCode::IfThenElse => {
                let condition = self.evaluate(state, row);
                if condition > 0.0 {
                    let value = self.evaluate(state, row);
                    state.skip_instructions(self.code);
                    value
                } else {
                    state.skip_instructions(self.code);
                    self.evaluate(state, row)
                }
            }
            OpCode::And => {
                let mut result = self.evaluate(state, row);
                for _ in 1..arg_count {
                    if result > 0.0 {
                        result = self.evaluate(state, row);
                    } else {
                        state.skip_instructions(self.code);
                    }
                }
                truth(result > 0.0)
            }
            OpCode::Or => {
                let mut result = self.evaluate(state, row);
                for _ in 1..arg_count {
                    if result <= 0.0 {
                        result = self.evaluate(state, row);
                    } else {
                        state.skip_instructions(self.code);
                    }
                }
                truth(result > 0.0)
            }
            OpCode::Not => {
                if self.evaluate(state, row) > 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
            OpCode::Xor => {
                let positives = (0..arg_count)
                    .filter(|_| self.evaluate(state, row) > 0.0)
                    .count();
                truth(positives % 2 == 1)
            }
            OpCode::GreaterThan => {
                let x = self.evaluate(state, row);
                let y = self.evaluate(state, row);
                truth(x > y)
            }
            OpCode::LessThan => {
                let x = self.evaluate(state, row);
                let y = self.evaluate(state, row);
                truth(x < y)
            }

            // Time series
            OpCode::TimeLag => {
                let Symbol::TimeLag { lag } = instr.node.symbol else {
                    payload_mismatch(instr)
                };
                let lag = i64::from(lag);
                *row += lag;
                let value = self.lagged(state, row);
                *row -= lag;
                value
            }
            OpCode::Integral => {
                let Symbol::Integral { lag } = instr.node.symbol else {
                    payload_mismatch(instr)
                };
                let start = state.pc();
                let step = i64::from(lag.signum());
                let mut sum = 0.0;
                for _ in 0..lag.unsigned_abs() {
                    *row += step;
                    sum += self.lagged(state, row);
                    state.set_pc(start);
                }
                *row -= i64::from(lag);
                sum + self.lagged(state, row)
            }
            OpCode::Derivative => {
                let start = state.pc();
                let f0 = self.lagged(state, row);
                *row -= 1;
                state.set_pc(start);
                let f1 = self.lagged(state, row);
                *row -= 2;
                state.set_pc(start);
                let f3 = self.lagged(state, row);
                *row -= 1;
                state.set_pc(start);
                let f4 = self.lagged(state, row);
                *row += 4;
                (f0 + 2.0 * f1 - 2.0 * f3 - f4) / 8.0
            }

            // Functions
            OpCode::Call => {
                let count = usize::from(arg_count);
                for _ in 0..count {
                    let value = self.evaluate(state, row);
                    state.push_argument(value);
                }
                let Data::Jump(target) = instr.data else {
                    state.discard_arguments(count);
                    return f64::NAN;
                };
                if state.call_depth >= self.max_call_depth {
                    tracing::debug!(
                        depth = state.call_depth,
                        "call depth limit reached, call evaluates to NaN"
                    );
                    state.discard_arguments(count);
                    return f64::NAN;
                }

                state.create_stack_frame(count);
                let saved_pc = state.pc();
                state.set_pc(usize::from(target));
                state.call_depth += 1;
                let value = self.evaluate(state, row);
                state.call_depth -= 1;
                state.set_pc(saved_pc);
                state.remove_stack_frame();
                value
            }
            OpCode::Arg => {
                let Symbol::Argument { index } = instr.node.symbol else {
                    payload_mismatch(instr)
                };
                state.frame_value(usize::from(index))
            }
            OpCode::SubFunction => self.evaluate(state, row),

            // Leaves
            OpCode::Constant => {
                let Symbol::Constant { value } = instr.node.symbol else {
                    payload_mismatch(instr)
                };
                value
            }
            OpCode::Variable => {
                let Symbol::Variable { weight, .. } = instr.node.symbol else {
                    payload_mismatch(instr)
                };
                match instr.data {
                    Data::Numeric(column) => self
                        .read(state, column, *row)
                        .map_or(f64::NAN, |value| value * weight),
                    _ => f64::NAN,
                }
            }
            OpCode::LagVariable => {
                let Symbol::LaggedVariable { weight, lag, .. } = instr.node.symbol else {
                    payload_mismatch(instr)
                };
                match instr.data {
                    Data::Numeric(column) => self
                        .checked(column, *row + i64::from(lag))
                        .map_or(f64::NAN, |value| value * weight),
                    _ => f64::NAN,
                }
            }
            OpCode::FactorVariable => {
                let Symbol::FactorVariable { weights, .. } = &instr.node.symbol else {
                    payload_mismatch(instr)
                };
                let Data::Categorical(column) = instr.data else {
                    return f64::NAN;
                };
                self.read(state, column, *row)
                    .and_then(|category| {
                        weights
                            .iter()
                            .find(|(candidate, _)| candidate == category)
                            .map(|&(_, weight)| weight)
                    })
                    .unwrap_or(f64::NAN)
            }
            OpCode::BinaryFactorVariable => {
                let Symbol::BinaryFactorVariable { value, weight, .. } = &instr.node.symbol else {
                    payload_mismatch(instr)
                };
                let Data::Categorical(column) = instr.data else {
                    return f64::NAN;
                };
                self.read(state, column, *row)
                    .map_or(f64::NAN, |category| {
                        if category == value { *weight } else { 0.0 }
                    })
            }
            OpCode::VariableCondition => {
                let Symbol::VariableCondition {
                    threshold,
                    slope,
                    ignore_slope,
                    ..
                } = instr.node.symbol
                else {
                    payload_mismatch(instr)
                };
                let value = match instr.data {
                    Data::Numeric(column) => self.read(state, column, *row).copied(),
                    _ => None,
                };
                let Some(value) = value else {
                    state.skip_instructions(self.code);
                    state.skip_instructions(self.code);
                    return f64::NAN;
                };

                if ignore_slope {
                    // Strict threshold: only the chosen branch is evaluated
                    if value <= threshold {
                        let left = self.evaluate(state, row);
                        state.skip_instructions(self.code);
                        left
                    } else {
                        state.skip_instructions(self.code);
                        self.evaluate(state, row)
                    }
                } else {
                    let p = 1.0 / (1.0 + (-slope * (value - threshold)).exp());
                    let left = self.evaluate(state, row);
                    let right = self.evaluate(state, row);
                    left * p + right * (1.0 - p)
                }
            }
        }
    }
}
