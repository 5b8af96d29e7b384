//! Mutable state of the scalar stack machine.
//!
//! # Argument Stack Layout
//!
//! ```text
//! bottom ─────────────────────────────────────────── top
//!   [ .. caller frame .. ][ argN-1 .. arg1  arg0  N ]
//!                                            ▲    ▲
//!                                 stack[top-2]    frame length
//! ```
//!
//! Argument `i` of the innermost frame lives at `stack[top - 2 - i]`.
//! Arguments of a call under construction are collected in a separate
//! pending buffer, so `Arg` reads inside argument expressions still see the
//! enclosing frame.

use super::binding::BoundInstruction;

/// Program counter, argument stack and bookkeeping for one evaluation.
///
/// A state is reused across rows; [`reset`](Self::reset) clears everything
/// but the allocations.
#[derive(Debug, Default)]
pub struct InterpreterState {
    pc: usize,
    stack: Vec<f64>,
    /// Evaluated arguments of calls whose frame is not created yet
    pending: Vec<f64>,
    /// Set while evaluating under a lag, integral or derivative
    pub(crate) in_lagged_context: bool,
    pub(crate) call_depth: usize,
    /// Instructions executed since the last reset
    executed: usize,
}

impl InterpreterState {
    pub fn new(stack_capacity: usize) -> Self {
        InterpreterState {
            stack: Vec::with_capacity(stack_capacity),
            pending: Vec::with_capacity(stack_capacity),
            ..Self::default()
        }
    }

    /// Rewind to the first instruction with empty stacks
    pub fn reset(&mut self) {
        self.pc = 0;
        self.stack.clear();
        self.pending.clear();
        self.in_lagged_context = false;
        self.call_depth = 0;
        self.executed = 0;
    }

    #[inline]
    pub fn pc(&self) -> usize {
        self.pc
    }

    #[inline]
    pub(crate) fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    /// Fetch the instruction at the program counter and advance past it
    #[inline]
    pub(crate) fn next_instruction<'p, 'a>(
        &mut self,
        code: &'p [BoundInstruction<'a>],
    ) -> &'p BoundInstruction<'a> {
        let instr = &code[self.pc];
        self.pc += 1;
        self.executed += 1;
        instr
    }

    /// Skip the subtree starting at the program counter without evaluating it
    pub(crate) fn skip_instructions(&mut self, code: &[BoundInstruction<'_>]) {
        let mut pending = 1_usize;
        while pending > 0 {
            pending = pending + usize::from(code[self.pc].arg_count) - 1;
            self.pc += 1;
        }
    }

    /// Number of instructions executed since the last reset
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Values currently on the argument stack, frame markers included
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub(crate) fn push_argument(&mut self, value: f64) {
        self.pending.push(value);
    }

    /// Drop `count` pending arguments without creating a frame
    pub(crate) fn discard_arguments(&mut self, count: usize) {
        let len = self.pending.len().saturating_sub(count);
        self.pending.truncate(len);
    }

    /// Move the last `count` pending arguments into a new frame
    pub(crate) fn create_stack_frame(&mut self, count: usize) {
        let start = self.pending.len() - count;
        self.stack.extend(self.pending.drain(start..).rev());
        #[allow(
            clippy::cast_precision_loss,
            reason = "Argument counts are limited to u16 and exactly representable"
        )]
        let marker = count as f64;
        self.stack.push(marker);
    }

    /// Pop the innermost frame
    pub(crate) fn remove_stack_frame(&mut self) {
        let Some(marker) = self.stack.pop() else {
            return;
        };
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Frame markers are written by create_stack_frame from a u16 count"
        )]
        let count = marker as usize;
        let len = self.stack.len().saturating_sub(count);
        self.stack.truncate(len);
    }

    /// Argument `index` of the innermost frame, NaN if there is no such
    /// argument
    pub(crate) fn frame_value(&self, index: usize) -> f64 {
        let Some(&marker) = self.stack.last() else {
            return f64::NAN;
        };
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Frame markers are written by create_stack_frame from a u16 count"
        )]
        let count = marker as usize;
        if index >= count {
            return f64::NAN;
        }
        self.stack[self.stack.len() - 2 - index]
    }
}
