//! Compiled instructions and the linear programs built from them.
//!
//! # Program Layout
//!
//! ```text
//! index:   0     1      2     3   |  4 (ADF0)   5
//!        [Add]  [Call] [x]  [2.0] | [Mul]      [ARG0] ...
//!          │      │               |   ▲
//!          │      └── target ─────────┘
//!          └── arg_count = 2, children start at index 1
//! ```
//!
//! The main body occupies the prefix of the program in pre-order. Each
//! function body follows in declaration order and is reached only through
//! `Call` targets. A node's children always start right after it, and the
//! subtree of instruction `i` is the contiguous range
//! `i..i + program.subtree_len(i)`.

use super::OpCode;
use crate::tree::Node;
use std::fmt;

/// One compiled node.
///
/// Instructions borrow their node so that payloads (constant values,
/// variable names, lags, weights) are read from the tree rather than copied.
#[derive(Clone, Copy)]
pub struct Instruction<'t> {
    /// Source node; the compiled program cannot outlive the tree
    pub node: &'t Node,
    pub opcode: OpCode,
    /// Number of children, limited to 16 bits
    pub arg_count: u16,
    /// Entry point of the called function, set on `Call` instructions only
    pub target: Option<u16>,
}

// Programs are scanned linearly in hot loops; keep instructions compact.
const _: () = assert!(std::mem::size_of::<Instruction<'static>>() <= 16);

impl<'t> Instruction<'t> {
    /// Create an instruction for `node` with no call target
    pub fn new(node: &'t Node, opcode: OpCode, arg_count: u16) -> Self {
        Instruction {
            node,
            opcode,
            arg_count,
            target: None,
        }
    }
}

impl fmt::Debug for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("opcode", &self.opcode)
            .field("arg_count", &self.arg_count)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// A compiled tree: main body followed by the function bodies.
///
/// Produced by [`Compiler::compile`](super::Compiler::compile). The program
/// is independent of any dataset; binding to a dataset happens per
/// evaluation.
#[derive(Debug, Clone)]
pub struct Program<'t> {
    instructions: Box<[Instruction<'t>]>,
    /// `(function name, entry point)` in declaration order
    entry_points: Vec<(&'t str, u16)>,
    /// Length of the main body; function bodies start here
    body_len: usize,
    /// Upper bound of argument values pushed by calls
    call_stack_size: usize,
}

impl<'t> Program<'t> {
    pub(crate) fn new(
        instructions: Vec<Instruction<'t>>,
        entry_points: Vec<(&'t str, u16)>,
        body_len: usize,
        call_stack_size: usize,
    ) -> Self {
        Program {
            instructions: instructions.into_boxed_slice(),
            entry_points,
            body_len,
            call_stack_size,
        }
    }

    #[inline]
    pub fn instructions(&self) -> &[Instruction<'t>] {
        &self.instructions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of instructions belonging to the main body
    pub fn body_len(&self) -> usize {
        self.body_len
    }

    /// Entry point of the function `name`, if the tree defines it
    pub fn entry_point(&self, name: &str) -> Option<u16> {
        self.entry_points
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|&(_, address)| address)
    }

    /// All function entry points in declaration order
    pub fn entry_points(&self) -> &[(&'t str, u16)] {
        &self.entry_points
    }

    /// Capacity to reserve for the argument stack.
    ///
    /// Sum over all call sites of `arg_count + 1` (arguments plus the frame
    /// length marker). Recursive programs may need more; the stack grows.
    pub fn call_stack_size(&self) -> usize {
        self.call_stack_size
    }

    /// Length of the contiguous subtree rooted at instruction `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn subtree_len(&self, index: usize) -> usize {
        subtree_len(&self.instructions, index, |instr| instr.arg_count)
    }
}

/// Walk forward from `index` until every pending child has been consumed
pub(crate) fn subtree_len<T>(code: &[T], index: usize, arg_count: impl Fn(&T) -> u16) -> usize {
    let mut pending = usize::from(arg_count(&code[index]));
    let mut end = index + 1;
    while pending > 0 {
        pending = pending + usize::from(arg_count(&code[end])) - 1;
        end += 1;
    }
    end - index
}

impl fmt::Display for Program<'_> {
    /// One line per instruction, e.g. `   3  Variable       1*x`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instr) in self.instructions.iter().enumerate() {
            if let Some(&(name, _)) = self
                .entry_points
                .iter()
                .find(|&&(_, address)| usize::from(address) == index)
            {
                writeln!(f, "{name}:")?;
            }
            write!(f, "{index:>4}  {:<22}", instr.opcode.name())?;
            match instr.opcode {
                OpCode::Call => write!(
                    f,
                    "{} -> {}",
                    instr.node,
                    instr.target.map_or_else(|| "?".to_owned(), |t| t.to_string())
                )?,
                _ if instr.arg_count == 0 => write!(f, "{}", instr.node)?,
                _ => write!(f, "({} args)", instr.arg_count)?,
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
