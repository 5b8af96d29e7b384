//! Symbolic expression trees produced by the genetic-programming operators.
//!
//! A tree is a plain, immutable value while it is being evaluated: only the
//! [`Compiler`](crate::Compiler) reads it, and compiled programs borrow nodes
//! from it to reach node payloads (literal values, variable names, lags).
//!
//! # Layout
//!
//! ```text
//! ProgramRoot
//! ├── Start
//! │   └── <main body>
//! ├── Defun "ADF0"
//! │   └── <function body>
//! └── Defun "ADF1"
//!     └── <function body>
//! ```

use std::collections::VecDeque;
use std::fmt;

/// Tree node symbol: the kind of a node plus its payload.
///
/// The set of variants is closed; user extensions that the engine does not
/// understand are represented by [`Symbol::Custom`] and rejected at compile
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    // Structural
    ProgramRoot,
    Start,
    Defun { name: String },

    // Arithmetic
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Average,
    Power,
    Root,
    Square,
    SquareRoot,
    Cube,
    CubeRoot,
    Absolute,
    AnalyticQuotient,

    // Transcendental
    Sine,
    Cosine,
    Tangent,
    HyperbolicTangent,
    Logarithm,
    Exponential,

    // Special functions
    Gamma,
    Psi,
    Dawson,
    ExponentialIntegralEi,
    CosineIntegral,
    SineIntegral,
    HyperbolicCosineIntegral,
    HyperbolicSineIntegral,
    FresnelCosineIntegral,
    FresnelSineIntegral,
    AiryA,
    AiryB,
    Norm,
    Erf,
    Bessel,

    // Boolean and control flow
    IfThenElse,
    GreaterThan,
    LessThan,
    And,
    Or,
    Not,
    Xor,

    // Leaves
    Constant {
        value: f64,
    },
    Variable {
        name: String,
        weight: f64,
    },
    LaggedVariable {
        name: String,
        weight: f64,
        lag: i32,
    },
    FactorVariable {
        name: String,
        weights: Vec<(String, f64)>,
    },
    BinaryFactorVariable {
        name: String,
        value: String,
        weight: f64,
    },
    VariableCondition {
        name: String,
        threshold: f64,
        slope: f64,
        ignore_slope: bool,
    },

    // Time series
    TimeLag {
        lag: i32,
    },
    Integral {
        lag: i32,
    },
    Derivative,

    // Functions
    Call {
        function: String,
    },
    Argument {
        index: u16,
    },
    SubFunction {
        name: String,
    },

    /// A symbol registered outside this crate; never compiles
    Custom {
        name: String,
    },
}

impl Symbol {
    /// Short name of the symbol kind, without payload
    pub fn name(&self) -> &str {
        match self {
            Symbol::ProgramRoot => "ProgramRoot",
            Symbol::Start => "Start",
            Symbol::Defun { .. } => "Defun",
            Symbol::Addition => "Addition",
            Symbol::Subtraction => "Subtraction",
            Symbol::Multiplication => "Multiplication",
            Symbol::Division => "Division",
            Symbol::Average => "Average",
            Symbol::Power => "Power",
            Symbol::Root => "Root",
            Symbol::Square => "Square",
            Symbol::SquareRoot => "SquareRoot",
            Symbol::Cube => "Cube",
            Symbol::CubeRoot => "CubeRoot",
            Symbol::Absolute => "Absolute",
            Symbol::AnalyticQuotient => "AnalyticQuotient",
            Symbol::Sine => "Sine",
            Symbol::Cosine => "Cosine",
            Symbol::Tangent => "Tangent",
            Symbol::HyperbolicTangent => "HyperbolicTangent",
            Symbol::Logarithm => "Logarithm",
            Symbol::Exponential => "Exponential",
            Symbol::Gamma => "Gamma",
            Symbol::Psi => "Psi",
            Symbol::Dawson => "Dawson",
            Symbol::ExponentialIntegralEi => "ExponentialIntegralEi",
            Symbol::CosineIntegral => "CosineIntegral",
            Symbol::SineIntegral => "SineIntegral",
            Symbol::HyperbolicCosineIntegral => "HyperbolicCosineIntegral",
            Symbol::HyperbolicSineIntegral => "HyperbolicSineIntegral",
            Symbol::FresnelCosineIntegral => "FresnelCosineIntegral",
            Symbol::FresnelSineIntegral => "FresnelSineIntegral",
            Symbol::AiryA => "AiryA",
            Symbol::AiryB => "AiryB",
            Symbol::Norm => "Norm",
            Symbol::Erf => "Erf",
            Symbol::Bessel => "Bessel",
            Symbol::IfThenElse => "IfThenElse",
            Symbol::GreaterThan => "GreaterThan",
            Symbol::LessThan => "LessThan",
            Symbol::And => "And",
            Symbol::Or => "Or",
            Symbol::Not => "Not",
            Symbol::Xor => "Xor",
            Symbol::Constant { .. } => "Constant",
            Symbol::Variable { .. } => "Variable",
            Symbol::LaggedVariable { .. } => "LaggedVariable",
            Symbol::FactorVariable { .. } => "FactorVariable",
            Symbol::BinaryFactorVariable { .. } => "BinaryFactorVariable",
            Symbol::VariableCondition { .. } => "VariableCondition",
            Symbol::TimeLag { .. } => "TimeLag",
            Symbol::Integral { .. } => "Integral",
            Symbol::Derivative => "Derivative",
            Symbol::Call { .. } => "Call",
            Symbol::Argument { .. } => "Argument",
            Symbol::SubFunction { .. } => "SubFunction",
            Symbol::Custom { name } => name.as_str(),
        }
    }

    /// Name of the dataset variable this symbol reads, if any
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Symbol::Variable { name, .. }
            | Symbol::LaggedVariable { name, .. }
            | Symbol::FactorVariable { name, .. }
            | Symbol::BinaryFactorVariable { name, .. }
            | Symbol::VariableCondition { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A node of a symbolic expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub symbol: Symbol,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(symbol: Symbol, children: Vec<Node>) -> Self {
        Node { symbol, children }
    }

    pub fn leaf(symbol: Symbol) -> Self {
        Node {
            symbol,
            children: Vec::new(),
        }
    }

    pub fn unary(symbol: Symbol, child: Node) -> Self {
        Node {
            symbol,
            children: vec![child],
        }
    }

    pub fn binary(symbol: Symbol, left: Node, right: Node) -> Self {
        Node {
            symbol,
            children: vec![left, right],
        }
    }

    pub fn constant(value: f64) -> Self {
        Node::leaf(Symbol::Constant { value })
    }

    /// Variable leaf with the given weight
    pub fn variable(name: impl Into<String>, weight: f64) -> Self {
        Node::leaf(Symbol::Variable {
            name: name.into(),
            weight,
        })
    }

    pub fn lagged_variable(name: impl Into<String>, weight: f64, lag: i32) -> Self {
        Node::leaf(Symbol::LaggedVariable {
            name: name.into(),
            weight,
            lag,
        })
    }

    pub fn call(function: impl Into<String>, args: Vec<Node>) -> Self {
        Node::new(
            Symbol::Call {
                function: function.into(),
            },
            args,
        )
    }

    pub fn argument(index: u16) -> Self {
        Node::leaf(Symbol::Argument { index })
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        self.iter_prefix().count()
    }

    /// Depth of this subtree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Iterate nodes in pre-order (parent before children, children left to right)
    pub fn iter_prefix(&self) -> PrefixIter<'_> {
        PrefixIter { stack: vec![self] }
    }

    /// Iterate nodes breadth-first (level by level, left to right)
    pub fn iter_breadth(&self) -> BreadthIter<'_> {
        BreadthIter {
            queue: VecDeque::from([self]),
        }
    }
}

/// Pre-order node iterator
pub struct PrefixIter<'t> {
    stack: Vec<&'t Node>,
}

impl<'t> Iterator for PrefixIter<'t> {
    type Item = &'t Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Breadth-first node iterator
pub struct BreadthIter<'t> {
    queue: VecDeque<&'t Node>,
}

impl<'t> Iterator for BreadthIter<'t> {
    type Item = &'t Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children.iter());
        Some(node)
    }
}

/// A complete GP individual: main body plus automatically defined functions.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicExpressionTree {
    pub root: Node,
}

impl SymbolicExpressionTree {
    /// Wrap an already assembled `ProgramRoot` node
    pub fn new(root: Node) -> Self {
        SymbolicExpressionTree { root }
    }

    /// Build a tree whose main body is `body` and which defines no functions
    pub fn from_body(body: Node) -> Self {
        Self::with_functions(body, Vec::new())
    }

    /// Build a tree from a main body and named function bodies
    pub fn with_functions(body: Node, functions: Vec<(String, Node)>) -> Self {
        let mut branches = Vec::with_capacity(functions.len() + 1);
        branches.push(Node::unary(Symbol::Start, body));
        for (name, function_body) in functions {
            branches.push(Node::unary(Symbol::Defun { name }, function_body));
        }
        SymbolicExpressionTree {
            root: Node::new(Symbol::ProgramRoot, branches),
        }
    }

    /// The evaluable main body (`ProgramRoot -> Start -> body`)
    pub fn body(&self) -> Option<&Node> {
        self.root.children.first()?.children.first()
    }

    /// Function branches as `(name, body)` pairs, in declaration order
    pub fn functions(&self) -> impl Iterator<Item = (&str, Option<&Node>)> {
        self.root
            .children
            .iter()
            .skip(1)
            .filter_map(|branch| match &branch.symbol {
                Symbol::Defun { name } => Some((name.as_str(), branch.children.first())),
                _ => None,
            })
    }

    /// Total number of nodes, structural nodes included
    pub fn len(&self) -> usize {
        self.root.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.body().is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Symbol::Constant { value } => write!(f, "{value}")?,
            Symbol::Variable { name, weight } => write!(f, "{weight}*{name}")?,
            Symbol::LaggedVariable { name, weight, lag } => {
                write!(f, "{weight}*{name}[{lag}]")?;
            }
            Symbol::Call { function } => write!(f, "{function}")?,
            Symbol::Argument { index } => write!(f, "ARG{index}")?,
            Symbol::TimeLag { lag } => write!(f, "lag[{lag}]")?,
            Symbol::Integral { lag } => write!(f, "integral[{lag}]")?,
            other => write!(f, "{}", other.name())?,
        }
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{child}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        // Add(2, Mul(x, 3))
        Node::binary(
            Symbol::Addition,
            Node::constant(2.0),
            Node::binary(
                Symbol::Multiplication,
                Node::variable("x", 1.0),
                Node::constant(3.0),
            ),
        )
    }

    #[test]
    fn test_prefix_order() {
        let node = sample();
        let names: Vec<&str> = node.iter_prefix().map(|n| n.symbol.name()).collect();
        let expected = "Addition Constant Multiplication Variable Constant";
        assert_eq!(names.join(" "), expected);
        assert_eq!(node.node_count(), 5);
        assert_eq!(node.depth(), 3);
    }

    #[test]
    fn test_breadth_order() {
        let node = sample();
        let names: Vec<&str> = node.iter_breadth().map(|n| n.symbol.name()).collect();
        let expected = "Addition Constant Multiplication Variable Constant";
        assert_eq!(names.join(" "), expected);
    }

    #[test]
    fn test_tree_branches() {
        let tree = SymbolicExpressionTree::with_functions(
            Node::call("ADF0", vec![Node::constant(1.0)]),
            vec![("ADF0".to_owned(), Node::argument(0))],
        );
        assert_eq!(tree.body().map(|b| b.symbol.name()), Some("Call"));
        let functions: Vec<&str> = tree.functions().map(|(name, _)| name).collect();
        assert_eq!(functions, ["ADF0"]);
        assert_eq!(tree.len(), 6);
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "Addition(2, Multiplication(1*x, 3))");
    }
}
