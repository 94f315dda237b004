//! Symbolic expression type produced by the resolver.
//!
//! Expressions are trees built bottom-up: every resolved operand is composed
//! into its parent node, and text only appears once, when the finished tree is
//! printed through [`fmt::Display`].

use crate::utils::opcodes::Opcode;
use primitive_types::U256;
use std::fmt;

/// How much trust a rendered constraint deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Every join was resolved with a supported rule.
    Confident,
    /// The tree contains an unsupported join or a value the search gave up on.
    Degraded,
}

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// Value from the constant-propagation pass.
    Constant(U256),
    /// Value loaded from a storage slot, by descriptor.
    StorageRef(String),
    /// Value loaded from memory; the tag names the address.
    MemoryRef(String),
    /// Value the resolver treats as a free input (calldata, formals, …).
    OpaqueInput(String),
    UnaryOp(Opcode, Box<Expression>),
    BinaryOp(Opcode, Box<Expression>, Box<Expression>),
    /// An operation left uninterpreted, e.g. `(CALLER)`.
    OpaqueCall(String, Vec<Expression>),
    /// A two-way join: `on_true` when `guard` holds, `on_false` otherwise.
    GuardedMerge {
        guard: Option<Box<Expression>>,
        on_true: Box<Expression>,
        on_false: Box<Expression>,
    },
    /// A join shape the phi rules do not cover, with a best-effort value.
    Unsupported {
        reason: String,
        best_effort: Box<Expression>,
    },
    /// A variable the search gave up on (cycle or depth limit).
    Unresolved(String),
}

impl Expression {
    pub fn constant(v: U256) -> Self {
        Expression::Constant(v)
    }

    pub fn storage(slot: &str) -> Self {
        Expression::StorageRef(slot.to_string())
    }

    pub fn memory(tag: &str) -> Self {
        Expression::MemoryRef(tag.to_string())
    }

    pub fn input(tag: &str) -> Self {
        Expression::OpaqueInput(tag.to_string())
    }

    pub fn unary(op: Opcode, e: Expression) -> Self {
        Expression::UnaryOp(op, Box::new(e))
    }

    pub fn binary(op: Opcode, l: Expression, r: Expression) -> Self {
        Expression::BinaryOp(op, Box::new(l), Box::new(r))
    }

    pub fn call(name: &str, args: Vec<Expression>) -> Self {
        Expression::OpaqueCall(name.to_string(), args)
    }

    pub fn merge(guard: Option<Expression>, on_true: Expression, on_false: Expression) -> Self {
        Expression::GuardedMerge {
            guard: guard.map(Box::new),
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
        }
    }

    pub fn unsupported(reason: impl Into<String>, best_effort: Expression) -> Self {
        Expression::Unsupported {
            reason: reason.into(),
            best_effort: Box::new(best_effort),
        }
    }

    /// Left-folded `OR` of alternatives; a single alternative is returned as
    /// is. `None` for an empty list.
    pub fn any(alternatives: Vec<Expression>) -> Option<Expression> {
        let mut iter = alternatives.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, |acc, e| Expression::binary(Opcode::Or, acc, e)))
    }

    /// Try to extract a concrete value.
    pub fn as_constant(&self) -> Option<U256> {
        match self {
            Expression::Constant(v) => Some(*v),
            _ => None,
        }
    }

    /// `true` for the bare opaque token of `var`, i.e. nothing was learned.
    pub fn is_opaque_token(&self, var: &str) -> bool {
        matches!(self, Expression::OpaqueInput(t) | Expression::Unresolved(t) if t == var)
    }

    pub fn confidence(&self) -> Confidence {
        if self.any_node(&|e| {
            matches!(e, Expression::Unsupported { .. } | Expression::Unresolved(_))
        }) {
            Confidence::Degraded
        } else {
            Confidence::Confident
        }
    }

    /// Check whether `pred` holds for this node or any node below it.
    pub fn any_node(&self, pred: &dyn Fn(&Expression) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Expression::UnaryOp(_, e) => e.any_node(pred),
            Expression::BinaryOp(_, l, r) => l.any_node(pred) || r.any_node(pred),
            Expression::OpaqueCall(_, args) => args.iter().any(|a| a.any_node(pred)),
            Expression::GuardedMerge {
                guard,
                on_true,
                on_false,
            } => {
                guard.as_ref().is_some_and(|g| g.any_node(pred))
                    || on_true.any_node(pred)
                    || on_false.any_node(pred)
            }
            Expression::Unsupported { best_effort, .. } => best_effort.any_node(pred),
            _ => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(v) => write!(f, "const_0x{v:x}"),
            Expression::StorageRef(slot) => write!(f, "storage_{slot}"),
            Expression::MemoryRef(tag) => write!(f, "MLOAD_{tag}"),
            Expression::OpaqueInput(tag) => write!(f, "{tag}"),
            Expression::UnaryOp(op, e) => write!(f, "({op} {e})"),
            Expression::BinaryOp(op, l, r) => write!(f, "({l} {op} {r})"),
            Expression::OpaqueCall(name, args) => {
                write!(f, "({name}")?;
                for a in args {
                    write!(f, " {a}")?;
                }
                write!(f, ")")
            }
            Expression::GuardedMerge {
                guard,
                on_true,
                on_false,
            } => match guard {
                Some(c) => write!(f, "{{({on_true}) and [{c}] phi_OR [1 - {c}] and ({on_false})}}"),
                None => write!(f, "{{({on_true}) phi_OR ({on_false})}}"),
            },
            Expression::Unsupported {
                reason,
                best_effort,
            } => write!(f, "<unsupported: {reason}>{{{best_effort}}}"),
            Expression::Unresolved(var) => write!(f, "unresolved_{var}"),
        }
    }
}
