// Placeholder combinator
// `_` is a deferred unary function: every operator applied to it records one
// more operation and yields a new placeholder; calling it replays the chain
// against a single argument.

use std::rc::Rc;

use crate::ast::{BinaryOp, UnaryOp};
use crate::evaluator::{self, EvaluatorError};
use crate::value::Value;

/// One side of a recorded binary operation: either a literal captured at
/// record time, or another placeholder resolved against the same eventual
/// argument (`_ + _` doubles its input).
#[derive(Debug, Clone)]
pub enum Operand {
    Literal(Value),
    Unbound(Rc<Placeholder>),
}

impl Operand {
    fn capture(value: Value) -> Operand {
        match value {
            Value::Placeholder(p) => Operand::Unbound(p),
            other => Operand::Literal(other),
        }
    }

    fn resolve(&self, arg: &Value) -> Result<Value, EvaluatorError> {
        match self {
            Operand::Literal(v) => Ok(v.clone()),
            Operand::Unbound(p) => p.apply(arg),
        }
    }
}

/// Immutable record of the operations applied to `_`.
///
/// Application is pure: given the same argument and pure underlying
/// operations, `apply` always produces the same result. Failures of the
/// underlying operation (division by zero, type mismatch) propagate
/// unchanged.
#[derive(Debug)]
pub enum Placeholder {
    /// `_` itself; applying returns the argument unchanged.
    Identity,

    /// A binary operation with at least one recorded side. Reflected forms
    /// (`1 + _`) capture the literal on the left.
    Binary {
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },

    /// Unary negation/plus/abs over an inner placeholder.
    Unary {
        op: UnaryOp,
        inner: Rc<Placeholder>,
    },

    /// Attribute access on the eventual value (`_.foo`).
    Attr {
        inner: Rc<Placeholder>,
        name: String,
    },

    /// Index access on the eventual value (`_[0]`, `_[key]`); the index may
    /// itself be a placeholder.
    Index {
        inner: Rc<Placeholder>,
        index: Operand,
    },

    /// Partial application: `partial(f, a, _, c)` resolves placeholder
    /// arguments against the eventual input, then invokes `f`.
    Call { func: Value, args: Vec<Operand> },
}

impl Placeholder {
    /// The identity placeholder, bound as `_` in the environment.
    pub fn identity() -> Value {
        Value::placeholder(Placeholder::Identity)
    }

    /// Record a binary operation. At least one of `lhs`/`rhs` is expected to
    /// be a placeholder value; the other side is captured literally.
    pub fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        Value::placeholder(Placeholder::Binary {
            op,
            lhs: Operand::capture(lhs),
            rhs: Operand::capture(rhs),
        })
    }

    /// Record a unary operation over `inner`.
    pub fn unary(op: UnaryOp, inner: Rc<Placeholder>) -> Value {
        Value::placeholder(Placeholder::Unary { op, inner })
    }

    /// Record attribute access.
    pub fn attr(inner: Rc<Placeholder>, name: impl Into<String>) -> Value {
        Value::placeholder(Placeholder::Attr {
            inner,
            name: name.into(),
        })
    }

    /// Record index access.
    pub fn index(inner: Rc<Placeholder>, index: Value) -> Value {
        Value::placeholder(Placeholder::Index {
            inner,
            index: Operand::capture(index),
        })
    }

    /// Build the `partial(callable, args...)` placeholder.
    pub fn partial(func: Value, args: Vec<Value>) -> Value {
        Value::placeholder(Placeholder::Call {
            func,
            args: args.into_iter().map(Operand::capture).collect(),
        })
    }

    /// Apply the recorded operation chain to `arg`.
    pub fn apply(&self, arg: &Value) -> Result<Value, EvaluatorError> {
        match self {
            Placeholder::Identity => Ok(arg.clone()),

            Placeholder::Binary { op, lhs, rhs } => {
                let left = lhs.resolve(arg)?;
                let right = rhs.resolve(arg)?;
                evaluator::apply_binary(*op, &left, &right)
            }

            Placeholder::Unary { op, inner } => {
                let value = inner.apply(arg)?;
                evaluator::apply_unary(*op, &value)
            }

            Placeholder::Attr { inner, name } => {
                let object = inner.apply(arg)?;
                evaluator::access_attr(&object, name)
            }

            Placeholder::Index { inner, index } => {
                let object = inner.apply(arg)?;
                let index = index.resolve(arg)?;
                evaluator::access_index(&object, &index)
            }

            Placeholder::Call { func, args } => {
                let mut resolved = Vec::with_capacity(args.len());
                for a in args {
                    resolved.push(a.resolve(arg)?);
                }
                evaluator::call_value(func, resolved)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::apply_binary;

    fn ident() -> Value {
        Placeholder::identity()
    }

    fn call(p: &Value, arg: Value) -> Value {
        match p {
            Value::Placeholder(p) => p.apply(&arg).unwrap(),
            _ => panic!("expected a placeholder"),
        }
    }

    #[test]
    fn test_identity_returns_argument() {
        assert_eq!(call(&ident(), Value::Int(2)), Value::Int(2));
    }

    #[test]
    fn test_arithmetic_accumulates() {
        // (_ + 1)(2) == 3
        let p = apply_binary(BinaryOp::Add, &ident(), &Value::Int(1)).unwrap();
        assert_eq!(call(&p, Value::Int(2)), Value::Int(3));

        // (2 * (_ + 1))(2) == 6
        let p = apply_binary(BinaryOp::Mul, &Value::Int(2), &p).unwrap();
        assert_eq!(call(&p, Value::Int(2)), Value::Int(6));
    }

    #[test]
    fn test_reflected_form_is_symmetric() {
        // (1 + _)(2) == 3
        let p = apply_binary(BinaryOp::Add, &Value::Int(1), &ident()).unwrap();
        assert_eq!(call(&p, Value::Int(2)), Value::Int(3));

        // (10 - _)(3) == 7, order preserved
        let p = apply_binary(BinaryOp::Sub, &Value::Int(10), &ident()).unwrap();
        assert_eq!(call(&p, Value::Int(3)), Value::Int(7));
    }

    #[test]
    fn test_self_combination_shares_argument() {
        // (_ + _)(1) == 2
        let p = apply_binary(BinaryOp::Add, &ident(), &ident()).unwrap();
        assert_eq!(call(&p, Value::Int(1)), Value::Int(2));
    }

    #[test]
    fn test_comparison_builds_placeholder_not_bool() {
        let p = apply_binary(BinaryOp::Eq, &ident(), &Value::Int(1)).unwrap();
        assert!(p.is_placeholder());
        assert_eq!(call(&p, Value::Int(1)), Value::Bool(true));
        assert_eq!(call(&p, Value::Int(2)), Value::Bool(false));
    }

    #[test]
    fn test_index_access() {
        // (_[0])([1]) == 1
        let p = match ident() {
            Value::Placeholder(inner) => Placeholder::index(inner, Value::Int(0)),
            _ => unreachable!(),
        };
        let arr = Value::array(vec![Value::Int(1)]);
        assert_eq!(call(&p, arr), Value::Int(1));
    }

    #[test]
    fn test_failure_propagates_unchanged() {
        // (_ / 0)(1) surfaces the division fault at call time
        let p = apply_binary(BinaryOp::Div, &ident(), &Value::Int(0)).unwrap();
        match &p {
            Value::Placeholder(p) => assert!(p.apply(&Value::Int(1)).is_err()),
            _ => panic!("expected a placeholder"),
        }
    }
}
