// jex - command-line JSON processor
// Copyright (c) 2026 jex contributors
// Licensed under the MIT License

//! # jex
//!
//! A command-line JSON processor: evaluate one Python-flavored expression
//! against JSON input and print JSON output.
//!
//! Every collection produced during decoding and evaluation is an extended
//! one: sequences and mappings preserve order, expose `map`/`filter` (as
//! methods and as the `|`/`&` operators) and never fail on missing
//! index/key reads — those resolve to an absent marker that encodes as
//! JSON `null`. The `_` placeholder builds deferred unary functions out of
//! ordinary operator syntax: `d | _ + 1` increments every element.
//!
//! ## Architecture
//!
//! - `parser` - expression parser (lexer + Pratt parser producing the AST)
//! - `ast` - abstract syntax tree definitions
//! - `evaluator` - tree evaluator, environment and operator semantics
//! - `placeholder` - the `_` combinator (deferred, composable unary functions)
//! - `functions` - builtin function implementations
//! - `value` - runtime value type (ordered collections, absent marker)
//!
//! ## Example
//!
//! ```
//! use jex::{compile, decode, Environment};
//!
//! fn main() -> Result<(), jex::Error> {
//!     let input = decode("<example>", r#"{"scores": [1, 2, 3]}"#)?;
//!     let expr = compile("d.scores.map(_ * 10)")?;
//!
//!     let mut env = Environment::with_inputs(vec![input]);
//!     let result = expr.evaluate(&mut env)?;
//!     assert_eq!(result.to_string(), "[10, 20, 30]");
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod placeholder;
pub mod value;

pub use evaluator::{Environment, Evaluator, EvaluatorError};
pub use parser::ParserError;
pub use placeholder::Placeholder;
pub use value::Value;

/// Top-level failure kinds. All are terminal for the current invocation;
/// none are retried. Missing index/key reads are *not* failures — they
/// resolve to the absent marker.
#[derive(Error, Debug)]
pub enum Error {
    /// Unparsable expression text, reported before any evaluation.
    #[error("syntax error: {0}")]
    Syntax(#[from] ParserError),

    /// Unreadable or invalid-JSON input, reported per source.
    #[error("cannot read {name}: {reason}")]
    Data { name: String, reason: String },

    /// A runtime fault during evaluation, outside the absent-marker policy.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluatorError),
}

/// A compiled expression, ready to evaluate against an environment.
///
/// Compile once, evaluate as often as needed; each evaluation takes its own
/// independently assembled [`Environment`].
pub struct Expression {
    ast: ast::Expr,
}

impl Expression {
    /// Evaluate this expression against `env`.
    pub fn evaluate(&self, env: &mut Environment) -> Result<Value, Error> {
        Ok(Evaluator::new(env).evaluate(&self.ast)?)
    }
}

/// Compile an expression into an executable form.
///
/// Accepts exactly one expression — no statements. Malformed text fails
/// here with [`Error::Syntax`], before any evaluation.
pub fn compile(expression: &str) -> Result<Expression, Error> {
    let ast = parser::parse(expression)?;
    Ok(Expression { ast })
}

/// Decode one JSON source into extended collection values.
///
/// Arrays decode as Sequences and objects as insertion-ordered Mappings.
/// Failures carry `name` so multi-input runs report the offending source.
pub fn decode(name: &str, text: &str) -> Result<Value, Error> {
    serde_json::from_str(text).map_err(|e| Error::Data {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Compile and evaluate in one step against a single input.
pub fn evaluate(expression: &str, input: Value) -> Result<Value, Error> {
    let expr = compile(expression)?;
    let mut env = Environment::with_inputs(vec![input]);
    expr.evaluate(&mut env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_then_evaluate() {
        let expr = compile("d + 1").unwrap();

        let mut env = Environment::with_inputs(vec![Value::Int(3)]);
        assert_eq!(expr.evaluate(&mut env).unwrap(), Value::Int(4));

        // same compiled expression, fresh environment
        let mut env = Environment::with_inputs(vec![Value::Int(10)]);
        assert_eq!(expr.evaluate(&mut env).unwrap(), Value::Int(11));
    }

    #[test]
    fn test_syntax_failure_before_evaluation() {
        match compile("d +") {
            Err(Error::Syntax(_)) => {}
            other => panic!("expected a syntax error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_data_failure_names_the_source() {
        match decode("bad.json", "{nope") {
            Err(Error::Data { name, .. }) => assert_eq!(name, "bad.json"),
            other => panic!("expected a data error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_evaluation_failure() {
        match evaluate("1 / 0", Value::Null) {
            Err(Error::Evaluation(_)) => {}
            other => panic!("expected an evaluation error, got {:?}", other.err()),
        }
    }
}
