// Expression evaluator
// Walks the AST against an environment. Literals, tuples and comprehensions
// construct extended Sequence/Mapping values directly, so every collection
// produced during evaluation carries map/filter and non-raising access.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::ast::{BinaryOp, CompClause, Expr, UnaryOp};
use crate::functions::{self, Builtin, FunctionError};
use crate::placeholder::Placeholder;
use crate::value::{MethodKind, Value};

/// Evaluator errors
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("name '{0}' is not defined")]
    NameError(String),

    #[error("{0}")]
    TypeError(String),

    #[error("{0}")]
    EvaluationError(String),
}

impl From<FunctionError> for EvaluatorError {
    fn from(e: FunctionError) -> Self {
        match e {
            FunctionError::TypeError(msg) => EvaluatorError::TypeError(msg),
            other => EvaluatorError::EvaluationError(other.to_string()),
        }
    }
}

/// Name → value bindings for one evaluation session.
///
/// `new` installs the default namespace: every builtin under its name and
/// the placeholder identity under `_`. `with_inputs` adds the decoded
/// inputs: the primary one under `d` and the full ordered list under
/// `inputs`. Caller overrides go through `bind`; rebinding `list` or `dict`
/// away from the extended constructors loses map/filter on explicit
/// constructor calls, so the CLI never does that.
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();
        for builtin in Builtin::ALL {
            bindings.insert(builtin.name().to_string(), Value::Builtin(builtin));
        }
        bindings.insert("_".to_string(), Placeholder::identity());
        Environment { bindings }
    }

    /// Default namespace plus input bindings: `d` is the first input (or
    /// `None` when there is none), `inputs` the Sequence of all of them.
    pub fn with_inputs(inputs: Vec<Value>) -> Self {
        let mut env = Environment::new();
        let primary = inputs.first().cloned().unwrap_or(Value::Null);
        env.bind("d", primary);
        env.bind("inputs", Value::array(inputs));
        env
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    fn unbind(&mut self, name: &str) {
        self.bindings.remove(name);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluator for parsed expressions.
pub struct Evaluator<'e> {
    env: &'e mut Environment,
    recursion_depth: usize,
    max_recursion_depth: usize,
}

impl<'e> Evaluator<'e> {
    pub fn new(env: &'e mut Environment) -> Self {
        Evaluator {
            env,
            recursion_depth: 0,
            // Turns runaway nesting into an error instead of a stack overflow
            max_recursion_depth: 256,
        }
    }

    /// Evaluate an AST node.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, EvaluatorError> {
        self.recursion_depth += 1;
        if self.recursion_depth > self.max_recursion_depth {
            self.recursion_depth -= 1;
            return Err(EvaluatorError::EvaluationError(format!(
                "maximum expression depth ({}) exceeded",
                self.max_recursion_depth
            )));
        }

        let result = self.evaluate_impl(expr);

        self.recursion_depth -= 1;
        result
    }

    fn evaluate_impl(&mut self, expr: &Expr) -> Result<Value, EvaluatorError> {
        match expr {
            Expr::None => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Str(s) => Ok(Value::string(s.as_str())),

            Expr::Name(name) => self
                .env
                .lookup(name)
                .cloned()
                .ok_or_else(|| EvaluatorError::NameError(name.clone())),

            // Sequence and tuple literals construct extended Sequences
            Expr::Seq(elements) => {
                let mut out = Vec::with_capacity(elements.len());
                for e in elements {
                    out.push(self.evaluate(e)?);
                }
                Ok(Value::array(out))
            }

            // Mapping literals construct extended Mappings; keys coerce to
            // their canonical string form, later duplicates win
            Expr::Map(pairs) => {
                let mut out = IndexMap::with_capacity(pairs.len());
                for (k, v) in pairs {
                    let key = self.evaluate(k)?;
                    let key = Value::coerce_key(&key)
                        .ok_or_else(|| {
                            EvaluatorError::TypeError(format!(
                                "unhashable type: '{}'",
                                key.type_name()
                            ))
                        })?
                        .into_owned();
                    out.insert(key, self.evaluate(v)?);
                }
                Ok(Value::object(out))
            }

            Expr::SeqComp { element, clauses } => {
                let mut out = Vec::new();
                self.comp_loop(clauses, 0, &mut |ev| {
                    out.push(ev.evaluate(element)?);
                    Ok(())
                })?;
                Ok(Value::array(out))
            }

            Expr::MapComp {
                key,
                value,
                clauses,
            } => {
                let mut out = IndexMap::new();
                self.comp_loop(clauses, 0, &mut |ev| {
                    let k = ev.evaluate(key)?;
                    let k = Value::coerce_key(&k)
                        .ok_or_else(|| {
                            EvaluatorError::TypeError(format!(
                                "unhashable type: '{}'",
                                k.type_name()
                            ))
                        })?
                        .into_owned();
                    out.insert(k, ev.evaluate(value)?);
                    Ok(())
                })?;
                Ok(Value::object(out))
            }

            Expr::Binary { op, lhs, rhs } => match op {
                // Short-circuit, returning the deciding operand
                BinaryOp::And => {
                    let left = self.evaluate(lhs)?;
                    if left.is_truthy() {
                        self.evaluate(rhs)
                    } else {
                        Ok(left)
                    }
                }
                BinaryOp::Or => {
                    let left = self.evaluate(lhs)?;
                    if left.is_truthy() {
                        Ok(left)
                    } else {
                        self.evaluate(rhs)
                    }
                }
                _ => {
                    let left = self.evaluate(lhs)?;
                    let right = self.evaluate(rhs)?;
                    apply_binary(*op, &left, &right)
                }
            },

            Expr::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                apply_unary(*op, &value)
            }

            Expr::Attribute { object, name } => {
                let object = self.evaluate(object)?;
                access_attr(&object, name)
            }

            Expr::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                access_index(&object, &index)
            }

            Expr::Call { func, args } => {
                let func = self.evaluate(func)?;
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.evaluate(a)?);
                }
                call_value(&func, values)
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
        }
    }

    /// Drive one comprehension clause, recursing into the next for every
    /// item that passes the conditions; the innermost level runs `body`.
    /// Loop variables shadow outer bindings and are restored afterwards.
    fn comp_loop(
        &mut self,
        clauses: &[CompClause],
        depth: usize,
        body: &mut dyn FnMut(&mut Self) -> Result<(), EvaluatorError>,
    ) -> Result<(), EvaluatorError> {
        if depth == clauses.len() {
            return body(self);
        }
        let clause = &clauses[depth];

        let iterable = self.evaluate(&clause.iter)?;
        let items = functions::iterate(&iterable)?;

        let saved: Vec<(String, Option<Value>)> = clause
            .targets
            .iter()
            .map(|t| (t.clone(), self.env.lookup(t).cloned()))
            .collect();

        let mut run = || -> Result<(), EvaluatorError> {
            'items: for item in items {
                self.bind_targets(&clause.targets, item)?;
                for cond in &clause.conds {
                    if !self.evaluate(cond)?.is_truthy() {
                        continue 'items;
                    }
                }
                self.comp_loop(clauses, depth + 1, body)?;
            }
            Ok(())
        };
        let result = run();

        for (name, old) in saved {
            match old {
                Some(value) => self.env.bind(name, value),
                None => self.env.unbind(&name),
            }
        }
        result
    }

    fn bind_targets(&mut self, targets: &[String], item: Value) -> Result<(), EvaluatorError> {
        if targets.len() == 1 {
            self.env.bind(targets[0].clone(), item);
            return Ok(());
        }
        let parts = item.as_array().ok_or_else(|| {
            EvaluatorError::TypeError(format!(
                "cannot unpack non-sequence '{}'",
                item.type_name()
            ))
        })?;
        if parts.len() != targets.len() {
            return Err(EvaluatorError::EvaluationError(format!(
                "expected {} values to unpack, got {}",
                targets.len(),
                parts.len()
            )));
        }
        for (target, part) in targets.iter().zip(parts.iter()) {
            self.env.bind(target.clone(), part.clone());
        }
        Ok(())
    }
}

// ── Operator application ─────────────────────────────────────────────────────
//
// Free functions shared by the evaluator and the placeholder combinator:
// a placeholder replaying `_ + 1` routes through the same `apply_binary`
// the evaluator uses for `d + 1`.

/// Operators a placeholder operand turns into a recorded operation.
/// `and`/`or` decide on truthiness (a placeholder is truthy) and membership
/// tests treat a placeholder as an ordinary, never-matching value.
fn is_liftable(op: BinaryOp) -> bool {
    !matches!(
        op,
        BinaryOp::And | BinaryOp::Or | BinaryOp::In | BinaryOp::NotIn
    )
}

/// Apply a binary operator to two evaluated values.
pub(crate) fn apply_binary(
    op: BinaryOp,
    left: &Value,
    right: &Value,
) -> Result<Value, EvaluatorError> {
    // `collection | f` maps, `collection & p` filters; this takes precedence
    // over placeholder accumulation so `d | _+1` maps with the placeholder
    // as the operator argument
    match op {
        BinaryOp::BitOr if (left.is_array() || left.is_object()) && right.is_callable() => {
            return map_collection(left, right);
        }
        BinaryOp::BitAnd if (left.is_array() || left.is_object()) && right.is_callable() => {
            return filter_collection(left, right);
        }
        _ => {}
    }

    if is_liftable(op) && (left.is_placeholder() || right.is_placeholder()) {
        return Ok(Placeholder::binary(op, left.clone(), right.clone()));
    }

    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arith(op, left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arith(op, left, right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => divide(left, right),
        BinaryOp::FloorDiv => floor_divide(left, right),
        BinaryOp::Mod => modulo(left, right),

        BinaryOp::BitAnd => bitwise(op, left, right, |a, b| a & b),
        BinaryOp::BitOr => bitwise(op, left, right, |a, b| a | b),
        BinaryOp::BitXor => bitwise(op, left, right, |a, b| a ^ b),

        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => ordered(op, left, right, |o| o == std::cmp::Ordering::Less),
        BinaryOp::Le => ordered(op, left, right, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => ordered(op, left, right, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::Ge => ordered(op, left, right, |o| o != std::cmp::Ordering::Less),

        BinaryOp::In => contains(right, left).map(Value::Bool),
        BinaryOp::NotIn => contains(right, left).map(|b| Value::Bool(!b)),

        // Normally short-circuited by the evaluator; a placeholder never
        // records these, but keep the non-short-circuit form total
        BinaryOp::And => Ok(if left.is_truthy() {
            right.clone()
        } else {
            left.clone()
        }),
        BinaryOp::Or => Ok(if left.is_truthy() {
            left.clone()
        } else {
            right.clone()
        }),
    }
}

/// Apply a unary operator to an evaluated value.
pub(crate) fn apply_unary(op: UnaryOp, value: &Value) -> Result<Value, EvaluatorError> {
    if let Value::Placeholder(p) = value {
        if op != UnaryOp::Not {
            return Ok(Placeholder::unary(op, p.clone()));
        }
    }
    match op {
        UnaryOp::Neg => match value {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| {
                EvaluatorError::EvaluationError("integer overflow in negation".to_string())
            }),
            Value::Float(n) => Ok(Value::Float(-n)),
            v => Err(EvaluatorError::TypeError(format!(
                "bad operand type for unary -: '{}'",
                v.type_name()
            ))),
        },
        UnaryOp::Pos => match value {
            Value::Int(_) | Value::Float(_) => Ok(value.clone()),
            v => Err(EvaluatorError::TypeError(format!(
                "bad operand type for unary +: '{}'",
                v.type_name()
            ))),
        },
        UnaryOp::Abs => match value {
            Value::Int(n) => n.checked_abs().map(Value::Int).ok_or_else(|| {
                EvaluatorError::EvaluationError("integer overflow in abs()".to_string())
            }),
            Value::Float(n) => Ok(Value::Float(n.abs())),
            v => Err(EvaluatorError::TypeError(format!(
                "bad operand type for abs(): '{}'",
                v.type_name()
            ))),
        },
        // `not` evaluates truthiness; a placeholder is truthy, so `not _`
        // is False rather than a recorded operation
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
    }
}

/// Attribute access: methods on collections, entry lookup on mappings
/// (absent-marker on a missing key), recorded access on placeholders.
pub(crate) fn access_attr(object: &Value, name: &str) -> Result<Value, EvaluatorError> {
    match object {
        Value::Placeholder(p) => Ok(Placeholder::attr(p.clone(), name)),
        Value::Array(_) => match MethodKind::for_sequence(name) {
            Some(kind) => Ok(Value::method(object.clone(), kind)),
            None => Err(EvaluatorError::TypeError(format!(
                "'{}' object has no attribute '{}'",
                object.type_name(),
                name
            ))),
        },
        Value::Object(map) => match MethodKind::for_mapping(name) {
            Some(kind) => Ok(Value::method(object.clone(), kind)),
            None => Ok(map.get(name).cloned().unwrap_or(Value::Absent)),
        },
        v => Err(EvaluatorError::TypeError(format!(
            "'{}' object has no attribute '{}'",
            v.type_name(),
            name
        ))),
    }
}

/// Index access: non-raising on sequences (negative indices from the end)
/// and mappings (keys coerce to their canonical string form), recorded
/// access on placeholders.
pub(crate) fn access_index(object: &Value, index: &Value) -> Result<Value, EvaluatorError> {
    if let Value::Placeholder(p) = object {
        return Ok(Placeholder::index(p.clone(), index.clone()));
    }
    if index.is_placeholder() {
        // Index access has no reflected form; refuse rather than guess
        return Err(EvaluatorError::TypeError(format!(
            "cannot index a '{}' value by a placeholder",
            object.type_name()
        )));
    }
    match object {
        Value::Array(arr) => match index {
            Value::Int(i) => Ok(Value::seq_get(arr, *i).cloned().unwrap_or(Value::Absent)),
            v => Err(EvaluatorError::TypeError(format!(
                "sequence indices must be integers, not '{}'",
                v.type_name()
            ))),
        },
        Value::Object(map) => match Value::map_get(map, index) {
            Some(v) => Ok(v.clone()),
            None => {
                if Value::coerce_key(index).is_some() {
                    Ok(Value::Absent)
                } else {
                    Err(EvaluatorError::TypeError(format!(
                        "unhashable type: '{}'",
                        index.type_name()
                    )))
                }
            }
        },
        Value::String(s) => match index {
            Value::Int(i) => {
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let i = if *i < 0 { *i + len } else { *i };
                if i < 0 || i >= len {
                    Ok(Value::Absent)
                } else {
                    Ok(Value::String(chars[i as usize].to_string().into()))
                }
            }
            v => Err(EvaluatorError::TypeError(format!(
                "string indices must be integers, not '{}'",
                v.type_name()
            ))),
        },
        v => Err(EvaluatorError::TypeError(format!(
            "'{}' object is not subscriptable",
            v.type_name()
        ))),
    }
}

/// Invoke a callable value: a builtin, a bound collection method, or a
/// placeholder (which takes exactly one argument).
pub(crate) fn call_value(func: &Value, args: Vec<Value>) -> Result<Value, EvaluatorError> {
    match func {
        Value::Builtin(b) => Ok(functions::call(*b, args)?),
        Value::Placeholder(p) => {
            if args.len() != 1 {
                return Err(EvaluatorError::TypeError(format!(
                    "a placeholder takes exactly one argument ({} given)",
                    args.len()
                )));
            }
            p.apply(&args[0])
        }
        Value::Method { target, kind } => call_method(target, *kind, args),
        v => Err(EvaluatorError::TypeError(format!(
            "'{}' object is not callable",
            v.type_name()
        ))),
    }
}

fn call_method(
    target: &Rc<Value>,
    kind: MethodKind,
    args: Vec<Value>,
) -> Result<Value, EvaluatorError> {
    let expect = |n: usize| -> Result<(), EvaluatorError> {
        if args.len() != n {
            return Err(EvaluatorError::TypeError(format!(
                "{}() takes {} argument{} ({} given)",
                kind.name(),
                n,
                if n == 1 { "" } else { "s" },
                args.len()
            )));
        }
        Ok(())
    };

    match kind {
        MethodKind::Map => {
            expect(1)?;
            map_collection(target, &args[0])
        }
        MethodKind::Filter => {
            expect(1)?;
            filter_collection(target, &args[0])
        }
        MethodKind::Get => {
            expect(1)?;
            access_index(target, &args[0])
        }
        MethodKind::Keys => {
            expect(0)?;
            let map = expect_mapping(target, kind)?;
            Ok(Value::array(
                map.keys().map(|k| Value::string(k.as_str())).collect(),
            ))
        }
        MethodKind::Values => {
            expect(0)?;
            let map = expect_mapping(target, kind)?;
            Ok(Value::array(map.values().cloned().collect()))
        }
        MethodKind::Items => {
            expect(0)?;
            let map = expect_mapping(target, kind)?;
            Ok(Value::array(
                map.iter()
                    .map(|(k, v)| Value::array(vec![Value::string(k.as_str()), v.clone()]))
                    .collect(),
            ))
        }
    }
}

fn expect_mapping<'v>(
    target: &'v Value,
    kind: MethodKind,
) -> Result<&'v IndexMap<String, Value>, EvaluatorError> {
    target.as_object().ok_or_else(|| {
        EvaluatorError::TypeError(format!(
            "'{}' object has no method '{}'",
            target.type_name(),
            kind.name()
        ))
    })
}

/// Apply a unary callable to one value (map/filter operator arguments).
fn call_unary(func: &Value, arg: Value) -> Result<Value, EvaluatorError> {
    call_value(func, vec![arg])
}

/// `map`: a new Sequence with `f` applied to every element, or a new
/// Mapping with the same keys and `f` applied to every value.
pub(crate) fn map_collection(collection: &Value, func: &Value) -> Result<Value, EvaluatorError> {
    match collection {
        Value::Array(arr) => {
            let mut out = Vec::with_capacity(arr.len());
            for v in arr.iter() {
                out.push(call_unary(func, v.clone())?);
            }
            Ok(Value::array(out))
        }
        Value::Object(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (k, v) in map.iter() {
                out.insert(k.clone(), call_unary(func, v.clone())?);
            }
            Ok(Value::object(out))
        }
        v => Err(EvaluatorError::TypeError(format!(
            "'{}' object has no method 'map'",
            v.type_name()
        ))),
    }
}

/// `filter`: elements (or entries, by value) whose predicate result is
/// truthy, relative order preserved.
pub(crate) fn filter_collection(collection: &Value, func: &Value) -> Result<Value, EvaluatorError> {
    match collection {
        Value::Array(arr) => {
            let mut out = Vec::new();
            for v in arr.iter() {
                if call_unary(func, v.clone())?.is_truthy() {
                    out.push(v.clone());
                }
            }
            Ok(Value::array(out))
        }
        Value::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map.iter() {
                if call_unary(func, v.clone())?.is_truthy() {
                    out.insert(k.clone(), v.clone());
                }
            }
            Ok(Value::object(out))
        }
        v => Err(EvaluatorError::TypeError(format!(
            "'{}' object has no method 'filter'",
            v.type_name()
        ))),
    }
}

// ── Concrete operators ───────────────────────────────────────────────────────

fn type_error(op: BinaryOp, left: &Value, right: &Value) -> EvaluatorError {
    EvaluatorError::TypeError(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

/// `+`: numbers add, strings and sequences concatenate.
fn add(left: &Value, right: &Value) -> Result<Value, EvaluatorError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int).ok_or_else(|| {
            EvaluatorError::EvaluationError("integer overflow in +".to_string())
        }),
        (Value::String(a), Value::String(b)) => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::from(s))
        }
        (Value::Array(a), Value::Array(b)) => {
            let mut out = a.as_ref().clone();
            out.extend(b.iter().cloned());
            Ok(Value::array(out))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(type_error(BinaryOp::Add, left, right)),
        },
    }
}

/// `-` and `*` share the shape: checked on integers, plain on floats.
fn arith(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvaluatorError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b).map(Value::Int).ok_or_else(|| {
            EvaluatorError::EvaluationError(format!("integer overflow in {}", op.symbol()))
        }),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(type_error(op, left, right)),
        },
    }
}

/// `/` is true division: always a float, zero divisor is a fault.
fn divide(left: &Value, right: &Value) -> Result<Value, EvaluatorError> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => {
            if b == 0.0 {
                Err(EvaluatorError::EvaluationError(
                    "division by zero".to_string(),
                ))
            } else {
                Ok(Value::Float(a / b))
            }
        }
        _ => Err(type_error(BinaryOp::Div, left, right)),
    }
}

/// `//` floors toward negative infinity, like the source language.
fn floor_divide(left: &Value, right: &Value) -> Result<Value, EvaluatorError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(EvaluatorError::EvaluationError(
                    "division by zero".to_string(),
                ));
            }
            let d = a / b;
            let r = a % b;
            Ok(Value::Int(if r != 0 && (r < 0) != (*b < 0) {
                d - 1
            } else {
                d
            }))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => {
                if b == 0.0 {
                    Err(EvaluatorError::EvaluationError(
                        "division by zero".to_string(),
                    ))
                } else {
                    Ok(Value::Float((a / b).floor()))
                }
            }
            _ => Err(type_error(BinaryOp::FloorDiv, left, right)),
        },
    }
}

/// `%` with the sign of the divisor, like the source language.
fn modulo(left: &Value, right: &Value) -> Result<Value, EvaluatorError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(EvaluatorError::EvaluationError(
                    "division by zero".to_string(),
                ));
            }
            let r = a % b;
            Ok(Value::Int(if r != 0 && (r < 0) != (*b < 0) {
                r + b
            } else {
                r
            }))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => {
                if b == 0.0 {
                    Err(EvaluatorError::EvaluationError(
                        "division by zero".to_string(),
                    ))
                } else {
                    Ok(Value::Float(a - b * (a / b).floor()))
                }
            }
            _ => Err(type_error(BinaryOp::Mod, left, right)),
        },
    }
}

/// `& | ^` on integers.
fn bitwise(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> i64,
) -> Result<Value, EvaluatorError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(*a, *b))),
        _ => Err(type_error(op, left, right)),
    }
}

/// Ordered comparison shared by `< <= > >=`: numbers cross the int/float
/// divide, strings compare lexicographically.
fn ordered(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EvaluatorError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(EvaluatorError::TypeError(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                )))
            }
        },
    };
    Ok(Value::Bool(ordering.map(accept).unwrap_or(false)))
}

/// Membership: sequence elements, mapping keys, substrings.
fn contains(container: &Value, item: &Value) -> Result<bool, EvaluatorError> {
    match container {
        Value::Array(arr) => Ok(arr.iter().any(|v| v == item)),
        Value::Object(map) => Ok(match Value::coerce_key(item) {
            Some(key) => map.contains_key(key.as_ref()),
            None => false,
        }),
        Value::String(s) => match item {
            Value::String(sub) => Ok(s.contains(sub.as_ref())),
            v => Err(EvaluatorError::TypeError(format!(
                "'in <string>' requires string as left operand, not '{}'",
                v.type_name()
            ))),
        },
        v => Err(EvaluatorError::TypeError(format!(
            "argument of type '{}' is not iterable",
            v.type_name()
        ))),
    }
}
