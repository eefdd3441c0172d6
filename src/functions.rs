// Builtin function implementations
// The default namespace: extended-collection constructors, partial
// application, and a small set of Python-named helpers.

use indexmap::IndexMap;
use std::cmp::Ordering;
use thiserror::Error;

use crate::ast::UnaryOp;
use crate::placeholder::Placeholder;
use crate::value::Value;

/// Function errors
#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("{0}")]
    ArgumentError(String),

    #[error("{0}")]
    TypeError(String),

    #[error("{0}")]
    ValueError(String),
}

/// Builtin functions available in every evaluation environment.
///
/// `List` and `Dict` are the rebound `list`/`dict` names: explicit
/// constructor calls produce extended Sequences/Mappings, exactly like
/// literals and comprehensions do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    List,
    Dict,
    Partial,
    Range,
    Len,
    Abs,
    Sum,
    Min,
    Max,
    Str,
}

impl Builtin {
    pub const ALL: [Builtin; 10] = [
        Builtin::List,
        Builtin::Dict,
        Builtin::Partial,
        Builtin::Range,
        Builtin::Len,
        Builtin::Abs,
        Builtin::Sum,
        Builtin::Min,
        Builtin::Max,
        Builtin::Str,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::List => "list",
            Builtin::Dict => "dict",
            Builtin::Partial => "partial",
            Builtin::Range => "range",
            Builtin::Len => "len",
            Builtin::Abs => "abs",
            Builtin::Sum => "sum",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Str => "str",
        }
    }
}

/// Dispatch a builtin call.
pub fn call(builtin: Builtin, args: Vec<Value>) -> Result<Value, FunctionError> {
    match builtin {
        Builtin::List => list(args),
        Builtin::Dict => dict(args),
        Builtin::Partial => partial(args),
        Builtin::Range => range(args),
        Builtin::Len => len(args),
        Builtin::Abs => abs(args),
        Builtin::Sum => sum(args),
        Builtin::Min => min_max(args, "min", Ordering::Less),
        Builtin::Max => min_max(args, "max", Ordering::Greater),
        Builtin::Str => str_(args),
    }
}

/// Elements yielded by iterating `value`: sequence elements, mapping keys,
/// string characters. Everything else is not iterable.
pub(crate) fn iterate(value: &Value) -> Result<Vec<Value>, FunctionError> {
    match value {
        Value::Array(arr) => Ok(arr.as_ref().clone()),
        Value::Object(map) => Ok(map.keys().map(|k| Value::string(k.as_str())).collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string().into())).collect()),
        _ => Err(FunctionError::TypeError(format!(
            "'{}' object is not iterable",
            value.type_name()
        ))),
    }
}

fn expect_args(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), FunctionError> {
    if args.len() < min || args.len() > max {
        return Err(FunctionError::ArgumentError(format!(
            "{}() takes {} to {} arguments ({} given)",
            name,
            min,
            max,
            args.len()
        )));
    }
    Ok(())
}

/// `list()` / `list(iterable)` — the Sequence constructor. Wrapping an
/// existing Sequence copies it; wrapping is idempotent and never fails for
/// empty input.
fn list(args: Vec<Value>) -> Result<Value, FunctionError> {
    expect_args("list", &args, 0, 1)?;
    match args.into_iter().next() {
        None => Ok(Value::array(Vec::new())),
        Some(v) => Ok(Value::array(iterate(&v)?)),
    }
}

/// `dict()` / `dict(mapping)` / `dict(pairs)` — the Mapping constructor.
/// Accepts an existing Mapping (copied entry-wise, order preserved) or a
/// sequence of two-element pairs.
fn dict(args: Vec<Value>) -> Result<Value, FunctionError> {
    expect_args("dict", &args, 0, 1)?;
    match args.into_iter().next() {
        None => Ok(Value::object(IndexMap::new())),
        Some(Value::Object(map)) => Ok(Value::object(map.as_ref().clone())),
        Some(Value::Array(arr)) => {
            let mut m = IndexMap::with_capacity(arr.len());
            for (i, pair) in arr.iter().enumerate() {
                let items = pair.as_array().ok_or_else(|| {
                    FunctionError::TypeError(format!(
                        "cannot convert dict update element #{} to a key/value pair",
                        i
                    ))
                })?;
                if items.len() != 2 {
                    return Err(FunctionError::ValueError(format!(
                        "dict update element #{} has length {}; 2 is required",
                        i,
                        items.len()
                    )));
                }
                let key = Value::coerce_key(&items[0]).ok_or_else(|| {
                    FunctionError::TypeError(format!(
                        "unhashable key of type '{}'",
                        items[0].type_name()
                    ))
                })?;
                m.insert(key.into_owned(), items[1].clone());
            }
            Ok(Value::object(m))
        }
        Some(v) => Err(FunctionError::TypeError(format!(
            "dict() argument must be a mapping or a sequence of pairs, not '{}'",
            v.type_name()
        ))),
    }
}

/// `partial(callable, args...)` — a placeholder that resolves any
/// placeholder-valued argument against the eventual input, then invokes the
/// callable.
fn partial(mut args: Vec<Value>) -> Result<Value, FunctionError> {
    if args.is_empty() {
        return Err(FunctionError::ArgumentError(
            "partial() takes at least 1 argument (0 given)".to_string(),
        ));
    }
    let func = args.remove(0);
    if !func.is_callable() {
        return Err(FunctionError::TypeError(format!(
            "'{}' object is not callable",
            func.type_name()
        )));
    }
    Ok(Placeholder::partial(func, args))
}

/// `range(stop)` / `range(start, stop)` / `range(start, stop, step)`
fn range(args: Vec<Value>) -> Result<Value, FunctionError> {
    expect_args("range", &args, 1, 3)?;
    let ints: Vec<i64> = args
        .iter()
        .map(|a| {
            a.as_i64().ok_or_else(|| {
                FunctionError::TypeError(format!(
                    "'{}' object cannot be interpreted as an integer",
                    a.type_name()
                ))
            })
        })
        .collect::<Result<_, _>>()?;

    let (start, stop, step) = match ints.len() {
        1 => (0, ints[0], 1),
        2 => (ints[0], ints[1], 1),
        _ => (ints[0], ints[1], ints[2]),
    };
    if step == 0 {
        return Err(FunctionError::ValueError(
            "range() arg 3 must not be zero".to_string(),
        ));
    }

    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(Value::Int(i));
        i += step;
    }
    Ok(Value::array(out))
}

/// `len(x)` for sequences, mappings and strings.
fn len(args: Vec<Value>) -> Result<Value, FunctionError> {
    expect_args("len", &args, 1, 1)?;
    match &args[0] {
        Value::Array(arr) => Ok(Value::from(arr.len())),
        Value::Object(map) => Ok(Value::from(map.len())),
        Value::String(s) => Ok(Value::from(s.chars().count())),
        v => Err(FunctionError::TypeError(format!(
            "object of type '{}' has no len()",
            v.type_name()
        ))),
    }
}

/// `abs(x)` for numbers; on a placeholder, records absolute value.
fn abs(args: Vec<Value>) -> Result<Value, FunctionError> {
    expect_args("abs", &args, 1, 1)?;
    match &args[0] {
        Value::Int(n) => n.checked_abs().map(Value::Int).ok_or_else(|| {
            FunctionError::ValueError("integer overflow in abs()".to_string())
        }),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        Value::Placeholder(p) => Ok(Placeholder::unary(UnaryOp::Abs, p.clone())),
        v => Err(FunctionError::TypeError(format!(
            "bad operand type for abs(): '{}'",
            v.type_name()
        ))),
    }
}

/// `sum(sequence)` over numbers; an all-integer sequence sums to an integer.
fn sum(args: Vec<Value>) -> Result<Value, FunctionError> {
    expect_args("sum", &args, 1, 1)?;
    let arr = args[0].as_array().ok_or_else(|| {
        FunctionError::TypeError(format!("'{}' object is not iterable", args[0].type_name()))
    })?;

    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut seen_float = false;
    for v in arr.iter() {
        match v {
            Value::Int(n) => {
                int_total = int_total.checked_add(*n).ok_or_else(|| {
                    FunctionError::ValueError("integer overflow in sum()".to_string())
                })?;
            }
            Value::Float(n) => {
                seen_float = true;
                float_total += n;
            }
            v => {
                return Err(FunctionError::TypeError(format!(
                    "unsupported operand type for sum(): '{}'",
                    v.type_name()
                )))
            }
        }
    }
    if seen_float {
        Ok(Value::Float(float_total + int_total as f64))
    } else {
        Ok(Value::Int(int_total))
    }
}

/// Shared ordering for `min`/`max`: numbers cross int/float, strings compare
/// lexicographically, anything else is a type mismatch.
fn compare(a: &Value, b: &Value, name: &str) -> Result<Ordering, FunctionError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(|| {
                FunctionError::ValueError(format!("{}() got an unorderable float", name))
            }),
            _ => Err(FunctionError::TypeError(format!(
                "{}() got unorderable types: '{}' and '{}'",
                name,
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

/// `min(sequence)` / `min(a, b, ...)` and the `max` counterparts.
fn min_max(args: Vec<Value>, name: &str, keep: Ordering) -> Result<Value, FunctionError> {
    let candidates: Vec<Value> = if args.len() == 1 {
        iterate(&args[0])?
    } else if args.len() >= 2 {
        args
    } else {
        return Err(FunctionError::ArgumentError(format!(
            "{}() takes at least 1 argument (0 given)",
            name
        )));
    };

    let mut best: Option<Value> = None;
    for v in candidates {
        best = Some(match best {
            None => v,
            Some(b) => {
                if compare(&v, &b, name)? == keep {
                    v
                } else {
                    b
                }
            }
        });
    }
    best.ok_or_else(|| {
        FunctionError::ValueError(format!("{}() arg is an empty sequence", name))
    })
}

/// `str(x)` — readable string form; strings pass through unchanged.
fn str_(args: Vec<Value>) -> Result<Value, FunctionError> {
    expect_args("str", &args, 1, 1)?;
    match &args[0] {
        Value::String(s) => Ok(Value::String(s.clone())),
        v => Ok(Value::from(v.to_string())),
    }
}
