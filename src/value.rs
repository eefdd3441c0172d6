// Value: Rc-wrapped runtime value type
// Sequences and mappings are the extended, order-preserving collections;
// missing index/key reads resolve to Absent instead of failing.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::functions::Builtin;
use crate::placeholder::Placeholder;

/// A JSON-compatible value with O(1) clone semantics via Rc-wrapping.
///
/// `Array` is the Sequence of the collection algebra (index-ordered),
/// `Object` the Mapping (insertion-ordered via `IndexMap`). `Absent` is the
/// marker produced by out-of-range or missing-key reads; it serializes as
/// JSON `null`. Placeholders, builtins and bound methods are first-class
/// values so they can flow through the environment and through calls, but
/// have no JSON representation of their own.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<IndexMap<String, Value>>),

    /// Marker for missing index/key reads; never an error.
    Absent,

    /// A deferred unary function built from `_`.
    Placeholder(Rc<Placeholder>),

    /// A builtin function reference (`list`, `range`, ...).
    Builtin(Builtin),

    /// A collection method bound to its receiver (`d.map`, `m.items`, ...).
    Method { target: Rc<Value>, kind: MethodKind },
}

/// Methods exposed on sequences and mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Map,
    Filter,
    Get,
    Keys,
    Values,
    Items,
}

impl MethodKind {
    pub fn name(&self) -> &'static str {
        match self {
            MethodKind::Map => "map",
            MethodKind::Filter => "filter",
            MethodKind::Get => "get",
            MethodKind::Keys => "keys",
            MethodKind::Values => "values",
            MethodKind::Items => "items",
        }
    }

    /// Method set for a sequence receiver.
    pub fn for_sequence(name: &str) -> Option<MethodKind> {
        match name {
            "map" => Some(MethodKind::Map),
            "filter" => Some(MethodKind::Filter),
            "get" => Some(MethodKind::Get),
            _ => None,
        }
    }

    /// Method set for a mapping receiver. These names shadow same-named
    /// keys in attribute position; `m["map"]` still reaches the entry.
    pub fn for_mapping(name: &str) -> Option<MethodKind> {
        match name {
            "map" => Some(MethodKind::Map),
            "filter" => Some(MethodKind::Filter),
            "get" => Some(MethodKind::Get),
            "keys" => Some(MethodKind::Keys),
            "values" => Some(MethodKind::Values),
            "items" => Some(MethodKind::Items),
            _ => None,
        }
    }
}

// ── Type checks ──────────────────────────────────────────────────────────────

impl Value {
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Placeholder(_))
    }

    /// Whether calling this value makes sense (placeholder, builtin or
    /// bound method).
    #[inline]
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Placeholder(_) | Value::Builtin(_) | Value::Method { .. }
        )
    }

    /// Python truthiness: empty collections, empty strings, zero and
    /// `None`/`Absent` are falsy; everything else, including placeholders
    /// and functions, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Absent => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Placeholder(_) | Value::Builtin(_) | Value::Method { .. } => true,
        }
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::Array(_) => "sequence",
            Value::Object(_) => "mapping",
            Value::Absent => "absent",
            Value::Placeholder(_) => "placeholder",
            Value::Builtin(_) => "builtin",
            Value::Method { .. } => "method",
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

impl Value {
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

// ── Non-raising access ───────────────────────────────────────────────────────

impl Value {
    /// Sequence element at `index`, supporting negative indices from the
    /// end. Out-of-range yields `None`; callers surface `Absent`.
    pub fn seq_get(arr: &[Value], index: i64) -> Option<&Value> {
        let len = arr.len() as i64;
        let i = if index < 0 { index + len } else { index };
        if i < 0 || i >= len {
            None
        } else {
            arr.get(i as usize)
        }
    }

    /// Mapping entry for `key` after coercion to its canonical string form.
    pub fn map_get<'m>(map: &'m IndexMap<String, Value>, key: &Value) -> Option<&'m Value> {
        let key = Value::coerce_key(key)?;
        map.get(key.as_ref())
    }

    /// Canonical string form of a mapping key.
    ///
    /// Mirrors what JSON encoding does to the original's non-string dict
    /// keys: `{0: x}` and `m[0]` both address the key `"0"`. Values with no
    /// stable key form (collections, functions) coerce to `None` and the
    /// caller reports the fault.
    pub fn coerce_key(key: &Value) -> Option<std::borrow::Cow<'_, str>> {
        use std::borrow::Cow;
        match key {
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Int(n) => Some(Cow::Owned(n.to_string())),
            Value::Float(n) => Some(Cow::Owned(format_float(*n))),
            Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            Value::Null => Some(Cow::Borrowed("null")),
            _ => None,
        }
    }
}

// ── Constructors ─────────────────────────────────────────────────────────────

impl Value {
    #[inline]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    #[inline]
    pub fn array(v: Vec<Value>) -> Self {
        Value::Array(Rc::new(v))
    }

    #[inline]
    pub fn object(m: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(m))
    }

    #[inline]
    pub fn placeholder(p: Placeholder) -> Self {
        Value::Placeholder(Rc::new(p))
    }

    #[inline]
    pub fn method(target: Value, kind: MethodKind) -> Self {
        Value::Method {
            target: Rc::new(target),
            kind,
        }
    }
}

// ── From impls ───────────────────────────────────────────────────────────────

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<usize> for Value {
    #[inline]
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    #[inline]
    fn from(v: Vec<Value>) -> Self {
        Value::Array(Rc::new(v))
    }
}

impl From<IndexMap<String, Value>> for Value {
    #[inline]
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(m))
    }
}

// ── PartialEq ────────────────────────────────────────────────────────────────

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Absent, Value::Absent) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // Numeric equality crosses the int/float divide: 1 == 1.0
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Float(a), Value::Float(b)) => {
                // NaN != NaN
                if a.is_nan() && b.is_nan() {
                    return false;
                }
                a == b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Placeholder(a), Value::Placeholder(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (
                Value::Method { target: a, kind: ak },
                Value::Method { target: b, kind: bk },
            ) => ak == bk && a == b,
            _ => false,
        }
    }
}

// ── Display ──────────────────────────────────────────────────────────────────

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Absent => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::String(s) => write!(f, "\"{}\"", escape_json_string(s)),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", escape_json_string(k), v)?;
                }
                write!(f, "}}")
            }
            Value::Placeholder(_) => write!(f, "<placeholder>"),
            Value::Builtin(b) => write!(f, "<builtin:{}>", b.name()),
            Value::Method { kind, .. } => write!(f, "<method:{}>", kind.name()),
        }
    }
}

fn escape_json_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c < '\x20' => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

fn format_float(n: f64) -> String {
    if !n.is_finite() {
        // NaN and +/-Infinity have no JSON form
        "null".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

// ── Serialization (JSON output) ──────────────────────────────────────────────

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            // Absent-marker reads serialize as JSON null
            Value::Absent => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => {
                if n.is_nan() || n.is_infinite() {
                    serializer.serialize_none()
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for v in arr.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
            // No JSON form: fall back to the readable string form
            Value::Placeholder(_) | Value::Builtin(_) | Value::Method { .. } => {
                serializer.serialize_str(&self.to_string())
            }
        }
    }
}

// ── Deserialization (single-pass JSON→Value) ─────────────────────────────────

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "any valid JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        if v <= i64::MAX as u64 {
            Ok(Value::Int(v as i64))
        } else {
            Ok(Value::Float(v as f64))
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::string(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v.into()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(elem) = seq.next_element()? {
            vec.push(elem);
        }
        Ok(Value::array(vec))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut m = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry()? {
            m.insert(k, v);
        }
        Ok(Value::object(m))
    }
}
