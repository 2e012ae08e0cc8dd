// Copyright 2025 Siftql Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runtime values for the expression engine
//!
//! A [`Value`] is a tagged union over the scalar and container kinds the
//! evaluator understands, with cross-kind coercion, equality, string
//! rendering and JSON marshaling.
//!
//! Nil is pervasive: the empty string, empty containers, the zero time,
//! NaN numbers and the historical nil-int sentinel all answer `is_nil()`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::error::{Error, Result};
use super::types::ValueType;

/// Historical sentinel for "nil int". Preserved for zero-value parity with
/// systems that serialized it.
pub const NIL_INT: i64 = i32::MIN as i64;

/// Timestamp formats supported for parsing
/// Order matters - more specific formats first
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z", // RFC3339 with fractional seconds
    "%Y-%m-%dT%H:%M:%S%:z",    // RFC3339
    "%Y-%m-%dT%H:%M:%SZ",      // RFC3339 UTC
    "%Y-%m-%dT%H:%M:%S",       // ISO without timezone
    "%Y-%m-%d %H:%M:%S%.f",    // SQL-style with fractional seconds
    "%Y-%m-%d %H:%M:%S",       // SQL-style
    "%Y/%m/%d %H:%M:%S",       // Alternative with slashes
    "%m/%d/%Y %H:%M:%S",       // US format with time
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", // ISO date
    "%Y/%m/%d", // Alternative date
    "%m/%d/%Y", // US format
    "%d/%m/%Y", // European format
];

/// Opaque host object usable as a [`Value::Struct`].
///
/// Caller-supplied records implement field lookup by name; everything else
/// about the object stays opaque to the engine.
pub trait StructObject: fmt::Debug + Send + Sync {
    /// Look up a field by name.
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Optional JSON rendering; `None` marshals as JSON null.
    fn json(&self) -> Option<String> {
        None
    }
}

/// A runtime value with kind information
///
/// Each variant carries its payload directly. Text-like payloads use
/// `Arc<str>` so row-level cloning stays cheap.
#[derive(Debug, Clone)]
pub enum Value {
    /// SQL NULL
    Nil,
    /// Evaluation error carried as a value; not equal to anything
    Error(Arc<str>),
    /// Lattice top, used when schema knowledge is absent
    Unknown,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer; NIL_INT is the nil-int sentinel
    Int(i64),
    /// 64-bit float; NaN is the nil-number
    Number(f64),
    /// UTC timestamp
    Time(DateTime<Utc>),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UTF-8 string (Arc for cheap cloning)
    String(Arc<str>),
    /// Ordered sequence of strings
    Strings(Vec<String>),
    /// Ordered, possibly heterogeneous sequence
    Slice(Vec<Value>),
    /// Generic string-keyed map
    Map(HashMap<String, Value>),
    /// string -> i64 map
    MapInt(HashMap<String, i64>),
    /// string -> string map
    MapString(HashMap<String, String>),
    /// string -> f64 map
    MapNumber(HashMap<String, f64>),
    /// string -> bool map
    MapBool(HashMap<String, bool>),
    /// string -> timestamp map
    MapTime(HashMap<String, DateTime<Utc>>),
    /// Opaque host object
    Struct(Arc<dyn StructObject>),
    /// Raw JSON document, marshaled verbatim
    Json(Arc<str>),
}

impl Value {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a string value
    pub fn string(value: impl AsRef<str>) -> Self {
        Value::String(Arc::from(value.as_ref()))
    }

    /// Create an error value
    pub fn error(message: impl AsRef<str>) -> Self {
        Value::Error(Arc::from(message.as_ref()))
    }

    /// Create a raw JSON value
    pub fn json(value: impl AsRef<str>) -> Self {
        Value::Json(Arc::from(value.as_ref()))
    }

    /// The nil-int sentinel value
    pub fn int_nil() -> Self {
        Value::Int(NIL_INT)
    }

    /// The nil-number (NaN) value
    pub fn number_nil() -> Self {
        Value::Number(f64::NAN)
    }

    /// Create a struct value from a host object
    pub fn struct_value(v: Arc<dyn StructObject>) -> Self {
        Value::Struct(v)
    }

    // =========================================================================
    // Kind accessors
    // =========================================================================

    /// Returns the kind tag of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Nil,
            Value::Error(_) => ValueType::Error,
            Value::Unknown => ValueType::Unknown,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Number(_) => ValueType::Number,
            Value::Time(_) => ValueType::Time,
            Value::Bytes(_) => ValueType::Bytes,
            Value::String(_) => ValueType::String,
            Value::Strings(_) => ValueType::Strings,
            Value::Slice(_) => ValueType::Slice,
            Value::Map(_) => ValueType::Map,
            Value::MapInt(_) => ValueType::MapInt,
            Value::MapString(_) => ValueType::MapString,
            Value::MapNumber(_) => ValueType::MapNumber,
            Value::MapBool(_) => ValueType::MapBool,
            Value::MapTime(_) => ValueType::MapTime,
            Value::Struct(_) => ValueType::Struct,
            Value::Json(_) => ValueType::Json,
        }
    }

    /// True for nil/empty values: the explicit nil kinds, empty strings and
    /// containers, the zero time, NaN numbers and the nil-int sentinel.
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Error(_) => false,
            Value::Unknown => true,
            Value::Bool(_) => false,
            Value::Int(v) => *v == NIL_INT,
            Value::Number(v) => v.is_nan(),
            Value::Time(t) => t.timestamp_nanos_opt().unwrap_or(1) == 0,
            Value::Bytes(b) => b.is_empty(),
            Value::String(s) => s.is_empty(),
            Value::Strings(v) => v.is_empty(),
            Value::Slice(v) => v.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::MapInt(m) => m.is_empty(),
            Value::MapString(m) => m.is_empty(),
            Value::MapNumber(m) => m.is_empty(),
            Value::MapBool(m) => m.is_empty(),
            Value::MapTime(m) => m.is_empty(),
            Value::Struct(_) => false,
            Value::Json(s) => s.is_empty(),
        }
    }

    /// True when this value represents a failure to evaluate
    pub fn is_err(&self) -> bool {
        match self {
            Value::Error(_) => true,
            Value::Number(v) => v.is_nan(),
            Value::Int(v) => *v == NIL_INT,
            _ => false,
        }
    }

    /// Coincides with `is_nil` for container and string kinds, and with
    /// numeric zero for Int/Number.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(v) => *v == 0,
            Value::Number(v) => *v == 0.0,
            other => other.is_nil(),
        }
    }

    // =========================================================================
    // Coercions
    // =========================================================================

    /// Coerce to i64: parses strings (int first, float fallback),
    /// truncates floats, converts bool. Containers and time are rejected.
    pub fn to_int64(&self) -> Option<i64> {
        match self {
            Value::Int(v) if *v != NIL_INT => Some(*v),
            Value::Number(v) if !v.is_nan() => Some(*v as i64),
            Value::Bool(b) => Some(if *b { 1 } else { 0 }),
            Value::String(s) => s
                .parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64)),
            _ => None,
        }
    }

    /// Coerce to f64, parallel to `to_int64`
    pub fn to_float64(&self) -> Option<f64> {
        match self {
            Value::Int(v) if *v != NIL_INT => Some(*v as f64),
            Value::Number(v) if !v.is_nan() => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Coerce to bool. Strings accept the usual literal spellings.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(v) if *v != NIL_INT => Some(*v != 0),
            Value::Number(v) if !v.is_nan() => Some(*v != 0.0),
            Value::String(s) => parse_bool(s),
            _ => None,
        }
    }

    /// Coerce to a timestamp.
    ///
    /// Accepts Time, parseable strings (RFC3339, `YYYY-MM-DD`, `MM/DD/YYYY`,
    /// digit strings via the epoch heuristic) and integers (epoch heuristic:
    /// seconds, milliseconds or nanoseconds by magnitude). Slices are not
    /// accepted here; callers handle them element-wise.
    pub fn to_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            Value::String(s) => parse_time(s).ok(),
            Value::Int(v) if *v != NIL_INT => time_from_epoch(*v),
            _ => None,
        }
    }

    /// Numeric view as f64. Time is epoch milliseconds.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Time(t) => Some(t.timestamp_millis() as f64),
            other => other.to_float64(),
        }
    }

    /// Numeric view as i64. Time is epoch milliseconds.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Time(t) => Some(t.timestamp_millis()),
            other => other.to_int64(),
        }
    }

    /// Stringify any kind except Error.
    pub fn coerce_str(&self) -> Option<String> {
        match self {
            Value::Error(_) => None,
            other => Some(other.to_string()),
        }
    }

    // =========================================================================
    // Container access
    // =========================================================================

    /// Map-keyed lookup across every map kind.
    pub fn get_key(&self, key: &str) -> Option<Value> {
        match self {
            Value::Map(m) => m.get(key).cloned(),
            Value::MapInt(m) => m.get(key).map(|v| Value::Int(*v)),
            Value::MapString(m) => m.get(key).map(Value::from),
            Value::MapNumber(m) => m.get(key).map(|v| Value::Number(*v)),
            Value::MapBool(m) => m.get(key).map(|v| Value::Bool(*v)),
            Value::MapTime(m) => m.get(key).map(|v| Value::Time(*v)),
            Value::Struct(s) => s.get_field(key),
            _ => None,
        }
    }

    /// True when this value is a map kind holding the key.
    pub fn has_key(&self, key: &str) -> bool {
        match self {
            Value::Map(m) => m.contains_key(key),
            Value::MapInt(m) => m.contains_key(key),
            Value::MapString(m) => m.contains_key(key),
            Value::MapNumber(m) => m.contains_key(key),
            Value::MapBool(m) => m.contains_key(key),
            Value::MapTime(m) => m.contains_key(key),
            _ => false,
        }
    }

    /// View any sequence kind as a vector of values. Maps yield their keys.
    pub fn slice_values(&self) -> Option<Vec<Value>> {
        match self {
            Value::Slice(v) => Some(v.clone()),
            Value::Strings(v) => Some(v.iter().map(Value::from).collect()),
            Value::Map(m) => Some(m.keys().map(Value::from).collect()),
            Value::MapInt(m) => Some(m.keys().map(Value::from).collect()),
            Value::MapString(m) => Some(m.keys().map(Value::from).collect()),
            Value::MapNumber(m) => Some(m.keys().map(Value::from).collect()),
            Value::MapBool(m) => Some(m.keys().map(Value::from).collect()),
            Value::MapTime(m) => Some(m.keys().map(Value::from).collect()),
            _ => None,
        }
    }

    /// Generic map view of the typed map kinds.
    pub fn map_value(&self) -> Option<HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m.clone()),
            Value::MapInt(m) => Some(
                m.iter()
                    .map(|(k, v)| (k.clone(), Value::Int(*v)))
                    .collect(),
            ),
            Value::MapString(m) => Some(m.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect()),
            Value::MapNumber(m) => Some(
                m.iter()
                    .map(|(k, v)| (k.clone(), Value::Number(*v)))
                    .collect(),
            ),
            Value::MapBool(m) => Some(
                m.iter()
                    .map(|(k, v)| (k.clone(), Value::Bool(*v)))
                    .collect(),
            ),
            Value::MapTime(m) => Some(
                m.iter()
                    .map(|(k, v)| (k.clone(), Value::Time(*v)))
                    .collect(),
            ),
            _ => None,
        }
    }

    // =========================================================================
    // JSON
    // =========================================================================

    /// Marshal to JSON. Error and Unknown kinds are not marshalable.
    pub fn to_json(&self) -> Result<String> {
        match self {
            Value::Error(_) | Value::Unknown => Err(Error::execute(format!(
                "cannot marshal {} value",
                self.value_type()
            ))),
            other => serde_json::to_string(&other.to_json_value())
                .map_err(|e| Error::execute(e.to_string())),
        }
    }

    fn to_json_value(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Nil | Value::Error(_) | Value::Unknown => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Int(v) => {
                if *v == NIL_INT {
                    J::Null
                } else {
                    J::from(*v)
                }
            }
            Value::Number(v) => {
                if v.is_nan() {
                    J::Null
                } else if v.fract() == 0.0 && v.abs() < 1e15 {
                    J::from(*v as i64)
                } else {
                    J::from(*v)
                }
            }
            Value::Time(t) => J::String(t.to_rfc3339()),
            Value::Bytes(b) => J::Array(b.iter().map(|v| J::from(*v)).collect()),
            Value::String(s) => J::String(s.to_string()),
            Value::Strings(v) => J::Array(v.iter().map(|s| J::String(s.clone())).collect()),
            Value::Slice(v) => J::Array(v.iter().map(|e| e.to_json_value()).collect()),
            Value::Map(m) => J::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
            Value::MapInt(m) => J::Object(m.iter().map(|(k, v)| (k.clone(), J::from(*v))).collect()),
            Value::MapString(m) => J::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), J::String(v.clone())))
                    .collect(),
            ),
            Value::MapNumber(m) => {
                J::Object(m.iter().map(|(k, v)| (k.clone(), J::from(*v))).collect())
            }
            Value::MapBool(m) => J::Object(m.iter().map(|(k, v)| (k.clone(), J::Bool(*v))).collect()),
            Value::MapTime(m) => J::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), J::String(v.to_rfc3339())))
                    .collect(),
            ),
            Value::Struct(s) => match s.json().and_then(|j| serde_json::from_str(&j).ok()) {
                Some(j) => j,
                None => J::Null,
            },
            Value::Json(s) => serde_json::from_str(s).unwrap_or(J::Null),
        }
    }

    /// Unmarshal JSON text onto the lattice. Objects become generic maps,
    /// homogeneous string arrays become Strings.
    pub fn from_json(text: &str) -> Result<Value> {
        let parsed: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::parse(e.to_string()))?;
        Ok(Value::from_json_value(parsed))
    }

    fn from_json_value(v: serde_json::Value) -> Value {
        use serde_json::Value as J;
        match v {
            J::Null => Value::Nil,
            J::Bool(b) => Value::Bool(b),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Number(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            J::String(s) => Value::string(s),
            J::Array(items) => {
                if !items.is_empty() && items.iter().all(|i| i.is_string()) {
                    Value::Strings(
                        items
                            .into_iter()
                            .map(|i| i.as_str().unwrap_or_default().to_string())
                            .collect(),
                    )
                } else {
                    Value::Slice(items.into_iter().map(Value::from_json_value).collect())
                }
            }
            J::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json_value(v)))
                    .collect(),
            ),
        }
    }
}

// =========================================================================
// Semantic equality
// =========================================================================

/// Kind-aware equality.
///
/// Same kinds compare structurally; Int and Number compare as Number;
/// Time against a parseable string compares at seconds granularity.
/// Incomparable kinds are simply not equal. Comparing Error values is the
/// only failure mode.
pub fn values_equal(a: &Value, b: &Value) -> Result<bool> {
    if matches!(a, Value::Error(_)) || matches!(b, Value::Error(_)) {
        return Err(Error::execute("cannot compare error values"));
    }

    let a_nil = matches!(a, Value::Nil);
    let b_nil = matches!(b, Value::Nil);
    if a_nil || b_nil {
        return Ok(a_nil && b_nil);
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Number(x), Value::Number(y)) => Ok(x == y),
        (Value::Int(x), Value::Number(y)) | (Value::Number(y), Value::Int(x)) => {
            Ok((*x as f64) == *y)
        }
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::Time(x), Value::Time(y)) => Ok(x.timestamp() == y.timestamp()),
        (Value::Time(t), Value::String(s)) | (Value::String(s), Value::Time(t)) => {
            match parse_time(s) {
                Ok(st) => Ok(st.timestamp() == t.timestamp()),
                Err(_) => Ok(false),
            }
        }
        (Value::Int(x), Value::String(s)) | (Value::String(s), Value::Int(x)) => {
            Ok(s.parse::<i64>().map(|v| v == *x).unwrap_or(false))
        }
        (Value::Number(x), Value::String(s)) | (Value::String(s), Value::Number(x)) => {
            Ok(s.parse::<f64>().map(|v| v == *x).unwrap_or(false))
        }
        (Value::Bytes(x), Value::Bytes(y)) => Ok(x == y),
        (Value::Strings(x), Value::Strings(y)) => Ok(x == y),
        (Value::Slice(x), Value::Slice(y)) => {
            if x.len() != y.len() {
                return Ok(false);
            }
            for (xe, ye) in x.iter().zip(y.iter()) {
                if !values_equal(xe, ye)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Json(x), Value::Json(y)) => Ok(x == y),
        (Value::Struct(x), Value::Struct(y)) => Ok(Arc::ptr_eq(x, y)),
        (x, y) if x.value_type().is_map() && y.value_type().is_map() => {
            let (mx, my) = (x.map_value().unwrap(), y.map_value().unwrap());
            if mx.len() != my.len() {
                return Ok(false);
            }
            for (k, v) in &mx {
                match my.get(k) {
                    Some(other) if values_equal(v, other)? => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

// =========================================================================
// Trait implementations
// =========================================================================

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl serde::Serialize for Value {
    /// Serializes through the JSON mapping; Error and Unknown become null.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

/// Structural equality for tests and container membership. Semantic
/// (operator-table) equality lives in [`values_equal`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) | (Value::Unknown, Value::Unknown) => true,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // NaN == NaN here so nil-numbers compare stable in tests
            (Value::Number(a), Value::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a == b
            }
            (Value::Int(i), Value::Number(f)) | (Value::Number(f), Value::Int(i)) => {
                *f == (*i as f64)
            }
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Strings(a), Value::Strings(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::MapInt(a), Value::MapInt(b)) => a == b,
            (Value::MapString(a), Value::MapString(b)) => a == b,
            (Value::MapNumber(a), Value::MapNumber(b)) => a == b,
            (Value::MapBool(a), Value::MapBool(b)) => a == b,
            (Value::MapTime(a), Value::MapTime(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => Arc::ptr_eq(a, b),
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// Canonical string form used by membership and concatenation
    /// semantics. Nil renders empty, sequences join with commas, and
    /// timestamps render as epoch milliseconds.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil | Value::Unknown => Ok(()),
            Value::Error(e) => write!(f, "{}", e),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Int(v) => {
                if *v == NIL_INT {
                    Ok(())
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Number(v) => write!(f, "{}", format_float(*v)),
            Value::Time(t) => write!(f, "{}", t.timestamp_millis()),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::String(s) => write!(f, "{}", s),
            Value::Strings(v) => write!(f, "{}", v.join(",")),
            Value::Slice(v) => {
                let parts: Vec<String> = v.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Json(s) => write!(f, "{}", s),
            Value::Struct(s) => write!(f, "{:?}", s),
            other => {
                // Map kinds: sorted key:value pairs for determinism.
                let mut pairs: Vec<String> = other
                    .map_value()
                    .unwrap_or_default()
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, v))
                    .collect();
                pairs.sort();
                write!(f, "map[{}]", pairs.join(" "))
            }
        }
    }
}

// =========================================================================
// From implementations for convenient construction
// =========================================================================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::string(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Strings(v)
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::Strings(v.into_iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Slice(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<DateTime<Utc>>> for Value {
    fn from(v: Vec<DateTime<Utc>>) -> Self {
        Value::Slice(v.into_iter().map(Value::Time).collect())
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(v: HashMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl From<HashMap<String, i64>> for Value {
    fn from(v: HashMap<String, i64>) -> Self {
        Value::MapInt(v)
    }
}

impl From<HashMap<String, String>> for Value {
    fn from(v: HashMap<String, String>) -> Self {
        Value::MapString(v)
    }
}

impl From<HashMap<String, f64>> for Value {
    fn from(v: HashMap<String, f64>) -> Self {
        Value::MapNumber(v)
    }
}

impl From<HashMap<String, bool>> for Value {
    fn from(v: HashMap<String, bool>) -> Self {
        Value::MapBool(v)
    }
}

impl From<HashMap<String, DateTime<Utc>>> for Value {
    fn from(v: HashMap<String, DateTime<Utc>>) -> Self {
        Value::MapTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Nil,
        }
    }
}

// =========================================================================
// Helper functions
// =========================================================================

/// Parse a timestamp string with multi-format support.
///
/// Digit-only strings go through the epoch heuristic.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::parse("empty timestamp"));
    }

    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = s.parse::<i64>() {
            if let Some(t) = time_from_epoch(n) {
                return Ok(t);
            }
        }
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            let datetime = date.and_hms_opt(0, 0, 0).unwrap();
            return Ok(Utc.from_utc_datetime(&datetime));
        }
    }

    Err(Error::parse(format!("invalid timestamp format: {}", s)))
}

/// Interpret an integer as a Unix epoch instant: seconds, milliseconds or
/// nanoseconds chosen by magnitude.
pub fn time_from_epoch(n: i64) -> Option<DateTime<Utc>> {
    let abs = n.unsigned_abs();
    if abs >= 1_000_000_000_000_000 {
        Some(Utc.timestamp_nanos(n))
    } else if abs >= 100_000_000_000 {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

/// Parse the standard bool literal spellings
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Format a float value consistently
pub(crate) fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        let s = format!("{:?}", v);
        if s.contains('.') && !s.contains('e') && !s.contains('E') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    }
}
