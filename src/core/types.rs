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

//! Kind tags for the value lattice
//!
//! Every [`Value`](crate::core::Value) carries one of these kinds. The
//! numeric tags are stable and live in a sparse reserved space; they are
//! serialized by downstream systems, so they must never be reordered or
//! reused.

use std::fmt;

use chrono::DateTime;

use super::value::Value;

/// Kind tag for a runtime value.
///
/// The discriminant values are part of the wire contract. Do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// SQL NULL. Distinct from a missing field.
    Nil = 0,
    /// An evaluation error carried as a value.
    Error = 1,
    /// Type lattice top; identity lookups with unknown schema.
    Unknown = 2,
    /// 64-bit float. NaN doubles as the nil-number.
    Number = 10,
    /// 64-bit signed integer. `i32::MIN` doubles as the nil-int.
    Int = 11,
    /// Boolean.
    Bool = 12,
    /// UTC timestamp.
    Time = 13,
    /// Raw byte array.
    Bytes = 14,
    /// UTF-8 string. The empty string counts as nil.
    String = 20,
    /// Ordered sequence of strings.
    Strings = 21,
    /// Generic string-keyed map of values.
    Map = 30,
    /// string -> i64 map.
    MapInt = 31,
    /// string -> string map.
    MapString = 32,
    /// string -> f64 map.
    MapNumber = 33,
    /// string -> bool map.
    MapBool = 34,
    /// string -> timestamp map.
    MapTime = 35,
    /// Ordered, possibly heterogeneous sequence of values.
    Slice = 40,
    /// Opaque host object accessed through the `StructObject` trait.
    Struct = 50,
    /// Raw JSON document, marshaled verbatim.
    Json = 51,
}

impl ValueType {
    /// True for every map-shaped kind.
    pub fn is_map(&self) -> bool {
        matches!(
            self,
            ValueType::Map
                | ValueType::MapInt
                | ValueType::MapString
                | ValueType::MapNumber
                | ValueType::MapBool
                | ValueType::MapTime
        )
    }

    /// True for the ordered-sequence kinds.
    pub fn is_slice(&self) -> bool {
        matches!(self, ValueType::Strings | ValueType::Slice)
    }

    /// True for Int and Number.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Number)
    }

    /// Parse a kind from its stable name.
    pub fn from_name(name: &str) -> ValueType {
        match name {
            "nil" | "null" => ValueType::Nil,
            "error" => ValueType::Error,
            "number" => ValueType::Number,
            "int" => ValueType::Int,
            "bool" => ValueType::Bool,
            "time" => ValueType::Time,
            "[]byte" => ValueType::Bytes,
            "string" => ValueType::String,
            "[]string" => ValueType::Strings,
            "map[string]value" => ValueType::Map,
            "map[string]int" => ValueType::MapInt,
            "map[string]string" => ValueType::MapString,
            "map[string]number" => ValueType::MapNumber,
            "map[string]bool" => ValueType::MapBool,
            "map[string]time" => ValueType::MapTime,
            "[]value" => ValueType::Slice,
            "struct" => ValueType::Struct,
            "json" => ValueType::Json,
            _ => ValueType::Unknown,
        }
    }

    /// The canonical empty instance for this kind.
    ///
    /// Containers come back empty, strings empty, numbers zero, and the
    /// time zero is the Unix epoch.
    pub fn zero(&self) -> Value {
        match self {
            ValueType::Nil => Value::Nil,
            ValueType::Error => Value::error(""),
            ValueType::Unknown => Value::Unknown,
            ValueType::Number => Value::Number(0.0),
            ValueType::Int => Value::Int(0),
            ValueType::Bool => Value::Bool(false),
            ValueType::Time => Value::Time(DateTime::UNIX_EPOCH),
            ValueType::Bytes => Value::Bytes(Vec::new()),
            ValueType::String => Value::string(""),
            ValueType::Strings => Value::Strings(Vec::new()),
            ValueType::Map => Value::Map(Default::default()),
            ValueType::MapInt => Value::MapInt(Default::default()),
            ValueType::MapString => Value::MapString(Default::default()),
            ValueType::MapNumber => Value::MapNumber(Default::default()),
            ValueType::MapBool => Value::MapBool(Default::default()),
            ValueType::MapTime => Value::MapTime(Default::default()),
            ValueType::Slice => Value::Slice(Vec::new()),
            ValueType::Struct => Value::Nil,
            ValueType::Json => Value::json(""),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Nil => "nil",
            ValueType::Error => "error",
            ValueType::Unknown => "unknown",
            ValueType::Number => "number",
            ValueType::Int => "int",
            ValueType::Bool => "bool",
            ValueType::Time => "time",
            ValueType::Bytes => "[]byte",
            ValueType::String => "string",
            ValueType::Strings => "[]string",
            ValueType::Map => "map[string]value",
            ValueType::MapInt => "map[string]int",
            ValueType::MapString => "map[string]string",
            ValueType::MapNumber => "map[string]number",
            ValueType::MapBool => "map[string]bool",
            ValueType::MapTime => "map[string]time",
            ValueType::Slice => "[]value",
            ValueType::Struct => "struct",
            ValueType::Json => "json",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_tags() {
        // The numeric tags are a wire contract.
        assert_eq!(ValueType::Nil as u8, 0);
        assert_eq!(ValueType::Error as u8, 1);
        assert_eq!(ValueType::Unknown as u8, 2);
        assert_eq!(ValueType::Number as u8, 10);
        assert_eq!(ValueType::Int as u8, 11);
        assert_eq!(ValueType::Bool as u8, 12);
        assert_eq!(ValueType::Time as u8, 13);
        assert_eq!(ValueType::Bytes as u8, 14);
        assert_eq!(ValueType::String as u8, 20);
        assert_eq!(ValueType::Strings as u8, 21);
        assert_eq!(ValueType::Map as u8, 30);
        assert_eq!(ValueType::Slice as u8, 40);
        assert_eq!(ValueType::Struct as u8, 50);
        assert_eq!(ValueType::Json as u8, 51);
    }

    #[test]
    fn test_name_round_trip() {
        for vt in [
            ValueType::Nil,
            ValueType::Error,
            ValueType::Number,
            ValueType::Int,
            ValueType::Bool,
            ValueType::Time,
            ValueType::Bytes,
            ValueType::String,
            ValueType::Strings,
            ValueType::Map,
            ValueType::MapInt,
            ValueType::MapString,
            ValueType::MapNumber,
            ValueType::MapBool,
            ValueType::MapTime,
            ValueType::Slice,
            ValueType::Struct,
            ValueType::Json,
        ] {
            assert_eq!(ValueType::from_name(&vt.to_string()), vt);
        }
        assert_eq!(ValueType::from_name("no-such-type"), ValueType::Unknown);
    }

    #[test]
    fn test_predicates() {
        assert!(ValueType::Map.is_map());
        assert!(ValueType::MapTime.is_map());
        assert!(!ValueType::Slice.is_map());
        assert!(ValueType::Slice.is_slice());
        assert!(ValueType::Strings.is_slice());
        assert!(!ValueType::String.is_slice());
        assert!(ValueType::Int.is_numeric());
        assert!(ValueType::Number.is_numeric());
        assert!(!ValueType::Time.is_numeric());
    }

    #[test]
    fn test_zero_is_nil_for_containers() {
        assert!(ValueType::String.zero().is_nil());
        assert!(ValueType::Strings.zero().is_nil());
        assert!(ValueType::Slice.zero().is_nil());
        assert!(ValueType::Map.zero().is_nil());
        assert!(ValueType::Time.zero().is_nil());
        // Numeric zeros are zero but not nil.
        assert!(ValueType::Int.zero().is_zero());
        assert!(!ValueType::Int.zero().is_nil());
        assert!(ValueType::Number.zero().is_zero());
        assert!(!ValueType::Number.zero().is_nil());
    }
}
