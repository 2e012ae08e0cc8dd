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

//! String functions

use crate::core::{Result, Value, ValueType};
use crate::expr::context::EvalContext;
use crate::expr::node::FuncNode;

use super::super::{expect_args, ScalarFunction};

/// `tolower(v)` - lowercase the string form of the argument
#[derive(Debug, Default)]
pub struct ToLowerFunction;

impl ScalarFunction for ToLowerFunction {
    fn name(&self) -> &'static str {
        "tolower"
    }

    fn return_type(&self) -> ValueType {
        ValueType::String
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        let arg = args.first()?;
        if arg.is_nil() {
            return None;
        }
        Some(Value::string(arg.coerce_str()?.to_lowercase()))
    }
}

/// `toupper(v)` - uppercase the string form of the argument
#[derive(Debug, Default)]
pub struct ToUpperFunction;

impl ScalarFunction for ToUpperFunction {
    fn name(&self) -> &'static str {
        "toupper"
    }

    fn return_type(&self) -> ValueType {
        ValueType::String
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        let arg = args.first()?;
        if arg.is_nil() {
            return None;
        }
        Some(Value::string(arg.coerce_str()?.to_uppercase()))
    }
}

/// `len(v)` - length of a string or container
#[derive(Debug, Default)]
pub struct LengthFunction;

impl ScalarFunction for LengthFunction {
    fn name(&self) -> &'static str {
        "len"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Int
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        let n = match args.first()? {
            Value::String(s) => s.chars().count(),
            Value::Strings(v) => v.len(),
            Value::Slice(v) => v.len(),
            Value::Bytes(b) => b.len(),
            v if v.value_type().is_map() => v.map_value()?.len(),
            Value::Nil => return None,
            _ => return None,
        };
        Some(Value::Int(n as i64))
    }
}

/// `contains(haystack, needle)` - substring test on the string forms
#[derive(Debug, Default)]
pub struct ContainsFunction;

impl ScalarFunction for ContainsFunction {
    fn name(&self) -> &'static str {
        "contains"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 2, 2)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        let haystack = args.first()?.coerce_str()?;
        let needle = args.get(1)?.coerce_str()?;
        Some(Value::Bool(haystack.contains(&needle)))
    }
}

/// `join(sep, v1, v2, ...)` - join the non-nil arguments' string forms
#[derive(Debug, Default)]
pub struct JoinFunction;

impl ScalarFunction for JoinFunction {
    fn name(&self) -> &'static str {
        "join"
    }

    fn return_type(&self) -> ValueType {
        ValueType::String
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 2, usize::MAX)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        let sep = args.first()?.coerce_str()?;
        let parts: Vec<String> = args[1..]
            .iter()
            .filter(|v| !v.is_nil())
            .filter_map(|v| v.coerce_str())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(Value::string(parts.join(&sep)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::context::MapContext;

    fn ctx() -> MapContext {
        MapContext::empty()
    }

    #[test]
    fn test_tolower_toupper() {
        let f = ToLowerFunction;
        assert_eq!(
            f.eval(&ctx(), &[Value::string("Yoda")]),
            Some(Value::string("yoda"))
        );
        assert_eq!(f.eval(&ctx(), &[Value::Nil]), None);

        let f = ToUpperFunction;
        assert_eq!(
            f.eval(&ctx(), &[Value::string("Yoda")]),
            Some(Value::string("YODA"))
        );
    }

    #[test]
    fn test_len() {
        let f = LengthFunction;
        assert_eq!(f.eval(&ctx(), &[Value::string("abc")]), Some(Value::Int(3)));
        assert_eq!(
            f.eval(&ctx(), &[Value::Strings(vec!["a".into(), "b".into()])]),
            Some(Value::Int(2))
        );
        assert_eq!(f.eval(&ctx(), &[Value::Int(5)]), None);
    }

    #[test]
    fn test_contains() {
        let f = ContainsFunction;
        assert_eq!(
            f.eval(&ctx(), &[Value::string("Yoda"), Value::string("od")]),
            Some(Value::Bool(true))
        );
        assert_eq!(
            f.eval(&ctx(), &[Value::string("Yoda"), Value::string("kin")]),
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn test_join() {
        let f = JoinFunction;
        assert_eq!(
            f.eval(
                &ctx(),
                &[
                    Value::string("-"),
                    Value::string("a"),
                    Value::Nil,
                    Value::string("b")
                ]
            ),
            Some(Value::string("a-b"))
        );
        assert_eq!(f.eval(&ctx(), &[Value::string("-"), Value::Nil]), None);
    }
}
