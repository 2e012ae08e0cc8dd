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

//! Type-conversion functions

use crate::core::{Result, Value, ValueType};
use crate::expr::context::EvalContext;
use crate::expr::node::FuncNode;
use crate::vm::datemath::value_to_time_anchored;

use super::super::{expect_args, ScalarFunction};

/// `toint(v)` - coerce to Int
#[derive(Debug, Default)]
pub struct ToIntFunction;

impl ScalarFunction for ToIntFunction {
    fn name(&self) -> &'static str {
        "toint"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Int
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        args.first()?.to_int64().map(Value::Int)
    }
}

/// `tonumber(v)` - coerce to Number
#[derive(Debug, Default)]
pub struct ToNumberFunction;

impl ScalarFunction for ToNumberFunction {
    fn name(&self) -> &'static str {
        "tonumber"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Number
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        args.first()?.to_float64().map(Value::Number)
    }
}

/// `tobool(v)` - coerce to Bool
#[derive(Debug, Default)]
pub struct ToBoolFunction;

impl ScalarFunction for ToBoolFunction {
    fn name(&self) -> &'static str {
        "tobool"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        args.first()?.to_bool().map(Value::Bool)
    }
}

/// `todate(v)` - coerce to Time, resolving date math against the row
/// timestamp
#[derive(Debug, Default)]
pub struct ToDateFunction;

impl ScalarFunction for ToDateFunction {
    fn name(&self) -> &'static str {
        "todate"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Time
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        value_to_time_anchored(args.first()?, ctx.ts()).map(Value::Time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::context::MapContext;
    use chrono::Datelike;

    fn ctx() -> MapContext {
        MapContext::empty()
    }

    #[test]
    fn test_toint() {
        let f = ToIntFunction;
        assert_eq!(f.eval(&ctx(), &[Value::string("42")]), Some(Value::Int(42)));
        assert_eq!(f.eval(&ctx(), &[Value::Number(3.7)]), Some(Value::Int(3)));
        assert_eq!(f.eval(&ctx(), &[Value::string("world")]), None);
    }

    #[test]
    fn test_tonumber() {
        let f = ToNumberFunction;
        assert_eq!(
            f.eval(&ctx(), &[Value::string("9.4")]),
            Some(Value::Number(9.4))
        );
        assert_eq!(f.eval(&ctx(), &[Value::Nil]), None);
    }

    #[test]
    fn test_tobool() {
        let f = ToBoolFunction;
        assert_eq!(
            f.eval(&ctx(), &[Value::string("true")]),
            Some(Value::Bool(true))
        );
        assert_eq!(f.eval(&ctx(), &[Value::Int(0)]), Some(Value::Bool(false)));
        assert_eq!(f.eval(&ctx(), &[Value::string("maybe")]), None);
    }

    #[test]
    fn test_todate() {
        let f = ToDateFunction;
        match f.eval(&ctx(), &[Value::string("1/1/2015")]) {
            Some(Value::Time(t)) => assert_eq!((t.year(), t.month(), t.day()), (2015, 1, 1)),
            other => panic!("expected time, got {:?}", other),
        }
        assert!(f.eval(&ctx(), &[Value::string("now-1d")]).is_some());
        assert_eq!(f.eval(&ctx(), &[Value::string("nope")]), None);
    }
}
