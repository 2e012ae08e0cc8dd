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

//! Comparison and utility functions

use crate::core::{values_equal, Result, Value, ValueType};
use crate::expr::context::EvalContext;
use crate::expr::node::FuncNode;

use super::super::{expect_args, ScalarFunction};

/// `eq(a, b)` - kind-aware equality
#[derive(Debug, Default)]
pub struct EqFunction;

impl ScalarFunction for EqFunction {
    fn name(&self) -> &'static str {
        "eq"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 2, 2)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        values_equal(args.first()?, args.get(1)?)
            .ok()
            .map(Value::Bool)
    }
}

/// `ne(a, b)` - negated equality
#[derive(Debug, Default)]
pub struct NeFunction;

impl ScalarFunction for NeFunction {
    fn name(&self) -> &'static str {
        "ne"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 2, 2)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        values_equal(args.first()?, args.get(1)?)
            .ok()
            .map(|eq| Value::Bool(!eq))
    }
}

macro_rules! ordered_fn {
    ($struct_name:ident, $fn_name:literal, $op:tt) => {
        #[doc = concat!("`", $fn_name, "(a, b)` - numeric comparison")]
        #[derive(Debug, Default)]
        pub struct $struct_name;

        impl ScalarFunction for $struct_name {
            fn name(&self) -> &'static str {
                $fn_name
            }

            fn return_type(&self) -> ValueType {
                ValueType::Bool
            }

            fn validate(&self, node: &FuncNode) -> Result<()> {
                expect_args(self.name(), node, 2, 2)
            }

            fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
                let a = args.first()?.as_float()?;
                let b = args.get(1)?.as_float()?;
                Some(Value::Bool(a $op b))
            }
        }
    };
}

ordered_fn!(GtFunction, "gt", >);
ordered_fn!(GeFunction, "ge", >=);
ordered_fn!(LtFunction, "lt", <);
ordered_fn!(LeFunction, "le", <=);

/// `not(v)` - boolean negation
#[derive(Debug, Default)]
pub struct NotFunction;

impl ScalarFunction for NotFunction {
    fn name(&self) -> &'static str {
        "not"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        args.first()?.to_bool().map(|b| Value::Bool(!b))
    }
}

/// `exists(v)` - true when the argument evaluated to a non-nil value
#[derive(Debug, Default)]
pub struct ExistsFunction;

impl ScalarFunction for ExistsFunction {
    fn name(&self) -> &'static str {
        "exists"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Bool
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, 1)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        Some(Value::Bool(!args.first()?.is_nil()))
    }
}

/// `coalesce(v1, v2, ...)` - the first non-nil argument
#[derive(Debug, Default)]
pub struct CoalesceFunction;

impl ScalarFunction for CoalesceFunction {
    fn name(&self) -> &'static str {
        "coalesce"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Unknown
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 1, usize::MAX)
    }

    fn eval(&self, _ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        args.iter()
            .find(|v| !v.is_nil() && !v.is_err())
            .cloned()
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
    fn test_eq_ne() {
        assert_eq!(
            EqFunction.eval(&ctx(), &[Value::Int(5), Value::Number(5.0)]),
            Some(Value::Bool(true))
        );
        assert_eq!(
            NeFunction.eval(&ctx(), &[Value::string("a"), Value::string("b")]),
            Some(Value::Bool(true))
        );
        // Missing argument arrives as Nil: not equal to a real value.
        assert_eq!(
            EqFunction.eval(&ctx(), &[Value::Nil, Value::Int(5)]),
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn test_ordered() {
        assert_eq!(
            GtFunction.eval(&ctx(), &[Value::Int(5), Value::Int(3)]),
            Some(Value::Bool(true))
        );
        assert_eq!(
            LeFunction.eval(&ctx(), &[Value::string("2"), Value::Int(3)]),
            Some(Value::Bool(true))
        );
        assert_eq!(GtFunction.eval(&ctx(), &[Value::Nil, Value::Int(3)]), None);
    }

    #[test]
    fn test_not() {
        assert_eq!(
            NotFunction.eval(&ctx(), &[Value::Bool(true)]),
            Some(Value::Bool(false))
        );
        assert_eq!(NotFunction.eval(&ctx(), &[Value::Slice(vec![])]), None);
    }

    #[test]
    fn test_exists() {
        assert_eq!(
            ExistsFunction.eval(&ctx(), &[Value::Int(5)]),
            Some(Value::Bool(true))
        );
        assert_eq!(
            ExistsFunction.eval(&ctx(), &[Value::Nil]),
            Some(Value::Bool(false))
        );
        assert_eq!(
            ExistsFunction.eval(&ctx(), &[Value::string("")]),
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn test_coalesce() {
        assert_eq!(
            CoalesceFunction.eval(
                &ctx(),
                &[Value::Nil, Value::string(""), Value::Int(7), Value::Int(9)]
            ),
            Some(Value::Int(7))
        );
        assert_eq!(CoalesceFunction.eval(&ctx(), &[Value::Nil]), None);
    }
}
