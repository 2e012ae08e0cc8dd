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

//! Date/time functions
//!
//! `now()` reads the row's logical timestamp, not the wall clock, so
//! evaluation stays deterministic.

use chrono::Datelike;

use crate::core::{Result, Value, ValueType};
use crate::expr::context::EvalContext;
use crate::expr::node::FuncNode;

use super::super::{expect_args, ScalarFunction};

/// `now()` - the row's logical timestamp
#[derive(Debug, Default)]
pub struct NowFunction;

impl ScalarFunction for NowFunction {
    fn name(&self) -> &'static str {
        "now"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Time
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 0, 0)
    }

    fn eval(&self, ctx: &dyn EvalContext, _args: &[Value]) -> Option<Value> {
        Some(Value::Time(ctx.ts()))
    }
}

/// `year(v?)` - the year of the argument, or of the row timestamp
#[derive(Debug, Default)]
pub struct YearFunction;

impl ScalarFunction for YearFunction {
    fn name(&self) -> &'static str {
        "year"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Int
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 0, 1)
    }

    fn eval(&self, ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        let t = match args.first() {
            Some(v) => v.to_time()?,
            None => ctx.ts(),
        };
        Some(Value::Int(t.year() as i64))
    }
}

/// `yy(v?)` - two-digit year of the argument, or of the row timestamp
#[derive(Debug, Default)]
pub struct YyFunction;

impl ScalarFunction for YyFunction {
    fn name(&self) -> &'static str {
        "yy"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Int
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 0, 1)
    }

    fn eval(&self, ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        let t = match args.first() {
            Some(v) => v.to_time()?,
            None => ctx.ts(),
        };
        Some(Value::Int((t.year() % 100) as i64))
    }
}

/// `epochms(v?)` - epoch milliseconds of the argument, or of the row
/// timestamp
#[derive(Debug, Default)]
pub struct EpochMsFunction;

impl ScalarFunction for EpochMsFunction {
    fn name(&self) -> &'static str {
        "epochms"
    }

    fn return_type(&self) -> ValueType {
        ValueType::Int
    }

    fn validate(&self, node: &FuncNode) -> Result<()> {
        expect_args(self.name(), node, 0, 1)
    }

    fn eval(&self, ctx: &dyn EvalContext, args: &[Value]) -> Option<Value> {
        let t = match args.first() {
            Some(v) => v.to_time()?,
            None => ctx.ts(),
        };
        Some(Value::Int(t.timestamp_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::context::MapContext;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    #[test]
    fn test_now_uses_row_ts() {
        let ts = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let ctx = MapContext::with_ts(HashMap::new(), ts);
        assert_eq!(NowFunction.eval(&ctx, &[]), Some(Value::Time(ts)));
    }

    #[test]
    fn test_year() {
        let ts = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let ctx = MapContext::with_ts(HashMap::new(), ts);
        assert_eq!(YearFunction.eval(&ctx, &[]), Some(Value::Int(2020)));
        assert_eq!(
            YearFunction.eval(&ctx, &[Value::string("2015-12-18")]),
            Some(Value::Int(2015))
        );
        assert_eq!(YearFunction.eval(&ctx, &[Value::Bool(true)]), None);
    }

    #[test]
    fn test_yy() {
        let ts = Utc.with_ymd_and_hms(2016, 5, 1, 12, 0, 0).unwrap();
        let ctx = MapContext::with_ts(HashMap::new(), ts);
        assert_eq!(YyFunction.eval(&ctx, &[]), Some(Value::Int(16)));
        assert_eq!(
            YyFunction.eval(&ctx, &[Value::string("2009-01-01")]),
            Some(Value::Int(9))
        );
        assert_eq!(YyFunction.eval(&ctx, &[Value::Bool(true)]), None);
    }

    #[test]
    fn test_epochms() {
        let ts = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let ctx = MapContext::with_ts(HashMap::new(), ts);
        assert_eq!(
            EpochMsFunction.eval(&ctx, &[]),
            Some(Value::Int(ts.timestamp_millis()))
        );
        assert_eq!(
            EpochMsFunction.eval(&ctx, &[Value::Time(ts)]),
            Some(Value::Int(ts.timestamp_millis()))
        );
        assert_eq!(EpochMsFunction.eval(&ctx, &[Value::Bool(true)]), None);
    }
}
