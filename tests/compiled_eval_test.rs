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

//! Compiled evaluator equivalence with the tree walker
//!
//! Every (expression, context) pair in the corpus must produce identical
//! results from both evaluators.

use std::collections::HashMap;

use chrono::{Duration, TimeZone, Utc};

use siftql::{eval, matches, CompiledEvaluator, IncluderContext, MapContext, MapIncluder, Node, Operator, Value};

fn contexts() -> Vec<MapContext> {
    let t1 = Utc.with_ymd_and_hms(2015, 12, 18, 0, 0, 0).unwrap();
    let now = Utc::now();

    vec![
        MapContext::with_ts(
            HashMap::from([
                ("name".to_string(), Value::string("Yoda")),
                ("zip".to_string(), Value::Int(5)),
                ("bankamount".to_string(), Value::Number(55.5)),
                ("roles".to_string(), Value::from(vec!["admin", "api"])),
                ("created".to_string(), Value::Time(t1)),
                (
                    "hits".to_string(),
                    Value::MapInt(HashMap::from([("foo".to_string(), 5i64)])),
                ),
                (
                    "transactions".to_string(),
                    Value::Slice(vec![
                        Value::Time(now - Duration::hours(24)),
                        Value::Time(now + Duration::hours(24)),
                    ]),
                ),
            ]),
            now,
        ),
        MapContext::with_ts(
            HashMap::from([
                ("name".to_string(), Value::string("Rey")),
                ("zip".to_string(), Value::Int(99999)),
                ("authenticated".to_string(), Value::Bool(false)),
            ]),
            now,
        ),
        // Empty context: everything is a missing field.
        MapContext::with_ts(HashMap::new(), now),
    ]
}

fn corpus() -> Vec<Node> {
    let cmp = |op, ident: &str, rhs| Node::binary(op, Node::identity(ident), rhs);
    let strs = |items: &[&str]| Node::array(items.iter().map(|s| Node::str(*s)).collect());

    vec![
        cmp(Operator::Eq, "name", Node::str("Yoda")),
        cmp(Operator::Ne, "name", Node::str("yoda")),
        cmp(Operator::Gt, "zip", Node::int(4)),
        cmp(Operator::Gt, "zip", Node::str("4.5")),
        cmp(Operator::Gt, "bankamount", Node::str("50")),
        cmp(Operator::Like, "name", Node::str("*da")),
        cmp(Operator::Contains, "name", Node::str("od")),
        cmp(Operator::In, "roles", strs(&["user", "api"])),
        cmp(Operator::Intersects, "hits", strs(&["foo", "bar"])),
        cmp(Operator::In, "not_a_field", strs(&["Yoda"])),
        cmp(Operator::Lt, "transactions", Node::str("now-1h")),
        cmp(Operator::Lt, "created", Node::str("now-1d")),
        Node::binary(Operator::Eq, Node::str("Yoda"), Node::identity("name")),
        Node::binary(Operator::Ne, Node::identity("providers.id"), Node::Null),
        Node::binary(Operator::Plus, Node::identity("zip"), Node::int(2)),
        Node::binary(Operator::Divide, Node::identity("zip"), Node::int(0)),
        Node::binary(Operator::Plus, Node::identity("not_a_field"), Node::str("x")),
        Node::binary(Operator::Or, Node::identity("authenticated"), Node::identity("missing")),
        Node::not(cmp(Operator::Eq, "name", Node::str("Yoda"))),
        Node::unary(Operator::Minus, Node::identity("zip")),
        Node::exists("name"),
        Node::exists("nope"),
        Node::between(Node::identity("zip"), Node::int(1), Node::int(10)),
        Node::not_between(Node::identity("zip"), Node::int(1), Node::int(10)),
        Node::between(
            Node::identity("created"),
            Node::str("12/01/2015"),
            Node::str("01/01/2016"),
        ),
        Node::and(vec![
            cmp(Operator::Eq, "name", Node::str("Yoda")),
            cmp(Operator::Gt, "zip", Node::int(0)),
        ]),
        Node::or(vec![
            Node::exists("q"),
            Node::and(vec![
                cmp(Operator::Gt, "zip", Node::int(0)),
                Node::or(vec![
                    cmp(Operator::Gt, "zip", Node::int(10000)),
                    cmp(Operator::Lt, "zip", Node::int(100)),
                ]),
            ]),
            Node::not(cmp(Operator::Eq, "name", Node::str("Yoda"))),
        ]),
        Node::boolean(
            Operator::And,
            vec![
                cmp(Operator::Eq, "name", Node::str("Yoda")),
                cmp(Operator::Eq, "zip", Node::int(5)),
            ],
            true,
        ),
        Node::array(vec![Node::int(1), Node::identity("zip"), Node::str("x")]),
        Node::func("tolower", vec![Node::identity("name")]).unwrap(),
        Node::binary(
            Operator::Eq,
            Node::func("tolower", vec![Node::identity("name")]).unwrap(),
            Node::str("yoda"),
        ),
        Node::func("coalesce", vec![Node::identity("missing"), Node::identity("zip")]).unwrap(),
        Node::identity("true"),
        Node::identity("authenticated"),
        Node::Null,
        Node::str("now-1d"),
        Node::int(42),
        Node::float(5.5),
    ]
}

#[test]
fn test_compiled_equals_walked() {
    let compiled = CompiledEvaluator::new();
    for ctx in contexts() {
        for node in corpus() {
            let walked = eval(&ctx, &node);
            let fast = compiled.eval_node(&ctx, &node);
            assert_eq!(walked, fast, "divergence on {}", node);

            let walked_match = matches(&ctx, &node);
            let fast_match = compiled.matches(&ctx, &node);
            assert_eq!(walked_match, fast_match, "match divergence on {}", node);
        }
    }
}

#[test]
fn test_compiled_equals_walked_with_includes() {
    let mut includer = MapIncluder::new();
    includer.add(
        "is_yoda",
        Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda")),
    );
    includer.add("everything", Node::identity("*"));

    let exprs = vec![
        Node::include("is_yoda"),
        Node::not_include("is_yoda"),
        Node::include("everything"),
        Node::not_include("no_such_filter"),
        Node::and(vec![Node::exists("name"), Node::include("is_yoda")]),
    ];

    let compiled = CompiledEvaluator::new();
    for ctx in contexts() {
        let ctx = IncluderContext::new(ctx, includer.clone());
        for node in exprs.iter() {
            // Fresh copies so both evaluators resolve from scratch.
            let walked = matches(&ctx, &node.copy());
            let fast = compiled.matches(&ctx, &node.copy());
            assert_eq!(walked, fast, "include divergence on {}", node);
        }
    }
}

#[test]
fn test_repeated_evaluation_uses_cache() {
    let compiled = CompiledEvaluator::new();
    let ctx = &contexts()[0];
    let node = Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda"));

    for _ in 0..100 {
        assert_eq!(compiled.matches(ctx, &node), Some(true));
    }
    assert_eq!(compiled.cached(), 1);
}
