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

//! Optimizer correctness: reordering must preserve truth

use std::collections::HashMap;

use chrono::Utc;

use siftql::{
    matches, optimize_boolean_nodes, IncluderContext, MapContext, MapIncluder, Node, Operator,
    SharedIncludeNodes, Value,
};

fn includer() -> MapIncluder {
    let mut inc = MapIncluder::new();
    inc.add(
        "is_yoda",
        Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda")),
    );
    inc.add(
        "heavy",
        Node::and(vec![
            Node::binary(Operator::Gt, Node::identity("zip"), Node::int(0)),
            Node::or(vec![
                Node::binary(Operator::Gt, Node::identity("zip"), Node::int(10000)),
                Node::binary(Operator::Lt, Node::identity("zip"), Node::int(100)),
            ]),
        ]),
    );
    inc
}

fn contexts() -> Vec<MapContext> {
    let now = Utc::now();
    let base = |pairs: Vec<(&str, Value)>| {
        MapContext::with_ts(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
            now,
        )
    };

    vec![
        base(vec![
            ("name", Value::string("Yoda")),
            ("zip", Value::Int(5)),
            ("roles", Value::from(vec!["admin", "api"])),
        ]),
        base(vec![
            ("name", Value::string("Rey")),
            ("zip", Value::Int(50000)),
        ]),
        base(vec![("zip", Value::Int(0))]),
        base(vec![]),
    ]
}

fn corpus() -> Vec<Node> {
    let cmp = |op, ident: &str, rhs| Node::binary(op, Node::identity(ident), rhs);

    vec![
        Node::and(vec![
            Node::or(vec![
                cmp(Operator::Gt, "zip", Node::int(10000)),
                cmp(Operator::Lt, "zip", Node::int(100)),
                cmp(Operator::Eq, "name", Node::str("Yoda")),
            ]),
            Node::exists("name"),
        ]),
        Node::or(vec![
            Node::and(vec![
                cmp(Operator::Gt, "zip", Node::int(0)),
                cmp(Operator::Eq, "name", Node::str("Rey")),
            ]),
            Node::exists("roles"),
            Node::include("is_yoda"),
        ]),
        Node::boolean(
            Operator::And,
            vec![
                Node::include("heavy"),
                cmp(Operator::Eq, "name", Node::str("Yoda")),
            ],
            true,
        ),
        Node::and(vec![
            Node::include("is_yoda"),
            Node::include("is_yoda"),
            Node::exists("zip"),
        ]),
        Node::or(vec![
            Node::not_between(Node::identity("zip"), Node::int(1), Node::int(10)),
            Node::include("heavy"),
        ]),
    ]
}

#[test]
fn test_optimizer_preserves_truth() {
    let inc = includer();
    let mut shared = SharedIncludeNodes::new();

    for expr in corpus() {
        let optimized = optimize_boolean_nodes(&inc, &expr, &mut shared).unwrap();
        for ctx in contexts() {
            let ctx = IncluderContext::new(ctx, inc.clone());
            // Fresh copy per evaluation so lazy resolution state cannot
            // leak between the two runs.
            let plain = matches(&ctx, &expr.copy());
            let fast = matches(&ctx, &optimized);
            assert_eq!(plain, fast, "optimizer changed outcome of {}", expr);
        }
    }
}

#[test]
fn test_optimizer_orders_cheap_first() {
    let inc = includer();
    let mut shared = SharedIncludeNodes::new();

    let expr = Node::and(vec![
        Node::include("heavy"),
        Node::exists("name"),
    ]);
    let optimized = optimize_boolean_nodes(&inc, &expr, &mut shared).unwrap();
    match optimized {
        Node::Boolean(b) => {
            assert!(
                matches!(b.args[0], Node::Unary(_)),
                "exists should evaluate before the heavy include"
            );
        }
        other => panic!("expected boolean node, got {}", other),
    }
}

#[test]
fn test_repeated_includes_share_one_subtree() {
    let inc = includer();
    let mut shared = SharedIncludeNodes::new();

    let expr = Node::and(vec![
        Node::include("is_yoda"),
        Node::or(vec![Node::include("is_yoda"), Node::exists("zip")]),
    ]);
    let optimized = optimize_boolean_nodes(&inc, &expr, &mut shared).unwrap();

    let mut resolved = Vec::new();
    collect_resolved(&optimized, &mut resolved);
    assert_eq!(resolved.len(), 2);
    assert!(
        std::sync::Arc::ptr_eq(&resolved[0], &resolved[1]),
        "both references should share one subtree"
    );
    assert!(shared.get("is_yoda").is_some());
}

fn collect_resolved(node: &Node, out: &mut Vec<std::sync::Arc<Node>>) {
    match node {
        Node::Include(inc) => {
            if let Some(r) = inc.resolved() {
                out.push(std::sync::Arc::clone(r));
            }
        }
        Node::Boolean(b) => {
            for arg in &b.args {
                collect_resolved(arg, out);
            }
        }
        Node::Binary(b) => {
            collect_resolved(&b.lhs, out);
            collect_resolved(&b.rhs, out);
        }
        Node::Unary(u) => collect_resolved(&u.arg, out),
        _ => {}
    }
}
