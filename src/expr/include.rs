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

//! Include resolution and inlining
//!
//! `INCLUDE <name>` nodes reference other filter statements. They resolve
//! in one of two ways: [`resolve_includes`] back-fills each node's referent
//! slot in place so runtime evaluation never consults the includer again,
//! while [`inline_includes`] rewrites the tree, embedding a deep copy of
//! every referenced expression.
//!
//! Both walks detect reference cycles through a visit stack and enforce a
//! nesting budget independent of the evaluator's node-depth guard.

use tracing::debug;

use crate::core::{Error, Result};
use crate::vm::MAX_DEPTH;

use super::context::Includer;
use super::node::{IncludeNode, Node, TriNode};

/// Maximum nesting of include resolutions. A chain deeper than this is
/// treated the same as a cycle.
pub const MAX_INCLUDE_DEPTH: usize = 100;

/// Resolve every include reference in `node`, in place.
///
/// Each `IncludeNode` with an unset referent asks the includer for the
/// named expression, recursively resolves it, then back-fills the slot.
/// Calling this twice is a no-op after the first success.
pub fn resolve_includes(includer: &dyn Includer, node: &Node) -> Result<()> {
    let mut visited = Vec::new();
    resolve_depth(includer, node, 0, &mut visited)
}

pub(crate) fn resolve_depth(
    includer: &dyn Includer,
    node: &Node,
    depth: usize,
    visited: &mut Vec<String>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::MaxDepth);
    }
    match node {
        Node::Binary(n) => {
            resolve_depth(includer, &n.lhs, depth + 1, visited)?;
            resolve_depth(includer, &n.rhs, depth + 1, visited)
        }
        Node::Boolean(n) => {
            for arg in &n.args {
                resolve_depth(includer, arg, depth + 1, visited)?;
            }
            Ok(())
        }
        Node::Unary(n) => resolve_depth(includer, &n.arg, depth + 1, visited),
        Node::Tri(n) => {
            for arg in &n.args {
                resolve_depth(includer, arg, depth + 1, visited)?;
            }
            Ok(())
        }
        Node::Array(n) => {
            for arg in &n.args {
                resolve_depth(includer, arg, depth + 1, visited)?;
            }
            Ok(())
        }
        Node::Func(n) => {
            for arg in &n.args {
                resolve_depth(includer, arg, depth + 1, visited)?;
            }
            Ok(())
        }
        Node::Include(inc) => resolve_include_node(includer, inc, depth + 1, visited),
        Node::Identity(_) | Node::Number(_) | Node::String(_) | Node::Null | Node::Value(_) => {
            Ok(())
        }
    }
}

/// Resolve one include node, guarding against cycles and runaway nesting.
pub(crate) fn resolve_include_node(
    includer: &dyn Includer,
    inc: &IncludeNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Result<()> {
    if inc.resolved().is_some() {
        return Ok(());
    }

    let name = inc.identity.text.clone();
    if visited.contains(&name) {
        return Err(Error::cycle(visited, &name));
    }
    if visited.len() >= MAX_INCLUDE_DEPTH {
        return Err(Error::MaxDepth);
    }

    let referent = includer.include(&name).map_err(|err| {
        debug!(include = %name, error = %err, "could not resolve include");
        err
    })?;

    visited.push(name);
    let outcome = resolve_depth(includer, &referent, depth + 1, visited);
    visited.pop();
    outcome?;

    inc.set_resolved(referent);
    Ok(())
}

/// Rewrite `node` into a new tree with every include reference replaced by
/// a deep copy of the referenced expression. A negated inclusion becomes a
/// `NOT (...)` wrapper around the embedded expression.
pub fn inline_includes(includer: &dyn Includer, node: &Node) -> Result<Node> {
    let mut visited = Vec::new();
    inline_depth(includer, node, 0, &mut visited)
}

fn inline_depth(
    includer: &dyn Includer,
    node: &Node,
    depth: usize,
    visited: &mut Vec<String>,
) -> Result<Node> {
    if depth > MAX_DEPTH {
        return Err(Error::MaxDepth);
    }
    match node {
        Node::Binary(n) => Ok(Node::binary(
            n.op,
            inline_depth(includer, &n.lhs, depth + 1, visited)?,
            inline_depth(includer, &n.rhs, depth + 1, visited)?,
        )),
        Node::Boolean(n) => {
            let mut args = Vec::with_capacity(n.args.len());
            for arg in &n.args {
                args.push(inline_depth(includer, arg, depth + 1, visited)?);
            }
            Ok(Node::boolean(n.op, args, n.negated))
        }
        Node::Unary(n) => Ok(Node::unary(
            n.op,
            inline_depth(includer, &n.arg, depth + 1, visited)?,
        )),
        Node::Tri(n) => Ok(Node::Tri(TriNode {
            op: n.op,
            args: [
                Box::new(inline_depth(includer, &n.args[0], depth + 1, visited)?),
                Box::new(inline_depth(includer, &n.args[1], depth + 1, visited)?),
                Box::new(inline_depth(includer, &n.args[2], depth + 1, visited)?),
            ],
            negated: n.negated,
        })),
        Node::Array(n) => {
            let mut args = Vec::with_capacity(n.args.len());
            for arg in &n.args {
                args.push(inline_depth(includer, arg, depth + 1, visited)?);
            }
            Ok(Node::array(args))
        }
        Node::Func(n) => {
            let mut args = Vec::with_capacity(n.args.len());
            for arg in &n.args {
                args.push(inline_depth(includer, arg, depth + 1, visited)?);
            }
            Ok(Node::func_with_impl(
                n.name.clone(),
                args,
                std::sync::Arc::clone(&n.f),
            ))
        }
        Node::Include(inc) => {
            let name = inc.identity.text.clone();
            if visited.contains(&name) {
                return Err(Error::cycle(visited, &name));
            }
            if visited.len() >= MAX_INCLUDE_DEPTH {
                return Err(Error::MaxDepth);
            }

            let referent = match inc.resolved() {
                Some(resolved) => std::sync::Arc::clone(resolved),
                None => includer.include(&name)?,
            };

            visited.push(name);
            let inlined = inline_depth(includer, &referent, depth + 1, visited);
            visited.pop();
            let inlined = inlined?;

            if inc.negated {
                Ok(Node::not(inlined))
            } else {
                Ok(inlined)
            }
        }
        leaf => Ok(leaf.copy()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::context::MapIncluder;
    use crate::expr::node::Operator;

    fn yoda_includer() -> MapIncluder {
        let mut inc = MapIncluder::new();
        inc.add(
            "is_yoda_true",
            Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda")),
        );
        inc.add(
            "nested_includes_yoda",
            Node::and(vec![
                Node::binary(Operator::Eq, Node::identity("planet"), Node::str("Dagobah")),
                Node::include("is_yoda_true"),
            ]),
        );
        inc
    }

    #[test]
    fn test_inline_no_includes_is_copy() {
        let inc = yoda_includer();
        let n = Node::binary(
            Operator::Lt,
            Node::identity("lastvisit_ts"),
            Node::str("now-1d"),
        );
        let out = inline_includes(&inc, &n).unwrap();
        assert_eq!(out, n);
        assert_eq!(out.to_string(), r#"lastvisit_ts < "now-1d""#);
    }

    #[test]
    fn test_inline_simple_include() {
        let inc = yoda_includer();
        let n = Node::and(vec![
            Node::binary(
                Operator::Lt,
                Node::identity("lastvisit_ts"),
                Node::str("now-1d"),
            ),
            Node::include("is_yoda_true"),
        ]);
        let out = inline_includes(&inc, &n).unwrap();
        assert_eq!(
            out.to_string(),
            r#"AND ( lastvisit_ts < "now-1d", name == "Yoda" )"#
        );
    }

    #[test]
    fn test_inline_negated_include() {
        let inc = yoda_includer();
        let n = Node::and(vec![
            Node::binary(
                Operator::Lt,
                Node::identity("lastvisit_ts"),
                Node::str("now-2d"),
            ),
            Node::not_include("is_yoda_true"),
        ]);
        let out = inline_includes(&inc, &n).unwrap();
        assert_eq!(
            out.to_string(),
            r#"AND ( lastvisit_ts < "now-2d", NOT (name == "Yoda") )"#
        );
    }

    #[test]
    fn test_inline_nested_negated_include() {
        let inc = yoda_includer();
        let n = Node::boolean(
            Operator::And,
            vec![
                Node::binary(
                    Operator::Lt,
                    Node::identity("lastvisit_ts"),
                    Node::str("now-3d"),
                ),
                Node::not_include("nested_includes_yoda"),
            ],
            true,
        );
        let out = inline_includes(&inc, &n).unwrap();
        assert_eq!(
            out.to_string(),
            r#"NOT AND ( lastvisit_ts < "now-3d", NOT (AND ( planet == "Dagobah", name == "Yoda" )) )"#
        );
    }

    #[test]
    fn test_inline_missing_include_errors() {
        let inc = yoda_includer();
        let n = Node::and(vec![Node::include("not_gonna_be_found")]);
        let err = inline_includes(&inc, &n).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_deep_chain_exhausts_budget() {
        let mut inc = MapIncluder::new();
        inc.add(
            "seg_0",
            Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda")),
        );
        for i in 1..120 {
            inc.add(
                format!("seg_{}", i),
                Node::and(vec![
                    Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda")),
                    Node::include(format!("seg_{}", i - 1)),
                ]),
            );
        }

        // Shallow chains resolve fine, even when pre-resolved pieces exist.
        let shallow = Node::include("seg_2");
        assert!(inline_includes(&inc, &shallow).is_ok());

        let deep = Node::include("seg_119");
        let err = inline_includes(&inc, &deep).unwrap_err();
        assert!(err.is_max_depth(), "got: {}", err);

        let err = resolve_includes(&inc, &deep).unwrap_err();
        assert!(err.is_max_depth(), "got: {}", err);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let inc = yoda_includer();
        let n = Node::and(vec![Node::include("nested_includes_yoda")]);
        resolve_includes(&inc, &n).unwrap();

        let first = match &n {
            Node::Boolean(b) => match &b.args[0] {
                Node::Include(i) => std::sync::Arc::clone(i.resolved().unwrap()),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        };

        resolve_includes(&inc, &n).unwrap();
        let second = match &n {
            Node::Boolean(b) => match &b.args[0] {
                Node::Include(i) => std::sync::Arc::clone(i.resolved().unwrap()),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        };
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cycle_detection() {
        let mut inc = MapIncluder::new();
        inc.add("a", Node::include("b"));
        inc.add("b", Node::include("a"));

        let n = Node::include("a");
        let err = resolve_includes(&inc, &n).unwrap_err();
        assert!(err.is_max_depth());
        assert!(err.to_string().contains("a->b->a"), "got: {}", err);

        let err = inline_includes(&inc, &n).unwrap_err();
        assert!(err.is_max_depth());
    }

    #[test]
    fn test_diamond_graph_is_not_a_cycle() {
        let mut inc = MapIncluder::new();
        inc.add(
            "a",
            Node::binary(Operator::Eq, Node::identity("name"), Node::str("bob")),
        );
        inc.add(
            "b",
            Node::and(vec![
                Node::binary(Operator::Eq, Node::identity("city"), Node::str("Peoria")),
                Node::include("a"),
            ]),
        );
        inc.add("z", Node::and(vec![Node::include("a"), Node::include("b")]));

        let n = Node::include("z");
        assert!(resolve_includes(&inc, &n).is_ok());
        assert!(inline_includes(&inc, &n).is_ok());
    }
}
