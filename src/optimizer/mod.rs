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

//! Boolean-argument optimizer
//!
//! Reorders AND/OR arguments so cheaper subtrees evaluate first (subtree
//! node count as the cost proxy), letting short-circuit evaluation bail
//! sooner. Include references resolve during the pass, and repeated names
//! share one resolved subtree through a caller-owned cache, cutting the
//! memory of optimized trees that include the same filters.
//!
//! The input tree is never mutated; the optimizer works on a deep copy.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{Error, Result};
use crate::expr::context::Includer;
use crate::expr::node::Node;
use crate::vm::MAX_DEPTH;

struct SharedNode {
    node_count: u64,
    node: Arc<Node>,
}

/// Cache of already-optimized include subtrees, keyed by include name.
///
/// Caller-owned so sharing extends across multiple optimized expressions;
/// the caller is responsible for thread safety.
#[derive(Default)]
pub struct SharedIncludeNodes {
    data: FxHashMap<String, SharedNode>,
}

impl SharedIncludeNodes {
    pub fn new() -> Self {
        SharedIncludeNodes::default()
    }

    /// The shared subtree for an include name, when one has been built.
    pub fn get(&self, name: &str) -> Option<&Arc<Node>> {
        self.data.get(name).map(|s| &s.node)
    }

    /// Number of cached include subtrees.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Optimize boolean nodes by sorting their arguments by subtree size.
///
/// Returns an optimized deep copy; ties keep their original order. Every
/// include resolves during the pass, and a missing one aborts with
/// [`Error::IncludeNotFound`].
pub fn optimize_boolean_nodes(
    includer: &dyn Includer,
    node: &Node,
    shared: &mut SharedIncludeNodes,
) -> Result<Node> {
    let mut optimized = node.copy();
    optimize_depth(includer, &mut optimized, 0, shared)?;
    Ok(optimized)
}

/// Returns the node count of the subtree rooted at `node`, reordering
/// boolean arguments as it goes.
fn optimize_depth(
    includer: &dyn Includer,
    node: &mut Node,
    depth: usize,
    shared: &mut SharedIncludeNodes,
) -> Result<u64> {
    if depth > MAX_DEPTH {
        return Err(Error::MaxDepth);
    }
    let mut result = 1u64;
    match node {
        Node::Boolean(n) => {
            let mut weighted: Vec<(u64, Node)> = Vec::with_capacity(n.args.len());
            for mut arg in n.args.drain(..) {
                let sub = optimize_depth(includer, &mut arg, depth + 1, shared)?;
                result += sub;
                weighted.push((sub, arg));
            }
            // Stable: equal-cost arguments keep their original order.
            weighted.sort_by_key(|(count, _)| *count);
            n.args = weighted.into_iter().map(|(_, arg)| arg).collect();
        }
        Node::Binary(n) => {
            result += optimize_depth(includer, &mut n.lhs, depth + 1, shared)?;
            result += optimize_depth(includer, &mut n.rhs, depth + 1, shared)?;
        }
        Node::Unary(n) => {
            result += optimize_depth(includer, &mut n.arg, depth + 1, shared)?;
        }
        Node::Tri(n) => {
            for arg in n.args.iter_mut() {
                result += optimize_depth(includer, arg, depth + 1, shared)?;
            }
        }
        Node::Array(n) => {
            for arg in n.args.iter_mut() {
                result += optimize_depth(includer, arg, depth + 1, shared)?;
            }
        }
        Node::Func(n) => {
            for arg in n.args.iter_mut() {
                result += optimize_depth(includer, arg, depth + 1, shared)?;
            }
        }
        Node::Include(inc) => {
            let name = inc.identity.text.clone();
            if let Some(hit) = shared.data.get(&name) {
                inc.set_resolved(Arc::clone(&hit.node));
                result += hit.node_count;
            } else {
                let referent = includer.include(&name)?;
                let mut copy = referent.copy();
                let sub = optimize_depth(includer, &mut copy, depth + 1, shared)?;
                let shared_node = Arc::new(copy);
                shared.data.insert(
                    name,
                    SharedNode {
                        node_count: sub,
                        node: Arc::clone(&shared_node),
                    },
                );
                inc.set_resolved(shared_node);
                result += sub;
            }
        }
        Node::Identity(_) | Node::Number(_) | Node::String(_) | Node::Null | Node::Value(_) => {}
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::context::MapIncluder;
    use crate::expr::node::Operator;

    fn heavy_light_tree() -> Node {
        // The OR's heavy argument comes first in source order.
        Node::or(vec![
            Node::and(vec![
                Node::binary(Operator::Gt, Node::identity("zip"), Node::int(10000)),
                Node::binary(Operator::Lt, Node::identity("zip"), Node::int(100)),
                Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda")),
            ]),
            Node::exists("q"),
        ])
    }

    #[test]
    fn test_cheaper_argument_moves_first() {
        let includer = MapIncluder::new();
        let mut shared = SharedIncludeNodes::new();
        let optimized =
            optimize_boolean_nodes(&includer, &heavy_light_tree(), &mut shared).unwrap();

        match optimized {
            Node::Boolean(b) => {
                assert!(matches!(b.args[0], Node::Unary(_)), "light arg should lead");
                assert!(matches!(b.args[1], Node::Boolean(_)));
            }
            other => panic!("expected boolean node, got {}", other),
        }
    }

    #[test]
    fn test_original_tree_untouched() {
        let includer = MapIncluder::new();
        let mut shared = SharedIncludeNodes::new();
        let original = heavy_light_tree();
        let rendered = original.to_string();
        let _ = optimize_boolean_nodes(&includer, &original, &mut shared).unwrap();
        assert_eq!(original.to_string(), rendered);
    }

    #[test]
    fn test_stable_order_for_ties() {
        let includer = MapIncluder::new();
        let mut shared = SharedIncludeNodes::new();
        let tree = Node::and(vec![
            Node::binary(Operator::Eq, Node::identity("a"), Node::int(1)),
            Node::binary(Operator::Eq, Node::identity("b"), Node::int(2)),
        ]);
        let optimized = optimize_boolean_nodes(&includer, &tree, &mut shared).unwrap();
        assert_eq!(optimized.to_string(), "AND ( a == 1, b == 2 )");
    }

    #[test]
    fn test_shared_includes_are_pointer_equal() {
        let mut includer = MapIncluder::new();
        includer.add(
            "is_yoda",
            Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda")),
        );

        let mut shared = SharedIncludeNodes::new();
        let a = optimize_boolean_nodes(&includer, &Node::include("is_yoda"), &mut shared).unwrap();
        let b = optimize_boolean_nodes(&includer, &Node::include("is_yoda"), &mut shared).unwrap();

        let (ra, rb) = match (&a, &b) {
            (Node::Include(ia), Node::Include(ib)) => (
                Arc::clone(ia.resolved().unwrap()),
                Arc::clone(ib.resolved().unwrap()),
            ),
            _ => panic!("expected include nodes"),
        };
        assert!(Arc::ptr_eq(&ra, &rb));
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_missing_include_aborts() {
        let includer = MapIncluder::new();
        let mut shared = SharedIncludeNodes::new();
        let err =
            optimize_boolean_nodes(&includer, &Node::include("missing"), &mut shared).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_include_weight_counts_subtree() {
        let mut includer = MapIncluder::new();
        includer.add(
            "big",
            Node::and(vec![
                Node::binary(Operator::Gt, Node::identity("x"), Node::int(1)),
                Node::binary(Operator::Lt, Node::identity("y"), Node::int(2)),
            ]),
        );

        // INCLUDE big carries its resolved subtree's weight, so the bare
        // comparison should sort ahead of it.
        let tree = Node::and(vec![
            Node::include("big"),
            Node::binary(Operator::Eq, Node::identity("a"), Node::int(1)),
        ]);
        let mut shared = SharedIncludeNodes::new();
        let optimized = optimize_boolean_nodes(&includer, &tree, &mut shared).unwrap();
        match optimized {
            Node::Boolean(b) => {
                assert!(matches!(b.args[0], Node::Binary(_)));
                assert!(matches!(b.args[1], Node::Include(_)));
            }
            other => panic!("expected boolean node, got {}", other),
        }
    }
}
