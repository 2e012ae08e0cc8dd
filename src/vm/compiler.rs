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

//! Compiled fast-path evaluator
//!
//! Lowers each AST node to a closure capturing its child closures, so hot
//! filters evaluate with no tree walking. Operator application goes through
//! the same helpers as the tree walker, which is what keeps the two
//! evaluators semantically identical.
//!
//! Compiled programs cache under a 64-bit hash of the node's canonical
//! string form. The cache is process-lifetime and unbounded; the lock is
//! reader-preferred and writes are short. The first compile for a key wins.

use std::hash::Hasher;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::core::{Error, Result, Value};
use crate::expr::context::EvalContext;
use crate::expr::node::{Node, Operator};

use super::{
    apply_between, apply_unary, eval, eval_binary_values, matches, walk_include_compiled,
};

/// A compiled evaluation function.
pub type EvalFn = Arc<dyn Fn(&dyn EvalContext) -> Option<Value> + Send + Sync>;

/// A compiled expression: the canonical form it was compiled from plus the
/// closure tree.
pub struct CompiledExpr {
    /// Canonical string of the source node; the cache key derives from it.
    pub canonical: String,
    /// The evaluation entry point.
    pub eval_fn: EvalFn,
}

impl CompiledExpr {
    /// Evaluate against a context.
    pub fn eval(&self, ctx: &dyn EvalContext) -> Option<Value> {
        (self.eval_fn)(ctx)
    }
}

/// Compiles expression nodes to closures, caching by fingerprint.
pub struct ExprCompiler {
    cache: RwLock<FxHashMap<u64, Arc<CompiledExpr>>>,
}

impl Default for ExprCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprCompiler {
    pub fn new() -> Self {
        ExprCompiler {
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Compile a node, consulting the fingerprint cache first.
    pub fn compile(&self, node: &Node) -> Result<Arc<CompiledExpr>> {
        let canonical = node.to_string();
        let key = fingerprint(&canonical);

        if let Some(hit) = self.cache.read().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(CompiledExpr {
            canonical,
            eval_fn: compile_node(node)?,
        });

        let mut cache = self.cache.write();
        Ok(Arc::clone(cache.entry(key).or_insert(compiled)))
    }

    /// Number of cached programs.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

/// High-level facade: compile when possible, fall back to the tree walker
/// transparently when not.
pub struct CompiledEvaluator {
    compiler: ExprCompiler,
}

impl Default for CompiledEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl CompiledEvaluator {
    pub fn new() -> Self {
        CompiledEvaluator {
            compiler: ExprCompiler::new(),
        }
    }

    /// Evaluate a node, compiled when supported.
    pub fn eval_node(&self, ctx: &dyn EvalContext, node: &Node) -> Option<Value> {
        match self.compiler.compile(node) {
            Ok(compiled) => compiled.eval(ctx),
            Err(_) => eval(ctx, node),
        }
    }

    /// Match decision for a boolean-valued expression.
    pub fn matches(&self, ctx: &dyn EvalContext, node: &Node) -> Option<bool> {
        if let Node::Identity(id) = node {
            if id.text == "*" || id.text == "match_all" {
                return Some(true);
            }
        }
        match self.compiler.compile(node) {
            Ok(compiled) => match compiled.eval(ctx)? {
                Value::Bool(b) => Some(b),
                _ => Some(false),
            },
            Err(_) => matches(ctx, node),
        }
    }

    /// Number of cached programs.
    pub fn cached(&self) -> usize {
        self.compiler.cached()
    }
}

/// 64-bit fingerprint of a canonical string form.
fn fingerprint(canonical: &str) -> u64 {
    let mut h = FxHasher::default();
    h.write(canonical.as_bytes());
    h.finish()
}

// ============================================================================
// Lowering
// ============================================================================

fn compile_node(node: &Node) -> Result<EvalFn> {
    match node {
        Node::Number(n) => {
            let value = if n.is_int {
                Value::Int(n.int_value)
            } else {
                Value::Number(n.float_value)
            };
            Ok(Arc::new(move |_ctx| Some(value.clone())))
        }

        Node::String(n) => {
            let value = Value::string(&n.text);
            Ok(Arc::new(move |_ctx| Some(value.clone())))
        }

        Node::Null => Ok(Arc::new(|_ctx| Some(Value::Nil))),

        Node::Value(n) => {
            if matches!(n.value, Value::Nil) {
                return Ok(Arc::new(|_ctx| None));
            }
            let value = n.value.clone();
            Ok(Arc::new(move |_ctx| Some(value.clone())))
        }

        Node::Identity(n) => {
            if n.is_boolean_identity() {
                let b = n.as_bool();
                return Ok(Arc::new(move |_ctx| Some(Value::Bool(b))));
            }
            let id = n.clone();
            Ok(Arc::new(move |ctx| {
                if let Some(v) = ctx.get(&id.text) {
                    return Some(v);
                }
                let (left, right) = id.left_right()?;
                ctx.get(left)?.get_key(right)
            }))
        }

        Node::Binary(n) => {
            let lhs = compile_node(&n.lhs)?;
            let rhs = compile_node(&n.rhs)?;
            let op = n.op;
            Ok(Arc::new(move |ctx| {
                eval_binary_values(op, lhs(ctx), rhs(ctx), ctx.ts())
            }))
        }

        Node::Boolean(n) => {
            let and = match n.op {
                Operator::And => true,
                Operator::Or => false,
                other => return Err(Error::UnknownOp(other.to_string())),
            };
            let args: Vec<EvalFn> = n
                .args
                .iter()
                .map(compile_node)
                .collect::<Result<Vec<_>>>()?;
            let negated = n.negated;
            Ok(Arc::new(move |ctx| {
                for arg in &args {
                    match arg(ctx) {
                        Some(Value::Bool(m)) => {
                            if !and && m {
                                return Some(Value::Bool(!negated));
                            }
                            if and && !m {
                                return Some(Value::Bool(negated));
                            }
                        }
                        // Unevaluable or non-boolean: fatal for AND,
                        // skipped for OR.
                        _ if and => return None,
                        _ => continue,
                    }
                }
                let outcome = if negated { !and } else { and };
                Some(Value::Bool(outcome))
            }))
        }

        Node::Unary(n) => {
            let arg = compile_node(&n.arg)?;
            let op = n.op;
            Ok(Arc::new(move |ctx| apply_unary(op, arg(ctx))))
        }

        Node::Tri(n) => {
            if n.op != Operator::Between {
                return Err(Error::UnknownOp(n.op.to_string()));
            }
            let subject = compile_node(&n.args[0])?;
            let low = compile_node(&n.args[1])?;
            let high = compile_node(&n.args[2])?;
            let negated = n.negated;
            Ok(Arc::new(move |ctx| {
                let a = subject(ctx)?;
                let b = low(ctx)?;
                let c = high(ctx)?;
                apply_between(&a, &b, &c, negated, ctx.ts())
            }))
        }

        Node::Array(n) => {
            let args: Vec<EvalFn> = n
                .args
                .iter()
                .map(compile_node)
                .collect::<Result<Vec<_>>>()?;
            Ok(Arc::new(move |ctx| {
                let vals = args
                    .iter()
                    .map(|arg| arg(ctx).unwrap_or(Value::Nil))
                    .collect();
                Some(Value::Slice(vals))
            }))
        }

        Node::Func(n) => {
            let args: Vec<EvalFn> = n
                .args
                .iter()
                .map(compile_node)
                .collect::<Result<Vec<_>>>()?;
            let f = Arc::clone(&n.f);
            Ok(Arc::new(move |ctx| {
                let vals: Vec<Value> = args
                    .iter()
                    .map(|arg| arg(ctx).unwrap_or(Value::Nil))
                    .collect();
                f.eval(ctx, &vals)
            }))
        }

        Node::Include(n) => {
            // The cloned node shares any already-resolved referent; an
            // unresolved one resolves lazily within the closure's copy.
            let inc = n.clone();
            Ok(Arc::new(move |ctx| walk_include_compiled(ctx, &inc)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::context::MapContext;
    use std::collections::HashMap;

    fn ctx() -> MapContext {
        MapContext::new(HashMap::from([
            ("name".to_string(), Value::string("Yoda")),
            ("zip".to_string(), Value::Int(5)),
        ]))
    }

    #[test]
    fn test_cache_hit_returns_same_program() {
        let compiler = ExprCompiler::new();
        let n = Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda"));
        let first = compiler.compile(&n).unwrap();
        let second = compiler.compile(&n).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(compiler.cached(), 1);

        // Structurally identical nodes share a fingerprint.
        let again = Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda"));
        let third = compiler.compile(&again).unwrap();
        assert!(Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_compiled_matches() {
        let ev = CompiledEvaluator::new();
        let n = Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda"));
        assert_eq!(ev.matches(&ctx(), &n), Some(true));

        let n = Node::binary(Operator::Eq, Node::identity("name"), Node::str("yoda"));
        assert_eq!(ev.matches(&ctx(), &n), Some(false));
    }

    #[test]
    fn test_match_all_identity() {
        let ev = CompiledEvaluator::new();
        assert_eq!(ev.matches(&ctx(), &Node::identity("*")), Some(true));
        assert_eq!(ev.matches(&ctx(), &Node::identity("match_all")), Some(true));
    }

    #[test]
    fn test_unsupported_falls_back() {
        // A ternary with a non-BETWEEN operator cannot compile; the facade
        // must fall back to the walker instead of erroring.
        let n = Node::Tri(crate::expr::node::TriNode {
            op: Operator::In,
            args: [
                Box::new(Node::identity("zip")),
                Box::new(Node::int(1)),
                Box::new(Node::int(10)),
            ],
            negated: false,
        });
        let compiler = ExprCompiler::new();
        assert!(compiler.compile(&n).is_err());

        let ev = CompiledEvaluator::new();
        // The walker also rejects the operator, so the result is a
        // non-match either way; the point is no panic and no compile error
        // escaping.
        assert_eq!(ev.eval_node(&ctx(), &n), None);
    }
}
