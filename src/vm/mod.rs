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

//! The expression virtual machine
//!
//! A recursive tree walker evaluating [`Node`] trees against a per-row
//! [`EvalContext`]. `None` means "could not evaluate" (missing variable,
//! type mismatch, divide by zero, missing include); boolean callers fold
//! that into the short-circuit rules rather than halting.
//!
//! The walker is re-entrant: one resolved tree may be evaluated from many
//! threads against distinct contexts.

pub mod compiler;
pub mod datemath;
pub mod pattern;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{values_equal, Error, Result, Value};
use crate::expr::context::EvalContext;
use crate::expr::include::resolve_include_node;
use crate::expr::node::{
    BinaryNode, BooleanNode, FuncNode, IncludeNode, Node, Operator, TriNode, UnaryNode,
};

use chrono::{DateTime, Utc};
use datemath::value_to_time_anchored;
use pattern::like_match;

/// Guard against runaway recursion in deep or self-referential trees.
pub const MAX_DEPTH: usize = 1000;

/// Evaluate the expression against the context.
///
/// `None` means the expression could not be evaluated; see the module docs
/// for how boolean parents treat that.
pub fn eval(ctx: &dyn EvalContext, node: &Node) -> Option<Value> {
    let mut visited = Vec::new();
    eval_depth(ctx, node, 0, &mut visited)
}

/// Evaluate a boolean-valued expression to a match decision.
///
/// A bare `*` / `match_all` identity matches everything. Non-boolean
/// results are a non-match; `None` propagates evaluation failure.
pub fn matches(ctx: &dyn EvalContext, node: &Node) -> Option<bool> {
    if let Node::Identity(id) = node {
        if id.text == "*" || id.text == "match_all" {
            return Some(true);
        }
    }
    match eval(ctx, node)? {
        Value::Bool(b) => Some(b),
        _ => Some(false),
    }
}

pub(crate) fn eval_depth(
    ctx: &dyn EvalContext,
    node: &Node,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<Value> {
    if depth > MAX_DEPTH {
        warn!(depth, "max depth exceeded during evaluation");
        return None;
    }

    match node {
        Node::Number(n) => {
            if n.is_int {
                Some(Value::Int(n.int_value))
            } else {
                Some(Value::Number(n.float_value))
            }
        }
        Node::String(n) => Some(Value::string(&n.text)),
        Node::Null => Some(Value::Nil),
        Node::Value(n) => match &n.value {
            Value::Nil => None,
            v => Some(v.clone()),
        },
        Node::Identity(n) => walk_identity(ctx, n),
        Node::Binary(n) => walk_binary(ctx, n, depth, visited),
        Node::Boolean(n) => walk_boolean(ctx, n, depth, visited),
        Node::Unary(n) => walk_unary(ctx, n, depth, visited),
        Node::Tri(n) => walk_ternary(ctx, n, depth, visited),
        Node::Array(n) => walk_array(ctx, n, depth, visited),
        Node::Func(n) => walk_func(ctx, n, depth, visited),
        Node::Include(n) => walk_include(ctx, n, depth + 1, visited),
    }
}

pub(crate) fn eval_bool(
    ctx: &dyn EvalContext,
    node: &Node,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<bool> {
    match eval_depth(ctx, node, depth, visited)? {
        Value::Bool(b) => Some(b),
        _ => None,
    }
}

// ============================================================================
// Identity
// ============================================================================

fn walk_identity(ctx: &dyn EvalContext, node: &crate::expr::node::IdentityNode) -> Option<Value> {
    // The true/false literals masquerade as identities.
    if node.is_boolean_identity() {
        return Some(Value::Bool(node.as_bool()));
    }
    if let Some(v) = ctx.get(&node.text) {
        return Some(v);
    }
    // Dotted fallback: left segment as a map, right segment as its key.
    let (left, right) = node.left_right()?;
    ctx.get(left)?.get_key(right)
}

// ============================================================================
// Boolean (n-ary AND / OR)
// ============================================================================

fn walk_boolean(
    ctx: &dyn EvalContext,
    node: &BooleanNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<Value> {
    let and = match node.op {
        Operator::And => true,
        Operator::Or => false,
        other => {
            warn!(op = %other, "unrecognized boolean operator");
            return None;
        }
    };

    for arg in &node.args {
        match eval_bool(ctx, arg, depth + 1, visited) {
            // An unevaluable AND argument short-circuits the whole
            // conjunction to a failure; OR just skips it.
            None if and => return None,
            None => continue,
            Some(m) => {
                if !and && m {
                    return Some(Value::Bool(!node.negated));
                }
                if and && !m {
                    return Some(Value::Bool(node.negated));
                }
            }
        }
    }

    // No short-circuit: AND means every argument was true, OR means none was.
    let outcome = if node.negated { !and } else { and };
    Some(Value::Bool(outcome))
}

// ============================================================================
// Binary
// ============================================================================

fn walk_binary(
    ctx: &dyn EvalContext,
    node: &BinaryNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<Value> {
    let lhs = eval_depth(ctx, &node.lhs, depth + 1, visited);
    let rhs = eval_depth(ctx, &node.rhs, depth + 1, visited);
    eval_binary_values(node.op, lhs, rhs, ctx.ts())
}

/// Apply a binary operator to two evaluation outcomes. This is the single
/// implementation both the walker and the compiled evaluator run.
pub(crate) fn eval_binary_values(
    op: Operator,
    lhs: Option<Value>,
    rhs: Option<Value>,
    ts: DateTime<Utc>,
) -> Option<Value> {
    match (lhs, rhs) {
        // Neither side evaluated.
        (None, None) => match op {
            Operator::Or
            | Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Ge
            | Operator::Lt
            | Operator::Le
            | Operator::Like => Some(Value::Bool(false)),
            _ => None,
        },
        // Exactly one side evaluated.
        (None, Some(r)) => match op {
            Operator::In
            | Operator::Intersects
            | Operator::Contains
            | Operator::Like
            | Operator::And
            | Operator::Eq
            | Operator::Gt
            | Operator::Ge
            | Operator::Lt
            | Operator::Le => Some(Value::Bool(false)),
            Operator::Ne => Some(Value::Bool(true)),
            Operator::Or => match r {
                Value::Bool(b) => Some(Value::Bool(b)),
                _ => Some(Value::Bool(false)),
            },
            _ => None,
        },
        (Some(l), None) => match op {
            Operator::In
            | Operator::Intersects
            | Operator::Contains
            | Operator::Like
            | Operator::And
            | Operator::Eq
            | Operator::Gt
            | Operator::Ge
            | Operator::Lt
            | Operator::Le => Some(Value::Bool(false)),
            Operator::Ne => Some(Value::Bool(true)),
            Operator::Or => match l {
                Value::Bool(b) => Some(Value::Bool(b)),
                _ => Some(Value::Bool(false)),
            },
            _ => None,
        },
        (Some(l), Some(r)) => apply_binary(op, &l, &r, ts),
    }
}

/// The (left-kind, right-kind, operator) dispatch table.
fn apply_binary(op: Operator, l: &Value, r: &Value, ts: DateTime<Utc>) -> Option<Value> {
    match l {
        Value::Int(a) => match r {
            Value::Int(b) => operate_ints(op, *a, *b),
            Value::Number(b) => operate_numbers(op, *a as f64, *b),
            Value::String(s) => {
                if let Ok(b) = s.parse::<i64>() {
                    operate_ints(op, *a, b)
                } else if let Ok(b) = s.parse::<f64>() {
                    operate_numbers(op, *a as f64, b)
                } else {
                    None
                }
            }
            Value::Slice(items) => match op {
                Operator::In | Operator::Intersects => Some(Value::Bool(
                    items.iter().any(|v| v.to_int64() == Some(*a)),
                )),
                _ => {
                    debug!(op = %op, "unsupported operator for int x slice");
                    None
                }
            },
            Value::Strings(items) => match op {
                Operator::In | Operator::Intersects => Some(Value::Bool(
                    items.iter().any(|s| s.parse::<i64>().ok() == Some(*a)),
                )),
                _ => None,
            },
            Value::Nil => None,
            other => {
                debug!(rhs = %other.value_type(), "unknown rhs kind for int lhs");
                None
            }
        },

        Value::Number(a) => match r {
            Value::Int(b) => operate_numbers(op, *a, *b as f64),
            Value::Number(b) => operate_numbers(op, *a, *b),
            Value::String(s) => {
                if let Ok(b) = s.parse::<f64>() {
                    operate_numbers(op, *a, b)
                } else {
                    None
                }
            }
            Value::Slice(items) => match op {
                Operator::In | Operator::Intersects => Some(Value::Bool(
                    items.iter().any(|v| v.to_float64() == Some(*a)),
                )),
                _ => None,
            },
            Value::Strings(items) => match op {
                Operator::In | Operator::Intersects => Some(Value::Bool(
                    items.iter().any(|s| s.parse::<f64>().ok() == Some(*a)),
                )),
                _ => None,
            },
            Value::Nil => None,
            _ => None,
        },

        Value::Bool(a) => match r {
            Value::Bool(b) => match op {
                Operator::And => Some(Value::Bool(*a && *b)),
                Operator::Or => Some(Value::Bool(*a || *b)),
                Operator::Eq => Some(Value::Bool(a == b)),
                Operator::Ne => Some(Value::Bool(a != b)),
                other => {
                    warn!(op = %other, "unsupported operator for bool x bool");
                    None
                }
            },
            Value::Nil => match op {
                Operator::And => Some(Value::Bool(false)),
                Operator::Or => Some(Value::Bool(*a)),
                Operator::Eq => Some(Value::Bool(false)),
                Operator::Ne => Some(Value::Bool(true)),
                _ => None,
            },
            _ => None,
        },

        Value::String(a) => match r {
            Value::String(b) => operate_strings(op, a, b),
            Value::Nil => match op {
                Operator::Eq => Some(Value::Bool(a.is_empty())),
                Operator::Ne => Some(Value::Bool(!a.is_empty())),
                _ => {
                    debug!(op = %op, "unsupported operator for string x nil");
                    None
                }
            },
            Value::Slice(_) | Value::Strings(_) => {
                let items = r.slice_values()?;
                match op {
                    Operator::In | Operator::Intersects => Some(Value::Bool(
                        items.iter().any(|v| a.as_ref() == v.to_string()),
                    )),
                    Operator::Contains => Some(Value::Bool(
                        items.iter().any(|v| a.contains(&v.to_string())),
                    )),
                    Operator::Like => Some(Value::Bool(
                        items.iter().any(|v| like_match(a, &v.to_string())),
                    )),
                    _ => {
                        debug!(op = %op, "unsupported operator for string x slice");
                        None
                    }
                }
            }
            Value::Bool(b) => {
                if let Some(ab) = crate::core::parse_bool(a) {
                    match op {
                        Operator::Eq => return Some(Value::Bool(ab == *b)),
                        Operator::Ne => return Some(Value::Bool(ab != *b)),
                        _ => {}
                    }
                }
                match op {
                    Operator::Or
                    | Operator::Eq
                    | Operator::And
                    | Operator::In
                    | Operator::Intersects
                    | Operator::Contains
                    | Operator::Like => Some(Value::Bool(false)),
                    _ => None,
                }
            }
            Value::Int(b) => {
                let af = a.parse::<f64>().unwrap_or(f64::NAN);
                operate_numbers(op, af, *b as f64)
            }
            Value::Number(b) => {
                let af = a.parse::<f64>().unwrap_or(f64::NAN);
                operate_numbers(op, af, *b)
            }
            Value::Time(t) => {
                let lht = value_to_time_anchored(l, ts)?;
                operate_time(op, lht, *t)
            }
            other if other.value_type().is_map() => match op {
                Operator::In | Operator::Intersects => Some(Value::Bool(other.has_key(a))),
                _ => {
                    debug!(op = %op, "unsupported operator for string x map");
                    None
                }
            },
            _ => None,
        },

        Value::Slice(items) => match op {
            Operator::Gt
            | Operator::Ge
            | Operator::Lt
            | Operator::Le
            | Operator::Eq
            | Operator::Ne => {
                if items.is_empty() {
                    return Some(Value::Bool(false));
                }
                // All elements must share the first element's kind; only
                // time-valued slices support ordered comparison.
                if matches!(items[0], Value::Time(_)) {
                    let rt = value_to_time_anchored(r, ts)?;
                    for item in items {
                        let lht = match item {
                            Value::Time(t) => *t,
                            _ => return None,
                        };
                        if let Some(Value::Bool(true)) = operate_time(op, lht, rt) {
                            return Some(Value::Bool(true));
                        }
                    }
                    return Some(Value::Bool(false));
                }
                None
            }
            Operator::Contains => match r {
                Value::Nil => None,
                Value::String(s) => Some(Value::Bool(
                    items.iter().any(|v| v.to_string().contains(s.as_ref())),
                )),
                Value::Int(b) => Some(Value::Bool(
                    items.iter().any(|v| v.to_int64() == Some(*b)),
                )),
                _ => None,
            },
            Operator::Like => match r {
                Value::String(pattern) => Some(Value::Bool(
                    items.iter().any(|v| like_match(&v.to_string(), pattern)),
                )),
                _ => None,
            },
            Operator::In | Operator::Intersects => match r {
                Value::Nil => None,
                Value::Slice(bt) => {
                    for av in items {
                        for bv in bt {
                            if values_equal(av, bv).unwrap_or(false) {
                                return Some(Value::Bool(true));
                            }
                        }
                    }
                    Some(Value::Bool(false))
                }
                Value::Strings(bt) => Some(Value::Bool(
                    items.iter().any(|av| bt.contains(&av.to_string())),
                )),
                other if other.value_type().is_map() => Some(Value::Bool(
                    items.iter().any(|av| other.has_key(&av.to_string())),
                )),
                _ => None,
            },
            Operator::And | Operator::Or => Some(Value::Bool(false)),
            _ => None,
        },

        Value::Strings(items) => match op {
            Operator::Contains => match r {
                Value::String(s) => Some(Value::Bool(
                    items.iter().any(|v| v.contains(s.as_ref())),
                )),
                Value::Bool(b) => {
                    let needle = if *b { "true" } else { "false" };
                    Some(Value::Bool(items.iter().any(|v| v.contains(needle))))
                }
                _ => None,
            },
            Operator::Like => match r {
                Value::String(pattern) => Some(Value::Bool(
                    items.iter().any(|v| like_match(v, pattern)),
                )),
                _ => None,
            },
            Operator::In | Operator::Intersects => match r {
                Value::Nil => None,
                Value::Slice(bt) => Some(Value::Bool(
                    items
                        .iter()
                        .any(|av| bt.iter().any(|bv| av.as_str() == bv.to_string())),
                )),
                Value::Strings(bt) => Some(Value::Bool(items.iter().any(|av| bt.contains(av)))),
                other if other.value_type().is_map() => {
                    Some(Value::Bool(items.iter().any(|av| other.has_key(av))))
                }
                _ => None,
            },
            Operator::Or | Operator::Eq | Operator::And => Some(Value::Bool(false)),
            _ => None,
        },

        Value::Time(t) => {
            let rt = value_to_time_anchored(r, ts)?;
            operate_time(op, *t, rt)
        }

        other if other.value_type().is_map() => {
            let rhvals: Vec<String> = match r {
                Value::Strings(v) => v.clone(),
                Value::Slice(v) => v.iter().map(|e| e.to_string()).collect(),
                bv => {
                    debug!(rhs = %bv.value_type(), "unhandled rhs kind for map lhs");
                    return None;
                }
            };
            match op {
                Operator::In | Operator::Intersects => {
                    Some(Value::Bool(rhvals.iter().any(|k| other.has_key(k))))
                }
                _ => None,
            }
        }

        Value::Nil => match op {
            Operator::And => Some(Value::Bool(false)),
            Operator::Or => match r {
                Value::Bool(b) => Some(Value::Bool(*b)),
                _ => Some(Value::Bool(false)),
            },
            Operator::Eq => Some(Value::Bool(matches!(r, Value::Nil))),
            Operator::Ne => Some(Value::Bool(true)),
            _ => None,
        },

        other => {
            debug!(lhs = %other.value_type(), "unsupported lhs kind in binary expression");
            None
        }
    }
}

// ============================================================================
// Unary
// ============================================================================

fn walk_unary(
    ctx: &dyn EvalContext,
    node: &UnaryNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<Value> {
    let arg = eval_depth(ctx, &node.arg, depth + 1, visited);
    apply_unary(node.op, arg)
}

pub(crate) fn apply_unary(op: Operator, arg: Option<Value>) -> Option<Value> {
    let a = match arg {
        Some(v) => v,
        None => {
            return match op {
                // EXISTS of an unevaluable argument is simply false.
                Operator::Exists => Some(Value::Bool(false)),
                _ => None,
            };
        }
    };

    match op {
        Operator::Not => match a {
            Value::Bool(b) => Some(Value::Bool(!b)),
            Value::Nil => None,
            other => {
                debug!(kind = %other.value_type(), "NOT applied to non-bool");
                None
            }
        },
        Operator::Minus => match a {
            Value::Int(v) => Some(Value::Int(-v)),
            Value::Number(v) => Some(Value::Number(-v)),
            Value::Time(t) => Some(Value::Number(-(t.timestamp_millis() as f64))),
            _ => None,
        },
        Operator::Exists => match a {
            Value::Nil => Some(Value::Bool(false)),
            v => Some(Value::Bool(!v.is_nil())),
        },
        other => {
            warn!(op = %other, "unary operator not implemented");
            None
        }
    }
}

// ============================================================================
// Ternary (BETWEEN)
// ============================================================================

fn walk_ternary(
    ctx: &dyn EvalContext,
    node: &TriNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<Value> {
    if node.op != Operator::Between {
        warn!(op = %node.op, "ternary operator not implemented");
        return None;
    }
    let a = eval_depth(ctx, &node.args[0], depth + 1, visited)?;
    let b = eval_depth(ctx, &node.args[1], depth + 1, visited)?;
    let c = eval_depth(ctx, &node.args[2], depth + 1, visited)?;
    apply_between(&a, &b, &c, node.negated, ctx.ts())
}

/// Strict BETWEEN (`low < subject < high`) over Int, Number and Time.
pub(crate) fn apply_between(
    subject: &Value,
    low: &Value,
    high: &Value,
    negated: bool,
    ts: DateTime<Utc>,
) -> Option<Value> {
    let inside = match subject {
        Value::Int(av) => {
            let bv = low.to_int64()?;
            let cv = high.to_int64()?;
            *av > bv && *av < cv
        }
        Value::Number(av) => {
            let bv = low.to_float64()?;
            let cv = high.to_float64()?;
            *av > bv && *av < cv
        }
        Value::Time(av) => {
            let bv = value_to_time_anchored(low, ts)?;
            let cv = value_to_time_anchored(high, ts)?;
            av.timestamp() > bv.timestamp() && av.timestamp() < cv.timestamp()
        }
        other => {
            warn!(kind = %other.value_type(), "BETWEEN not implemented for kind");
            return None;
        }
    };
    Some(Value::Bool(if negated { !inside } else { inside }))
}

// ============================================================================
// Array
// ============================================================================

fn walk_array(
    ctx: &dyn EvalContext,
    node: &crate::expr::node::ArrayNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<Value> {
    let vals = node
        .args
        .iter()
        .map(|arg| eval_depth(ctx, arg, depth + 1, visited).unwrap_or(Value::Nil))
        .collect();
    Some(Value::Slice(vals))
}

// ============================================================================
// Function call
// ============================================================================

fn walk_func(
    ctx: &dyn EvalContext,
    node: &FuncNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<Value> {
    let args: Vec<Value> = node
        .args
        .iter()
        .map(|arg| eval_depth(ctx, arg, depth + 1, visited).unwrap_or(Value::Nil))
        .collect();
    node.f.eval(ctx, &args)
}

// ============================================================================
// Include
// ============================================================================

fn walk_include(
    ctx: &dyn EvalContext,
    inc: &IncludeNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Option<Value> {
    let name = inc.identity.text.clone();

    let outcome = if let Some(cache) = ctx.include_cache() {
        let mut compute = || evaluate_include(ctx, inc, depth, visited);
        cache.get_or_set(&name, &mut compute)
    } else {
        evaluate_include(ctx, inc, depth, visited)
    };

    match outcome {
        Ok(m) => Some(Value::Bool(if inc.negated { !m } else { m })),
        Err(err) => {
            debug!(include = %name, error = %err, "include evaluation failed");
            // A negated include of something unevaluable still means "the
            // included filter did not reject this row".
            if inc.negated {
                Some(Value::Bool(true))
            } else {
                None
            }
        }
    }
}

/// Include entry point for the compiled evaluator, which starts a fresh
/// visit stack per evaluation.
pub(crate) fn walk_include_compiled(ctx: &dyn EvalContext, inc: &IncludeNode) -> Option<Value> {
    let mut visited = Vec::new();
    walk_include(ctx, inc, 0, &mut visited)
}

/// Resolve (lazily if necessary) and evaluate one include reference.
pub(crate) fn evaluate_include(
    ctx: &dyn EvalContext,
    inc: &IncludeNode,
    depth: usize,
    visited: &mut Vec<String>,
) -> Result<bool> {
    let referent: Arc<Node> = match inc.resolved() {
        Some(r) => Arc::clone(r),
        None => {
            let includer = ctx.as_includer().ok_or(Error::NoIncluder)?;
            resolve_include_node(includer, inc, depth, visited)?;
            match inc.resolved() {
                Some(r) => Arc::clone(r),
                None => return Err(Error::IncludeNotFound(inc.identity.text.clone())),
            }
        }
    };

    if let Node::Identity(id) = referent.as_ref() {
        if id.text == "*" || id.text == "match_all" {
            return Ok(true);
        }
    }

    eval_bool(ctx, &referent, depth + 1, visited)
        .ok_or_else(|| Error::execute(format!("failed inclusion {}", inc.identity.text)))
}

// ============================================================================
// Scalar operator tables
// ============================================================================

fn operate_ints(op: Operator, a: i64, b: i64) -> Option<Value> {
    match op {
        Operator::Plus => Some(Value::Int(a + b)),
        Operator::Multiply => Some(Value::Int(a * b)),
        Operator::Minus => Some(Value::Int(a - b)),
        Operator::Divide => {
            if b == 0 {
                None
            } else {
                Some(Value::Int(a / b))
            }
        }
        Operator::Modulus => {
            if b == 0 {
                None
            } else {
                Some(Value::Int(a % b))
            }
        }
        Operator::Eq => Some(Value::Bool(a == b)),
        Operator::Ne => Some(Value::Bool(a != b)),
        Operator::Gt => Some(Value::Bool(a > b)),
        Operator::Ge => Some(Value::Bool(a >= b)),
        Operator::Lt => Some(Value::Bool(a < b)),
        Operator::Le => Some(Value::Bool(a <= b)),
        Operator::Or => Some(Value::Bool(a != 0 || b != 0)),
        Operator::And => Some(Value::Bool(a != 0 && b != 0)),
        other => {
            warn!(op = %other, "unknown operator for ints");
            None
        }
    }
}

fn operate_numbers(op: Operator, a: f64, b: f64) -> Option<Value> {
    if matches!(
        op,
        Operator::Plus | Operator::Multiply | Operator::Minus | Operator::Divide | Operator::Modulus
    ) && (a.is_nan() || b.is_nan())
    {
        return Some(Value::Number(f64::NAN));
    }

    match op {
        Operator::Plus => Some(Value::Number(a + b)),
        Operator::Multiply => Some(Value::Number(a * b)),
        Operator::Minus => Some(Value::Number(a - b)),
        Operator::Divide => {
            if b == 0.0 {
                None
            } else {
                Some(Value::Number(a / b))
            }
        }
        Operator::Modulus => {
            // Remainder coerces both sides to int64 first.
            let (ai, bi) = (a as i64, b as i64);
            if bi == 0 {
                None
            } else {
                Some(Value::Number((ai % bi) as f64))
            }
        }
        Operator::Eq => Some(Value::Bool(a == b)),
        Operator::Ne => Some(Value::Bool(a != b)),
        Operator::Gt => Some(Value::Bool(a > b)),
        Operator::Ge => Some(Value::Bool(a >= b)),
        Operator::Lt => Some(Value::Bool(a < b)),
        Operator::Le => Some(Value::Bool(a <= b)),
        Operator::Or => Some(Value::Bool(a != 0.0 || b != 0.0)),
        Operator::And => Some(Value::Bool(a != 0.0 && b != 0.0)),
        other => {
            warn!(op = %other, "unknown operator for numbers");
            None
        }
    }
}

fn operate_strings(op: Operator, a: &str, b: &str) -> Option<Value> {
    match op {
        Operator::Eq => Some(Value::Bool(a == b)),
        Operator::Ne => Some(Value::Bool(a != b)),
        Operator::Contains => Some(Value::Bool(a.contains(b))),
        Operator::Like => Some(Value::Bool(like_match(a, b))),
        Operator::In | Operator::Intersects => Some(Value::Bool(a == b)),
        Operator::Gt
        | Operator::Ge
        | Operator::Lt
        | Operator::Le
        | Operator::Plus
        | Operator::Minus
        | Operator::Multiply
        | Operator::Divide
        | Operator::Modulus => {
            // Opportunistic numeric parse, int before float; otherwise
            // ordered comparisons fall back to lexicographic order and
            // `+` to concatenation.
            if let (Ok(ai), Ok(bi)) = (a.parse::<i64>(), b.parse::<i64>()) {
                return operate_ints(op, ai, bi);
            }
            if let (Ok(af), Ok(bf)) = (a.parse::<f64>(), b.parse::<f64>()) {
                return operate_numbers(op, af, bf);
            }
            match op {
                Operator::Gt => Some(Value::Bool(a > b)),
                Operator::Ge => Some(Value::Bool(a >= b)),
                Operator::Lt => Some(Value::Bool(a < b)),
                Operator::Le => Some(Value::Bool(a <= b)),
                Operator::Plus => Some(Value::string(format!("{}{}", a, b))),
                _ => None,
            }
        }
        other => {
            debug!(op = %other, "unsupported operator for strings");
            None
        }
    }
}

fn operate_time(op: Operator, lht: DateTime<Utc>, rht: DateTime<Utc>) -> Option<Value> {
    // Operator semantics compare at seconds granularity.
    let (a, b) = (lht.timestamp(), rht.timestamp());
    match op {
        Operator::Eq => Some(Value::Bool(a == b)),
        Operator::Ne => Some(Value::Bool(a != b)),
        Operator::Gt => Some(Value::Bool(a > b)),
        Operator::Ge => Some(Value::Bool(a >= b)),
        Operator::Lt => Some(Value::Bool(a < b)),
        Operator::Le => Some(Value::Bool(a <= b)),
        other => {
            debug!(op = %other, "unhandled time operator");
            None
        }
    }
}
