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

//! Expression AST node taxonomy
//!
//! A closed set of node variants produced by FilterQL/SQL front ends and
//! consumed by the evaluators. Nodes own their children exclusively and are
//! logically immutable during evaluation; the single exception is the
//! include node's resolved-referent slot, which is a one-time set.
//!
//! Every node supports deep copy, structural equality and a deterministic
//! canonical string rendering that the hash-keyed caches depend on.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::core::{Value, ValueType};
use crate::functions::ScalarFunction;

// ============================================================================
// Operators
// ============================================================================

/// Operator kind for unary, binary, boolean and ternary nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    Contains,
    In,
    Intersects,
    Between,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulus,
    Not,
    Exists,
}

impl Operator {
    /// True for the ordered comparison operators.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le)
    }

    /// True for operators that always produce a boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Operator::And
                | Operator::Or
                | Operator::Eq
                | Operator::Ne
                | Operator::Gt
                | Operator::Ge
                | Operator::Lt
                | Operator::Le
                | Operator::Like
                | Operator::Contains
                | Operator::In
                | Operator::Intersects
                | Operator::Between
                | Operator::Not
                | Operator::Exists
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Like => "LIKE",
            Operator::Contains => "CONTAINS",
            Operator::In => "IN",
            Operator::Intersects => "INTERSECTS",
            Operator::Between => "BETWEEN",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulus => "%",
            Operator::Not => "NOT",
            Operator::Exists => "EXISTS",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Node variants
// ============================================================================

/// Variable reference, possibly a dotted path (`user.email`).
#[derive(Debug, Clone)]
pub struct IdentityNode {
    /// The lookup key as written.
    pub text: String,
    /// Split form for dotted names: (map key, sub key).
    left_right: Option<(String, String)>,
}

impl IdentityNode {
    /// Build from source text, splitting a dotted path at the first dot.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let left_right = text
            .split_once('.')
            .filter(|(l, r)| !l.is_empty() && !r.is_empty())
            .map(|(l, r)| (l.to_string(), r.to_string()));
        IdentityNode { text, left_right }
    }

    /// Build from explicit path segments; used when segments themselves
    /// contain dots (rendered backtick-quoted).
    pub fn with_parts(left: impl Into<String>, right: impl Into<String>) -> Self {
        let (left, right) = (left.into(), right.into());
        IdentityNode {
            text: format!("{}.{}", left, right),
            left_right: Some((left, right)),
        }
    }

    /// The `true`/`false` literals masquerade as identities.
    pub fn is_boolean_identity(&self) -> bool {
        self.text.eq_ignore_ascii_case("true") || self.text.eq_ignore_ascii_case("false")
    }

    /// Literal value for a boolean identity.
    pub fn as_bool(&self) -> bool {
        self.text.eq_ignore_ascii_case("true")
    }

    /// True when the name is a dotted path.
    pub fn has_left_right(&self) -> bool {
        self.left_right.is_some()
    }

    /// The dotted path split, when present.
    pub fn left_right(&self) -> Option<(&str, &str)> {
        self.left_right.as_ref().map(|(l, r)| (l.as_str(), r.as_str()))
    }
}

impl PartialEq for IdentityNode {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl fmt::Display for IdentityNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.left_right {
            Some((l, r)) if needs_quote(l) || needs_quote(r) => {
                write!(f, "{}.{}", quote_segment(l), quote_segment(r))
            }
            _ => {
                if needs_quote(&self.text) && !self.text.contains('.') {
                    write!(f, "`{}`", self.text)
                } else {
                    write!(f, "{}", self.text)
                }
            }
        }
    }
}

fn needs_quote(segment: &str) -> bool {
    segment.is_empty()
        || !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_segment(segment: &str) -> String {
    if needs_quote(segment) {
        format!("`{}`", segment)
    } else {
        segment.to_string()
    }
}

/// Numeric literal, int or float. Keeps the source text so rendering is
/// stable.
#[derive(Debug, Clone)]
pub struct NumberNode {
    pub text: String,
    pub is_int: bool,
    pub int_value: i64,
    pub float_value: f64,
}

impl NumberNode {
    pub fn from_i64(v: i64) -> Self {
        NumberNode {
            text: v.to_string(),
            is_int: true,
            int_value: v,
            float_value: v as f64,
        }
    }

    pub fn from_f64(v: f64) -> Self {
        NumberNode {
            text: crate::core::value::format_float(v),
            is_int: false,
            int_value: v as i64,
            float_value: v,
        }
    }
}

impl PartialEq for NumberNode {
    fn eq(&self, other: &Self) -> bool {
        self.is_int == other.is_int
            && self.int_value == other.int_value
            && (self.float_value == other.float_value
                || (self.float_value.is_nan() && other.float_value.is_nan()))
    }
}

impl fmt::Display for NumberNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// String literal.
#[derive(Debug, Clone, PartialEq)]
pub struct StringNode {
    pub text: String,
}

impl fmt::Display for StringNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Embedded double quotes double up, the FilterQL way.
        write!(f, "\"{}\"", self.text.replace('"', "\"\""))
    }
}

/// Pre-boxed literal value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueNode {
    pub value: Value,
}

impl fmt::Display for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => write!(f, "\"{}\"", s),
            other => write!(f, "{}", other),
        }
    }
}

/// Array literal `(a, b, c)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    pub args: Vec<Node>,
}

impl fmt::Display for ArrayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Unary operation: `NOT x`, `-x`, `EXISTS x`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryNode {
    pub op: Operator,
    pub arg: Box<Node>,
}

impl fmt::Display for UnaryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Operator::Minus => write!(f, "-{}", self.arg),
            Operator::Exists => write!(f, "EXISTS {}", self.arg),
            _ => {
                if self.arg.is_leaf() {
                    write!(f, "NOT {}", self.arg)
                } else {
                    write!(f, "NOT ({})", self.arg)
                }
            }
        }
    }
}

/// Binary operation across the full operator set.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryNode {
    pub op: Operator,
    pub lhs: Box<Node>,
    pub rhs: Box<Node>,
}

impl fmt::Display for BinaryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// N-ary AND / OR, optionally negated.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanNode {
    pub op: Operator,
    pub args: Vec<Node>,
    pub negated: bool,
}

impl fmt::Display for BooleanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        if self.negated {
            write!(f, "NOT {} ( {} )", self.op, parts.join(", "))
        } else {
            write!(f, "{} ( {} )", self.op, parts.join(", "))
        }
    }
}

/// Ternary operation; `a BETWEEN b AND c` is the only instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TriNode {
    pub op: Operator,
    pub args: [Box<Node>; 3],
    pub negated: bool,
}

impl fmt::Display for TriNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(
                f,
                "{} NOT BETWEEN {} AND {}",
                self.args[0], self.args[1], self.args[2]
            )
        } else {
            write!(
                f,
                "{} BETWEEN {} AND {}",
                self.args[0], self.args[1], self.args[2]
            )
        }
    }
}

/// Function call with its resolved implementation handle.
#[derive(Debug, Clone)]
pub struct FuncNode {
    pub name: String,
    pub args: Vec<Node>,
    /// Resolved at construction; `copy()` preserves the handle.
    pub f: Arc<dyn ScalarFunction>,
}

impl PartialEq for FuncNode {
    fn eq(&self, other: &Self) -> bool {
        // The handle is identified by name; implementations are stateless.
        self.name == other.name && self.args == other.args
    }
}

impl fmt::Display for FuncNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}({})", self.name, parts.join(", "))
    }
}

/// Named reference to another filter statement.
///
/// `expr` is the one mutable slot on an otherwise immutable tree: the
/// resolved referent is written exactly once (idempotent set), either by
/// `resolve_includes` at deployment time or lazily by the evaluator.
#[derive(Debug, Clone)]
pub struct IncludeNode {
    pub identity: IdentityNode,
    pub negated: bool,
    expr: OnceLock<Arc<Node>>,
}

impl IncludeNode {
    pub fn new(name: impl Into<String>, negated: bool) -> Self {
        IncludeNode {
            identity: IdentityNode::new(name),
            negated,
            expr: OnceLock::new(),
        }
    }

    /// The resolved referent, if set.
    pub fn resolved(&self) -> Option<&Arc<Node>> {
        self.expr.get()
    }

    /// One-time set of the resolved referent. Later calls are no-ops, so
    /// concurrent resolution of the same tree stays benign.
    pub fn set_resolved(&self, node: Arc<Node>) {
        let _ = self.expr.set(node);
    }
}

impl PartialEq for IncludeNode {
    fn eq(&self, other: &Self) -> bool {
        // Resolution state is not part of structural identity.
        self.identity == other.identity && self.negated == other.negated
    }
}

impl fmt::Display for IncludeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "NOT INCLUDE {}", self.identity)
        } else {
            write!(f, "INCLUDE {}", self.identity)
        }
    }
}

// ============================================================================
// The node enum
// ============================================================================

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Identity(IdentityNode),
    Number(NumberNode),
    String(StringNode),
    Null,
    Value(ValueNode),
    Array(ArrayNode),
    Unary(UnaryNode),
    Binary(BinaryNode),
    Boolean(BooleanNode),
    Tri(TriNode),
    Func(FuncNode),
    Include(IncludeNode),
}

impl Node {
    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn identity(text: impl Into<String>) -> Node {
        Node::Identity(IdentityNode::new(text))
    }

    pub fn identity_parts(left: impl Into<String>, right: impl Into<String>) -> Node {
        Node::Identity(IdentityNode::with_parts(left, right))
    }

    pub fn int(v: i64) -> Node {
        Node::Number(NumberNode::from_i64(v))
    }

    pub fn float(v: f64) -> Node {
        Node::Number(NumberNode::from_f64(v))
    }

    pub fn str(text: impl Into<String>) -> Node {
        Node::String(StringNode { text: text.into() })
    }

    pub fn value(v: Value) -> Node {
        Node::Value(ValueNode { value: v })
    }

    pub fn array(args: Vec<Node>) -> Node {
        Node::Array(ArrayNode { args })
    }

    pub fn unary(op: Operator, arg: Node) -> Node {
        Node::Unary(UnaryNode {
            op,
            arg: Box::new(arg),
        })
    }

    pub fn not(arg: Node) -> Node {
        Node::unary(Operator::Not, arg)
    }

    pub fn exists(name: impl Into<String>) -> Node {
        Node::unary(Operator::Exists, Node::identity(name))
    }

    pub fn binary(op: Operator, lhs: Node, rhs: Node) -> Node {
        Node::Binary(BinaryNode {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn and(args: Vec<Node>) -> Node {
        Node::Boolean(BooleanNode {
            op: Operator::And,
            args,
            negated: false,
        })
    }

    pub fn or(args: Vec<Node>) -> Node {
        Node::Boolean(BooleanNode {
            op: Operator::Or,
            args,
            negated: false,
        })
    }

    pub fn boolean(op: Operator, args: Vec<Node>, negated: bool) -> Node {
        Node::Boolean(BooleanNode { op, args, negated })
    }

    pub fn between(subject: Node, low: Node, high: Node) -> Node {
        Node::Tri(TriNode {
            op: Operator::Between,
            args: [Box::new(subject), Box::new(low), Box::new(high)],
            negated: false,
        })
    }

    pub fn not_between(subject: Node, low: Node, high: Node) -> Node {
        Node::Tri(TriNode {
            op: Operator::Between,
            args: [Box::new(subject), Box::new(low), Box::new(high)],
            negated: true,
        })
    }

    /// Build a function call, resolving the implementation from the global
    /// registry and validating argument shape.
    pub fn func(name: impl Into<String>, args: Vec<Node>) -> crate::core::Result<Node> {
        let name = name.into();
        let f = crate::functions::global_registry()
            .get(&name)
            .ok_or_else(|| crate::core::Error::FuncNotFound(name.clone()))?;
        let node = FuncNode { name, args, f };
        node.f.validate(&node)?;
        Ok(Node::Func(node))
    }

    /// Build a function call with an explicit implementation handle.
    pub fn func_with_impl(
        name: impl Into<String>,
        args: Vec<Node>,
        f: Arc<dyn ScalarFunction>,
    ) -> Node {
        Node::Func(FuncNode {
            name: name.into(),
            args,
            f,
        })
    }

    pub fn include(name: impl Into<String>) -> Node {
        Node::Include(IncludeNode::new(name, false))
    }

    pub fn not_include(name: impl Into<String>) -> Node {
        Node::Include(IncludeNode::new(name, true))
    }

    // =========================================================================
    // Tree operations
    // =========================================================================

    /// Deep clone. Include nodes come back unresolved; everything else is
    /// structurally equal to the original.
    pub fn copy(&self) -> Node {
        match self {
            Node::Identity(n) => Node::Identity(n.clone()),
            Node::Number(n) => Node::Number(n.clone()),
            Node::String(n) => Node::String(n.clone()),
            Node::Null => Node::Null,
            Node::Value(n) => Node::Value(n.clone()),
            Node::Array(n) => Node::array(n.args.iter().map(|a| a.copy()).collect()),
            Node::Unary(n) => Node::unary(n.op, n.arg.copy()),
            Node::Binary(n) => Node::binary(n.op, n.lhs.copy(), n.rhs.copy()),
            Node::Boolean(n) => Node::boolean(n.op, n.args.iter().map(|a| a.copy()).collect(), n.negated),
            Node::Tri(n) => Node::Tri(TriNode {
                op: n.op,
                args: [
                    Box::new(n.args[0].copy()),
                    Box::new(n.args[1].copy()),
                    Box::new(n.args[2].copy()),
                ],
                negated: n.negated,
            }),
            Node::Func(n) => Node::Func(FuncNode {
                name: n.name.clone(),
                args: n.args.iter().map(|a| a.copy()).collect(),
                f: Arc::clone(&n.f),
            }),
            Node::Include(n) => Node::Include(IncludeNode::new(n.identity.text.clone(), n.negated)),
        }
    }

    /// Structural equality; alias for `==`.
    pub fn equal(&self, other: &Node) -> bool {
        self == other
    }

    /// The negation flag, where the variant carries one.
    pub fn negated(&self) -> bool {
        match self {
            Node::Boolean(n) => n.negated,
            Node::Tri(n) => n.negated,
            Node::Include(n) => n.negated,
            _ => false,
        }
    }

    /// True for literal and identity leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Node::Identity(_) | Node::Number(_) | Node::String(_) | Node::Null | Node::Value(_)
        )
    }

    /// Static result kind of this expression.
    pub fn value_type(&self) -> ValueType {
        match self {
            Node::Identity(_) => ValueType::Unknown,
            Node::Number(n) => {
                if n.is_int {
                    ValueType::Int
                } else {
                    ValueType::Number
                }
            }
            Node::String(_) => ValueType::String,
            Node::Null => ValueType::Nil,
            Node::Value(n) => n.value.value_type(),
            Node::Array(_) => ValueType::Slice,
            Node::Unary(n) => match n.op {
                Operator::Minus => n.arg.value_type(),
                _ => ValueType::Bool,
            },
            Node::Binary(n) => match n.op {
                Operator::Modulus => ValueType::Int,
                Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide => {
                    ValueType::Number
                }
                _ => ValueType::Bool,
            },
            Node::Boolean(_) | Node::Tri(_) | Node::Include(_) => ValueType::Bool,
            Node::Func(n) => n.f.return_type(),
        }
    }

    fn children(&self) -> Vec<&Node> {
        match self {
            Node::Array(n) => n.args.iter().collect(),
            Node::Unary(n) => vec![&n.arg],
            Node::Binary(n) => vec![&n.lhs, &n.rhs],
            Node::Boolean(n) => n.args.iter().collect(),
            Node::Tri(n) => n.args.iter().map(|b| b.as_ref()).collect(),
            Node::Func(n) => n.args.iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Identity(n) => write!(f, "{}", n),
            Node::Number(n) => write!(f, "{}", n),
            Node::String(n) => write!(f, "{}", n),
            Node::Null => write!(f, "NULL"),
            Node::Value(n) => write!(f, "{}", n),
            Node::Array(n) => write!(f, "{}", n),
            Node::Unary(n) => write!(f, "{}", n),
            Node::Binary(n) => write!(f, "{}", n),
            Node::Boolean(n) => write!(f, "{}", n),
            Node::Tri(n) => write!(f, "{}", n),
            Node::Func(n) => write!(f, "{}", n),
            Node::Include(n) => write!(f, "{}", n),
        }
    }
}

// ============================================================================
// Tree utilities
// ============================================================================

/// Collect the names referenced by include nodes, in visit order.
/// Resolved referents are not followed.
pub fn find_includes(node: &Node) -> Vec<String> {
    let mut found = Vec::new();
    collect_includes(node, &mut found);
    found
}

fn collect_includes(node: &Node, out: &mut Vec<String>) {
    if let Node::Include(inc) = node {
        out.push(inc.identity.text.clone());
    }
    for child in node.children() {
        collect_includes(child, out);
    }
}

/// The first non-boolean identity in evaluation order, if any.
pub fn find_first_identity(node: &Node) -> Option<String> {
    match node {
        Node::Identity(id) if !id.is_boolean_identity() => Some(id.text.clone()),
        _ => node.children().into_iter().find_map(find_first_identity),
    }
}

/// All distinct identities in visit order (boolean literals excluded).
pub fn find_all_identities(node: &Node) -> Vec<String> {
    let mut found = Vec::new();
    collect_identities(node, &mut found);
    found
}

fn collect_identities(node: &Node, out: &mut Vec<String>) {
    if let Node::Identity(id) = node {
        if !id.is_boolean_identity() && !out.contains(&id.text) {
            out.push(id.text.clone());
        }
    }
    for child in node.children() {
        collect_identities(child, out);
    }
}
