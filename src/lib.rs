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

//! # Siftql - FilterQL expression runtime
//!
//! Siftql evaluates FilterQL/SQL boolean expression trees against per-row
//! contexts. Front ends hand it parsed ASTs; it supplies the value
//! lattice, the evaluators, and the supporting machinery around them.
//!
//! ## Key pieces
//!
//! - **Value lattice** - ~20 scalar and container kinds with cross-kind
//!   coercion, equality and JSON marshaling
//! - **AST taxonomy** - a closed node set with deep copy, structural
//!   equality and canonical string rendering
//! - **Tree-walking evaluator** - type dispatch across the full lattice,
//!   short-circuiting logical operators, container membership, temporal
//!   comparison, depth and cycle guards
//! - **Include resolution** - lazy or eager resolution of cross-filter
//!   references, with per-row memoization
//! - **Date-math boundary analysis** - when will `last_event < "now-1d"`
//!   change its mind?
//! - **Compiled fast path** - the same semantics lowered to closures,
//!   cached by canonical-form fingerprint
//! - **Optimizer** - cheapest-first ordering of AND/OR arguments with
//!   shared include subtrees
//!
//! ## Quick start
//!
//! ```rust
//! use siftql::{eval, matches, MapContext, Node, Operator, Value};
//! use std::collections::HashMap;
//!
//! let ctx = MapContext::new(HashMap::from([
//!     ("name".to_string(), Value::from("Yoda")),
//!     ("roles".to_string(), Value::from(vec!["admin", "api"])),
//! ]));
//!
//! // name == "Yoda"
//! let filter = Node::binary(Operator::Eq, Node::identity("name"), Node::str("Yoda"));
//! assert_eq!(matches(&ctx, &filter), Some(true));
//!
//! // roles INTERSECTS ("user", "api")
//! let filter = Node::binary(
//!     Operator::Intersects,
//!     Node::identity("roles"),
//!     Node::array(vec![Node::str("user"), Node::str("api")]),
//! );
//! assert_eq!(matches(&ctx, &filter), Some(true));
//!
//! // Arithmetic evaluates to values, not just matches.
//! let sum = Node::binary(Operator::Plus, Node::int(40), Node::int(2));
//! assert_eq!(eval(&ctx, &sum), Some(Value::Int(42)));
//! ```
//!
//! ## Modules
//!
//! - [`core`] - [`Value`], [`ValueType`], [`Error`]
//! - [`expr`] - [`Node`], contexts, include resolution
//! - [`vm`] - tree walker, compiled evaluator, date math
//! - [`functions`] - function registration and builtins
//! - [`optimizer`] - boolean-argument reordering

pub mod core;
pub mod expr;
pub mod functions;
pub mod optimizer;
pub mod vm;

// Re-export the main types for convenience
pub use core::{values_equal, Error, Result, StructObject, Value, ValueType, NIL_INT};

pub use expr::{
    find_all_identities, find_first_identity, find_includes, inline_includes, resolve_includes,
    ContextWriter, EvalContext, IncludeCache, Includer, IncluderContext, MapContext, MapIncluder,
    Node, Operator, SimpleContext,
};

pub use functions::{global_registry, FunctionRegistry, ScalarFunction};

pub use optimizer::{optimize_boolean_nodes, SharedIncludeNodes};

pub use vm::compiler::{CompiledEvaluator, CompiledExpr, ExprCompiler};
pub use vm::datemath::{eval_anchor, is_date_math, value_to_time_anchored, DateConverter};
pub use vm::{eval, matches, MAX_DEPTH};
