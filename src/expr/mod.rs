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

//! Expression trees and evaluation contexts
//!
//! - [`node`] - the AST node taxonomy front ends produce
//! - [`context`] - per-row variable sources and their capabilities
//! - [`include`] - resolution and inlining of `INCLUDE` references

pub mod context;
pub mod include;
pub mod node;

pub use context::{
    ContextWriter, EvalContext, IncludeCache, Includer, IncluderContext, MapContext, MapIncluder,
    MemoIncludeCache, SimpleContext,
};
pub use include::{inline_includes, resolve_includes, MAX_INCLUDE_DEPTH};
pub use node::{
    find_all_identities, find_first_identity, find_includes, ArrayNode, BinaryNode, BooleanNode,
    FuncNode, IdentityNode, IncludeNode, Node, NumberNode, Operator, StringNode, TriNode,
    UnaryNode, ValueNode,
};
