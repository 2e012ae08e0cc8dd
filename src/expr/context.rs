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

//! Evaluation contexts
//!
//! A context is a capability set: the base trait supplies variable lookup
//! and the row's logical timestamp; optional capabilities (include
//! resolution, per-row include caching) are discovered through accessor
//! methods rather than downcasting. Evaluator code asks for the narrowest
//! capability it needs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::{Error, Result, Value};

use super::node::Node;

/// Per-row variable source for expression evaluation.
pub trait EvalContext {
    /// Look up a variable. Dotted names such as `user.email` may be either
    /// a single key or a path into a map value; implementations must try
    /// both, preferring the full-key form.
    fn get(&self, name: &str) -> Option<Value>;

    /// The row's logical timestamp, used to anchor date math.
    fn ts(&self) -> DateTime<Utc>;

    /// Optional row snapshot, used by projection writers.
    fn row(&self) -> Option<HashMap<String, Value>> {
        None
    }

    /// Include-resolution capability, when the context carries one.
    fn as_includer(&self) -> Option<&dyn Includer> {
        None
    }

    /// Per-row include memoization capability, when present.
    fn include_cache(&self) -> Option<&dyn IncludeCache> {
        None
    }
}

/// Resolves a named filter reference to its expression tree.
pub trait Includer {
    fn include(&self, name: &str) -> Result<Arc<Node>>;
}

/// Per-row memoization of include evaluation results.
///
/// The compute closure runs the include evaluation; cached outcomes
/// short-circuit later encounters of the same name within the row.
pub trait IncludeCache {
    fn get_or_set(
        &self,
        name: &str,
        compute: &mut dyn FnMut() -> Result<bool>,
    ) -> Result<bool>;
}

/// Write side for projections emitting computed column values.
pub trait ContextWriter {
    fn put(&mut self, name: &str, value: Value);
}

// ============================================================================
// Shipped contexts
// ============================================================================

/// Map-backed read context with dotted-path lookup.
#[derive(Debug, Clone)]
pub struct MapContext {
    values: HashMap<String, Value>,
    ts: DateTime<Utc>,
}

impl MapContext {
    /// Create with the current instant as the row timestamp.
    pub fn new(values: HashMap<String, Value>) -> Self {
        MapContext {
            values,
            ts: Utc::now(),
        }
    }

    /// Create with an explicit row timestamp.
    pub fn with_ts(values: HashMap<String, Value>, ts: DateTime<Utc>) -> Self {
        MapContext { values, ts }
    }

    /// Create empty.
    pub fn empty() -> Self {
        MapContext::new(HashMap::new())
    }
}

impl EvalContext for MapContext {
    fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.values.get(name) {
            return Some(v.clone());
        }
        // Dotted path: left segment as a map, right segment as its key.
        let (left, right) = name.split_once('.')?;
        self.values.get(left).and_then(|v| v.get_key(right))
    }

    fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    fn row(&self) -> Option<HashMap<String, Value>> {
        Some(self.values.clone())
    }
}

/// Read/write context used as a projection target.
#[derive(Debug, Clone, Default)]
pub struct SimpleContext {
    values: HashMap<String, Value>,
    ts: Option<DateTime<Utc>>,
}

impl SimpleContext {
    pub fn new() -> Self {
        SimpleContext::default()
    }

    /// Create with an explicit row timestamp.
    pub fn with_ts(ts: DateTime<Utc>) -> Self {
        SimpleContext {
            values: HashMap::new(),
            ts: Some(ts),
        }
    }
}

impl EvalContext for SimpleContext {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn ts(&self) -> DateTime<Utc> {
        self.ts.unwrap_or(DateTime::UNIX_EPOCH)
    }

    fn row(&self) -> Option<HashMap<String, Value>> {
        Some(self.values.clone())
    }
}

impl ContextWriter for SimpleContext {
    fn put(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }
}

/// Named-filter includer backed by a map of parsed statements.
#[derive(Debug, Clone, Default)]
pub struct MapIncluder {
    filters: HashMap<String, Arc<Node>>,
}

impl MapIncluder {
    pub fn new() -> Self {
        MapIncluder::default()
    }

    /// Register a filter under an alias. Lookup is case-insensitive.
    pub fn add(&mut self, alias: impl AsRef<str>, filter: Node) {
        self.filters
            .insert(alias.as_ref().to_lowercase(), Arc::new(filter));
    }
}

impl Includer for MapIncluder {
    fn include(&self, name: &str) -> Result<Arc<Node>> {
        self.filters
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::IncludeNotFound(name.to_string()))
    }
}

/// Composes a reader context with an includer and an optional per-row
/// include cache.
pub struct IncluderContext<C: EvalContext> {
    pub reader: C,
    pub includer: MapIncluder,
    cache: Option<MemoIncludeCache>,
}

impl<C: EvalContext> IncluderContext<C> {
    pub fn new(reader: C, includer: MapIncluder) -> Self {
        IncluderContext {
            reader,
            includer,
            cache: None,
        }
    }

    /// Enable per-row include memoization.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(MemoIncludeCache::default());
        self
    }
}

impl<C: EvalContext> EvalContext for IncluderContext<C> {
    fn get(&self, name: &str) -> Option<Value> {
        self.reader.get(name)
    }

    fn ts(&self) -> DateTime<Utc> {
        self.reader.ts()
    }

    fn row(&self) -> Option<HashMap<String, Value>> {
        self.reader.row()
    }

    fn as_includer(&self) -> Option<&dyn Includer> {
        Some(&self.includer)
    }

    fn include_cache(&self) -> Option<&dyn IncludeCache> {
        self.cache.as_ref().map(|c| c as &dyn IncludeCache)
    }
}

/// In-memory include cache scoped to a single row's evaluation.
#[derive(Debug, Default)]
pub struct MemoIncludeCache {
    entries: RefCell<HashMap<String, bool>>,
}

impl IncludeCache for MemoIncludeCache {
    fn get_or_set(
        &self,
        name: &str,
        compute: &mut dyn FnMut() -> Result<bool>,
    ) -> Result<bool> {
        if let Some(hit) = self.entries.borrow().get(name) {
            return Ok(*hit);
        }
        let outcome = compute()?;
        self.entries.borrow_mut().insert(name.to_string(), outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_context_dotted_lookup() {
        let mut inner = HashMap::new();
        inner.insert("City".to_string(), Value::string("Detroit"));
        let ctx = MapContext::new(HashMap::from([
            ("name".to_string(), Value::string("Yoda")),
            ("Address".to_string(), Value::Map(inner)),
            ("last.event".to_string(), Value::Int(5)),
        ]));

        assert_eq!(ctx.get("name"), Some(Value::string("Yoda")));
        assert_eq!(ctx.get("Address.City"), Some(Value::string("Detroit")));
        // Full-key form wins over path traversal.
        assert_eq!(ctx.get("last.event"), Some(Value::Int(5)));
        assert_eq!(ctx.get("Address.Zip"), None);
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_simple_context_writer() {
        let mut ctx = SimpleContext::new();
        ctx.put("name", Value::string("Yoda"));
        assert_eq!(ctx.get("name"), Some(Value::string("Yoda")));
        assert_eq!(ctx.row().unwrap().len(), 1);
    }

    #[test]
    fn test_map_includer_case_insensitive() {
        let mut inc = MapIncluder::new();
        inc.add("Is_Yoda", Node::identity("x"));
        assert!(inc.include("is_yoda").is_ok());
        assert!(matches!(
            inc.include("missing"),
            Err(Error::IncludeNotFound(_))
        ));
    }

    #[test]
    fn test_memo_include_cache() {
        let cache = MemoIncludeCache::default();
        let mut calls = 0;
        let mut compute = || -> Result<bool> {
            calls += 1;
            Ok(true)
        };
        assert_eq!(cache.get_or_set("a", &mut compute).unwrap(), true);
        assert_eq!(cache.get_or_set("a", &mut compute).unwrap(), true);
        drop(compute);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_includer_capability_discovery() {
        let ctx = MapContext::empty();
        assert!(ctx.as_includer().is_none());
        assert!(ctx.include_cache().is_none());

        let ctx = IncluderContext::new(MapContext::empty(), MapIncluder::new());
        assert!(ctx.as_includer().is_some());
        assert!(ctx.include_cache().is_none());

        let ctx = ctx.with_cache();
        assert!(ctx.include_cache().is_some());
    }
}
