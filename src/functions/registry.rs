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

//! Function Registry
//!
//! Name -> implementation lookup for expression functions. The process
//! registry is written once at init and read-only afterward; nodes hold
//! resolved handles, so evaluation never goes through the registry.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use super::scalar::{
    CoalesceFunction, ContainsFunction, EpochMsFunction, EqFunction, ExistsFunction, GeFunction,
    GtFunction, JoinFunction, LeFunction, LengthFunction, LtFunction, NeFunction, NotFunction,
    NowFunction, ToBoolFunction, ToDateFunction, ToIntFunction, ToLowerFunction,
    ToNumberFunction, ToUpperFunction, YearFunction, YyFunction,
};
use super::ScalarFunction;

/// Global function registry instance
static GLOBAL_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Get the global function registry
#[inline]
pub fn global_registry() -> &'static FunctionRegistry {
    GLOBAL_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Registry of scalar expression functions
pub struct FunctionRegistry {
    funcs: RwLock<HashMap<String, Arc<dyn ScalarFunction>>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with the builtin functions registered
    pub fn new() -> Self {
        let registry = Self {
            funcs: RwLock::new(HashMap::new()),
        };

        // String functions
        registry.register::<ToLowerFunction>();
        registry.register::<ToUpperFunction>();
        registry.register::<LengthFunction>();
        registry.register::<ContainsFunction>();
        registry.register::<JoinFunction>();

        // Conversion functions
        registry.register::<ToIntFunction>();
        registry.register::<ToNumberFunction>();
        registry.register::<ToBoolFunction>();
        registry.register::<ToDateFunction>();

        // Comparison / logic functions
        registry.register::<EqFunction>();
        registry.register::<NeFunction>();
        registry.register::<GtFunction>();
        registry.register::<GeFunction>();
        registry.register::<LtFunction>();
        registry.register::<LeFunction>();
        registry.register::<NotFunction>();
        registry.register::<ExistsFunction>();

        // Time / utility functions
        registry.register::<NowFunction>();
        registry.register::<YearFunction>();
        registry.register::<YyFunction>();
        registry.register::<EpochMsFunction>();
        registry.register::<CoalesceFunction>();

        registry
    }

    /// Create an empty registry (no builtins)
    pub fn empty() -> Self {
        Self {
            funcs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a function by type
    pub fn register<F: ScalarFunction + Default + 'static>(&self) {
        self.register_instance(Arc::new(F::default()));
    }

    /// Register a function instance
    pub fn register_instance(&self, f: Arc<dyn ScalarFunction>) {
        let name = f.name().to_lowercase();
        let mut funcs = self.funcs.write().unwrap();
        funcs.insert(name, f);
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn ScalarFunction>> {
        let funcs = self.funcs.read().unwrap();
        if let Some(f) = funcs.get(name) {
            return Some(Arc::clone(f));
        }
        let lower = name.to_lowercase();
        funcs.get(&lower).map(Arc::clone)
    }

    /// Check whether a function is registered
    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// List the registered names, sorted
    pub fn list(&self) -> Vec<String> {
        let funcs = self.funcs.read().unwrap();
        let mut names: Vec<String> = funcs.keys().cloned().collect();
        names.sort();
        names
    }
}
