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

//! Compiled pattern matching for LIKE
//!
//! FilterQL LIKE accepts both the SQL `%` wildcard and the glob `*`; the
//! two are interchangeable. Simple patterns get direct string operations;
//! anything else compiles to an anchored regex, cached process-wide so
//! repeated row evaluation never recompiles.

use parking_lot::RwLock;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// Maximum number of patterns to cache
const MAX_CACHE_SIZE: usize = 10_000;

/// Compiled pattern tiers for fast matching
#[derive(Debug, Clone)]
enum CompiledPattern {
    /// No wildcards: direct equality
    Exact(String),
    /// `hello*`
    Prefix(String),
    /// `*hello`
    Suffix(String),
    /// `*hello*`
    Contains(String),
    /// `hello*world`
    PrefixSuffix(String, String),
    /// Multiple wildcard segments
    Regex(Regex),
    /// Bare `*` / `%`
    MatchAll,
}

impl CompiledPattern {
    fn matches(&self, text: &str) -> bool {
        match self {
            CompiledPattern::MatchAll => true,
            CompiledPattern::Exact(s) => text == s,
            CompiledPattern::Prefix(p) => text.starts_with(p),
            CompiledPattern::Suffix(s) => text.ends_with(s),
            CompiledPattern::Contains(c) => text.contains(c),
            CompiledPattern::PrefixSuffix(p, s) => {
                text.starts_with(p) && text.ends_with(s) && text.len() >= p.len() + s.len()
            }
            CompiledPattern::Regex(re) => re.is_match(text),
        }
    }
}

/// Thread-safe cache of compiled LIKE patterns
struct PatternCache {
    cache: RwLock<FxHashMap<String, CompiledPattern>>,
}

impl PatternCache {
    fn new() -> Self {
        PatternCache {
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> CompiledPattern {
        if let Some(hit) = self.cache.read().get(pattern) {
            return hit.clone();
        }

        let compiled = compile_pattern(pattern);

        let mut cache = self.cache.write();
        if cache.len() >= MAX_CACHE_SIZE {
            cache.clear();
        }
        cache.insert(pattern.to_string(), compiled.clone());
        compiled
    }
}

static GLOBAL_CACHE: OnceLock<PatternCache> = OnceLock::new();

/// Evaluate a LIKE pattern against a string.
pub fn like_match(text: &str, pattern: &str) -> bool {
    GLOBAL_CACHE
        .get_or_init(PatternCache::new)
        .get_or_compile(pattern)
        .matches(text)
}

/// Compile a LIKE pattern, normalizing `%` to `*` first
fn compile_pattern(pattern: &str) -> CompiledPattern {
    let normalized = pattern.replace('%', "*");

    if normalized.is_empty() {
        return CompiledPattern::Exact(String::new());
    }
    if normalized == "*" {
        return CompiledPattern::MatchAll;
    }
    if !normalized.contains('*') {
        return CompiledPattern::Exact(normalized);
    }

    let parts: Vec<&str> = normalized.split('*').collect();
    match parts.as_slice() {
        ["", suffix] if !suffix.is_empty() => {
            return CompiledPattern::Suffix(suffix.to_string());
        }
        [prefix, ""] if !prefix.is_empty() => {
            return CompiledPattern::Prefix(prefix.to_string());
        }
        ["", contains, ""] if !contains.is_empty() => {
            return CompiledPattern::Contains(contains.to_string());
        }
        [prefix, suffix] if !prefix.is_empty() && !suffix.is_empty() => {
            return CompiledPattern::PrefixSuffix(prefix.to_string(), suffix.to_string());
        }
        _ => {}
    }

    match Regex::new(&wildcard_to_regex(&normalized)) {
        Ok(re) => CompiledPattern::Regex(re),
        // Fallback to exact match on regex error
        Err(_) => CompiledPattern::Exact(normalized),
    }
}

/// Convert a normalized wildcard pattern to an anchored regex
fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2 + 2);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '.' | '^' | '$' | '+' | '?' | '{' | '}' | '[' | ']' | '(' | ')' | '|' | '\\' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact() {
        assert!(like_match("hello", "hello"));
        assert!(!like_match("Hello", "hello"));
    }

    #[test]
    fn test_wildcards_both_spellings() {
        assert!(like_match("Yoda", "*da"));
        assert!(like_match("Yoda", "%da"));
        assert!(!like_match("Yoda", "*kin"));
        assert!(like_match("Yoda", "Yo*"));
        assert!(like_match("Yoda", "Yo%"));
        assert!(like_match("hello world", "*world"));
        assert!(like_match("hello world", "hello*"));
        assert!(like_match("hello world", "*lo wo*"));
        assert!(like_match("helloworld", "hello*world"));
        assert!(!like_match("hello", "hello*world"));
    }

    #[test]
    fn test_match_all() {
        assert!(like_match("", "*"));
        assert!(like_match("anything", "%"));
    }

    #[test]
    fn test_multi_segment_regex() {
        assert!(like_match("a-b-c", "a*b*c"));
        assert!(!like_match("a-c-b", "a*b*c"));
        // Regex metacharacters in the pattern are literal.
        assert!(like_match("a.b", "a.b"));
        assert!(!like_match("axb", "a.b*"));
    }
}
