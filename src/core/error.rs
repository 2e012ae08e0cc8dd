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

//! Error types for siftql
//!
//! The stable, cross-component error taxonomy. Soft evaluation failures are
//! not errors; they surface as `None` from the evaluators. These variants
//! cover structural problems (depth, cycles, missing includes) and
//! malformed input (bad date math, unknown operators).

use thiserror::Error;

/// Result type alias for siftql operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for expression resolution, compilation and analysis
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Depth / cycle errors
    // =========================================================================
    /// Recursion depth guard tripped
    #[error("recursive evaluation error")]
    MaxDepth,

    /// Include graph contains a cycle; the payload is the visit path,
    /// e.g. `A->B->A`
    #[error("recursive evaluation error: cycle encountered: {0}")]
    IncludeCycle(String),

    // =========================================================================
    // Include errors
    // =========================================================================
    /// Includer returned nothing for the named filter
    #[error("include '{0}' not found")]
    IncludeNotFound(String),

    /// Context does not implement the includer capability
    #[error("context does not implement Includer")]
    NoIncluder,

    // =========================================================================
    // Malformed tree errors
    // =========================================================================
    /// Unrecognized operator for the node it appears on
    #[error("unknown operator: {0}")]
    UnknownOp(String),

    /// Unhandled node variant for the requested operation
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    // =========================================================================
    // Value / argument errors
    // =========================================================================
    /// Invalid date-math literal such as `now-` or `now-3x`
    #[error("invalid date math: {0}")]
    InvalidDateMath(String),

    /// Function argument validation failure
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced function is not registered
    #[error("function '{0}' not found")]
    FuncNotFound(String),

    /// Field absent from the evaluation context
    #[error("missing field: {0}")]
    MissingField(String),

    /// Parse error (timestamps, literals)
    #[error("parse error: {0}")]
    Parse(String),

    /// Generic evaluation failure
    #[error("could not execute: {0}")]
    Execute(String),
}

impl Error {
    /// Create a new InvalidDateMath error
    pub fn invalid_date_math(expr: impl Into<String>) -> Self {
        Error::InvalidDateMath(expr.into())
    }

    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a new Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    /// Create a new Execute error
    pub fn execute(message: impl Into<String>) -> Self {
        Error::Execute(message.into())
    }

    /// Build the cycle error from the visit stack plus the repeated name
    pub fn cycle(visited: &[String], repeat: &str) -> Self {
        let mut path = visited.join("->");
        if !path.is_empty() {
            path.push_str("->");
        }
        path.push_str(repeat);
        Error::IncludeCycle(path)
    }

    /// True for the depth guard and for include cycles, which classify as
    /// the same failure mode
    pub fn is_max_depth(&self) -> bool {
        matches!(self, Error::MaxDepth | Error::IncludeCycle(_))
    }

    /// True when the error means a named reference could not be resolved
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::IncludeNotFound(_) | Error::FuncNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::MaxDepth.to_string(), "recursive evaluation error");
        assert_eq!(
            Error::IncludeNotFound("seg_a".to_string()).to_string(),
            "include 'seg_a' not found"
        );
        assert_eq!(
            Error::NoIncluder.to_string(),
            "context does not implement Includer"
        );
        assert_eq!(
            Error::invalid_date_math("now-3x").to_string(),
            "invalid date math: now-3x"
        );
        assert_eq!(
            Error::UnknownOp("MODULUS".to_string()).to_string(),
            "unknown operator: MODULUS"
        );
    }

    #[test]
    fn test_cycle_message() {
        let err = Error::cycle(&["A".to_string(), "B".to_string()], "A");
        assert_eq!(
            err.to_string(),
            "recursive evaluation error: cycle encountered: A->B->A"
        );
        assert!(err.is_max_depth());
    }

    #[test]
    fn test_classification() {
        assert!(Error::MaxDepth.is_max_depth());
        assert!(Error::IncludeCycle("A->A".to_string()).is_max_depth());
        assert!(!Error::NoIncluder.is_max_depth());

        assert!(Error::IncludeNotFound("x".to_string()).is_not_found());
        assert!(Error::FuncNotFound("x".to_string()).is_not_found());
        assert!(!Error::MaxDepth.is_not_found());
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            Error::IncludeNotFound("a".to_string()),
            Error::IncludeNotFound("a".to_string())
        );
        assert_ne!(Error::MaxDepth, Error::NoIncluder);
    }
}
