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

//! Expression function system
//!
//! Functions referenced from expressions resolve through the
//! [`FunctionRegistry`] at node-construction time: lookup is
//! case-insensitive, the implementation validates argument shape once, and
//! the resolved handle rides on the node for the lifetime of the tree.
//!
//! The builtin set shipped here is representative rather than exhaustive;
//! hosts register their own implementations the same way.

pub mod registry;
pub mod scalar;

use std::fmt;

use crate::core::{Error, Result, Value, ValueType};
use crate::expr::context::EvalContext;
use crate::expr::node::FuncNode;

pub use registry::{global_registry, FunctionRegistry};

/// A scalar expression function.
///
/// Implementations are stateless and shared; one instance serves every
/// node referencing the name.
pub trait ScalarFunction: fmt::Debug + Send + Sync {
    /// Registered name; lookup is case-insensitive.
    fn name(&self) -> &'static str;

    /// Static result kind, or `Unknown` when it depends on the arguments.
    fn return_type(&self) -> ValueType;

    /// Validate arity and argument shape at node-construction time.
    fn validate(&self, node: &FuncNode) -> Result<()>;

    /// Evaluate. Arguments that failed to evaluate arrive as Nil; `None`
    /// signals the function itself could not produce a value.
    fn eval(&self, ctx: &dyn EvalContext, args: &[Value]) -> Option<Value>;
}

/// Arity check shared by the builtin validators.
pub fn expect_args(name: &str, node: &FuncNode, min: usize, max: usize) -> Result<()> {
    let got = node.args.len();
    if got < min || got > max {
        if min == max {
            return Err(Error::invalid_argument(format!(
                "{} expects {} argument(s), got {}",
                name, min, got
            )));
        }
        return Err(Error::invalid_argument(format!(
            "{} expects between {} and {} arguments, got {}",
            name, min, max, got
        )));
    }
    Ok(())
}
