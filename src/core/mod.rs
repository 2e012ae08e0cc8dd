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

//! Core types: the value lattice and the error taxonomy

pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use types::ValueType;
pub use value::{
    parse_bool, parse_time, time_from_epoch, values_equal, StructObject, Value, NIL_INT,
};
