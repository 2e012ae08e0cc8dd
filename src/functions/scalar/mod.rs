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

//! Builtin scalar functions

mod conversion;
mod datetime;
mod string;
mod utility;

pub use conversion::{ToBoolFunction, ToDateFunction, ToIntFunction, ToNumberFunction};
pub use datetime::{EpochMsFunction, NowFunction, YearFunction, YyFunction};
pub use string::{ContainsFunction, JoinFunction, LengthFunction, ToLowerFunction, ToUpperFunction};
pub use utility::{
    CoalesceFunction, EqFunction, ExistsFunction, GeFunction, GtFunction, LeFunction, LtFunction,
    NeFunction, NotFunction,
};
