// Copyright 2024 rotunda Project Authors
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

//! State cache engine for rotunda.
//!
//! Typed partitions of mergeable entries, shared by concurrent collector
//! agents on the write side and query services on the read side. Entries
//! merge field-wise: attribute sets replace, relationship types accumulate.

mod agent;
mod cache;
mod data;
mod error;
mod filter;
mod glob;
mod memory;
mod store;

/// Re-exports of the public API.
pub mod prelude;
pub use prelude::*;
