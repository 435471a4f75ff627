// Copyright 2026 rotunda Project Authors
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

pub use crate::{
    agent::{AgentDataType, Authority, CacheResult, CachingAgent, store_result},
    cache::{Cache, WriteableCache},
    data::{Attributes, CacheData, NO_TTL, Relationships},
    error::{Error, MultipleError, Result},
    filter::{CacheFilter, filter_fn, FilterFn, RelationshipFilter},
    glob::Glob,
    memory::{InMemoryCache, InMemoryCacheBuilder},
};
