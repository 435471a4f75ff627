// Copyright 2025 rotunda Project Authors
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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    cache::{Cache, WriteableCache},
    data::CacheData,
    error::{Error, Result},
};

/// How strongly an agent's view of a resource type binds the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authority {
    /// The agent observes the full id set of the type; ids it stops
    /// reporting are eligible for eviction.
    Authoritative,
    /// The agent only enriches entries owned by another agent.
    Informative,
}

impl Authority {
    /// Declare a provided resource type under this authority.
    pub fn for_type(self, resource_type: impl Into<String>) -> AgentDataType {
        AgentDataType {
            authority: self,
            type_name: resource_type.into(),
        }
    }
}

/// One resource type an agent provides, with the authority it holds over it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDataType {
    /// The authority the agent holds over the type.
    pub authority: Authority,
    /// The provided resource type.
    pub type_name: String,
}

/// Outcome of one agent poll cycle: entries to merge and ids to evict, per
/// resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheResult {
    /// Entries to merge, keyed by resource type.
    #[serde(default)]
    pub cache_results: HashMap<String, Vec<CacheData>>,
    /// Identifiers whose upstream resources are positively gone, keyed by
    /// resource type.
    #[serde(default)]
    pub evictions: HashMap<String, Vec<String>>,
}

impl CacheResult {
    /// An empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add entries of `resource_type` to merge.
    pub fn with_items<I>(mut self, resource_type: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = CacheData>,
    {
        self.cache_results.entry(resource_type.into()).or_default().extend(items);
        self
    }

    /// Add ids of `resource_type` to evict.
    pub fn with_evictions<I, T>(mut self, resource_type: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.evictions
            .entry(resource_type.into())
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Whether the cycle produced neither entries nor evictions.
    pub fn is_empty(&self) -> bool {
        self.cache_results.values().all(Vec::is_empty) && self.evictions.values().all(Vec::is_empty)
    }
}

/// A periodic collector contributing one slice of the inventory.
///
/// Agents are driven by an external scheduler, one agent per resource
/// type/account/region; the cache itself never polls. An agent polls its
/// upstream source, diffs against what `load` can read from the cache, and
/// hands back a [`CacheResult`] for [`store_result`] to apply.
pub trait CachingAgent: Send + Sync {
    /// Stable name identifying the agent, e.g. `aws/us-east-1/instances`.
    fn agent_type(&self) -> &str;

    /// The resource types this agent provides, with their authority.
    fn provided_types(&self) -> Vec<AgentDataType>;

    /// Poll the upstream source and produce this cycle's result.
    fn load(&self, cache: &dyn Cache) -> Result<CacheResult>;
}

/// Write one poll cycle's outcome into `cache`.
///
/// Merges every type's entries, then applies evictions restricted to ids
/// actually present. A failing type does not stop the others; failures are
/// surfaced together once the whole result is applied.
pub fn store_result<C>(cache: &C, result: CacheResult) -> Result<()>
where
    C: WriteableCache + ?Sized,
{
    let CacheResult {
        cache_results,
        evictions,
    } = result;

    let mut errs = Vec::new();
    for (resource_type, items) in cache_results {
        if let Err(err) = cache.merge_all(&resource_type, items) {
            errs.push(err);
        }
    }
    for (resource_type, ids) in evictions {
        cache.evict_deleted_items(&resource_type, &ids);
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(Error::multiple(errs))
    }
}
