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

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::{data::CacheData, error::Result, filter::CacheFilter};

/// Read access to a state cache.
///
/// A cache is a registry of typed partitions; every operation names the
/// resource type it works on. Reads return detached snapshots and never
/// block on upstream sources.
pub trait Cache: Send + Sync + 'static {
    /// Snapshot of the entry `id` of `resource_type`.
    ///
    /// `None` if the id was never merged or currently has no attributes.
    /// Relationship types the filter excludes are dropped from the snapshot;
    /// attributes are returned unfiltered.
    fn get_with_filter(&self, resource_type: &str, id: &str, filter: Option<&dyn CacheFilter>) -> Option<CacheData>;

    /// Snapshots of every live entry of `resource_type`, in no particular
    /// order.
    ///
    /// The result is materialized at call time; later merges and evictions
    /// do not show through.
    fn get_all_with_filter(&self, resource_type: &str, filter: Option<&dyn CacheFilter>) -> Vec<CacheData>;

    /// Snapshots for `ids`, in input order. Missing and attribute-less ids
    /// are skipped.
    fn get_by_ids_with_filter(
        &self,
        resource_type: &str,
        ids: &[String],
        filter: Option<&dyn CacheFilter>,
    ) -> Vec<CacheData>;

    /// Every identifier present in the `resource_type` partition.
    ///
    /// Includes entries that currently have no attributes and are invisible
    /// to `get`.
    fn identifiers(&self, resource_type: &str) -> BTreeSet<String>;

    /// The subset of `ids` present in the `resource_type` partition.
    fn existing_identifiers(&self, resource_type: &str, ids: &[String]) -> BTreeSet<String>;

    /// Identifiers of `resource_type` whose whole text matches `glob`.
    ///
    /// Scans the partition key set; there is no identifier index.
    fn filter_identifiers(&self, resource_type: &str, glob: &str) -> Result<BTreeSet<String>>;

    /// [`get_with_filter`] with all relationships included.
    ///
    /// [`get_with_filter`]: Cache::get_with_filter
    fn get(&self, resource_type: &str, id: &str) -> Option<CacheData> {
        self.get_with_filter(resource_type, id, None)
    }

    /// [`get_all_with_filter`] with all relationships included.
    ///
    /// [`get_all_with_filter`]: Cache::get_all_with_filter
    fn get_all(&self, resource_type: &str) -> Vec<CacheData> {
        self.get_all_with_filter(resource_type, None)
    }

    /// [`get_by_ids_with_filter`] with all relationships included.
    ///
    /// [`get_by_ids_with_filter`]: Cache::get_by_ids_with_filter
    fn get_by_ids(&self, resource_type: &str, ids: &[String]) -> Vec<CacheData> {
        self.get_by_ids_with_filter(resource_type, ids, None)
    }
}

/// Write access to a state cache.
pub trait WriteableCache: Cache {
    /// Merge `item` into its slot, creating partition and slot on demand.
    ///
    /// Attributes are replaced as a set, relationship types additively; see
    /// [`CacheData`] for the exact contract. Concurrent merges to the same
    /// id interleave per field map operation, last write wins per key.
    fn merge(&self, resource_type: &str, item: CacheData) -> Result<()>;

    /// Merge every item of the batch.
    ///
    /// A failing item does not stop the batch; failures are collected and
    /// returned together once every item has been processed, identified by
    /// entry id.
    fn merge_all(&self, resource_type: &str, items: Vec<CacheData>) -> Result<()>;

    /// Drop the slot for `id`. A missing id is a no-op.
    fn evict(&self, resource_type: &str, id: &str);

    /// Drop the slots for `ids`. Missing ids are no-ops.
    fn evict_all(&self, resource_type: &str, ids: &[String]);

    /// Evict the subset of `ids` that is actually cached.
    ///
    /// Agents apply upstream deletion lists with this so that ids which
    /// never made it into the cache stay untouched on backends where
    /// eviction writes bookkeeping.
    fn evict_deleted_items(&self, resource_type: &str, ids: &[String]) {
        let existing = self.existing_identifiers(resource_type, ids).into_iter().collect_vec();
        self.evict_all(resource_type, &existing);
    }
}
