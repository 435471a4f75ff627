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

use std::{collections::BTreeSet, hash::RandomState, sync::Arc};

use itertools::Itertools;
use parking_lot::RwLock;
use rotunda_common::{hasher::HashBuilder, scope::Scope};

use crate::{
    cache::{Cache, WriteableCache},
    data::CacheData,
    error::{Error, Result},
    filter::CacheFilter,
    glob::Glob,
    store::Partition,
};

/// Builder for [`InMemoryCache`].
pub struct InMemoryCacheBuilder<S = RandomState>
where
    S: HashBuilder,
{
    shards: usize,
    hash_builder: S,
}

impl Default for InMemoryCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheBuilder {
    /// Builder with the default configuration.
    pub fn new() -> Self {
        Self {
            shards: 8,
            hash_builder: RandomState::default(),
        }
    }
}

impl<S> InMemoryCacheBuilder<S>
where
    S: HashBuilder,
{
    /// Set the per-partition shard count. Entries are distributed to shards
    /// by id hash; operations on different shards can be parallelized.
    ///
    /// The default value is 8.
    pub fn with_shards(mut self, shards: usize) -> Self {
        assert!(shards > 0, "shards must be greater than zero, got: {shards}");
        self.shards = shards;
        self
    }

    /// Set the id hash builder shared by all partitions.
    pub fn with_hash_builder<OS>(self, hash_builder: OS) -> InMemoryCacheBuilder<OS>
    where
        OS: HashBuilder,
    {
        InMemoryCacheBuilder {
            shards: self.shards,
            hash_builder,
        }
    }

    /// Build the cache with the given configuration.
    pub fn build(self) -> InMemoryCache<S> {
        InMemoryCache {
            inner: Arc::new(Inner {
                partitions: RwLock::new(hashbrown::HashMap::new()),
                shards: self.shards,
                hash_builder: Arc::new(self.hash_builder),
            }),
        }
    }
}

struct Inner<S>
where
    S: HashBuilder,
{
    /// Partitions are created on first write and never removed.
    partitions: RwLock<hashbrown::HashMap<String, Arc<Partition<S>>>>,
    shards: usize,
    hash_builder: Arc<S>,
}

/// Fully in-memory state cache.
///
/// The reference [`WriteableCache`]: typed partitions of mergeable entries,
/// safe to share between collector agents and readers. Cloning is cheap and
/// clones operate on the same storage.
///
/// ```
/// use rotunda_cache::prelude::*;
///
/// let cache = InMemoryCache::new();
/// cache
///     .merge("instances", CacheData::new("i-1").with_attribute("state", "up"))
///     .unwrap();
/// assert!(cache.get("instances", "i-1").is_some());
/// ```
pub struct InMemoryCache<S = RandomState>
where
    S: HashBuilder,
{
    inner: Arc<Inner<S>>,
}

impl<S> Clone for InMemoryCache<S>
where
    S: HashBuilder,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    /// Cache with the default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Builder with the default configuration.
    pub fn builder() -> InMemoryCacheBuilder {
        InMemoryCacheBuilder::new()
    }
}

impl<S> InMemoryCache<S>
where
    S: HashBuilder,
{
    /// Per-partition shard count.
    pub fn shards(&self) -> usize {
        self.inner.shards
    }

    fn partition(&self, resource_type: &str) -> Option<Arc<Partition<S>>> {
        self.inner
            .partitions
            .read()
            .with(|partitions| partitions.get(resource_type).cloned())
    }

    fn partition_or_create(&self, resource_type: &str) -> Arc<Partition<S>> {
        if let Some(partition) = self.partition(resource_type) {
            return partition;
        }
        self.inner.partitions.write().with(|mut partitions| {
            partitions
                .entry_ref(resource_type)
                .or_insert_with(|| Arc::new(Partition::new(self.inner.shards, self.inner.hash_builder.clone())))
                .clone()
        })
    }
}

impl<S> Cache for InMemoryCache<S>
where
    S: HashBuilder,
{
    fn get_with_filter(&self, resource_type: &str, id: &str, filter: Option<&dyn CacheFilter>) -> Option<CacheData> {
        self.partition(resource_type)?.slot(id)?.snapshot(filter)
    }

    fn get_all_with_filter(&self, resource_type: &str, filter: Option<&dyn CacheFilter>) -> Vec<CacheData> {
        match self.partition(resource_type) {
            Some(partition) => partition
                .slots()
                .iter()
                .filter_map(|slot| slot.snapshot(filter))
                .collect_vec(),
            None => vec![],
        }
    }

    fn get_by_ids_with_filter(
        &self,
        resource_type: &str,
        ids: &[String],
        filter: Option<&dyn CacheFilter>,
    ) -> Vec<CacheData> {
        match self.partition(resource_type) {
            Some(partition) => ids
                .iter()
                .filter_map(|id| partition.slot(id).and_then(|slot| slot.snapshot(filter)))
                .collect_vec(),
            None => vec![],
        }
    }

    fn identifiers(&self, resource_type: &str) -> BTreeSet<String> {
        self.partition(resource_type).map(|partition| partition.ids()).unwrap_or_default()
    }

    fn existing_identifiers(&self, resource_type: &str, ids: &[String]) -> BTreeSet<String> {
        match self.partition(resource_type) {
            Some(partition) => ids.iter().filter(|id| partition.contains(id)).cloned().collect(),
            None => BTreeSet::new(),
        }
    }

    fn filter_identifiers(&self, resource_type: &str, glob: &str) -> Result<BTreeSet<String>> {
        // compile first so that a bad pattern fails even on unknown types
        let glob = Glob::new(glob)?;
        Ok(self
            .partition(resource_type)
            .map(|partition| partition.ids_matching(&glob))
            .unwrap_or_default())
    }
}

impl<S> WriteableCache for InMemoryCache<S>
where
    S: HashBuilder,
{
    fn merge(&self, resource_type: &str, item: CacheData) -> Result<()> {
        item.validate()?;
        self.partition_or_create(resource_type).slot_or_create(item.id()).merge(item);
        Ok(())
    }

    fn merge_all(&self, resource_type: &str, items: Vec<CacheData>) -> Result<()> {
        let errs = items
            .into_iter()
            .filter_map(|item| self.merge(resource_type, item).err())
            .collect_vec();
        if errs.is_empty() {
            Ok(())
        } else {
            tracing::warn!(resource_type, dropped = errs.len(), "batch merge dropped invalid entries");
            Err(Error::multiple(errs))
        }
    }

    fn evict(&self, resource_type: &str, id: &str) {
        if let Some(partition) = self.partition(resource_type) {
            partition.remove(id);
        }
    }

    fn evict_all(&self, resource_type: &str, ids: &[String]) {
        let Some(partition) = self.partition(resource_type) else {
            return;
        };
        let mut removed = 0;
        for id in ids {
            removed += usize::from(partition.remove(id));
        }
        tracing::trace!(resource_type, requested = ids.len(), removed, "evicted entries");
    }
}

#[cfg(test)]
mod tests {
    use rotunda_common::hasher::ModHasher;
    use serde_json::json;

    use super::*;
    use crate::filter::{filter_fn, RelationshipFilter};

    fn is_send_sync_static<T: Send + Sync + 'static>() {}

    #[test]
    fn test_send_sync_static() {
        is_send_sync_static::<InMemoryCache>();
        is_send_sync_static::<InMemoryCache<ModHasher>>();
    }

    #[test]
    fn test_dyn_compatible() {
        let _: Arc<dyn WriteableCache> = Arc::new(InMemoryCache::new());
        let _: Arc<dyn Cache> = Arc::new(cache_for_test());
    }

    fn cache_for_test() -> InMemoryCache<ModHasher> {
        InMemoryCache::builder()
            .with_shards(4)
            .with_hash_builder(ModHasher::default())
            .build()
    }

    fn ids<const N: usize>(ids: [&str; N]) -> Vec<String> {
        ids.into_iter().map(str::to_string).collect()
    }

    fn id_set<const N: usize>(ids: [&str; N]) -> BTreeSet<String> {
        ids.into_iter().map(str::to_string).collect()
    }

    #[test]
    fn test_builder() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.shards(), 8);
        let cache = cache_for_test();
        assert_eq!(cache.shards(), 4);
    }

    #[test]
    fn test_get_absent() {
        let cache = cache_for_test();
        assert!(cache.get("instances", "i-1").is_none());

        cache.merge("instances", CacheData::new("i-1").with_attribute("state", "up")).unwrap();
        assert!(cache.get("instances", "i-2").is_none());
        assert!(cache.get("images", "i-1").is_none());
    }

    #[test]
    fn test_merge_then_get() {
        let cache = cache_for_test();
        cache
            .merge(
                "instances",
                CacheData::new("i-1")
                    .with_ttl_seconds(600)
                    .with_attribute("state", "up")
                    .with_relationship("zones", ["us-east-1a"]),
            )
            .unwrap();

        let data = cache.get("instances", "i-1").unwrap();
        assert_eq!(data.id(), "i-1");
        assert_eq!(data.attribute("state"), Some(&json!("up")));
        assert_eq!(data.relationship("zones"), Some(&id_set(["us-east-1a"])));
        // the engine does not persist payload TTLs
        assert_eq!(data.ttl_seconds(), crate::data::NO_TTL);
    }

    #[test]
    fn test_latest_merge_owns_attributes_but_shares_relationships() {
        let cache = cache_for_test();
        // the instance agent asserts state, the balancer agent asserts
        // region and a link; the later payload owns the attribute set
        cache.merge("instances", CacheData::new("i-1").with_attribute("state", "up")).unwrap();
        cache
            .merge(
                "instances",
                CacheData::new("i-1")
                    .with_attribute("region", "us-east-1")
                    .with_relationship("loadBalancers", ["lb-1"]),
            )
            .unwrap();

        let data = cache.get("instances", "i-1").unwrap();
        assert_eq!(data.attribute("state"), None);
        assert_eq!(data.attribute("region"), Some(&json!("us-east-1")));
        assert_eq!(data.attributes().len(), 1);
        assert_eq!(data.relationship("loadBalancers"), Some(&id_set(["lb-1"])));
    }

    #[test]
    fn test_stub_entries_are_listed_but_not_read() {
        let cache = cache_for_test();
        cache
            .merge("instances", CacheData::new("i-stub").with_relationship("zones", ["us-east-1a"]))
            .unwrap();

        assert!(cache.get("instances", "i-stub").is_none());
        assert!(cache.get_all("instances").is_empty());
        assert_eq!(cache.identifiers("instances"), id_set(["i-stub"]));
        assert_eq!(cache.existing_identifiers("instances", &ids(["i-stub", "i-x"])), id_set(["i-stub"]));
        assert_eq!(cache.filter_identifiers("instances", "i-*").unwrap(), id_set(["i-stub"]));
    }

    #[test]
    fn test_get_all() {
        let cache = cache_for_test();
        for i in 0..5 {
            cache
                .merge("instances", CacheData::new(format!("i-{i}")).with_attribute("index", i))
                .unwrap();
        }
        cache.merge("instances", CacheData::new("i-stub")).unwrap();

        let all = cache.get_all("instances");
        assert_eq!(all.len(), 5);
        let seen: BTreeSet<String> = all.iter().map(|data| data.id().to_string()).collect();
        assert_eq!(seen, id_set(["i-0", "i-1", "i-2", "i-3", "i-4"]));

        assert!(cache.get_all("images").is_empty());
    }

    #[test]
    fn test_get_by_ids_keeps_input_order_and_skips_missing() {
        let cache = cache_for_test();
        for id in ["i-1", "i-2", "i-3"] {
            cache.merge("instances", CacheData::new(id).with_attribute("state", "up")).unwrap();
        }

        let got = cache.get_by_ids("instances", &ids(["i-3", "i-missing", "i-1", "i-3"]));
        let got = got.iter().map(CacheData::id).collect_vec();
        assert_eq!(got, vec!["i-3", "i-1", "i-3"]);

        assert!(cache.get_by_ids("images", &ids(["i-1"])).is_empty());
    }

    #[test]
    fn test_read_filters_narrow_relationships_only() {
        let cache = cache_for_test();
        cache
            .merge(
                "instances",
                CacheData::new("i-1")
                    .with_attribute("state", "up")
                    .with_relationship("loadBalancers", ["lb-1"])
                    .with_relationship("serverGroups", ["sg-1"]),
            )
            .unwrap();

        let filter = RelationshipFilter::include(["loadBalancers"]);
        let data = cache.get_with_filter("instances", "i-1", Some(&filter)).unwrap();
        assert_eq!(data.attribute("state"), Some(&json!("up")));
        assert!(data.relationships().contains_key("loadBalancers"));
        assert!(!data.relationships().contains_key("serverGroups"));

        let all = cache.get_all_with_filter("instances", Some(&RelationshipFilter::none()));
        assert_eq!(all.len(), 1);
        assert!(all[0].relationships().is_empty());

        // closures work as filters
        let data = cache
            .get_with_filter("instances", "i-1", Some(&filter_fn(|name| name == "serverGroups")))
            .unwrap();
        assert!(data.relationships().contains_key("serverGroups"));
        assert!(!data.relationships().contains_key("loadBalancers"));
    }

    #[test]
    fn test_evict() {
        let cache = cache_for_test();
        cache.merge("instances", CacheData::new("i-1").with_attribute("state", "up")).unwrap();
        cache.merge("instances", CacheData::new("i-2").with_attribute("state", "up")).unwrap();

        cache.evict("instances", "i-1");
        assert!(cache.get("instances", "i-1").is_none());
        assert_eq!(cache.identifiers("instances"), id_set(["i-2"]));

        // no-ops
        cache.evict("instances", "i-unknown");
        cache.evict("images", "i-1");
        assert_eq!(cache.identifiers("instances"), id_set(["i-2"]));
    }

    #[test]
    fn test_evict_all_and_evict_deleted_items() {
        let cache = cache_for_test();
        for id in ["i-1", "i-2", "i-3"] {
            cache.merge("instances", CacheData::new(id).with_attribute("state", "up")).unwrap();
        }

        cache.evict_all("instances", &ids(["i-1", "i-missing"]));
        assert_eq!(cache.identifiers("instances"), id_set(["i-2", "i-3"]));

        cache.evict_deleted_items("instances", &ids(["i-2", "i-never-cached"]));
        assert_eq!(cache.identifiers("instances"), id_set(["i-3"]));
    }

    #[test]
    fn test_existing_identifiers() {
        let cache = cache_for_test();
        assert!(cache.existing_identifiers("instances", &ids(["i-1"])).is_empty());

        for id in ["i-1", "i-2"] {
            cache.merge("instances", CacheData::new(id).with_attribute("state", "up")).unwrap();
        }
        assert_eq!(
            cache.existing_identifiers("instances", &ids(["i-2", "i-9", "i-1"])),
            id_set(["i-1", "i-2"])
        );
    }

    #[test]
    fn test_filter_identifiers() {
        let cache = cache_for_test();
        for id in ["app-server-v001", "app-server-v002", "app-worker-v010", "db-main-v001"] {
            cache.merge("servers", CacheData::new(id).with_attribute("state", "up")).unwrap();
        }

        assert_eq!(
            cache.filter_identifiers("servers", "app-*-v0??").unwrap(),
            id_set(["app-server-v001", "app-server-v002", "app-worker-v010"])
        );
        assert_eq!(cache.filter_identifiers("servers", "[ad]*").unwrap(), cache.identifiers("servers"));
        assert!(cache.filter_identifiers("servers", "x-*").unwrap().is_empty());

        // a bad pattern fails fast even for unknown types
        assert!(matches!(
            cache.filter_identifiers("servers", "[z-a]"),
            Err(Error::InvalidGlob { .. })
        ));
        assert!(matches!(
            cache.filter_identifiers("unknown", "[z-a]"),
            Err(Error::InvalidGlob { .. })
        ));
        assert!(cache.filter_identifiers("unknown", "app-*").unwrap().is_empty());
    }

    #[test]
    fn test_merge_rejects_invalid_entries() {
        let cache = cache_for_test();
        assert!(matches!(
            cache.merge("instances", CacheData::new("")),
            Err(Error::InvalidEntry { .. })
        ));
        assert!(matches!(
            cache.merge("instances", CacheData::new("i-1").with_ttl_seconds(-2)),
            Err(Error::InvalidEntry { .. })
        ));
        // rejected payloads leave no trace, not even a stub
        assert!(cache.identifiers("instances").is_empty());
    }

    #[test]
    fn test_merge_all_reports_failures_without_losing_progress() {
        let cache = cache_for_test();
        let err = cache
            .merge_all(
                "instances",
                vec![
                    CacheData::new("i-1").with_attribute("state", "up"),
                    CacheData::new(""),
                    CacheData::new("i-2").with_attribute("state", "up"),
                    CacheData::new("i-bad-ttl").with_ttl_seconds(-5),
                ],
            )
            .unwrap_err();

        let Error::Multiple(errs) = err else {
            panic!("expected a multiple error, got: {err}");
        };
        assert_eq!(errs.errors().len(), 2);

        // the valid items around the failures made it in
        assert_eq!(cache.identifiers("instances"), id_set(["i-1", "i-2"]));
    }

    #[test]
    fn test_merge_all_empty_batch() {
        let cache = cache_for_test();
        cache.merge_all("instances", vec![]).unwrap();
        assert!(cache.identifiers("instances").is_empty());
    }

    mod fuzzy {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        use super::*;

        const THREADS: u64 = 8;
        const ITERS: u64 = 10_000;
        const POOL: u64 = 64;

        fn pool_id(n: u64) -> String {
            format!("server-{}", n % POOL)
        }

        #[test_log::test]
        fn test_fuzzy_attribute_writers() {
            let cache = InMemoryCache::new();

            let handles = (0..THREADS)
                .map(|t| {
                    let c = cache.clone();
                    std::thread::spawn(move || {
                        let mut rng = SmallRng::seed_from_u64(t);
                        let field = format!("field-{t}");
                        for i in 0..ITERS {
                            let id = pool_id(rng.random());
                            if rng.random_ratio(1, 4) {
                                if let Some(data) = c.get("servers", &id) {
                                    assert!(!data.attributes().is_empty());
                                }
                                continue;
                            }
                            c.merge("servers", CacheData::new(id).with_attribute(field.clone(), i))
                                .unwrap();
                        }
                    })
                })
                .collect_vec();
            handles.into_iter().for_each(|handle| handle.join().unwrap());

            // Attribute sets replace each other wholesale, so any subset of
            // the per-thread fields may survive on an id; values must still
            // be exactly what some thread wrote.
            for data in cache.get_all("servers") {
                for (key, value) in data.attributes() {
                    assert!(key.starts_with("field-"), "unexpected key: {key}");
                    let value = value.as_u64().expect("torn attribute value");
                    assert!(value < ITERS);
                }
            }
            for id in cache.identifiers("servers") {
                assert!(id.starts_with("server-"), "unexpected id: {id}");
            }
        }

        #[test_log::test]
        fn test_fuzzy_relationship_contributors_never_lose_updates() {
            let cache = InMemoryCache::new();

            let handles = (0..THREADS)
                .map(|t| {
                    let c = cache.clone();
                    std::thread::spawn(move || {
                        let mut rng = SmallRng::seed_from_u64(t);
                        let name = format!("rel-{t}");
                        for i in 0..ITERS {
                            c.merge(
                                "hubs",
                                CacheData::new("hub-1")
                                    .with_attribute("kind", "hub")
                                    .with_relationship(name.clone(), [format!("t-{t}-{i}")]),
                            )
                            .unwrap();
                            if rng.random_ratio(1, 8) {
                                if let Some(data) = c.get("hubs", "hub-1") {
                                    for (name, targets) in data.relationships() {
                                        let targets = targets.as_ref().expect("snapshot holds no markers");
                                        assert_eq!(targets.len(), 1);
                                        let rel = name.strip_prefix("rel-").unwrap();
                                        assert!(targets.first().unwrap().starts_with(&format!("t-{rel}-")));
                                    }
                                }
                            }
                        }
                    })
                })
                .collect_vec();
            handles.into_iter().for_each(|handle| handle.join().unwrap());

            // relationship merging is additive: every contributor survives
            let data = cache.get("hubs", "hub-1").unwrap();
            for t in 0..THREADS {
                let targets = data.relationship(&format!("rel-{t}")).unwrap();
                assert_eq!(targets.len(), 1);
                assert!(targets.first().unwrap().starts_with(&format!("t-{t}-")));
            }
        }

        #[test_log::test]
        fn test_fuzzy_merge_evict_readers() {
            let cache = InMemoryCache::new();

            let handles = (0..THREADS)
                .map(|t| {
                    let c = cache.clone();
                    std::thread::spawn(move || {
                        let mut rng = SmallRng::seed_from_u64(t);
                        for i in 0..ITERS {
                            let id = pool_id(rng.random());
                            match rng.random_range(0..4u8) {
                                0 => c.evict("servers", &id),
                                1 => {
                                    let _ = c.get("servers", &id);
                                }
                                2 => {
                                    let _ = c.filter_identifiers("servers", "server-1*").unwrap();
                                }
                                _ => c
                                    .merge(
                                        "servers",
                                        CacheData::new(id)
                                            .with_attribute("iter", i)
                                            .with_relationship(format!("rel-{t}"), ["x"]),
                                    )
                                    .unwrap(),
                            }
                        }
                    })
                })
                .collect_vec();
            handles.into_iter().for_each(|handle| handle.join().unwrap());

            for id in cache.identifiers("servers") {
                assert!(id.starts_with("server-"));
            }
        }
    }
}
