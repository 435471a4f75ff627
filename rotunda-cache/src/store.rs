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

use std::{collections::BTreeSet, sync::Arc};

use itertools::{Either, Itertools};
use parking_lot::RwLock;
use rotunda_common::{hasher::HashBuilder, scope::Scope};

use crate::{
    data::{Attributes, CacheData},
    filter::CacheFilter,
    glob::Glob,
};

/// Live storage for one entry.
///
/// A slot is created once per (type, id) and mutated in place from then on;
/// it is never swapped for a fresh one, so concurrently held handles stay
/// valid across merges. Attributes and relationships sit behind separate
/// locks: merges take each lock once per bulk step and never both at once.
pub(crate) struct Slot {
    id: String,
    attributes: RwLock<Attributes>,
    relationships: RwLock<std::collections::HashMap<String, BTreeSet<String>>>,
}

impl Slot {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            attributes: RwLock::new(Attributes::default()),
            relationships: RwLock::new(Default::default()),
        }
    }

    /// Apply one merge payload.
    ///
    /// Runs as a sequence of bulk map operations, each atomic on its own;
    /// merges racing on the same slot interleave between the steps, last
    /// write wins per key.
    pub(crate) fn merge(&self, update: CacheData) {
        let (_, attributes, relationships) = update.into_parts();

        // Attribute keys absent from the update are dropped: the payload
        // replaces the attribute key set wholesale.
        let missing = self
            .attributes
            .read()
            .with(|attrs| attrs.keys().filter(|key| !attributes.contains_key(*key)).cloned().collect_vec());
        let (removals, puts): (Vec<String>, Attributes) =
            attributes.into_iter().partition_map(|(key, value)| {
                if value.is_null() {
                    Either::Left(key)
                } else {
                    Either::Right((key, value))
                }
            });

        self.attributes.write().with(|mut attrs| attrs.extend(puts));
        self.attributes.write().with(|mut attrs| {
            for key in &missing {
                attrs.remove(key);
            }
        });
        self.attributes.write().with(|mut attrs| {
            for key in &removals {
                attrs.remove(key);
            }
        });

        // Relationship types the update does not mention stay as they are.
        let (rel_removals, rel_puts): (Vec<String>, Vec<(String, BTreeSet<String>)>) =
            relationships.into_iter().partition_map(|(name, targets)| match targets {
                None => Either::Left(name),
                Some(targets) => Either::Right((name, targets)),
            });

        self.relationships.write().with(|mut rels| rels.extend(rel_puts));
        self.relationships.write().with(|mut rels| {
            for name in &rel_removals {
                rels.remove(name);
            }
        });
    }

    /// Detached copy for readers.
    ///
    /// `None` while the slot has no attributes; relationship-only stubs are
    /// invisible to entry reads.
    pub(crate) fn snapshot(&self, filter: Option<&dyn CacheFilter>) -> Option<CacheData> {
        let attributes = self.attributes.read().clone();
        if attributes.is_empty() {
            return None;
        }
        let relationships = self.relationships.read().with(|rels| {
            rels.iter()
                .filter(|(name, _)| filter.map_or(true, |f| f.includes(name)))
                .map(|(name, targets)| (name.clone(), targets.clone()))
                .collect_vec()
        });
        Some(CacheData::from_stored(self.id.clone(), attributes, relationships))
    }
}

/// Slots of one resource type, sharded by id hash.
pub(crate) struct Partition<S>
where
    S: HashBuilder,
{
    shards: Vec<RwLock<hashbrown::HashMap<String, Arc<Slot>>>>,
    hash_builder: Arc<S>,
}

impl<S> Partition<S>
where
    S: HashBuilder,
{
    pub(crate) fn new(shards: usize, hash_builder: Arc<S>) -> Self {
        assert!(shards > 0, "shards must be greater than zero, got: {shards}");
        Self {
            shards: (0..shards).map(|_| RwLock::new(hashbrown::HashMap::new())).collect_vec(),
            hash_builder,
        }
    }

    fn shard(&self, id: &str) -> usize {
        self.hash_builder.hash_one(id) as usize % self.shards.len()
    }

    /// Get the slot for `id`, installing a fresh one if absent.
    ///
    /// Installation is atomic under the shard guard; racing writers all end
    /// up on the winner's slot.
    pub(crate) fn slot_or_create(&self, id: &str) -> Arc<Slot> {
        self.shards[self.shard(id)]
            .write()
            .with(|mut shard| shard.entry_ref(id).or_insert_with(|| Arc::new(Slot::new(id))).clone())
    }

    pub(crate) fn slot(&self, id: &str) -> Option<Arc<Slot>> {
        self.shards[self.shard(id)].read().with(|shard| shard.get(id).cloned())
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.shards[self.shard(id)].read().with(|shard| shard.contains_key(id))
    }

    /// Drop the slot for `id` unconditionally. The slot is released outside
    /// the shard guard.
    pub(crate) fn remove(&self, id: &str) -> bool {
        let slot = self.shards[self.shard(id)].write().with(|mut shard| shard.remove(id));
        slot.is_some()
    }

    /// Identifiers across all shards, attribute-less stubs included.
    pub(crate) fn ids(&self) -> BTreeSet<String> {
        self.shards
            .iter()
            .flat_map(|shard| shard.read().with(|shard| shard.keys().cloned().collect_vec()))
            .collect()
    }

    /// Identifiers matching `glob`, attribute-less stubs included.
    pub(crate) fn ids_matching(&self, glob: &Glob) -> BTreeSet<String> {
        self.shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .with(|shard| shard.keys().filter(|id| glob.is_match(id)).cloned().collect_vec())
            })
            .collect()
    }

    /// Handles on every slot. Guards are held per shard only; snapshotting
    /// happens after release.
    pub(crate) fn slots(&self) -> Vec<Arc<Slot>> {
        self.shards
            .iter()
            .flat_map(|shard| shard.read().with(|shard| shard.values().cloned().collect_vec()))
            .collect_vec()
    }
}
