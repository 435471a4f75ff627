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

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Advisory TTL value meaning "never expires".
pub const NO_TTL: i64 = -1;

/// Attribute map of a cache entry.
///
/// Values are opaque JSON. In a merge payload, `Value::Null` marks the
/// attribute for deletion; stored entries never hold nulls.
pub type Attributes = HashMap<String, Value>;

/// Relationship map of a cache entry: relationship type name to the foreign
/// identifiers of that type.
///
/// In a merge payload, `None` marks the relationship type for deletion;
/// stored entries and read snapshots always hold `Some`.
pub type Relationships = HashMap<String, Option<BTreeSet<String>>>;

/// One cache entry, used both as the merge payload produced by collector
/// agents and as the detached snapshot returned by reads.
///
/// Merging treats the two maps differently:
///
/// - Attributes are replaced as a set: after a merge, the stored attribute
///   keys are exactly the non-null keys of the payload. Keys the payload
///   omits are deleted, and `Value::Null` deletes explicitly.
/// - Relationship types are merged additively: keys the payload omits are
///   left untouched, non-null keys overwrite their target set, and only an
///   explicit `None` deletes.
///
/// Snapshots share no storage with the live entry; mutating the cache after
/// a read leaves earlier snapshots unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheData {
    id: String,
    #[serde(default = "no_ttl")]
    ttl_seconds: i64,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    relationships: Relationships,
}

fn no_ttl() -> i64 {
    NO_TTL
}

impl CacheData {
    /// A payload with the given id and no fields set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ttl_seconds: NO_TTL,
            attributes: Attributes::default(),
            relationships: Relationships::default(),
        }
    }

    /// Set the advisory TTL in seconds, `-1` for none.
    ///
    /// The in-memory engine never expires entries; lifetime is driven by
    /// agent evictions. The value is carried for backends that honor it.
    pub fn with_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Set attribute `key` to `value`.
    ///
    /// Setting `Value::Null` is equivalent to [`without_attribute`].
    ///
    /// [`without_attribute`]: CacheData::without_attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Mark attribute `key` for deletion on merge.
    pub fn without_attribute(mut self, key: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), Value::Null);
        self
    }

    /// Replace the whole attribute map.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Assert relationship `name` as exactly `targets`.
    ///
    /// Merging overwrites the stored target set of `name`; other
    /// relationship types are untouched.
    pub fn with_relationship<I, T>(mut self, name: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.relationships
            .insert(name.into(), Some(targets.into_iter().map(Into::into).collect()));
        self
    }

    /// Mark relationship type `name` for deletion on merge.
    pub fn without_relationship(mut self, name: impl Into<String>) -> Self {
        self.relationships.insert(name.into(), None);
        self
    }

    /// Replace the whole relationship map.
    pub fn with_relationships(mut self, relationships: Relationships) -> Self {
        self.relationships = relationships;
        self
    }

    /// Entry id, unique within its resource type.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Advisory TTL in seconds, `-1` for none.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// The attribute map.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Attribute `key`, if set.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The relationship map, deletion markers included.
    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Targets of relationship `name`, if asserted.
    ///
    /// A deletion marker reads as absent.
    pub fn relationship(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.relationships.get(name).and_then(Option::as_ref)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidEntry {
                id: self.id.clone(),
                reason: "id must not be empty",
            });
        }
        if self.ttl_seconds < NO_TTL {
            return Err(Error::InvalidEntry {
                id: self.id.clone(),
                reason: "ttl_seconds must be -1 or non-negative",
            });
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (String, Attributes, Relationships) {
        (self.id, self.attributes, self.relationships)
    }

    pub(crate) fn from_stored<R>(id: String, attributes: Attributes, relationships: R) -> Self
    where
        R: IntoIterator<Item = (String, BTreeSet<String>)>,
    {
        Self {
            id,
            ttl_seconds: NO_TTL,
            attributes,
            relationships: relationships.into_iter().map(|(name, targets)| (name, Some(targets))).collect(),
        }
    }
}
