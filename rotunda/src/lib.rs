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

//! rotunda is a type-partitioned, in-memory state cache for cloud resource
//! inventories.
//!
//! Collector agents continuously re-poll cloud APIs and merge what they see
//! into the cache; query services read from it instead of hitting the cloud.
//! Entries merge field-wise: the attribute key set of an entry is replaced
//! by each merge, while relationship types accumulate across agents so that
//! independent collectors can link the same entry without overwriting each
//! other.
//!
//! # Examples
//!
//! ```
//! use rotunda::{Cache, CacheData, InMemoryCache, RelationshipFilter, WriteableCache};
//!
//! let cache = InMemoryCache::builder().with_shards(16).build();
//!
//! // the instance agent reports state, the load balancer agent links it
//! cache.merge(
//!     "instances",
//!     CacheData::new("i-1")
//!         .with_attribute("state", "up")
//!         .with_relationship("loadBalancers", ["lb-1"]),
//! )?;
//! cache.merge(
//!     "instances",
//!     CacheData::new("i-1")
//!         .with_attribute("state", "up")
//!         .with_relationship("serverGroups", ["sg-1"]),
//! )?;
//!
//! let entry = cache.get("instances", "i-1").unwrap();
//! assert!(entry.relationship("loadBalancers").is_some());
//! assert!(entry.relationship("serverGroups").is_some());
//!
//! // narrow reads copy only the relationships they need
//! let filter = RelationshipFilter::include(["serverGroups"]);
//! let entry = cache.get_with_filter("instances", "i-1", Some(&filter)).unwrap();
//! assert!(entry.relationship("loadBalancers").is_none());
//!
//! let matched = cache.filter_identifiers("instances", "i-*")?;
//! assert_eq!(matched.len(), 1);
//! # Ok::<(), rotunda::Error>(())
//! ```

pub use rotunda_cache::prelude::*;
