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

use rotunda::{
    Authority, Cache, CacheData, CacheResult, CachingAgent, InMemoryCache, RelationshipFilter, Result, store_result,
};

fn init_logger() {
    use tracing_subscriber::{prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_line_number(true))
        .with(EnvFilter::from_default_env())
        .init();
}

/// Authoritative source for the instance partition of a single region.
struct InstanceAgent {
    region: String,
    upstream: Vec<(String, String)>,
}

impl CachingAgent for InstanceAgent {
    fn agent_type(&self) -> &str {
        &self.region
    }

    fn provided_types(&self) -> Vec<rotunda::AgentDataType> {
        vec![Authority::Authoritative.for_type("instances")]
    }

    fn load(&self, cache: &dyn Cache) -> Result<CacheResult> {
        let departed: Vec<String> = cache
            .identifiers("instances")
            .into_iter()
            .filter(|id| !self.upstream.iter().any(|(upstream_id, _)| upstream_id == id))
            .collect();
        let items = self.upstream.iter().map(|(id, zone)| {
            CacheData::new(id)
                .with_attribute("zone", zone.as_str())
                .with_attribute("state", "running")
                .with_relationship("zones", [zone.clone()])
        });
        Ok(CacheResult::new()
            .with_items("instances", items)
            .with_evictions("instances", departed))
    }
}

fn main() -> anyhow::Result<()> {
    init_logger();

    let cache = InMemoryCache::builder().with_shards(4).build();

    let mut agent = InstanceAgent {
        region: "demo/us-east-1/instances".to_string(),
        upstream: vec![
            ("i-001".to_string(), "us-east-1a".to_string()),
            ("i-002".to_string(), "us-east-1b".to_string()),
            ("i-003".to_string(), "us-east-1a".to_string()),
        ],
    };

    store_result(&cache, agent.load(&cache)?)?;
    tracing::info!(agent = agent.agent_type(), cached = cache.get_all("instances").len(), "cycle complete");

    // a second observer links the same instances to load balancers
    store_result(
        &cache,
        CacheResult::new().with_items(
            "instances",
            [CacheData::new("i-001")
                .with_attribute("zone", "us-east-1a")
                .with_attribute("state", "running")
                .with_relationship("loadBalancers", ["lb-edge"])],
        ),
    )?;

    let entry = cache.get("instances", "i-001").unwrap();
    println!("i-001 zones: {:?}", entry.relationship("zones"));
    println!("i-001 load balancers: {:?}", entry.relationship("loadBalancers"));

    // narrow a read to one relationship type
    let narrowed = cache
        .get_with_filter("instances", "i-001", Some(&RelationshipFilter::include(["zones"])))
        .unwrap();
    assert!(narrowed.relationship("loadBalancers").is_none());

    // glob over the partition
    let matched = cache.filter_identifiers("instances", "i-00?")?;
    println!("matched: {matched:?}");

    // the upstream shrinks; the next cycle evicts what departed
    agent.upstream.truncate(2);
    store_result(&cache, agent.load(&cache)?)?;
    assert_eq!(cache.identifiers("instances").len(), 2);

    Ok(())
}
