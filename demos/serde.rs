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

use rotunda::{Cache, CacheData, CacheResult, InMemoryCache, store_result, WriteableCache};

fn main() -> anyhow::Result<()> {
    let cache = InMemoryCache::new();

    // the wire shape collectors hand over
    let result: CacheResult = serde_json::from_str(
        r#"{
            "cacheResults": {
                "serverGroups": [
                    {
                        "id": "sg-frontend-v002",
                        "ttlSeconds": -1,
                        "attributes": {"capacity": 3, "detail": "canary"},
                        "relationships": {"instances": ["i-001", "i-002"]}
                    }
                ]
            },
            "evictions": {}
        }"#,
    )?;
    store_result(&cache, result)?;

    let entry = cache.get("serverGroups", "sg-frontend-v002").unwrap();
    println!("{}", serde_json::to_string_pretty(&entry)?);

    // explicit nulls are deletion markers
    let update: CacheData = serde_json::from_str(
        r#"{
            "id": "sg-frontend-v002",
            "attributes": {"capacity": 3, "detail": null},
            "relationships": {"instances": null}
        }"#,
    )?;
    cache.merge("serverGroups", update)?;

    let entry = cache.get("serverGroups", "sg-frontend-v002").unwrap();
    assert!(entry.attribute("detail").is_none());
    assert!(entry.relationship("instances").is_none());
    println!("{}", serde_json::to_string_pretty(&entry)?);

    Ok(())
}
