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

use std::collections::BTreeSet;

/// Read-time relationship selector.
///
/// Reads pass each relationship type name of an entry through the filter and
/// copy only the included ones into the returned snapshot. Attributes are
/// never filtered. Skipping relationships a caller does not need keeps the
/// snapshot copy cheap on heavily linked entries.
pub trait CacheFilter: Send + Sync {
    /// Whether relationship type `name` is copied into read results.
    fn includes(&self, name: &str) -> bool;
}

/// Wraps a closure as a [`CacheFilter`].
pub fn filter_fn<F>(f: F) -> FilterFn<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    FilterFn(f)
}

/// [`CacheFilter`] backed by a closure. Built with [`filter_fn`].
pub struct FilterFn<F>(F);

impl<F> CacheFilter for FilterFn<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn includes(&self, name: &str) -> bool {
        (self.0)(name)
    }
}

/// Stock [`CacheFilter`] selecting relationship types by name.
#[derive(Debug, Clone, Default)]
pub struct RelationshipFilter {
    include: BTreeSet<String>,
}

impl RelationshipFilter {
    /// Exclude every relationship type.
    pub fn none() -> Self {
        Self::default()
    }

    /// Include exactly the named relationship types.
    pub fn include<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            include: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl CacheFilter for RelationshipFilter {
    fn includes(&self, name: &str) -> bool {
        self.include.contains(name)
    }
}
