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

use std::fmt::Display;

/// State cache error.
///
/// Lookups never error; a missing entry is `None` or an empty collection.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Multiple error list.
    #[error(transparent)]
    Multiple(MultipleError),
    /// Entry payload rejected before it reaches the store.
    #[error("invalid entry {id:?}: {reason}")]
    InvalidEntry {
        /// Id of the rejected entry.
        id: String,
        /// What the validation found.
        reason: &'static str,
    },
    /// Glob pattern rejected at compilation.
    #[error("invalid glob {pattern:?}")]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// Rejection reported by the regex engine.
        #[source]
        source: regex::Error,
    },
    /// Failure raised by an external collaborator, e.g. a collector agent
    /// poll cycle.
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Combine multiple errors into one error.
    pub fn multiple(errs: Vec<Error>) -> Self {
        Self::Multiple(MultipleError(errs))
    }
}

/// Error list collected from a batch operation.
///
/// A batch runs to completion; this carries the failures of the items that
/// were dropped along the way.
#[derive(thiserror::Error, Debug)]
pub struct MultipleError(Vec<Error>);

impl MultipleError {
    /// Individual errors, in batch order.
    pub fn errors(&self) -> &[Error] {
        &self.0
    }
}

impl Display for MultipleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "multiple errors: [")?;
        if let Some((last, errs)) = self.0.as_slice().split_last() {
            for err in errs {
                write!(f, "{}, ", err)?;
            }
            write!(f, "{}", last)?;
        }
        write!(f, "]")?;
        Ok(())
    }
}

/// State cache result.
pub type Result<T> = std::result::Result<T, Error>;
