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

use std::{fmt::Display, str::FromStr};

use regex::Regex;

use crate::error::{Error, Result};

/// A compiled identifier glob, matched against whole identifiers.
///
/// Supported syntax:
///
/// - `*` matches any run of characters, including the empty run.
/// - `?` matches exactly one character.
/// - `[...]` is a regex character class, copied verbatim.
/// - `\` escapes the next character, inside and outside classes.
///
/// Everything else matches literally; identifiers are flat strings, so `*`
/// crosses `/`, `:` and other separators freely. Compilation fails fast on
/// class bodies the regex engine rejects.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

enum State {
    Init,
    Escaping,
    Capturing,
    CapturingEscape,
}

impl Glob {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<Self> {
        let source = Self::regex_source(pattern);
        let regex = Regex::new(&source).map_err(|source| Error::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The original glob pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the whole of `id` matches.
    pub fn is_match(&self, id: &str) -> bool {
        self.regex.is_match(id)
    }

    fn regex_source(pattern: &str) -> String {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push_str(r"\A(?:");
        // pending literal run, regex-quoted on flush
        let mut literal = String::new();
        // pending character class body, emitted verbatim on `]`
        let mut capture = String::new();
        let mut state = State::Init;

        for c in pattern.chars() {
            state = match state {
                State::Init => match c {
                    '\\' => State::Escaping,
                    '*' => {
                        flush_literal(&mut source, &mut literal);
                        source.push_str(".*");
                        State::Init
                    }
                    '?' => {
                        flush_literal(&mut source, &mut literal);
                        source.push('.');
                        State::Init
                    }
                    '[' => {
                        flush_literal(&mut source, &mut literal);
                        State::Capturing
                    }
                    _ => {
                        literal.push(c);
                        State::Init
                    }
                },
                State::Escaping => {
                    literal.push(c);
                    State::Init
                }
                State::Capturing => match c {
                    ']' => {
                        source.push('[');
                        source.push_str(&capture);
                        source.push(']');
                        capture.clear();
                        State::Init
                    }
                    '\\' => {
                        capture.push('\\');
                        State::CapturingEscape
                    }
                    _ => {
                        capture.push(c);
                        State::Capturing
                    }
                },
                State::CapturingEscape => {
                    capture.push(c);
                    State::Capturing
                }
            };
        }

        // A class left open at end of input downgrades to literal text.
        if matches!(state, State::Capturing | State::CapturingEscape) {
            literal.push('[');
            literal.push_str(&capture);
        }
        flush_literal(&mut source, &mut literal);

        source.push_str(r")\z");
        source
    }
}

fn flush_literal(source: &mut String, literal: &mut String) {
    if !literal.is_empty() {
        source.push_str(&regex::escape(literal));
        literal.clear();
    }
}

impl FromStr for Glob {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Display for Glob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pattern)
    }
}
