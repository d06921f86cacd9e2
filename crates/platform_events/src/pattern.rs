//! Wildcard pattern compilation shared by the event and hook registries.
//!
//! A pattern is a plain string where `*` matches any run of characters. The
//! token `all` is accepted as a synonym for `*`. Every other character,
//! including `/` and regex metacharacters, is matched literally and the
//! compiled form is anchored at both ends.
//!
//! Two rules exist for `all`:
//!
//! * [`PatternSyntax::Legacy`] rewrites *every* occurrence of the substring,
//!   so `ballot` compiles to `b.*ot`. Existing listener sets rely on this.
//! * [`PatternSyntax::Strict`] only honours `all` when it is a complete
//!   colon-delimited segment (`obj:all`, `all:saved`).

use crate::error::EventError;
use compact_str::CompactString;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const MATCH_ANY: &str = ".*";
const ALL_TOKEN: &str = "all";

/// Selects how the `all` token is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSyntax {
    #[default]
    Legacy,
    Strict,
}

/// A compiled wildcard pattern. Immutable once built.
#[derive(Clone)]
pub struct Pattern {
    source: CompactString,
    regex: Regex,
}

impl Pattern {
    /// Compiles `source` under the given syntax.
    pub fn compile(source: &str, syntax: PatternSyntax) -> Result<Self, EventError> {
        let body = match syntax {
            PatternSyntax::Legacy => translate_legacy(source),
            PatternSyntax::Strict => translate_strict(source),
        };

        let regex = Regex::new(&format!("^(?:{body})$")).map_err(|source_err| {
            EventError::InvalidPattern {
                pattern: source.to_string(),
                source: source_err,
            }
        })?;

        Ok(Self {
            source: CompactString::new(source),
            regex,
        })
    }

    /// The pattern as it was registered.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The anchored expression the pattern compiled to.
    #[inline]
    pub fn compiled(&self) -> &str {
        self.regex.as_str()
    }

    /// Tests whether the whole of `candidate` matches.
    #[inline]
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// Whether this pattern can match more than one literal string.
    pub fn is_wildcard(&self) -> bool {
        self.compiled().contains(MATCH_ANY)
    }
}

/// Patterns are the same bucket key when they compile to the same expression,
/// so `*` and `all` are interchangeable.
impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.compiled() == other.compiled()
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("compiled", &self.compiled())
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compiles and matches in one step.
pub fn matches(pattern: &str, candidate: &str, syntax: PatternSyntax) -> Result<bool, EventError> {
    Ok(Pattern::compile(pattern, syntax)?.matches(candidate))
}

fn translate_legacy(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    let mut literal = String::new();
    let mut rest = source;

    while let Some(ch) = rest.chars().next() {
        if rest.starts_with(ALL_TOKEN) {
            flush_literal(&mut out, &mut literal);
            out.push_str(MATCH_ANY);
            rest = &rest[ALL_TOKEN.len()..];
        } else if ch == '*' {
            flush_literal(&mut out, &mut literal);
            out.push_str(MATCH_ANY);
            rest = &rest[1..];
        } else {
            literal.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    flush_literal(&mut out, &mut literal);
    out
}

fn translate_strict(source: &str) -> String {
    source
        .split(':')
        .map(|segment| {
            if segment == ALL_TOKEN {
                return MATCH_ANY.to_string();
            }
            segment
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(MATCH_ANY)
        })
        .collect::<Vec<_>>()
        .join(":")
}

fn flush_literal(out: &mut String, literal: &mut String) {
    if !literal.is_empty() {
        out.push_str(&regex::escape(literal));
        literal.clear();
    }
}
