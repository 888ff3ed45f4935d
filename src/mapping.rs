//! Ordered prefix rules that rewrite media-library paths into the storage
//! namespace behind the CDN.

use std::borrow::Cow;

use tracing::debug;

use crate::error::{ConfigError, RedirectError};

/// How a rule string separates its two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSyntax {
    /// `source:dest`, used for CDN and object-storage mappings
    Colon,
    /// `source=>dest`, used for strm remote-path mappings
    Arrow,
}

impl RuleSyntax {
    fn separator(self) -> &'static str {
        match self {
            RuleSyntax::Colon => ":",
            RuleSyntax::Arrow => "=>",
        }
    }
}

/// One `source -> dest` substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    pub source: String,
    pub dest: String,
}

impl MappingRule {
    /// Parse a rule string. `=>` takes precedence over `:` so arrow rules may
    /// contain colons.
    pub fn parse(rule: &str) -> Result<Self, ConfigError> {
        let syntax = if rule.contains(RuleSyntax::Arrow.separator()) {
            RuleSyntax::Arrow
        } else {
            RuleSyntax::Colon
        };
        Self::parse_with(rule, syntax)
    }

    pub fn parse_with(rule: &str, syntax: RuleSyntax) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidMappingRule {
            rule: rule.to_string(),
            reason,
        };

        let parts: Vec<&str> = rule.split(syntax.separator()).collect();
        let [source, dest] = parts.as_slice() else {
            return Err(invalid("expected exactly one separator"));
        };

        let (source, dest) = (source.trim(), dest.trim());
        if source.is_empty() || dest.is_empty() {
            return Err(invalid("source and destination must not be empty"));
        }

        Ok(Self {
            source: source.to_string(),
            dest: dest.to_string(),
        })
    }
}

/// Ordered mapping table. Rules are tried top to bottom and at most one
/// substitution happens per path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMapping {
    rules: Vec<MappingRule>,
}

impl PathMapping {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }

    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Result<Self, ConfigError> {
        rules
            .iter()
            .map(|rule| MappingRule::parse(rule.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn apply(&self, path: &str) -> Option<(&MappingRule, String)> {
        // Substring match, not prefix-anchored: the source may occur anywhere.
        self.rules
            .iter()
            .find(|rule| path.contains(rule.source.as_str()))
            .map(|rule| (rule, path.replacen(rule.source.as_str(), &rule.dest, 1)))
    }

    /// Rewrite `path` with the first matching rule.
    ///
    /// Returns [`RedirectError::NoMappingMatch`] when no rule applies, which
    /// means the path lives outside the CDN namespace.
    pub fn map(&self, path: &str) -> Result<String, RedirectError> {
        match self.apply(path) {
            Some((rule, mapped)) => {
                debug!(from = %rule.source, to = %rule.dest, "mapped path");
                Ok(mapped)
            }
            None => Err(RedirectError::NoMappingMatch {
                path: path.to_string(),
            }),
        }
    }

    /// Like [`map`](Self::map) but returns the path unchanged when nothing matches.
    pub fn map_or_keep<'a>(&self, path: &'a str) -> Cow<'a, str> {
        match self.apply(path) {
            Some((rule, mapped)) => {
                debug!(from = %rule.source, to = %rule.dest, "mapped path");
                Cow::Owned(mapped)
            }
            None => Cow::Borrowed(path),
        }
    }
}
