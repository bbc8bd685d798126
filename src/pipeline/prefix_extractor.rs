use indexmap::IndexMap;
use regex::Regex;

use crate::error::ConfigError;

/// Result of looking for a header/prefix on a line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMatch {
    /// The matched leading text, empty when nothing matched
    pub prefix: String,
    /// Header fields extracted from the prefix, in capture group order
    pub fields: IndexMap<String, String>,
}

impl PrefixMatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.fields.is_empty()
    }
}

/// Finds a recognized prefix on a line. Not finding one is not an error.
pub trait PrefixMatcher: Send + Sync {
    fn find_prefix(&self, line: &str) -> PrefixMatch;
}

impl<F> PrefixMatcher for F
where
    F: Fn(&str) -> PrefixMatch + Send + Sync,
{
    fn find_prefix(&self, line: &str) -> PrefixMatch {
        self(line)
    }
}

/// Prefix matcher driven by a regex with named capture groups.
///
/// The whole match is the prefix; each named group that took part in the
/// match becomes a header field.
#[derive(Debug, Clone)]
pub struct RegexPrefix {
    regex: Regex,
}

impl RegexPrefix {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPrefixRegex {
            pattern: pattern.to_string(),
            source,
        })?;

        if regex.capture_names().flatten().next().is_none() {
            return Err(ConfigError::PrefixWithoutNamedGroups(pattern.to_string()));
        }

        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl PrefixMatcher for RegexPrefix {
    fn find_prefix(&self, line: &str) -> PrefixMatch {
        let Some(caps) = self.regex.captures(line) else {
            return PrefixMatch::none();
        };

        let mut fields = IndexMap::new();
        for name in self.regex.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                fields.insert(name.to_string(), m.as_str().to_string());
            }
        }

        PrefixMatch {
            prefix: caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default(),
            fields,
        }
    }
}

/// Splits a line at the first occurrence of a separator and stores the
/// (trimmed) text before it under a single field name, e.g. docker compose
/// style `web_1 | ...` lines.
#[derive(Debug, Clone)]
pub struct SeparatorPrefix {
    pub field_name: String,
    pub separator: String,
}

impl SeparatorPrefix {
    pub fn new(field_name: String, separator: String) -> Self {
        Self {
            field_name,
            separator,
        }
    }
}

impl PrefixMatcher for SeparatorPrefix {
    fn find_prefix(&self, line: &str) -> PrefixMatch {
        if self.separator.is_empty() {
            return PrefixMatch::none();
        }

        let Some(sep_pos) = line.find(&self.separator) else {
            return PrefixMatch::none();
        };

        let end = sep_pos + self.separator.len();
        let value = line[..sep_pos].trim();

        let mut fields = IndexMap::new();
        if !value.is_empty() {
            fields.insert(self.field_name.clone(), value.to_string());
        }

        PrefixMatch {
            prefix: line[..end].to_string(),
            fields,
        }
    }
}

/// Apply an optional prefix matcher: returns the line with the prefix removed
/// (only when the line actually starts with it) and the header fields.
pub fn extract_prefix<'a>(
    line: &'a str,
    matcher: Option<&dyn PrefixMatcher>,
) -> (&'a str, IndexMap<String, String>) {
    let Some(matcher) = matcher else {
        return (line, IndexMap::new());
    };

    let found = matcher.find_prefix(line);
    let remaining = line.strip_prefix(found.prefix.as_str()).unwrap_or(line);
    (remaining, found.fields)
}
