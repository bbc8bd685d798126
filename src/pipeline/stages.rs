use indexmap::IndexMap;
use regex::Regex;

use crate::error::ConfigError;
use crate::event::{FieldMap, FieldValue};
use crate::reporting::Rejection;

/// Outcome of running the filter on a raw line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Process,
    Skip { matched: bool },
}

/// Optional regex filter with invert flag, applied to raw lines
#[derive(Debug, Clone, Default)]
pub struct LineFilter {
    regex: Option<Regex>,
    invert: bool,
}

impl LineFilter {
    /// Compile the filter. An empty or missing pattern disables filtering.
    pub fn new(pattern: Option<&str>, invert: bool) -> Result<Self, ConfigError> {
        let regex = match pattern {
            Some(p) if !p.is_empty() => Some(Regex::new(p).map_err(|source| {
                ConfigError::InvalidFilterRegex {
                    pattern: p.to_string(),
                    source,
                }
            })?),
            _ => None,
        };
        Ok(Self { regex, invert })
    }

    pub fn is_enabled(&self) -> bool {
        self.regex.is_some()
    }

    /// A line is processed when the match result differs from the invert flag
    pub fn check(&self, line: &str) -> FilterOutcome {
        let Some(regex) = &self.regex else {
            return FilterOutcome::Process;
        };

        let matched = regex.is_match(line);
        if matched == self.invert {
            FilterOutcome::Skip { matched }
        } else {
            FilterOutcome::Process
        }
    }
}

/// Apply the post-tokenize rejection rules in order.
///
/// Runs on the tokenized fields only, before any header fields are merged,
/// so header fields can't rescue an otherwise empty line.
pub fn check_rejections(fields: &FieldMap) -> Result<(), Rejection> {
    if fields.is_empty() {
        return Err(Rejection::EmptyResult);
    }
    if all_empty(fields) {
        return Err(Rejection::AllValuesEmpty);
    }
    Ok(())
}

/// True when every value is the empty string
fn all_empty(fields: &FieldMap) -> bool {
    fields.values().all(FieldValue::is_empty_str)
}

/// Merge header fields over the tokenized ones. Headers win on key collisions.
pub fn merge_headers(fields: &mut FieldMap, headers: IndexMap<String, String>) {
    for (key, value) in headers {
        fields.insert(key, FieldValue::Str(value));
    }
}
