/// Fatal initialization errors. The worker pool never starts when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid filter_regex '{pattern}': {source}")]
    InvalidFilterRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid prefix regex '{pattern}': {source}")]
    InvalidPrefixRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("prefix regex '{0}' has no named capture groups")]
    PrefixWithoutNamedGroups(String),

    #[error("number of parsers must be at least 1")]
    NoWorkers,
}

/// A line that could not be split into key=value tokens
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("logfmt: unterminated quoted value for key '{key}'")]
    UnterminatedString { key: String },

    #[error("logfmt: invalid escape sequence '\\{sequence}' in value for key '{key}'")]
    InvalidEscape { key: String, sequence: String },
}
