use std::sync::Arc;

use crate::error::ConfigError;
use crate::pipeline::prefix_extractor::{PrefixMatcher, RegexPrefix, SeparatorPrefix};
use crate::pipeline::stages::LineFilter;

/// Default bound for the channels between reader, workers and sink
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

/// Settings that shape how each line is parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Field holding the event time. `None` means try the well-known names.
    pub time_field_name: Option<String>,
    /// Format hint for the time field (strftime, Go layout, or `unix*`)
    pub time_field_format: Option<String>,
    pub filter_regex: Option<String>,
    pub invert_filter: bool,
    pub num_parsers: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            time_field_name: None,
            time_field_format: None,
            filter_regex: None,
            invert_filter: false,
            num_parsers: num_cpus::get(),
        }
    }
}

impl ParserConfig {
    /// Treat empty strings as "not set"
    pub fn normalize(mut self) -> Self {
        self.time_field_name = non_empty(self.time_field_name);
        self.time_field_format = non_empty(self.time_field_format);
        self.filter_regex = non_empty(self.filter_regex);
        self
    }

    /// Reject settings the dispatcher can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_parsers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        LineFilter::new(self.filter_regex.as_deref(), self.invert_filter)?;
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// How the header/prefix of each line is recognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixConfig {
    Regex(String),
    Separator { field: String, separator: String },
}

impl PrefixConfig {
    pub fn build(&self) -> Result<Arc<dyn PrefixMatcher>, ConfigError> {
        match self {
            PrefixConfig::Regex(pattern) => Ok(Arc::new(RegexPrefix::new(pattern)?)),
            PrefixConfig::Separator { field, separator } => Ok(Arc::new(SeparatorPrefix::new(
                field.clone(),
                separator.clone(),
            ))),
        }
    }
}

/// Everything the binary needs: the parser settings plus CLI-only options
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub parser: ParserConfig,
    pub files: Vec<String>,
    pub prefix: Option<PrefixConfig>,
    pub output_file: Option<String>,
    pub buffer_size: usize,
    pub stats: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            files: Vec::new(),
            prefix: None,
            output_file: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            stats: false,
        }
    }
}

impl AppConfig {
    pub fn from_cli(cli: &crate::Cli) -> Self {
        let num_parsers = if cli.threads == 0 {
            num_cpus::get()
        } else {
            cli.threads
        };

        let prefix = match (&cli.prefix_regex, &cli.extract_prefix) {
            (Some(pattern), _) => Some(PrefixConfig::Regex(pattern.clone())),
            (None, Some(field)) => Some(PrefixConfig::Separator {
                field: field.clone(),
                separator: cli.prefix_sep.clone(),
            }),
            (None, None) => None,
        };

        Self {
            parser: ParserConfig {
                time_field_name: cli.timefield.clone(),
                time_field_format: cli.time_format.clone(),
                filter_regex: cli.filter_regex.clone(),
                invert_filter: cli.invert_filter,
                num_parsers,
            }
            .normalize(),
            files: cli.files.clone(),
            prefix,
            output_file: cli.output_file.clone(),
            buffer_size: cli.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE).max(1),
            stats: cli.stats,
        }
    }
}
