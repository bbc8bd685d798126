// CLI-specific types and structures
// This module contains the command-line interface definitions

use clap::Parser;

// CLI structure - contains all command-line arguments and options
#[derive(Parser, Debug)]
#[command(name = "keyval")]
#[command(about = "Parse key=value (logfmt) log lines into timestamped JSON events")]
#[command(
    long_about = "Parse key=value (logfmt) log lines into timestamped JSON events\n\nEach input line is tokenized into typed fields (bool, int, float, string) and written as one JSON object per line:\n  {\"timestamp\":\"...\",\"data\":{...}}\n\nLines that are filtered out, fail to parse, or carry no values are skipped. Set RUST_LOG=keyval=debug to see why.\n\nCOMMON EXAMPLES:\n  keyval app.log --timefield ts --format unix\n  keyval app.log --filter-regex '^level=error'\n  docker compose logs | keyval --extract-prefix service"
)]
#[command(author = "Dirk Loss <mail@dirk-loss.de>")]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Input files (stdin if not specified, or use "-" to explicitly specify stdin)
    pub files: Vec<String>,

    /// Field holding the event time. Without it, common names (time, timestamp, date, ...) are tried.
    #[arg(long = "timefield", help_heading = "Timestamp Options")]
    pub timefield: Option<String>,

    /// Time format: strftime (%Y-%m-%d %H:%M:%S), Go layout (2006-01-02T15:04:05Z07:00), or unix, unix_ms, unix_us, unix_ns
    #[arg(long = "format", help_heading = "Timestamp Options")]
    pub time_format: Option<String>,

    /// Only parse lines matching this regex
    #[arg(long = "filter-regex", help_heading = "Filtering Options")]
    pub filter_regex: Option<String>,

    /// Parse only lines NOT matching --filter-regex
    #[arg(
        long = "invert-filter",
        requires = "filter_regex",
        help_heading = "Filtering Options"
    )]
    pub invert_filter: bool,

    /// Regex with named groups matching a leading prefix; each group becomes a field
    #[arg(long = "prefix-regex", help_heading = "Prefix Options")]
    pub prefix_regex: Option<String>,

    /// Store the text before --prefix-sep in FIELD and strip it from the line
    #[arg(
        long = "extract-prefix",
        value_name = "FIELD",
        conflicts_with = "prefix_regex",
        help_heading = "Prefix Options"
    )]
    pub extract_prefix: Option<String>,

    /// Separator ending the prefix for --extract-prefix
    #[arg(
        long = "prefix-sep",
        value_name = "SEP",
        default_value = "|",
        help_heading = "Prefix Options"
    )]
    pub prefix_sep: String,

    /// Output file for events (stdout if not specified)
    #[arg(short = 'o', long = "output-file", help_heading = "Output Options")]
    pub output_file: Option<String>,

    /// Print processing statistics to stderr when done
    #[arg(long = "stats", help_heading = "Output Options")]
    pub stats: bool,

    /// Number of parser threads (0 = number of CPUs)
    #[arg(long = "threads", default_value_t = 0, help_heading = "Performance Options")]
    pub threads: usize,

    /// Capacity of the line and event channels
    #[arg(long = "buffer-size", help_heading = "Performance Options")]
    pub buffer_size: Option<usize>,
}
