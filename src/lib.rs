// Core library for the keyval log parser

pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod parallel;
pub mod parsers;
pub mod pipeline;
pub mod platform;
pub mod readers;
pub mod reporting;
pub mod stats;
pub mod timestamp;

pub use cli::Cli;
pub use config::{AppConfig, ParserConfig, PrefixConfig};
pub use error::{ConfigError, TokenizeError};
pub use event::{Event, FieldMap, FieldValue};
pub use parallel::{Dispatcher, DispatcherState, ReaderOutcome};
pub use pipeline::{LineProcessor, PrefixMatch, PrefixMatcher, RegexPrefix, SeparatorPrefix};
pub use reporting::{Rejection, RejectionReason, Reporter, TracingReporter};
pub use stats::ProcessingStats;
pub use timestamp::{DefaultResolver, TimestampResolver};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::bounded;
use std::io::{BufRead, Write};
use std::thread;

/// What a full run produced
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub stats: ProcessingStats,
    pub events_written: usize,
    pub reader: ReaderOutcome,
}

impl PipelineResult {
    /// True when a shutdown signal cut the input short
    pub fn interrupted(&self) -> bool {
        self.reader.interrupted
    }
}

/// Build a dispatcher from `config` and run it over `reader`, writing JSON
/// lines to `output`.
pub fn run_pipeline<R, W>(config: &AppConfig, reader: R, output: W) -> Result<PipelineResult>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let mut dispatcher = Dispatcher::new(config.parser.clone())?;
    if let Some(prefix) = &config.prefix {
        dispatcher = dispatcher.with_prefix_matcher(prefix.build()?);
    }

    run_dispatcher(&dispatcher, reader, output, config.buffer_size)
}

/// Run an already configured dispatcher: a reader thread feeds lines into a
/// bounded channel, the dispatcher's workers parse them, and a sink thread
/// writes the events.
pub fn run_dispatcher<R, W>(
    dispatcher: &Dispatcher,
    reader: R,
    output: W,
    buffer_size: usize,
) -> Result<PipelineResult>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let buffer_size = buffer_size.max(1);
    let (line_sender, line_receiver) = bounded(buffer_size);
    let (event_sender, event_receiver) = bounded(buffer_size);

    let io_handle = thread::Builder::new()
        .name("keyval-reader".to_string())
        .spawn(move || parallel::io_reader_thread(reader, line_sender))
        .context("Failed to spawn reader thread")?;

    let sink_handle = thread::Builder::new()
        .name("keyval-sink".to_string())
        .spawn(move || {
            let mut output = output;
            parallel::event_sink_thread(event_receiver, &mut output)
        })
        .context("Failed to spawn sink thread")?;

    let stats = dispatcher.process_lines(line_receiver, event_sender);

    let reader = io_handle
        .join()
        .map_err(|_| anyhow!("Reader thread panicked"))??;
    let events_written = sink_handle
        .join()
        .map_err(|_| anyhow!("Sink thread panicked"))??;

    Ok(PipelineResult {
        stats,
        events_written,
        reader,
    })
}
