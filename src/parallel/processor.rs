//! Worker pool that turns a stream of lines into a stream of events

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::config::ParserConfig;
use crate::error::ConfigError;
use crate::event::Event;
use crate::pipeline::{LineProcessor, PrefixMatcher};
use crate::reporting::{Reporter, TracingReporter};
use crate::stats::ProcessingStats;
use crate::timestamp::TimestampResolver;

use super::types::{DispatcherState, StateCell};
use super::worker::{worker_thread, WorkerContext};

/// Runs `num_parsers` worker threads over a shared line channel.
///
/// Lines are handed out to whichever worker is free, so event order across
/// workers is not preserved.
pub struct Dispatcher {
    processor: LineProcessor,
    reporter: Arc<dyn Reporter>,
    num_parsers: usize,
    state: StateCell,
}

impl Dispatcher {
    /// Validate the configuration and compile the filter once for all workers
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        let config = config.normalize();
        config.validate()?;

        Ok(Self {
            processor: LineProcessor::new(&config)?,
            reporter: Arc::new(TracingReporter),
            num_parsers: config.num_parsers,
            state: StateCell::new(DispatcherState::Idle),
        })
    }

    pub fn with_prefix_matcher(mut self, matcher: Arc<dyn PrefixMatcher>) -> Self {
        self.processor = self.processor.with_prefix_matcher(matcher);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn TimestampResolver>) -> Self {
        self.processor = self.processor.with_resolver(resolver);
        self
    }

    pub fn num_parsers(&self) -> usize {
        self.num_parsers
    }

    pub fn state(&self) -> DispatcherState {
        self.state.get()
    }

    /// Process lines until `lines` is closed and drained.
    ///
    /// Blocks until every worker has exited, then drops `events` so the
    /// receiving side sees the end of the stream.
    pub fn process_lines(
        &self,
        lines: Receiver<String>,
        events: Sender<Event>,
    ) -> ProcessingStats {
        self.state.set(DispatcherState::Running);
        tracing::debug!(workers = self.num_parsers, "Starting parsers");

        let mut total = ProcessingStats::new();

        thread::scope(|scope| {
            let mut worker_handles = Vec::with_capacity(self.num_parsers);

            for worker_id in 0..self.num_parsers {
                let ctx = WorkerContext {
                    processor: &self.processor,
                    reporter: self.reporter.as_ref(),
                    state: &self.state,
                };
                let lines = &lines;
                let events = &events;

                let spawned = thread::Builder::new()
                    .name(format!("keyval-parser-{}", worker_id))
                    .spawn_scoped(scope, move || worker_thread(worker_id, ctx, lines, events));

                match spawned {
                    Ok(handle) => worker_handles.push(handle),
                    Err(e) => {
                        tracing::warn!(worker = worker_id, error = %e, "Failed to spawn parser thread");
                        total.worker_errors += 1;
                    }
                }
            }

            for handle in worker_handles {
                match handle.join() {
                    Ok(worker_stats) => total.merge(&worker_stats),
                    Err(_) => {
                        tracing::warn!("Parser thread panicked");
                        total.worker_errors += 1;
                    }
                }
            }
        });

        drop(events);
        self.state.set(DispatcherState::Stopped);
        tracing::debug!(
            lines = total.lines_read,
            events = total.events_output,
            "All parsers finished"
        );

        total
    }
}
