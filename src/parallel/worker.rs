//! Worker thread for parallel processing

use crossbeam_channel::{Receiver, Sender};

use crate::event::Event;
use crate::pipeline::LineProcessor;
use crate::reporting::{report_contained, Reporter};
use crate::stats::{
    get_thread_stats, stats_add_event_output, stats_add_line_read, stats_add_rejection,
    stats_add_reporter_panic, stats_add_worker_error, stats_finish_processing, stats_start_timer,
    ProcessingStats,
};

use super::types::{DispatcherState, StateCell, WorkerExit};

/// Everything a worker borrows from the dispatcher
pub(crate) struct WorkerContext<'a> {
    pub processor: &'a LineProcessor,
    pub reporter: &'a dyn Reporter,
    pub state: &'a StateCell,
}

/// Worker loop: pull lines until the input is closed and drained, push events
/// for lines that parse and report the rest. Returns this worker's counters.
pub(crate) fn worker_thread(
    worker_id: usize,
    ctx: WorkerContext<'_>,
    line_receiver: &Receiver<String>,
    event_sender: &Sender<Event>,
) -> ProcessingStats {
    stats_start_timer();

    let exit = process_lines(&ctx, line_receiver, event_sender);

    match exit {
        WorkerExit::InputClosed => {
            ctx.state.transition(DispatcherState::Running, DispatcherState::Draining);
            tracing::debug!(worker = worker_id, "lines channel is closed, ending parser");
        }
        WorkerExit::SinkClosed => {
            stats_add_worker_error();
            tracing::warn!(worker = worker_id, "Event receiver dropped; worker stopping");
        }
    }

    stats_finish_processing();

    let mut stats = get_thread_stats();
    stats.workers = 1;
    stats
}

fn process_lines(
    ctx: &WorkerContext<'_>,
    line_receiver: &Receiver<String>,
    event_sender: &Sender<Event>,
) -> WorkerExit {
    // recv() only fails once the channel is both disconnected and empty
    while let Ok(line) = line_receiver.recv() {
        stats_add_line_read();

        match ctx.processor.process(&line) {
            Ok(event) => {
                if event_sender.send(event).is_err() {
                    return WorkerExit::SinkClosed;
                }
                stats_add_event_output();
            }
            Err(rejection) => {
                stats_add_rejection(rejection.reason());
                if !report_contained(ctx.reporter, &line, &rejection) {
                    stats_add_reporter_panic();
                }
            }
        }
    }

    WorkerExit::InputClosed
}
