//! IO reader thread: the upstream producer feeding the worker pool

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::io::BufRead;

use crate::platform::SignalHandler;

/// Summary of what the reader pushed downstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOutcome {
    pub lines_sent: usize,
    /// Stopped early because a shutdown signal arrived
    pub interrupted: bool,
}

/// Read lines until EOF, a shutdown signal, or until nobody is listening.
///
/// Line terminators are stripped; invalid UTF-8 is replaced rather than
/// rejected. Dropping `line_sender` on return closes the input for the workers.
pub(crate) fn io_reader_thread<R: BufRead>(
    mut reader: R,
    line_sender: Sender<String>,
) -> Result<ReaderOutcome> {
    let mut outcome = ReaderOutcome::default();
    let mut buffer = Vec::new();

    loop {
        if SignalHandler::should_terminate() {
            tracing::debug!("Shutdown requested; closing input");
            outcome.interrupted = true;
            break;
        }

        buffer.clear();
        let n = reader
            .read_until(b'\n', &mut buffer)
            .context("Failed to read input")?;
        if n == 0 {
            break;
        }

        if buffer.last() == Some(&b'\n') {
            buffer.pop();
            if buffer.last() == Some(&b'\r') {
                buffer.pop();
            }
        }

        let line = String::from_utf8_lossy(&buffer).into_owned();
        if line_sender.send(line).is_err() {
            tracing::debug!("All parsers gone; reader stopping");
            break;
        }
        outcome.lines_sent += 1;
    }

    Ok(outcome)
}
