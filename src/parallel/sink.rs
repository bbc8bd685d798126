//! Event sink thread: serializes events as JSON lines

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::io::Write;

use crate::event::Event;
use crate::platform::write_line;

/// Write every event as one JSON line until all senders are gone.
///
/// Returns the number of events written. On a write error the receiver is
/// dropped, which tells the workers to stop.
pub(crate) fn event_sink_thread<W: Write>(
    event_receiver: Receiver<Event>,
    output: &mut W,
) -> Result<usize> {
    let mut written = 0usize;

    for event in event_receiver.iter() {
        let line = event
            .to_json_line()
            .context("Failed to serialize event")?;
        write_line(output, &line)?;
        written += 1;
    }

    output.flush().context("Failed to flush output")?;
    tracing::debug!(events = written, "Event sink finished");
    Ok(written)
}
