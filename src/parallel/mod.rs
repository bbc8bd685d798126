//! Parallel processing module for keyval
//!
//! # Module Structure
//!
//! - `types`: dispatcher lifecycle state
//! - `reader`: IO reader thread feeding the line channel
//! - `worker`: worker loop run by each parser thread
//! - `sink`: event sink thread writing JSON lines
//! - `processor`: the `Dispatcher` that owns the worker pool

mod processor;
mod reader;
mod sink;
mod types;
mod worker;

pub use processor::Dispatcher;
pub use reader::ReaderOutcome;
pub use types::DispatcherState;

pub(crate) use reader::io_reader_thread;
pub(crate) use sink::event_sink_thread;
