//! Type definitions for parallel processing

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a dispatcher run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatcherState {
    /// Built, no workers started yet
    Idle = 0,
    /// Workers are consuming lines
    Running = 1,
    /// Input is closed; workers are finishing what they hold
    Draining = 2,
    /// Every worker has been joined
    Stopped = 3,
}

impl DispatcherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DispatcherState::Idle,
            1 => DispatcherState::Running,
            2 => DispatcherState::Draining,
            _ => DispatcherState::Stopped,
        }
    }
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatcherState::Idle => "idle",
            DispatcherState::Running => "running",
            DispatcherState::Draining => "draining",
            DispatcherState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a [`DispatcherState`]
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: DispatcherState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> DispatcherState {
        DispatcherState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: DispatcherState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move `from -> to` only if currently in `from`
    pub fn transition(&self, from: DispatcherState, to: DispatcherState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Why a worker left its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// Input channel closed and drained
    InputClosed,
    /// Nobody is receiving events any more
    SinkClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let cell = StateCell::new(DispatcherState::Idle);
        assert_eq!(cell.get(), DispatcherState::Idle);

        cell.set(DispatcherState::Running);
        assert!(cell.transition(DispatcherState::Running, DispatcherState::Draining));
        // Only the first worker to see closed input moves the state
        assert!(!cell.transition(DispatcherState::Running, DispatcherState::Draining));
        assert_eq!(cell.get(), DispatcherState::Draining);
        assert_eq!(cell.get().to_string(), "draining");
    }
}
