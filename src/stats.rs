use std::cell::RefCell;
use std::time::{Duration, Instant};

use crate::reporting::RejectionReason;

/// Statistics collected during log processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub lines_read: usize,
    pub events_output: usize,
    pub lines_filtered: usize,
    pub tokenize_errors: usize,
    pub empty_results: usize,
    pub all_values_empty: usize,
    /// Workers that panicked or lost their sink
    pub worker_errors: usize,
    pub reporter_panics: usize,
    pub workers: usize,
    pub processing_time: Duration,
}

// Thread-local storage for statistics; each worker owns one copy
thread_local! {
    static THREAD_STATS: RefCell<ProcessingStats> = RefCell::new(ProcessingStats::default());
    static THREAD_START: RefCell<Option<Instant>> = const { RefCell::new(None) };
}

pub fn stats_add_line_read() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().lines_read += 1;
    });
}

pub fn stats_add_event_output() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().events_output += 1;
    });
}

pub fn stats_add_rejection(reason: RejectionReason) {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().add_rejection(reason);
    });
}

pub fn stats_add_reporter_panic() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().reporter_panics += 1;
    });
}

pub fn stats_add_worker_error() {
    THREAD_STATS.with(|stats| {
        stats.borrow_mut().worker_errors += 1;
    });
}

/// Reset this thread's counters and start its timer
pub fn stats_start_timer() {
    THREAD_STATS.with(|stats| *stats.borrow_mut() = ProcessingStats::default());
    THREAD_START.with(|start| *start.borrow_mut() = Some(Instant::now()));
}

pub fn stats_finish_processing() {
    THREAD_START.with(|start| {
        if let Some(start) = *start.borrow() {
            THREAD_STATS.with(|stats| stats.borrow_mut().processing_time = start.elapsed());
        }
    });
}

pub fn get_thread_stats() -> ProcessingStats {
    THREAD_STATS.with(|stats| stats.borrow().clone())
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rejection(&mut self, reason: RejectionReason) {
        match reason {
            RejectionReason::FilteredByRegex => self.lines_filtered += 1,
            RejectionReason::TokenizeError => self.tokenize_errors += 1,
            RejectionReason::EmptyResult => self.empty_results += 1,
            RejectionReason::AllValuesEmpty => self.all_values_empty += 1,
        }
    }

    pub fn rejections(&self, reason: RejectionReason) -> usize {
        match reason {
            RejectionReason::FilteredByRegex => self.lines_filtered,
            RejectionReason::TokenizeError => self.tokenize_errors,
            RejectionReason::EmptyResult => self.empty_results,
            RejectionReason::AllValuesEmpty => self.all_values_empty,
        }
    }

    pub fn total_rejected(&self) -> usize {
        RejectionReason::ALL
            .iter()
            .map(|reason| self.rejections(*reason))
            .sum()
    }

    /// Fold a worker's counters into this one. Elapsed time is the longest worker.
    pub fn merge(&mut self, other: &ProcessingStats) {
        self.lines_read += other.lines_read;
        self.events_output += other.events_output;
        self.lines_filtered += other.lines_filtered;
        self.tokenize_errors += other.tokenize_errors;
        self.empty_results += other.empty_results;
        self.all_values_empty += other.all_values_empty;
        self.worker_errors += other.worker_errors;
        self.reporter_panics += other.reporter_panics;
        self.workers += other.workers;
        self.processing_time = self.processing_time.max(other.processing_time);
    }

    pub fn format_stats(&self) -> String {
        let mut output = format!(
            "Lines processed: {} total, {} output, {} filtered",
            self.lines_read, self.events_output, self.lines_filtered
        );

        let skipped = self.tokenize_errors + self.empty_results + self.all_values_empty;
        if skipped > 0 {
            output.push_str(&format!(
                ", {} skipped ({} parse errors, {} empty, {} all-empty)",
                skipped, self.tokenize_errors, self.empty_results, self.all_values_empty
            ));
        }

        if self.worker_errors > 0 {
            output.push_str(&format!(", {} worker errors", self.worker_errors));
        }

        if self.reporter_panics > 0 {
            output.push_str(&format!(", {} reporter panics", self.reporter_panics));
        }

        let processing_time_ms = self.processing_time.as_millis();
        output.push_str(&format!(" in {}ms", processing_time_ms));

        if processing_time_ms > 0 && self.lines_read > 0 {
            let lines_per_sec = (self.lines_read as f64 * 1000.0) / processing_time_ms as f64;
            output.push_str(&format!(" ({:.0} lines/s)", lines_per_sec));
        }

        if self.workers > 0 {
            output.push_str(&format!(", {} workers", self.workers));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sums_counters() {
        let mut total = ProcessingStats::new();
        let a = ProcessingStats {
            lines_read: 3,
            events_output: 2,
            lines_filtered: 1,
            workers: 1,
            processing_time: Duration::from_millis(5),
            ..Default::default()
        };
        let b = ProcessingStats {
            lines_read: 4,
            events_output: 1,
            all_values_empty: 2,
            tokenize_errors: 1,
            workers: 1,
            processing_time: Duration::from_millis(9),
            ..Default::default()
        };

        total.merge(&a);
        total.merge(&b);

        assert_eq!(total.lines_read, 7);
        assert_eq!(total.events_output, 3);
        assert_eq!(total.total_rejected(), 4);
        assert_eq!(total.workers, 2);
        assert_eq!(total.processing_time, Duration::from_millis(9));
    }

    #[test]
    fn test_thread_local_counters() {
        stats_start_timer();
        stats_add_line_read();
        stats_add_line_read();
        stats_add_event_output();
        stats_add_rejection(RejectionReason::EmptyResult);
        stats_finish_processing();

        let stats = get_thread_stats();
        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.events_output, 1);
        assert_eq!(stats.rejections(RejectionReason::EmptyResult), 1);
    }

    #[test]
    fn test_format_stats() {
        let stats = ProcessingStats {
            lines_read: 10,
            events_output: 7,
            lines_filtered: 1,
            tokenize_errors: 1,
            all_values_empty: 1,
            ..Default::default()
        };
        let line = stats.format_stats();
        assert!(line.starts_with("Lines processed: 10 total, 7 output, 1 filtered"));
        assert!(line.contains("2 skipped (1 parse errors, 0 empty, 1 all-empty)"));
        assert!(!line.contains("worker errors"));
    }
}
