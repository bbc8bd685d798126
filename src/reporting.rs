//! Rejected-line reporting
//!
//! Every line that doesn't become an event is classified as a [`Rejection`]
//! and handed to a [`Reporter`] exactly once.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::TokenizeError;

/// Stable tag for why a line was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    FilteredByRegex,
    TokenizeError,
    EmptyResult,
    AllValuesEmpty,
}

impl RejectionReason {
    pub const ALL: [RejectionReason; 4] = [
        RejectionReason::FilteredByRegex,
        RejectionReason::TokenizeError,
        RejectionReason::EmptyResult,
        RejectionReason::AllValuesEmpty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::FilteredByRegex => "filtered-by-regex",
            RejectionReason::TokenizeError => "tokenize-error",
            RejectionReason::EmptyResult => "empty-result",
            RejectionReason::AllValuesEmpty => "all-values-empty",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a particular line was dropped, with whatever detail goes with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The filter decided against the line. `matched` is the raw regex result.
    Filtered { matched: bool },
    Tokenize(TokenizeError),
    EmptyResult,
    AllValuesEmpty,
}

impl Rejection {
    pub fn reason(&self) -> RejectionReason {
        match self {
            Rejection::Filtered { .. } => RejectionReason::FilteredByRegex,
            Rejection::Tokenize(_) => RejectionReason::TokenizeError,
            Rejection::EmptyResult => RejectionReason::EmptyResult,
            Rejection::AllValuesEmpty => RejectionReason::AllValuesEmpty,
        }
    }

    /// Structured context for the filter case, `None` otherwise
    pub fn matched(&self) -> Option<bool> {
        match self {
            Rejection::Filtered { matched } => Some(*matched),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Filtered { .. } => f.write_str("due to provided filter_regex"),
            Rejection::Tokenize(err) => write!(f, "{}", err),
            Rejection::EmptyResult => f.write_str("no key/val pairs found"),
            Rejection::AllValuesEmpty => f.write_str("all values are the empty string"),
        }
    }
}

impl From<TokenizeError> for Rejection {
    fn from(err: TokenizeError) -> Self {
        Rejection::Tokenize(err)
    }
}

/// Receives one call per rejected line. Shared by all workers.
pub trait Reporter: Send + Sync {
    fn report(&self, line: &str, rejection: &Rejection);
}

impl<F> Reporter for F
where
    F: Fn(&str, &Rejection) + Send + Sync,
{
    fn report(&self, line: &str, rejection: &Rejection) {
        self(line, rejection)
    }
}

/// Default reporter: one debug-level tracing event per rejected line
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, line: &str, rejection: &Rejection) {
        match rejection {
            Rejection::Filtered { matched } => {
                tracing::debug!(
                    line,
                    reason = %rejection.reason(),
                    matched = *matched,
                    "Skipping line {}", rejection
                );
            }
            Rejection::Tokenize(err) => {
                tracing::debug!(
                    line,
                    reason = %rejection.reason(),
                    error = %err,
                    "Skipping line; failed to parse"
                );
            }
            Rejection::EmptyResult | Rejection::AllValuesEmpty => {
                tracing::debug!(line, reason = %rejection.reason(), "Skipping line {}", rejection);
            }
        }
    }
}

/// Reporter that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _line: &str, _rejection: &Rejection) {}
}

/// Invoke a reporter without letting a panic inside it escape into the worker.
/// Returns false if the reporter panicked.
pub(crate) fn report_contained(reporter: &dyn Reporter, line: &str, rejection: &Rejection) -> bool {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| reporter.report(line, rejection)));
    if outcome.is_err() {
        tracing::warn!(reason = %rejection.reason(), "Reporter panicked; continuing");
        return false;
    }
    true
}
