use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::thread;

#[cfg(unix)]
use signal_hook::{consts::SIGINT, consts::SIGTERM, iterator::Signals};

#[cfg(windows)]
use signal_hook::{consts::SIGINT, flag};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalInt = 130,  // 128 + SIGINT (2)
    SignalPipe = 141, // 128 + SIGPIPE (13)
    SignalTerm = 143, // 128 + SIGTERM (15)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

/// Global termination flag for graceful shutdown
pub static SHOULD_TERMINATE: AtomicBool = AtomicBool::new(false);
/// Number of the first shutdown signal received, 0 if none
static RECEIVED_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Signal handler for graceful shutdown.
///
/// The first SIGINT/SIGTERM only raises [`SHOULD_TERMINATE`]; the reader
/// notices it and closes the input so the workers drain normally.
/// A second signal exits on the spot.
pub struct SignalHandler {
    _handle: thread::JoinHandle<()>,
}

impl SignalHandler {
    pub fn new() -> Result<Self> {
        #[cfg(unix)]
        {
            let mut signals = Signals::new([SIGINT, SIGTERM])?;

            let handle = thread::spawn(move || {
                let mut shutdown_count = 0;
                for sig in signals.forever() {
                    let exit_code = match sig {
                        SIGINT => ExitCode::SignalInt,
                        SIGTERM => ExitCode::SignalTerm,
                        _ => continue,
                    };

                    shutdown_count += 1;
                    let _ = RECEIVED_SIGNAL.compare_exchange(
                        0,
                        sig,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    );
                    SHOULD_TERMINATE.store(true, Ordering::Relaxed);

                    if shutdown_count > 1 {
                        exit_code.exit();
                    }
                    tracing::warn!(signal = sig, "Shutting down; waiting for workers to drain");
                }
            });

            Ok(SignalHandler { _handle: handle })
        }

        #[cfg(windows)]
        {
            let term_flag = std::sync::Arc::new(AtomicBool::new(false));
            flag::register(SIGINT, std::sync::Arc::clone(&term_flag))?;

            let handle = thread::spawn(move || {
                let mut shutdown_count = 0;
                loop {
                    thread::sleep(std::time::Duration::from_millis(100));
                    if term_flag.swap(false, Ordering::Relaxed) {
                        shutdown_count += 1;
                        RECEIVED_SIGNAL.store(SIGINT, Ordering::Relaxed);
                        SHOULD_TERMINATE.store(true, Ordering::Relaxed);
                        if shutdown_count > 1 {
                            ExitCode::SignalInt.exit();
                        }
                    }
                }
            });

            Ok(SignalHandler { _handle: handle })
        }
    }

    /// Check if we should terminate processing
    pub fn should_terminate() -> bool {
        SHOULD_TERMINATE.load(Ordering::Relaxed)
    }

    /// Exit code matching the signal that stopped us, if any
    pub fn exit_code() -> Option<ExitCode> {
        match RECEIVED_SIGNAL.load(Ordering::Relaxed) {
            0 => None,
            #[cfg(unix)]
            SIGTERM => Some(ExitCode::SignalTerm),
            _ => Some(ExitCode::SignalInt),
        }
    }
}

/// Cross-platform broken pipe detection
pub fn is_broken_pipe(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
    }
    #[cfg(windows)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
            || e.raw_os_error() == Some(232) // ERROR_NO_DATA "The pipe is being closed"
            || e.raw_os_error() == Some(109) // ERROR_BROKEN_PIPE "The pipe has been ended"
    }
}

/// True if the error chain bottoms out in a broken pipe
pub fn is_broken_pipe_error(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(is_broken_pipe)
}

/// Create a helpful error message for file creation failures
fn create_helpful_error_message(path: &Path, error: &io::Error) -> String {
    let base_msg = format!("Cannot create output file '{}': {}", path.display(), error);

    let suggestion = match error.kind() {
        io::ErrorKind::PermissionDenied => {
            if path.parent().is_some_and(|p| !p.exists()) {
                "Suggestion: Parent directory does not exist, create it first"
            } else {
                "Suggestion: Check file permissions or choose a writable location"
            }
        }
        io::ErrorKind::NotFound => "Suggestion: Parent directory does not exist, create it first",
        io::ErrorKind::AlreadyExists if path.is_dir() => {
            "Suggestion: Path points to a directory, specify a filename instead"
        }
        _ => return base_msg,
    };

    format!("{}\n{}", base_msg, suggestion)
}

/// Open the event destination: the given file (truncated) or stdout
pub fn open_output(path: Option<&str>) -> Result<Box<dyn Write + Send>> {
    match path {
        Some(path) => {
            let path_ref = Path::new(path);
            let file = File::create(path_ref)
                .map_err(|e| anyhow::anyhow!("{}", create_helpful_error_message(path_ref, &e)))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Write one line, tagging failures with where they happened
pub fn write_line<W: Write + ?Sized>(output: &mut W, line: &str) -> Result<()> {
    writeln!(output, "{}", line).context("Failed to write event")
}
