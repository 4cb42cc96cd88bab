//! Failure sinks the mock reports through.
//!
//! `error` is non-fatal: the mock keeps going and the test may still pass or
//! fail on its own assertions. `fatal` marks a condition the mock cannot
//! recover from; the call that triggered it is abandoned.

use parking_lot::Mutex;
use tracing::error;

/// The reporting capability a mock needs from its test context.
pub trait FailureReporter {
    fn error(&self, message: &str);
    fn fatal(&self, message: &str);
}

/// Reporter for real tests: fatal reports panic immediately, non-fatal ones
/// are collected and fail the test when the reporter is dropped.
#[derive(Debug, Default)]
pub struct PanicReporter {
    errors: Mutex<Vec<String>>,
}

impl PanicReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl FailureReporter for PanicReporter {
    fn error(&self, message: &str) {
        error!("{message}");
        self.errors.lock().push(message.to_string());
    }

    fn fatal(&self, message: &str) {
        panic!("{message}");
    }
}

impl Drop for PanicReporter {
    fn drop(&mut self) {
        let errors = self.errors.get_mut();
        if !errors.is_empty() && !std::thread::panicking() {
            panic!("{}", errors.join("\n"));
        }
    }
}

/// Reporter that only remembers the last message of each kind.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    last_error: Mutex<Option<String>>,
    last_fatal: Mutex<Option<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn last_fatal(&self) -> Option<String> {
        self.last_fatal.lock().clone()
    }

    pub fn clear(&self) {
        *self.last_error.lock() = None;
        *self.last_fatal.lock() = None;
    }
}

impl FailureReporter for RecordingReporter {
    fn error(&self, message: &str) {
        *self.last_error.lock() = Some(message.to_string());
    }

    fn fatal(&self, message: &str) {
        *self.last_fatal.lock() = Some(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_reporter_keeps_last_message() {
        let reporter = RecordingReporter::new();
        reporter.error("first");
        reporter.error("second");
        reporter.fatal("boom");
        assert_eq!(reporter.last_error().as_deref(), Some("second"));
        assert_eq!(reporter.last_fatal().as_deref(), Some("boom"));

        reporter.clear();
        assert!(reporter.last_error().is_none());
        assert!(reporter.last_fatal().is_none());
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn panic_reporter_fatal_panics() {
        PanicReporter::new().fatal("boom");
    }

    #[test]
    #[should_panic(expected = "out of scope")]
    fn panic_reporter_fails_on_drop_after_error() {
        let reporter = PanicReporter::new();
        reporter.error("out of scope");
        assert_eq!(reporter.errors(), vec!["out of scope".to_string()]);
    }

    #[test]
    fn panic_reporter_is_quiet_without_errors() {
        drop(PanicReporter::new());
    }
}
