//! Host callbacks: cancellation polling, runtime error display and the
//! single-step debugger.

use std::time::Duration;

use crate::error::ErrorKind;

/// Progress information handed to [`Host::feedback`].
#[derive(Clone, Copy, Debug)]
pub struct Feedback {
    /// Time since the current top-level execution started.
    pub elapsed: Duration,
    /// Elements evaluated so far in the current top-level execution.
    pub elements: u64,
}

#[derive(Clone, Debug)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub line: u32,
    /// Decompiled text of the failing statement.
    pub source: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorAction {
    Abort,
    Debug,
}

#[derive(Clone, Debug)]
pub struct DebugEvent {
    pub line: u32,
    pub source: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugAction {
    Step,
    Continue,
    Abort,
}

pub trait Host {
    /// Polled for every evaluated element. Returning `false` stops execution.
    fn feedback(&mut self, info: &Feedback) -> bool;

    /// A runtime error occurred outside any `try`.
    fn report_error(&mut self, report: &ErrorReport) -> ErrorAction;

    /// Called before each statement while single-stepping.
    fn debug_step(&mut self, _event: &DebugEvent) -> DebugAction {
        DebugAction::Continue
    }
}

/// Logs errors and enforces an optional wall-clock timeout.
#[derive(Clone, Debug, Default)]
pub struct DefaultHost {
    pub timeout: Option<Duration>,
}

impl DefaultHost {
    pub fn new(timeout: Option<Duration>) -> Self {
        DefaultHost { timeout }
    }
}

impl Host for DefaultHost {
    fn feedback(&mut self, info: &Feedback) -> bool {
        match self.timeout {
            Some(limit) if info.elapsed > limit => {
                log::warn!(
                    "script stopped after {:?} ({} elements evaluated)",
                    info.elapsed,
                    info.elements
                );
                false
            }
            _ => true,
        }
    }

    fn report_error(&mut self, report: &ErrorReport) -> ErrorAction {
        log::warn!(
            "{}: {} (line {}): {}",
            report.kind,
            report.message,
            report.line,
            report.source
        );
        ErrorAction::Abort
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host_enforces_timeout() {
        let mut host = DefaultHost::new(Some(Duration::from_millis(10)));
        let early = Feedback {
            elapsed: Duration::from_millis(5),
            elements: 1,
        };
        let late = Feedback {
            elapsed: Duration::from_millis(11),
            elements: 2,
        };
        assert!(host.feedback(&early));
        assert!(!host.feedback(&late));
        assert!(DefaultHost::default().feedback(&late));
    }

    #[test]
    fn default_host_never_debugs() {
        let mut host = DefaultHost::default();
        let report = ErrorReport {
            kind: ErrorKind::Type,
            message: "x is not a function".into(),
            line: 3,
            source: "x();".into(),
        };
        assert_eq!(host.report_error(&report), ErrorAction::Abort);
        let event = DebugEvent {
            line: 3,
            source: "x();".into(),
        };
        assert_eq!(host.debug_step(&event), DebugAction::Continue);
    }
}
